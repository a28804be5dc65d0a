//! Texture data decoded on the CPU before GPU upload: flat RGBA8 textures,
//! six-face cube textures and linear HDR environment maps.

use std::path::Path;

use anyhow::{Context, Result, bail, ensure};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureData {
    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        ensure!(
            data.len() == (width as usize) * (height as usize) * 4,
            "Data size {} doesn't match RGBA8 {}x{}",
            data.len(),
            width,
            height
        );
        Ok(Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        })
    }

    /// Decode any image format enabled on the `image` crate (PNG, JPEG).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading texture from {:?}", path);

        let img =
            image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::debug!("Loaded texture {}x{} with {} bytes", width, height, data.len());

        Self::new_rgba8(width, height, data)
    }

    /// Create a simple test texture (checkerboard pattern).
    pub fn create_test_texture(size: u32) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let checker = ((x / 8) + (y / 8)) % 2;
                if checker == 0 {
                    data.extend_from_slice(&[252, 252, 252, 255]);
                } else {
                    data.extend_from_slice(&[128, 128, 128, 255]);
                }
            }
        }

        Self {
            data,
            width: size,
            height: size,
            format: TextureFormat::Rgba8,
        }
    }

    /// A single opaque pixel, used as a neutral placeholder.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            data: rgba.to_vec(),
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
        }
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size = (self.width * self.height * self.bytes_per_pixel()) as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }
}

/// Cube texture faces in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Clone, Debug)]
pub struct CubeTextureData {
    pub faces: [TextureData; 6],
}

impl CubeTextureData {
    pub fn from_faces(faces: Vec<TextureData>) -> Result<Self> {
        let faces: [TextureData; 6] = match faces.try_into() {
            Ok(faces) => faces,
            Err(faces) => bail!("Cube texture needs 6 faces, got {}", faces.len()),
        };
        let (w, h) = (faces[0].width, faces[0].height);
        ensure!(w == h, "Cube faces must be square, got {}x{}", w, h);
        for (i, face) in faces.iter().enumerate() {
            ensure!(
                face.width == w && face.height == h,
                "Cube face {} is {}x{}, expected {}x{}",
                i,
                face.width,
                face.height,
                w,
                h
            );
        }
        Ok(Self { faces })
    }

    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let faces = paths
            .iter()
            .map(|p| TextureData::load(p))
            .collect::<Result<Vec<_>>>()?;
        Self::from_faces(faces)
    }

    pub fn size(&self) -> u32 {
        self.faces[0].width
    }
}

/// Linear RGB radiance map (equirectangular), as stored in `.hdr` files.
#[derive(Clone, Debug)]
pub struct HdrTexture {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<[f32; 3]>,
}

impl HdrTexture {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading radiance map from {:?}", path);

        let img =
            image::open(path).with_context(|| format!("Failed to open HDR image {:?}", path))?;
        let rgb = img.to_rgb32f();
        let (width, height) = rgb.dimensions();
        let texels = rgb.pixels().map(|p| p.0).collect();

        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Reinhard tone map + sRGB encode, for display on an 8-bit target.
    pub fn to_rgba8_tonemapped(&self, exposure: f32) -> TextureData {
        let mut data = Vec::with_capacity(self.texels.len() * 4);
        for texel in &self.texels {
            for c in texel {
                let v = (c * exposure).max(0.0);
                let mapped = v / (1.0 + v);
                data.push((linear_to_srgb(mapped) * 255.0).round() as u8);
            }
            data.push(255);
        }
        TextureData {
            data,
            width: self.width,
            height: self.height,
            format: TextureFormat::Rgba8,
        }
    }

    /// Mean radiance, used as a cheap ambient term.
    pub fn average(&self) -> [f32; 3] {
        if self.texels.is_empty() {
            return [0.0; 3];
        }
        let mut sum = [0.0f64; 3];
        for t in &self.texels {
            for (s, c) in sum.iter_mut().zip(t) {
                *s += f64::from(*c);
            }
        }
        let n = self.texels.len() as f64;
        sum.map(|s| (s / n) as f32)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_size_mismatch_is_rejected() {
        assert!(TextureData::new_rgba8(2, 2, vec![0; 15]).is_err());
        assert!(TextureData::new_rgba8(2, 2, vec![0; 16]).unwrap().is_valid());
    }

    #[test]
    fn checker_texture_is_valid() {
        let tex = TextureData::create_test_texture(16);
        assert!(tex.is_valid());
        assert_eq!(&tex.data[..4], &[252, 252, 252, 255]);
    }

    #[test]
    fn cube_requires_six_square_faces() {
        let face = || TextureData::create_test_texture(4);
        assert!(CubeTextureData::from_faces(vec![face(); 5]).is_err());
        let cube = CubeTextureData::from_faces(vec![face(); 6]).unwrap();
        assert_eq!(cube.size(), 4);

        let mut faces = vec![face(); 6];
        faces[3] = TextureData::create_test_texture(8);
        assert!(CubeTextureData::from_faces(faces).is_err());
    }

    #[test]
    fn tonemap_maps_black_and_bright() {
        let hdr = HdrTexture {
            width: 2,
            height: 1,
            texels: vec![[0.0, 0.0, 0.0], [1000.0, 1000.0, 1000.0]],
        };
        let ldr = hdr.to_rgba8_tonemapped(1.0);
        assert!(ldr.is_valid());
        assert_eq!(&ldr.data[..4], &[0, 0, 0, 255]);
        assert!(ldr.data[4] >= 254);
        assert_eq!(hdr.average(), [500.0, 500.0, 500.0]);
    }
}
