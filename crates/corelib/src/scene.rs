//! Scene description: lights, material, viewport sizing and the ranges the
//! debug panel exposes.

use thiserror::Error;

use crate::{Vec3, camera::Camera, vec3};

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("Invalid hex color '{0}', expected #rrggbb")]
    InvalidColor(String),
}

/// sRGB color with components in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Self = Self::from_rgb_u32(0xffffff);

    pub const fn from_rgb_u32(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as f32 / 255.0,
            g: ((rgb >> 8) & 0xff) as f32 / 255.0,
            b: (rgb & 0xff) as f32 / 255.0,
        }
    }

    /// Parse `#rrggbb` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Result<Self, SceneError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 {
            return Err(SceneError::InvalidColor(hex.to_owned()));
        }
        u32::from_str_radix(digits, 16)
            .map(Self::from_rgb_u32)
            .map_err(|_| SceneError::InvalidColor(hex.to_owned()))
    }

    /// Linear-light components, for lighting math.
    pub fn to_linear(self) -> Vec3 {
        fn decode(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        vec3(decode(self.r), decode(self.g), decode(self.b))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

impl AmbientLight {
    pub fn radiance(&self) -> Vec3 {
        self.color.to_linear() * self.intensity
    }
}

/// Light arriving from `position` towards the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
}

impl DirectionalLight {
    /// Unit vector pointing from the surface towards the light.
    pub fn to_light(&self) -> Vec3 {
        self.position.normalize_or_zero()
    }

    pub fn radiance(&self) -> Vec3 {
        self.color.to_linear() * self.intensity
    }
}

/// Slider bounds for the debug panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliderRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl SliderRange {
    pub const INTENSITY: Self = Self {
        min: 0.0,
        max: 10.0,
        step: 0.1,
    };

    /// Clamp into range and snap to the nearest step counted from `min`.
    pub fn clamp_snap(&self, value: f32) -> f32 {
        let clamped = value.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return clamped;
        }
        let steps = ((clamped - self.min) / self.step).round();
        (self.min + steps * self.step).clamp(self.min, self.max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialSettings {
    pub color: Color,
    pub metalness: f32,
    pub roughness: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereSettings {
    pub radius: f32,
    pub scale: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    /// Balls per half-axis of the grid; 0 keeps a single centred ball.
    pub grid_half_extent: i32,
}

impl SphereSettings {
    /// Ball positions on the XY grid, or just the origin.
    pub fn positions(&self) -> Vec<Vec3> {
        let n = self.grid_half_extent;
        if n <= 0 {
            return vec![Vec3::ZERO];
        }
        (-n..n)
            .flat_map(|i| (-n..n).map(move |j| vec3(i as f32, j as f32, 0.0)))
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct SceneSettings {
    pub clear_color: Color,
    pub ambient: AmbientLight,
    pub key_light: DirectionalLight,
    pub fill_light: DirectionalLight,
    pub camera: Camera,
    pub sphere: SphereSettings,
    pub material: MaterialSettings,
    pub environment_intensity: f32,
    pub intensity_range: SliderRange,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            clear_color: Color::from_rgb_u32(0x181818),
            ambient: AmbientLight {
                color: Color::WHITE,
                intensity: 2.4,
            },
            key_light: DirectionalLight {
                color: Color::from_rgb_u32(0xff0000),
                intensity: 1.8,
                position: vec3(4.0, 4.0, 4.0),
            },
            fill_light: DirectionalLight {
                color: Color::from_rgb_u32(0x000dff),
                intensity: 1.8,
                position: vec3(-4.0, -4.0, -4.0),
            },
            camera: Camera::new_perspective(
                vec3(0.0, 0.0, 4.0),
                Vec3::ZERO,
                Vec3::Y,
                35f32.to_radians(),
                0.1,
                100.0,
                16.0 / 9.0,
            ),
            sphere: SphereSettings {
                radius: 1.0,
                scale: 0.4,
                width_segments: 64,
                height_segments: 64,
                grid_half_extent: 0,
            },
            material: MaterialSettings {
                color: Color::from_rgb_u32(0xfcfcfc),
                metalness: 0.7,
                roughness: 0.8,
            },
            environment_intensity: 0.3,
            intensity_range: SliderRange::INTENSITY,
        }
    }
}

/// Render target sizing. The pixel ratio is capped at 2 so high-DPI
/// displays don't quadruple the fragment cost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sizes {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Sizes {
    pub const MAX_PIXEL_RATIO: f32 = 2.0;

    /// `width`/`height` in logical (CSS-like) pixels.
    pub fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: scale_factor.clamp(f32::MIN_POSITIVE, Self::MAX_PIXEL_RATIO),
        }
    }

    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let scale = (scale_factor as f32).max(f32::MIN_POSITIVE);
        Self::new(width as f32 / scale, height as f32 / scale, scale)
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height.max(1.0)
    }

    /// Backbuffer size in device pixels, never zero.
    pub fn render_size(&self) -> (u32, u32) {
        let w = (self.width * self.pixel_ratio).round().max(1.0) as u32;
        let h = (self.height * self.pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse() {
        assert_eq!(Color::from_hex("#ff0000"), Ok(Color::from_rgb_u32(0xff0000)));
        assert_eq!(Color::from_hex("000dff").unwrap().b, 1.0);
        assert!(Color::from_hex("#fff").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
    }

    #[test]
    fn linear_conversion_keeps_extremes() {
        assert!((Color::WHITE.to_linear() - Vec3::ONE).length() < 1e-6);
        assert_eq!(Color::from_rgb_u32(0).to_linear(), Vec3::ZERO);
        let mid = Color::from_rgb_u32(0x808080).to_linear().x;
        assert!((mid - 0.2158).abs() < 1e-3);
    }

    #[test]
    fn slider_clamps_and_snaps() {
        let r = SliderRange::INTENSITY;
        assert_eq!(r.clamp_snap(-1.0), 0.0);
        assert_eq!(r.clamp_snap(42.0), 10.0);
        assert!((r.clamp_snap(2.44) - 2.4).abs() < 1e-5);
        assert!((r.clamp_snap(2.46) - 2.5).abs() < 1e-5);
    }

    #[test]
    fn pixel_ratio_is_capped() {
        let s = Sizes::new(800.0, 600.0, 3.0);
        assert_eq!(s.pixel_ratio, 2.0);
        assert_eq!(s.render_size(), (1600, 1200));

        let p = Sizes::from_physical(2400, 1800, 3.0);
        assert_eq!(p.width, 800.0);
        assert_eq!(p.render_size(), (1600, 1200));
        assert!((p.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn default_scene_matches_the_lookdev_setup() {
        let s = SceneSettings::default();
        assert_eq!(s.ambient.intensity, 2.4);
        assert_eq!(s.key_light.color, Color::from_rgb_u32(0xff0000));
        assert_eq!(s.fill_light.position, vec3(-4.0, -4.0, -4.0));
        assert_eq!(s.sphere.positions(), vec![Vec3::ZERO]);
        let d = s.key_light.to_light();
        assert!((d.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sphere_grid_positions() {
        let sphere = SphereSettings {
            grid_half_extent: 1,
            ..SceneSettings::default().sphere
        };
        let p = sphere.positions();
        assert_eq!(p.len(), 4);
        assert!(p.contains(&vec3(-1.0, -1.0, 0.0)));
        assert!(p.contains(&vec3(0.0, 0.0, 0.0)));
    }
}
