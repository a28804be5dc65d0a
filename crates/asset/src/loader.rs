//! Fan-out asset loader with progress aggregation and a one-shot `ready` event.
//!
//! Every descriptor is dispatched on construction to the source registered
//! for its kind, each on its own worker thread. Workers report back over a
//! channel; the owner of the [`ResourceLoader`] applies those reports when it
//! calls [`ResourceLoader::poll`] or one of the `wait` methods, so all state
//! changes and all event handlers run on that one thread.

use std::{
    collections::{HashMap, HashSet},
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use anyhow::anyhow;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::{
    descriptor::{AssetDescriptor, Manifest},
    error::{AssetError, AssetResult},
    loaded::LoadedAsset,
    observers::{Observers, SubscriptionId},
    registry::LoaderRegistry,
    sources::AssetSource,
};

/// What a failed asset means for readiness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Ready once every asset has settled; failed assets are left out.
    #[default]
    Settle,
    /// Any failure prevents `Ready`; the loader ends in `Stalled` instead.
    Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// Every asset settled but at least one failed under [`FailurePolicy::Block`].
    Stalled,
}

impl LoadState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LoadState::Loading)
    }
}

/// One worker's single report, keyed by manifest position.
struct Completion {
    index: usize,
    outcome: AssetResult<LoadedAsset>,
}

pub struct ResourceLoader {
    manifest: Manifest,
    policy: FailurePolicy,
    items: HashMap<String, LoadedAsset>,
    failures: Vec<AssetError>,
    settled: Vec<bool>,
    completed: usize,
    state: LoadState,
    ready_announced: bool,
    observers: Observers,
    rx: Receiver<Completion>,
}

impl ResourceLoader {
    /// Start loading `manifest` with the default [`FailurePolicy::Settle`].
    pub fn new(manifest: Manifest, registry: &LoaderRegistry) -> Self {
        Self::with_policy(manifest, registry, FailurePolicy::default())
    }

    pub fn with_policy(manifest: Manifest, registry: &LoaderRegistry, policy: FailurePolicy) -> Self {
        let (tx, rx) = unbounded();
        let expected = manifest.len();
        log::info!("Loading {} assets ({:?} on failure)", expected, policy);

        {
            let mut names = HashSet::new();
            for (index, descriptor) in manifest.assets.iter().enumerate() {
                let outcome = if !names.insert(descriptor.name.as_str()) {
                    Err(AssetError::DuplicateName {
                        descriptor: descriptor.clone(),
                    })
                } else if let Some(source) = registry.get(&descriptor.kind) {
                    spawn_load(index, descriptor.clone(), source, &tx);
                    continue;
                } else {
                    Err(AssetError::UnknownKind {
                        descriptor: descriptor.clone(),
                    })
                };
                // Delivered on the first poll, like any other outcome.
                report(&tx, Completion { index, outcome });
            }
        }

        let state = if expected == 0 {
            log::info!("Empty manifest; resources ready");
            LoadState::Ready
        } else {
            LoadState::Loading
        };

        Self {
            manifest,
            policy,
            items: HashMap::with_capacity(expected),
            failures: Vec::new(),
            settled: vec![false; expected],
            completed: 0,
            state,
            ready_announced: false,
            observers: Observers::new(),
            rx,
        }
    }

    pub fn on_ready(&mut self, f: impl FnMut() + 'static) -> SubscriptionId {
        self.observers.on_ready(f)
    }

    pub fn on_error(&mut self, f: impl FnMut(&AssetError) + 'static) -> SubscriptionId {
        self.observers.on_error(f)
    }

    pub fn on_progress(&mut self, f: impl FnMut(u8) + 'static) -> SubscriptionId {
        self.observers.on_progress(f)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.observers.off(id)
    }

    /// Apply every report that has arrived, without blocking.
    /// Returns how many reports were taken off the channel.
    pub fn poll(&mut self) -> usize {
        let mut taken = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(completion);
            taken += 1;
        }
        self.announce_ready();
        taken
    }

    /// Block until every asset has settled.
    pub fn wait(&mut self) -> LoadState {
        self.poll();
        while !self.state.is_terminal() {
            match self.rx.recv() {
                Ok(completion) => self.apply(completion),
                Err(_) => {
                    self.log_orphaned();
                    break;
                }
            }
        }
        self.state
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`. Giving up does
    /// not fail any asset; loading continues in the background.
    pub fn wait_timeout(&mut self, timeout: Duration) -> LoadState {
        let deadline = Instant::now() + timeout;
        self.poll();
        while !self.state.is_terminal() {
            match self.rx.recv_deadline(deadline) {
                Ok(completion) => self.apply(completion),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    self.log_orphaned();
                    break;
                }
            }
        }
        self.state
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn expected(&self) -> usize {
        self.manifest.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// `floor(100 * completed / expected)`; 100 for an empty manifest.
    pub fn progress(&self) -> u8 {
        match self.expected() {
            0 => 100,
            n => (self.completed * 100 / n) as u8,
        }
    }

    /// `true` once every asset has either loaded or failed.
    pub fn is_settled(&self) -> bool {
        self.completed + self.failures.len() == self.expected()
    }

    pub fn failures(&self) -> &[AssetError] {
        &self.failures
    }

    pub fn get(&self, name: &str) -> Option<&LoadedAsset> {
        self.items.get(name)
    }

    pub fn items(&self) -> &HashMap<String, LoadedAsset> {
        &self.items
    }

    fn apply(&mut self, completion: Completion) {
        let Completion { index, outcome } = completion;
        let name = match self.manifest.assets.get(index) {
            Some(descriptor) => descriptor.name.clone(),
            None => {
                log::warn!("Ignoring report for unknown manifest entry #{}", index);
                return;
            }
        };
        if self.state.is_terminal() {
            log::debug!("Ignoring late report for '{}'; loader already settled", name);
            return;
        }
        if std::mem::replace(&mut self.settled[index], true) {
            log::debug!("Ignoring duplicate report for '{}'", name);
            return;
        }

        match outcome {
            Ok(asset) => {
                log::debug!("Loaded '{}': {:?}", name, asset);
                self.items.insert(name, asset);
                self.completed += 1;
                let progress = self.progress();
                self.observers.emit_progress(progress);
            }
            Err(error) => {
                log::warn!("{}", error);
                self.observers.emit_error(&error);
                self.failures.push(error);
            }
        }

        if self.is_settled() {
            self.finish();
        }
    }

    fn finish(&mut self) {
        let failed = self.failures.len();
        if failed > 0 && self.policy == FailurePolicy::Block {
            self.state = LoadState::Stalled;
            log::error!(
                "Resource loading stalled: {} of {} assets failed",
                failed,
                self.expected()
            );
            return;
        }

        self.state = LoadState::Ready;
        if failed > 0 {
            log::warn!(
                "Resources ready without {} of {} assets",
                failed,
                self.expected()
            );
        } else {
            log::info!("Resources ready ({} assets)", self.completed);
        }
        self.announce_ready();
    }

    fn announce_ready(&mut self) {
        if self.state == LoadState::Ready && !self.ready_announced {
            self.ready_announced = true;
            self.observers.emit_ready();
        }
    }

    fn log_orphaned(&self) {
        log::error!(
            "All loader threads exited with {} assets unsettled",
            self.expected() - self.completed - self.failures.len()
        );
    }
}

fn report(tx: &Sender<Completion>, completion: Completion) {
    if tx.send(completion).is_err() {
        log::trace!("Resource loader dropped before a report arrived");
    }
}

fn spawn_load(
    index: usize,
    descriptor: AssetDescriptor,
    source: Arc<dyn AssetSource>,
    tx: &Sender<Completion>,
) {
    let worker_tx = tx.clone();
    let worker_descriptor = descriptor.clone();
    let spawned = thread::Builder::new()
        .name(worker_name(&descriptor.name))
        .spawn(move || {
            let descriptor = worker_descriptor;
            let result = panic::catch_unwind(AssertUnwindSafe(|| source.load(&descriptor.path)));
            let outcome = match result {
                Ok(Ok(asset)) => Ok(asset),
                Ok(Err(source)) => Err(AssetError::LoadFailed { descriptor, source }),
                Err(payload) => Err(AssetError::LoadFailed {
                    descriptor,
                    source: anyhow!("loader panicked: {}", panic_message(payload.as_ref())),
                }),
            };
            report(&worker_tx, Completion { index, outcome });
        });

    if let Err(source) = spawned {
        report(
            tx,
            Completion {
                index,
                outcome: Err(AssetError::Spawn { descriptor, source }),
            },
        );
    }
}

/// Thread names may not contain NUL; asset names may.
fn worker_name(asset: &str) -> String {
    format!("asset:{}", asset.replace('\0', "?"))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, sync::Mutex};

    use super::*;
    use crate::{
        descriptor::{AssetKind, AssetPath},
        texture::TextureData,
    };

    const LONG: Duration = Duration::from_secs(10);

    fn texture_registry() -> LoaderRegistry {
        let mut reg = LoaderRegistry::new();
        reg.register(AssetKind::Texture, |_: &AssetPath| -> anyhow::Result<LoadedAsset> {
            Ok(LoadedAsset::Texture(TextureData::create_test_texture(1)))
        });
        reg
    }

    fn textures(names: &[&str]) -> Manifest {
        names
            .iter()
            .map(|n| AssetDescriptor::new(AssetKind::Texture, *n, format!("{n}.jpg").as_str()))
            .collect()
    }

    /// Counters filled by the loader's event handlers.
    #[derive(Default)]
    struct Recorder {
        ready: Rc<RefCell<usize>>,
        progress: Rc<RefCell<Vec<u8>>>,
        errors: Rc<RefCell<Vec<AssetDescriptor>>>,
    }

    impl Recorder {
        fn attach(loader: &mut ResourceLoader) -> Self {
            let rec = Recorder::default();
            let ready = rec.ready.clone();
            loader.on_ready(move || *ready.borrow_mut() += 1);
            let progress = rec.progress.clone();
            loader.on_progress(move |p| progress.borrow_mut().push(p));
            let errors = rec.errors.clone();
            loader.on_error(move |e| errors.borrow_mut().push(e.descriptor().clone()));
            rec
        }

        fn ready(&self) -> usize {
            *self.ready.borrow()
        }
    }

    #[test]
    fn two_textures_report_half_then_full() {
        let mut loader = ResourceLoader::new(textures(&["a", "b"]), &texture_registry());
        let rec = Recorder::attach(&mut loader);

        assert_eq!(loader.wait_timeout(LONG), LoadState::Ready);
        assert_eq!(*rec.progress.borrow(), vec![50, 100]);
        assert_eq!(rec.ready(), 1);
        assert_eq!(loader.items().len(), 2);
        assert!(loader.get("a").and_then(LoadedAsset::as_texture).is_some());
        assert!(loader.get("b").is_some());
    }

    #[test]
    fn every_manifest_size_completes_exactly_once() {
        for n in 0..7 {
            let names: Vec<String> = (0..n).map(|i| format!("t{i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let mut loader = ResourceLoader::new(textures(&refs), &texture_registry());
            let rec = Recorder::attach(&mut loader);

            assert_eq!(loader.wait_timeout(LONG), LoadState::Ready);
            loader.poll();
            loader.poll();

            assert_eq!(loader.completed(), n);
            assert_eq!(loader.items().len(), n);
            assert_eq!(rec.ready(), 1, "manifest of {n}");
            let progress = rec.progress.borrow();
            assert_eq!(progress.len(), n);
            for (i, p) in progress.iter().enumerate() {
                assert_eq!(*p as usize, 100 * (i + 1) / n);
            }
            assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn empty_manifest_is_ready_immediately() {
        let mut loader = ResourceLoader::new(Manifest::default(), &texture_registry());
        assert_eq!(loader.state(), LoadState::Ready);
        assert_eq!(loader.progress(), 100);

        let rec = Recorder::attach(&mut loader);
        assert_eq!(loader.poll(), 0);
        assert_eq!(rec.ready(), 1);
        loader.poll();
        assert_eq!(rec.ready(), 1);
        assert!(rec.progress.borrow().is_empty());
    }

    #[test]
    fn handlers_added_after_ready_are_not_replayed() {
        let mut loader = ResourceLoader::new(textures(&["a"]), &texture_registry());
        assert_eq!(loader.wait_timeout(LONG), LoadState::Ready);

        let late = Recorder::attach(&mut loader);
        loader.poll();
        assert_eq!(late.ready(), 0);
    }

    #[test]
    fn duplicate_reports_are_ignored() {
        let (gate_tx, gate_rx) = unbounded::<()>();
        let mut reg = LoaderRegistry::new();
        reg.register(AssetKind::Texture, move |_: &AssetPath| -> anyhow::Result<LoadedAsset> {
            let _ = gate_rx.recv();
            Ok(LoadedAsset::Texture(TextureData::create_test_texture(1)))
        });
        let mut loader = ResourceLoader::new(textures(&["a", "b"]), &reg);
        let rec = Recorder::attach(&mut loader);

        let duplicate = || Completion {
            index: 0,
            outcome: Ok(LoadedAsset::Texture(TextureData::solid([1, 2, 3, 4]))),
        };
        loader.apply(duplicate());
        loader.apply(duplicate());
        assert_eq!(loader.completed(), 1);
        assert_eq!(*rec.progress.borrow(), vec![50]);

        drop(gate_tx);
        assert_eq!(loader.wait_timeout(LONG), LoadState::Ready);
        loader.poll();
        loader.apply(duplicate());

        assert_eq!(loader.completed(), 2);
        assert_eq!(rec.ready(), 1);
        assert_eq!(*rec.progress.borrow(), vec![50, 100]);
        // First report wins; the name is never overwritten.
        let a = loader.get("a").and_then(LoadedAsset::as_texture).unwrap();
        assert_eq!(a.data, vec![1, 2, 3, 4]);
    }

    fn with_unknown_kind(policy: FailurePolicy) -> (ResourceLoader, Recorder) {
        let mut manifest = textures(&["a"]);
        manifest
            .assets
            .push(AssetDescriptor::new(AssetKind::from("foo"), "mystery", "x.foo"));
        let mut loader = ResourceLoader::with_policy(manifest, &texture_registry(), policy);
        // Subscribing after construction still sees configuration errors.
        let rec = Recorder::attach(&mut loader);
        (loader, rec)
    }

    #[test]
    fn unknown_kind_is_reported_and_excluded_under_settle() {
        let (mut loader, rec) = with_unknown_kind(FailurePolicy::Settle);
        assert_eq!(loader.wait_timeout(LONG), LoadState::Ready);

        let errors = rec.errors.borrow();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "mystery");
        assert_eq!(errors[0].kind, AssetKind::Custom("foo".into()));
        assert!(loader.failures()[0].is_configuration_error());
        assert_eq!(rec.ready(), 1);
        assert_eq!(*rec.progress.borrow(), vec![50]);
        assert_eq!(loader.completed(), 1);
    }

    #[test]
    fn unknown_kind_stalls_under_block() {
        let (mut loader, rec) = with_unknown_kind(FailurePolicy::Block);
        assert_eq!(loader.wait_timeout(LONG), LoadState::Stalled);
        loader.poll();

        assert_eq!(rec.errors.borrow().len(), 1);
        assert_eq!(rec.ready(), 0);
        assert!(loader.is_settled());
        assert_eq!(loader.progress(), 50);
    }

    #[test]
    fn duplicate_names_are_configuration_errors() {
        let mut loader = ResourceLoader::new(textures(&["a", "a", "b"]), &texture_registry());
        let rec = Recorder::attach(&mut loader);
        assert_eq!(loader.wait_timeout(LONG), LoadState::Ready);

        assert!(matches!(
            loader.failures(),
            [AssetError::DuplicateName { descriptor }] if descriptor.name == "a"
        ));
        assert_eq!(loader.completed(), 2);
        assert_eq!(rec.errors.borrow().len(), 1);
        assert_eq!(*rec.progress.borrow(), vec![33, 66]);
    }

    #[test]
    fn load_failures_and_panics_do_not_count_as_success() {
        let mut reg = texture_registry();
        reg.register(AssetKind::Model, |_: &AssetPath| -> anyhow::Result<LoadedAsset> {
            Err(anyhow!("corrupt file"))
        });
        reg.register(AssetKind::RadianceTexture, |_: &AssetPath| -> anyhow::Result<LoadedAsset> {
            panic!("decoder exploded")
        });
        let manifest = Manifest::new(vec![
            AssetDescriptor::new(AssetKind::Texture, "tex", "a.jpg"),
            AssetDescriptor::new(AssetKind::Model, "model", "m.glb"),
            AssetDescriptor::new(AssetKind::RadianceTexture, "env", "e.hdr"),
        ]);
        let mut loader = ResourceLoader::new(manifest, &reg);
        let rec = Recorder::attach(&mut loader);

        assert_eq!(loader.wait_timeout(LONG), LoadState::Ready);
        assert_eq!(loader.completed(), 1);
        assert_eq!(loader.failures().len(), 2);
        assert_eq!(*rec.progress.borrow(), vec![33]);

        let mut failed: Vec<String> = rec.errors.borrow().iter().map(|d| d.name.clone()).collect();
        failed.sort();
        assert_eq!(failed, vec!["env", "model"]);
        let messages: Vec<String> = loader.failures().iter().map(|e| e.to_string()).collect();
        assert!(messages.iter().any(|m| m.contains("corrupt file")));
        assert!(messages.iter().any(|m| m.contains("decoder exploded")));
    }

    #[test]
    fn cube_source_receives_all_six_paths() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut reg = LoaderRegistry::new();
        {
            let seen = seen.clone();
            reg.register(AssetKind::CubeTexture, move |p: &AssetPath| -> anyhow::Result<LoadedAsset> {
                seen.lock().unwrap().push(p.clone());
                let faces = vec![TextureData::create_test_texture(2); 6];
                Ok(LoadedAsset::CubeTexture(crate::CubeTextureData::from_faces(faces)?))
            });
        }
        let faces = vec!["px.jpg", "nx.jpg", "py.jpg", "ny.jpg", "pz.jpg", "nz.jpg"];
        let manifest = Manifest::new(vec![AssetDescriptor::new(
            AssetKind::CubeTexture,
            "sky",
            faces.clone(),
        )]);
        let mut loader = ResourceLoader::new(manifest, &reg);
        let rec = Recorder::attach(&mut loader);

        assert_eq!(loader.wait_timeout(LONG), LoadState::Ready);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].locations(), faces);
        assert_eq!(loader.items().len(), 1);
        assert!(loader.get("sky").and_then(LoadedAsset::as_cube_texture).is_some());
        assert_eq!(*rec.progress.borrow(), vec![100]);
    }

    #[test]
    fn wait_timeout_gives_up_without_failing_assets() {
        let (_gate_tx, gate_rx) = unbounded::<()>();
        let mut reg = LoaderRegistry::new();
        reg.register(AssetKind::Texture, move |_: &AssetPath| -> anyhow::Result<LoadedAsset> {
            let _ = gate_rx.recv();
            Ok(LoadedAsset::Texture(TextureData::solid([0, 0, 0, 255])))
        });
        let mut loader = ResourceLoader::new(textures(&["slow"]), &reg);

        assert_eq!(
            loader.wait_timeout(Duration::from_millis(20)),
            LoadState::Loading
        );
        assert!(loader.failures().is_empty());
        assert_eq!(loader.progress(), 0);
    }

    #[test]
    fn names_with_nul_bytes_still_load() {
        let manifest =
            Manifest::from_json_str(r#"[{"type":"texture","name":"a\u0000b","path":"a.jpg"}]"#)
                .unwrap();
        let mut loader = ResourceLoader::new(manifest, &texture_registry());
        let rec = Recorder::attach(&mut loader);

        assert_eq!(loader.wait_timeout(LONG), LoadState::Ready);
        assert_eq!(rec.ready(), 1);
        assert!(loader.get("a\0b").is_some());
        assert_eq!(worker_name("a\0b"), "asset:a?b");
    }

    #[test]
    fn spawn_failures_settle_as_errors() {
        let (gate_tx, gate_rx) = unbounded::<()>();
        let mut reg = LoaderRegistry::new();
        reg.register(AssetKind::Texture, move |_: &AssetPath| -> anyhow::Result<LoadedAsset> {
            let _ = gate_rx.recv();
            Ok(LoadedAsset::Texture(TextureData::solid([0, 0, 0, 255])))
        });
        let mut loader = ResourceLoader::new(textures(&["a", "b"]), &reg);
        let rec = Recorder::attach(&mut loader);

        let descriptor = loader.manifest().assets[1].clone();
        loader.apply(Completion {
            index: 1,
            outcome: Err(AssetError::Spawn {
                descriptor,
                source: std::io::Error::other("no threads left"),
            }),
        });
        assert_eq!(loader.failures().len(), 1);
        assert!(!loader.failures()[0].is_configuration_error());

        drop(gate_tx);
        assert_eq!(loader.wait_timeout(LONG), LoadState::Ready);
        assert_eq!(rec.errors.borrow()[0].name, "b");
        assert_eq!(*rec.progress.borrow(), vec![50]);
        assert_eq!(rec.ready(), 1);
    }

    #[test]
    fn wait_returns_when_every_worker_is_gone() {
        let (_gate_tx, gate_rx) = unbounded::<()>();
        let mut reg = LoaderRegistry::new();
        reg.register(AssetKind::Texture, move |_: &AssetPath| -> anyhow::Result<LoadedAsset> {
            let _ = gate_rx.recv();
            Ok(LoadedAsset::Texture(TextureData::solid([0, 0, 0, 255])))
        });
        let mut loader = ResourceLoader::new(textures(&["a"]), &reg);

        // Swap in a channel with no senders left.
        let (tx, rx) = unbounded();
        drop(tx);
        loader.rx = rx;

        assert_eq!(loader.wait(), LoadState::Loading);
        assert_eq!(
            loader.wait_timeout(Duration::from_millis(20)),
            LoadState::Loading
        );
        assert!(!loader.is_settled());
    }

    #[test]
    fn off_stops_delivery() {
        let mut loader = ResourceLoader::new(textures(&["a"]), &texture_registry());
        let hits = Rc::new(RefCell::new(0));
        let id = {
            let hits = hits.clone();
            loader.on_ready(move || *hits.borrow_mut() += 1)
        };
        assert!(loader.off(id));
        loader.wait_timeout(LONG);
        assert_eq!(*hits.borrow(), 0);
    }
}
