use std::sync::{Arc, Mutex};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::ranking::settings::StudySettings;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    settings: Arc<RwLock<StudySettings>>,
    rng: Arc<Mutex<StdRng>>,
    config: Arc<Config>,
    started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<Store>, settings: StudySettings, config: &Config) -> Self {
        Self::with_rng(store, settings, config, StdRng::from_entropy())
    }

    /// Same as `new` with a caller-provided generator (seeded in tests).
    pub fn with_rng(
        store: Arc<Store>,
        settings: StudySettings,
        config: &Config,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            settings: Arc::new(RwLock::new(settings)),
            rng: Arc::new(Mutex::new(rng)),
            config: Arc::new(config.clone()),
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot of the active study behaviour.
    pub async fn settings(&self) -> StudySettings {
        self.settings.read().await.clone()
    }

    pub async fn replace_settings(&self, settings: StudySettings) {
        *self.settings.write().await = settings;
    }

    /// A request-local generator seeded from the shared one. The shared
    /// lock is held for a single draw, never across store I/O.
    pub fn fork_rng(&self) -> StdRng {
        // The generator holds no invariant a panic could break.
        let mut shared = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        StdRng::seed_from_u64(shared.gen())
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
