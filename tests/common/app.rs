use std::sync::Arc;

use axum::Router;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

use comparison_backend::config::Config;
use comparison_backend::ranking::settings::StudySettings;
use comparison_backend::routes::build_router;
use comparison_backend::state::AppState;
use comparison_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    _temp_dir: TempDir,
}

fn test_config(sled_path: String, admin_access: bool) -> Config {
    // Built directly so parallel tests never race on process env vars.
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path,
        cors_origin: "http://localhost:5173".to_string(),
        study_config_path: None,
        admin_access,
        session_ttl_minutes: 60,
    }
}

async fn spawn(admin_access: bool) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("comparison-test.sled");
    let config = test_config(sled_path.to_string_lossy().to_string(), admin_access);

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let state = AppState::with_rng(
        store,
        StudySettings::default(),
        &config,
        StdRng::seed_from_u64(7),
    );
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn(true).await
}

pub async fn spawn_test_app_without_admin() -> TestApp {
    spawn(false).await
}
