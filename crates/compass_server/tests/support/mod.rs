//! Shared integration-test server bootstrap helpers.

use axum_test::TestServer;
use compass_server::{create_app, AppState, Config, Database};
use std::path::Path;
use tempfile::TempDir;

pub(crate) fn test_config_for_root(root: &Path) -> Config {
    Config {
        data_dir: root.join("data").to_str().expect("data path").to_string(),
        config_dir: root.join("config").to_str().expect("config path").to_string(),
        port: 0,
        max_body_size: 1024 * 1024,
        import_origins: vec!["https://qoj.ac".to_string()],
        auto_backup: false,
        git_bin: "git".to_string(),
    }
}

pub(crate) fn test_server_for_config(config: Config) -> TestServer {
    let db = Database::open(&config.data_dir).expect("open db");
    let state = AppState::new(config, db);
    TestServer::new(create_app(state, false)).expect("server")
}

pub(crate) fn setup_test_server() -> (TestServer, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config_for_root(temp_dir.path());
    let server = test_server_for_config(config);
    (server, temp_dir)
}
