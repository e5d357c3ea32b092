//! Shared utilities for integration testing.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use script_gateway::config::GatewayConfig;
use script_gateway::{GatewayServer, Shutdown};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const API_KEY: &str = "integration-key-0123456789";

/// A gateway serving on an ephemeral loopback port.
pub struct TestGateway {
    pub url: String,
    pub shutdown: Shutdown,
    // Held so the scripts directory outlives the server.
    _scripts: TempDir,
}

/// Write an executable shell script into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Scripts directory with `budget.sh` wrapping the budget-report binary.
pub fn scripts_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_script(
        dir.path(),
        "budget.sh",
        &format!(
            "#!/bin/sh\nexec \"{}\" \"$@\"\n",
            env!("CARGO_BIN_EXE_budget-report")
        ),
    );
    write_script(dir.path(), "broken.sh", "#!/bin/sh\necho 'disk on fire' >&2\nexit 3\n");
    dir
}

pub fn config(scripts: &Path) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.access.allowed_ips = vec!["127.0.0.1".into()];
    config.auth.api_keys = vec![API_KEY.into()];
    config.scripts.directory = scripts.display().to_string();
    config.scripts.extension = "sh".into();
    config.scripts.interpreter = String::new();
    config
}

/// Start a gateway with `adjust` applied to the default test config.
pub async fn start_gateway(adjust: impl FnOnce(&mut GatewayConfig)) -> TestGateway {
    let scripts = scripts_dir();
    let mut config = config(scripts.path());
    adjust(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestGateway {
        url,
        shutdown,
        _scripts: scripts,
    }
}
