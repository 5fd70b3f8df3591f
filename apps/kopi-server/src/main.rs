//! # Kopi POS Server
//!
//! ```text
//! kopi-server
//!   1. tracing subscriber (RUST_LOG, default info,kopi=debug,sqlx=warn)
//!   2. ServerConfig: defaults ─► kopi.toml ─► KOPI_* env
//!   3. SQLite pool + migrations
//!   4. axum on server.bind_addr:server.port until Ctrl-C / SIGTERM
//! ```

use kopi_server::config::ServerConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kopi_server::init_tracing();

    info!("Starting Kopi POS server...");

    let config = ServerConfig::load(None)?;
    info!(
        addr = %config.server.bind_address(),
        db = %config.database.path.display(),
        store = %config.store.name,
        staff_routes = config.security.service_key.is_some(),
        "Configuration loaded"
    );

    kopi_server::run(config).await
}
