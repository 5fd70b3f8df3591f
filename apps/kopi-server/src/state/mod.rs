//! # State Module
//!
//! Shared state handed to every axum handler.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  Router::with_state(AppState)                                           │
//! │                              │                                          │
//! │          ┌───────────────────┼───────────────────┬──────────────┐       │
//! │          ▼                   ▼                   ▼              ▼       │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────┐ ┌──────────┐ │
//! │  │   Database   │  │  SessionStore    │  │ OrderEvents  │ │  Config  │ │
//! │  │ (SQLite pool)│  │ Arc<Mutex<Map>>  │  │  broadcast   │ │  (Arc)   │ │
//! │  └──────────────┘  └──────────────────┘  └──────────────┘ └──────────┘ │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Database: pool is internally synchronized                           │
//! │  • SessionStore: one Mutex, never held across .await                   │
//! │  • OrderEvents: broadcast sender, clone per handler                    │
//! │  • Config: read-only after startup                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod events;
mod sessions;

use std::sync::Arc;

use kopi_db::Database;

use crate::config::ServerConfig;

pub use events::{OrderEvent, OrderEventKind, OrderEvents};
pub use sessions::{SessionStore, TerminalSession};

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
    pub sessions: SessionStore,
    pub events: OrderEvents,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
            sessions: SessionStore::new(),
            events: OrderEvents::new(),
        }
    }
}
