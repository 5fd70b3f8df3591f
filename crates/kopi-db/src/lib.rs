//! # kopi-db: Database Layer for Kopi POS
//!
//! SQLite persistence for the café: catalog, orders, stock ledger,
//! customers, fees, discount codes, menu promos and staff accounts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Kopi POS Data Flow                              │
//! │                                                                         │
//! │  kopi-server handler (POST /api/pos/{terminal}/checkout)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kopi-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │◄───│ orders, stock │    │  (embedded)  │   │   │
//! │  │   │  SqlitePool   │    │ products, …   │    │ 001_init.sql │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per table group
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kopi_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kopi.db")).await?;
//! let fees = db.fees().list_active().await?;
//! let order = db.orders().require(&order_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::customer::CustomerRepository;
pub use repository::discount::DiscountRepository;
pub use repository::fee::FeeRepository;
pub use repository::order::{CustomerContact, OrderRepository, TableFrequency};
pub use repository::product::{MenuEntry, ProductRepository};
pub use repository::promo::PromoRepository;
pub use repository::staff::{StaffRepository, StaffUpdate};
pub use repository::stock::StockRepository;
