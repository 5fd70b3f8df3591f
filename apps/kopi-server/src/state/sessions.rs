//! # Terminal Sessions
//!
//! Per-terminal cart and parked orders for the cashier screens.
//!
//! ## Session Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Terminal Session Store                               │
//! │                                                                         │
//! │  HashMap<terminal id, TerminalSession>  behind one Mutex                │
//! │                                                                         │
//! │  "counter-1" ──► TerminalSession { cart, parked }                       │
//! │  "counter-2" ──► TerminalSession { cart, parked }                       │
//! │                                                                         │
//! │  with_session("counter-1", |s| s.cart.add(..))                          │
//! │      • creates the session on first write                               │
//! │      • holds the lock only for the closure                              │
//! │      • drops the entry again once it is back to an idle session         │
//! │                                                                         │
//! │  read("counter-3", |s| ..)  ──► default session, nothing stored         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers load catalog rows and fees from the database first, then enter
//! the closure; the lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use kopi_core::cart::Cart;
use kopi_core::parked::ParkedOrders;
use kopi_core::DiningType;
use serde::{Deserialize, Serialize};

/// What one POS terminal is working on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerminalSession {
    pub cart: Cart,
    pub parked: ParkedOrders,
}

impl TerminalSession {
    /// Nothing in the cart, nothing parked and no dining type chosen.
    pub fn is_idle(&self) -> bool {
        self.cart.is_empty()
            && self.cart.discount.is_none()
            && self.cart.dining_type == DiningType::DineIn
            && self.parked.is_empty()
    }
}

/// Shared, cloneable store of terminal sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, TerminalSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with exclusive access to the terminal's session.
    ///
    /// Idle sessions are not kept, so only terminals holding a cart or
    /// parked orders occupy the store.
    pub fn with_session<F, R>(&self, terminal: &str, f: F) -> R
    where
        F: FnOnce(&mut TerminalSession) -> R,
    {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.entry(terminal.to_string()).or_default();
        let result = f(session);
        if session.is_idle() {
            sessions.remove(terminal);
        }
        result
    }

    /// Runs `f` on the terminal's session without creating one.
    pub fn read<F, R>(&self, terminal: &str, f: F) -> R
    where
        F: FnOnce(&TerminalSession) -> R,
    {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        match sessions.get(terminal) {
            Some(session) => f(session),
            None => f(&TerminalSession::default()),
        }
    }

    /// Copy of a terminal's session, for export or display.
    pub fn snapshot(&self, terminal: &str) -> TerminalSession {
        self.read(terminal, TerminalSession::clone)
    }

    /// Replaces a terminal's session, e.g. after importing a saved one.
    pub fn restore(&self, terminal: &str, session: TerminalSession) {
        self.with_session(terminal, |s| *s = session);
    }

    pub fn terminal_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
