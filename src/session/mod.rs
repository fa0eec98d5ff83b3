//! Media session lifecycle
//!
//! This module provides the `SessionController` that manages:
//! - Credential request (with bounded retry)
//! - Local track acquisition and guaranteed release
//! - Transport connection and its participant events
//! - Idempotent leave and remote-initiated teardown

mod config;
mod controller;
mod state;

pub use config::{session_id_for, SessionConfig};
pub use controller::{SessionController, SessionDeps};
pub use state::{SessionNotice, SessionSnapshot, SessionState, SessionView};
