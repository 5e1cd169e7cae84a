//! The demonstration session.
//!
//! [`SessionController`] owns the loaded sample catalog and the single
//! [`SessionState`] record. Runs are numbered by epoch; a run whose epoch is
//! no longer current when it settles is dropped.

pub mod controller;
pub mod state;

pub use controller::{RunOutcome, SessionController, SessionSettings, SessionSnapshot};
pub use state::{ErrorInfo, SessionState, SessionStatus};
