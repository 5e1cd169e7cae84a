//! Analysis service access.
//!
//! This module provides the transport abstraction and the typed client for
//! the flow, entanglement and sample-data endpoints.

pub mod analysis;
pub mod transport;

pub use analysis::{AnalysisClient, Endpoints};
pub use transport::ReqwestTransport;
