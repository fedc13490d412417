//! HTTP API module for the dues engine.
//!
//! This module provides the REST endpoints for single-member evaluation,
//! batch dues runs, and per-capita remittance aggregation. All inputs are
//! carried inline; the engine owns no storage.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{AggregateRequest, EvaluateRequest, RunRequest};
pub use response::{AggregateResponse, ApiError, RunResponse};
pub use state::AppState;
