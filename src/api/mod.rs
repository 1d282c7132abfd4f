//! HTTP API
//!
//! JSON surface over the wager engine: placement, resolution, the funding
//! surface, and the query surface. All state-changing handlers funnel
//! through the single engine mutex, which is the process's serialization
//! point for wager state.

pub mod routes;

pub use routes::{build_router, AppState};
