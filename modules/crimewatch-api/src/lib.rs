//! HTTP surface for the refresh pipeline and its read views.

pub mod error;
pub mod routes;

pub use routes::{build_router, AppState, SERVICE_NAME};
