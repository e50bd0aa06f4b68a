//! V1 API: transaction loops and the caller's access summary.

pub mod routes;

pub use routes::{v1_router, V1_PREFIX};
