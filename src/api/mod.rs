//! REST API.
//!
//! Exposes the clinic modules as JSON endpoints under `/api/` and serves
//! the browser dashboard at `/`. Protected routes run behind
//! Auth → Audit middleware.
//!
//! The router is composable: `api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server_on, ApiServer};
pub use types::ApiContext;
