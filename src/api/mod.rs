//! HTTP surface: handlers, routes and the server composition root.

pub mod handlers;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use routes::create_router;
pub use server::{build_test_state, Application};
