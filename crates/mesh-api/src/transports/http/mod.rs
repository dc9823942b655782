// HTTP transport (Axum)

pub mod server;

pub use server::{create_http_server, ApiState};
