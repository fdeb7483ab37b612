// HTTP surface for lifelog. The binary in main.rs wires configuration
// and serving; everything testable lives here.

pub mod app;
pub mod auth;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
