//! HTTP routes.

pub mod count;
pub mod health;
pub mod session;

pub use count::{CountResponse, count_handler, count_routes};
pub use health::{HealthResponse, health_routes};
pub use session::{
    SessionPayload, delete_session_handler, get_session_handler, patch_session_handler,
    replace_session_handler, session_routes,
};
