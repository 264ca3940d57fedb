//! Admin HTTP gateway

mod handler;
mod listener;

pub use handler::{admin_routes, AdminError, AUTH_HEADER};
pub use listener::AdminServer;
