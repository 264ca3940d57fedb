//! tg-server: Tenant registry daemon for a reverse-tunnel server
//!
//! The server keeps every tenant's credentials and tunnel definitions in
//! memory, mirrors them to a durable store, resets daily transfer counters
//! and answers login authorization queries for the tunnel-accept path.
//! Operators provision tenants through a small HTTP admin gateway.

pub mod auth;
pub mod quota;
pub mod registry;
pub mod server;
pub mod state;
pub mod store;

pub use auth::AuthGate;
pub use registry::Registry;
pub use state::GatewayState;
