//! Authentication module for the tunnel-accept path
//!
//! The relay calls [`AuthGate::check_login`] for every client login. The
//! gate fails closed: unknown tenants, wrong secrets and tenants over their
//! daily transfer quota are all denied.

mod gate;

pub use gate::AuthGate;
