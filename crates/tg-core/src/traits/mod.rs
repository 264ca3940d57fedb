//! Core trait definitions

mod store;

pub use store::{decode_record, record_key, tenant_from_key, AccountStore, STORE_PREFIX};
