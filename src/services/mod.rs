//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! The balance service owns every write to an account balance; the two
//! stores are thin accessors over the remote collections.

pub mod account_locks;
pub mod account_store;
pub mod balance_service;
pub mod transaction_store;
