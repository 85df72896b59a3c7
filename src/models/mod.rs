//! Data models representing store rows and API payloads.
//!
//! This module contains all data structures that map to store collections.

/// Account model
pub mod account;
/// Transaction model and payloads
pub mod transaction;
