//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, auth context)
//! 2. Delegates to the balance service
//! 3. Returns HTTP response (JSON, status code)

/// Account read and reconciliation endpoints
pub mod accounts;
/// Service health endpoint
pub mod health;
/// Transaction lifecycle endpoints
pub mod transactions;
