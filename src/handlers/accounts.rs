//! Account HTTP handlers.
//!
//! - GET /api/accounts/{id} - Get one of the caller's accounts
//! - POST /api/accounts/{id}/reconcile - Recompute the balance from transactions

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    error::AppError, middleware::auth::AuthContext, models::account::AccountResponse,
    state::AppState,
};

/// Get a specific account by ID.
///
/// Returns 404 if the account doesn't exist OR belongs to another user.
pub async fn get_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state.ledger.get_account(auth.user_id, account_id).await?;

    Ok(Json(account.into()))
}

/// Recompute an account's balance as `opening_balance + Σ effects` and
/// store it if it drifted. Returns the (possibly corrected) account.
pub async fn reconcile_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state
        .ledger
        .reconcile_account(auth.user_id, account_id)
        .await?;

    Ok(Json(account.into()))
}
