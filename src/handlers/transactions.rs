//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - GET /api/transactions - List the caller's transactions by date
//! - POST /api/transactions - Record a transaction and apply it to its account
//! - PUT /api/transactions/{id} - Replace a transaction, moving its effect
//! - DELETE /api/transactions/{id} - Remove a transaction, reversing its effect

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::transaction::{Confirmation, TransactionRequest, TransactionResponse},
    state::AppState,
};

/// Turn a body that failed to parse into a validation error.
fn payload(
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<TransactionRequest, AppError> {
    body.map(|Json(request)| request)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// List the caller's transactions, oldest date first.
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let transactions = state.ledger.list_transactions(auth.user_id).await?;

    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}

/// Create a transaction.
///
/// # Request Body
///
/// ```json
/// {
///   "account_id": "550e8400-...",
///   "date": "2025-12-20",
///   "amount": "200.00",
///   "type": "INCOME"
/// }
/// ```
///
/// # Response (201)
///
/// The stored transaction, including `balance_after`.
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let request = payload(body)?;
    let transaction = state.ledger.create_transaction(auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Replace a transaction with the body's values.
pub async fn update_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transaction_id): Path<Uuid>,
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<Json<Confirmation>, AppError> {
    let request = payload(body)?;
    state
        .ledger
        .update_transaction(auth.user_id, transaction_id, request)
        .await?;

    Ok(Json(Confirmation::new("Transaction updated successfully")))
}

/// Delete a transaction.
pub async fn delete_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<Confirmation>, AppError> {
    state
        .ledger
        .delete_transaction(auth.user_id, transaction_id)
        .await?;

    Ok(Json(Confirmation::new("Transaction deleted successfully")))
}
