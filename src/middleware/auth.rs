//! Bearer token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the token from the Authorization header
//! 2. Verify it against the store's auth endpoint and find the matching user
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Authentication context attached to authenticated requests.
///
/// Route handlers extract it with `Extension<AuthContext>`; `user_id` scopes
/// every store query to the caller.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
}

/// Pull `<token>` out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware function.
///
/// # Returns
///
/// - `Ok(Response)` if authenticated successfully (calls next handler)
/// - `Err(AppError::Unauthorized)` if the token is missing or rejected
/// - `Err(AppError::Store)` if the store could not be asked
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;

    let user = state
        .client
        .authenticated_user(token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    tracing::debug!(user_id = %user.id, email = %user.email, "request authenticated");

    request
        .extensions_mut()
        .insert(AuthContext { user_id: user.id });

    Ok(next.run(request).await)
}
