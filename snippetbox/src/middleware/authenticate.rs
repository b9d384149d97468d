//! Deriving [`AuthContext`] for dynamic routes
//!
//! Runs inside the session layer. A session user id only counts if the
//! account still exists, so deleted users are treated as anonymous.

use crate::auth::{AuthContext, AUTHENTICATED_USER_ID};
use crate::error::AppError;
use crate::session::Session;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Insert the request's [`AuthContext`] into its extensions, then continue.
pub async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = match session.get::<i64>(AUTHENTICATED_USER_ID) {
        Some(user_id) if state.users().exists(user_id).await? => {
            AuthContext::Authenticated { user_id }
        }
        _ => AuthContext::Anonymous,
    };

    request.extensions_mut().insert(auth);
    Ok(next.run(request).await)
}
