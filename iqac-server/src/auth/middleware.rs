//! Bearer token middleware and the authenticated-user extractor

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use iqac_common::models::User;
use std::ops::Deref;
use tracing::warn;

use crate::error::ApiError;
use crate::{db, AppState};

/// The account behind the request's bearer token, reloaded from the
/// database for every request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
///
/// Applied to every protected route. Returns 401 when the token is
/// missing, invalid or expired, or when the account was deleted or is no
/// longer approved since the token was issued.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization token".to_string()))?;

    let claims = state.jwt.verify(token).map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        ApiError::from(e)
    })?;

    let user = db::users::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            warn!("Token for unknown user {}", claims.sub);
            ApiError::Unauthorized("Account no longer exists".to_string())
        })?;

    if !user.is_approved {
        warn!("Token for unapproved user {}", user.email);
        return Err(ApiError::Unauthorized("Account is not approved".to_string()));
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Missing authentication".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
