use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::verify_jwt;
use crate::error::ApiError;
use crate::models::Principal;

/// Bearer authentication: validates the JWT, confirms the user is still
/// active, and injects the resulting `Principal` into request extensions.
/// Runs before any handler, so ownership checks never see anonymous requests.
pub async fn require_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(request.headers()).map_err(ApiError::unauthorized)?;

    let claims = verify_jwt(&token).map_err(|e| {
        tracing::warn!("Rejected bearer token: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    let user = state
        .store
        .users
        .find_active(claims.user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Token for user {} does not match an active user", claims.user_id);
            ApiError::unauthorized("User not found or inactive")
        })?;

    request.extensions_mut().insert(Principal::from(&user));

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Authentication credentials were not provided".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_jwt_from_headers(&headers(Some("Bearer abc.def"))), Ok("abc.def".to_string()));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(extract_jwt_from_headers(&headers(None)).is_err());
        assert!(extract_jwt_from_headers(&headers(Some("Token abc"))).is_err());
        assert!(extract_jwt_from_headers(&headers(Some("Bearer   "))).is_err());
    }
}
