use axum::http::{header::AUTHORIZATION, HeaderMap};
use medflow_database::Role;

use crate::ApiError;

pub const STAFF: &[Role] = &[Role::Admin, Role::Doctor, Role::Receptionist];
pub const ADMIN: &[Role] = &[Role::Admin];
pub const FRONT_DESK: &[Role] = &[Role::Admin, Role::Receptionist];
pub const CLINICIANS: &[Role] = &[Role::Doctor, Role::Admin];
pub const SCHEDULERS: &[Role] = &[Role::Admin, Role::Receptionist, Role::Doctor];
pub const BOOKERS: &[Role] = &[Role::Admin, Role::Receptionist, Role::Patient];
pub const PATIENTS: &[Role] = &[Role::Patient];

pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ApiError::unauthorized("Unauthorized"));
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(ApiError::unauthorized("Unauthorized"));
    }

    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn require_bearer_extracts_token_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer TOKEN123"));

        let token = require_bearer(&headers).expect("token should be extracted");
        assert_eq!(token, "TOKEN123");
    }

    #[test]
    fn require_bearer_rejects_missing_token_and_other_schemes() {
        let mut headers = HeaderMap::new();
        assert_eq!(require_bearer(&headers).unwrap_err().status, StatusCode::UNAUTHORIZED);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert_eq!(require_bearer(&headers).unwrap_err().status, StatusCode::UNAUTHORIZED);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(require_bearer(&headers).unwrap_err().status, StatusCode::UNAUTHORIZED);
    }
}
