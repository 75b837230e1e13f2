//! Resolves the acting principal from request headers.
//!
//! An upstream gateway authenticates callers and forwards who they are:
//! `x-user-id` and `x-user-role` for users, `x-session-id` for guests.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::UserId;
use domain::{Principal, Role};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Extractor for the caller of a request.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve(&parts.headers).map(Caller)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| ApiError::Unauthenticated(format!("{name} is not valid text")))
        })
        .transpose()
}

fn resolve(headers: &HeaderMap) -> Result<Principal, ApiError> {
    if let Some(raw_id) = header(headers, USER_ID_HEADER)? {
        let id: i64 = raw_id
            .parse()
            .map_err(|_| ApiError::Unauthenticated(format!("invalid user id: {raw_id}")))?;
        let role = match header(headers, USER_ROLE_HEADER)? {
            Some(raw_role) => raw_role
                .parse::<Role>()
                .map_err(|err| ApiError::Unauthenticated(err.to_string()))?,
            None => Role::default(),
        };
        return Ok(Principal::user(UserId::new(id), role));
    }

    match header(headers, SESSION_ID_HEADER)? {
        Some(session) if !session.is_empty() => Ok(Principal::guest(session)),
        _ => Err(ApiError::Unauthenticated(
            "no user or session identity".to_string(),
        )),
    }
}
