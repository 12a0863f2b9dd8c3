//! Request identity extractors.
//!
//! Handlers take the acting user from these extractors, never from request
//! bodies. The auth middleware resolves the bearer token and stashes the
//! user model in request extensions; the extractors only read it back out.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use koinonia_db::entities::user;

/// The authenticated actor. Rejects with 401 when the request carried no
/// resolvable token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

/// The actor, when there is one. Endpoints that serve anonymous readers,
/// like public event lookups, use this instead of `AuthUser`.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl MaybeAuthUser {
    /// The acting user's id, when authenticated.
    #[must_use]
    pub fn actor_id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.id.as_str())
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}
