use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::TodoError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload expected inside the bearer JWT issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID in the `users` table.
    pub sub: Uuid,
    /// Expiration Time (exp): always validated.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved caller identity of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Option<Role>,
}

impl AuthUser {
    fn resolved(user: User, via: &'static str) -> Self {
        let caller = AuthUser {
            id: user.id,
            role: user.role,
        };
        tracing::debug!(user_id = %caller.id, role = ?caller.role, via, "caller resolved");
        caller
    }
}

/// resolve_caller
///
/// Works out who is calling, if anyone:
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing user is accepted.
/// 2. Bearer token: `Authorization: Bearer <jwt>` signed with the configured secret.
/// 3. User lookup: the subject must still exist, so deleted users lose access immediately.
///
/// Every authentication failure yields `Ok(None)`; only storage failures are errors.
async fn resolve_caller(
    parts: &Parts,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Option<AuthUser>, TodoError> {
    // 1. Local Development Bypass
    // Ignored outside Env::Local. An id that names no user falls through to the token check.
    if config.env == Env::Local {
        let bypass = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|id_str| Uuid::parse_str(id_str).ok());
        if let Some(user_id) = bypass {
            if let Some(user) = repo.get_user(user_id).await.map_err(TodoError::from)? {
                return Ok(Some(AuthUser::resolved(user, "x-user-id")));
            }
        }
    }

    // 2. Bearer Token Extraction
    let Some(token) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        return Ok(None);
    };

    // 3. JWT Validation (HS256, shared secret, expiry enforced)
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let claims = match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!("rejected token: {:?}", other),
            }
            return Ok(None);
        }
    };

    // 4. User Lookup
    // A signed token alone is not enough: the subject must still have a `users` row.
    let user = repo.get_user(claims.sub).await.map_err(TodoError::from)?;
    if user.is_none() {
        tracing::debug!(user_id = %claims.sub, "token subject has no user record");
    }
    Ok(user.map(|user| AuthUser::resolved(user, "bearer")))
}

/// Required identity: rejects with `NotAuthenticated` (401) when no caller can be resolved.
/// Used by `/me`, which has no service guard of its own.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = TodoError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        resolve_caller(parts, &repo, &config)
            .await?
            .ok_or(TodoError::NotAuthenticated)
    }
}

/// Optional identity: `Option<AuthUser>` in a handler hands the absent case to the service guard.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = TodoError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        resolve_caller(parts, &repo, &config).await
    }
}
