use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    errors::AppError,
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the session token issued by the external identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's id in the `users` table.
    pub sub: Uuid,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. As a handler argument it
/// rejects anonymous requests with 401.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// Viewer
///
/// The optional variant of `AuthUser` for pages anonymous visitors may see.
/// Missing or invalid credentials both resolve to an anonymous viewer.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<AuthUser>);

impl Viewer {
    pub fn anonymous() -> Self {
        Viewer(None)
    }

    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.id)
    }

    /// True when the viewer is signed in as `user_id`.
    pub fn is(&self, user_id: Uuid) -> bool {
        self.id() == Some(user_id)
    }
}

/// resolve_identity
///
/// Returns `Ok(None)` when the request carries no credentials at all and
/// `Err(Unauthorized)` when it carries credentials that do not check out.
///
/// 1. In `Env::Local`, an `x-user-id` header naming an existing user is accepted.
/// 2. Otherwise a `Bearer` token is decoded and its expiry validated.
/// 3. The token subject must still exist in `users`.
async fn resolve_identity(
    parts: &Parts,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Option<AuthUser>, AppError> {
    if config.env == Env::Local {
        let bypass_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|id| Uuid::parse_str(id).ok());
        if let Some(user_id) = bypass_id {
            if let Some(user) = repo.get_user(user_id).await? {
                return Ok(Some(AuthUser {
                    id: user.id,
                    username: user.username,
                }));
            }
        }
    }

    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!("Rejected session token: {:?}", e.kind());
        AppError::Unauthorized
    })?;

    let user = repo
        .get_user(token_data.claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Some(AuthUser {
        id: user.id,
        username: user.username,
    }))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        resolve_identity(parts, &repo, &config)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        match resolve_identity(parts, &repo, &config).await {
            Ok(user) => Ok(Viewer(user)),
            Err(AppError::Unauthorized) => Ok(Viewer::anonymous()),
            Err(e) => Err(e),
        }
    }
}
