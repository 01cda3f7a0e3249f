use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use uuid::Uuid;

use crate::auth::hash_access_token;
use crate::error::ApiError;
use crate::models::{AppState, Dentist};
use crate::services::profile;

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub session_token_id: Uuid,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            // Authorization: Bearer <token>
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::session_expired())?;

            let token_hash = hash_access_token(authz.token());

            let session = state
                .store
                .session_user(&token_hash)
                .await
                .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
                .ok_or_else(ApiError::session_expired)?;

            Ok(AuthContext {
                user_id: session.user_id,
                session_token_id: session.session_token_id,
            })
        }
    }
}

/// Session resolved to an active practitioner. Every dashboard route takes
/// this instead of `AuthContext`, so the dentist id always comes from the
/// signed-in profile.
#[derive(Debug, Clone)]
pub struct DentistContext {
    pub dentist: Dentist,
}

impl DentistContext {
    pub fn dentist_id(&self) -> Uuid {
        self.dentist.id
    }
}

impl FromRequestParts<AppState> for DentistContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let auth = AuthContext::from_request_parts(parts, state).await?;
            let (profile, dentist) = profile::require_dentist(state.store.as_ref(), auth.user_id).await?;
            tracing::debug!(
                session_token_id = %auth.session_token_id,
                profile_id = %profile.id,
                dentist_id = %dentist.id,
                "dentist session resolved"
            );
            Ok(DentistContext { dentist })
        }
    }
}
