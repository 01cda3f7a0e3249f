// Resolves the signed-in user to a profile and, for practitioners, to the
// dentist row. The dentist id is always derived from the profile.

use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::{Dentist, Profile, UserRole};
use crate::store::PracticeStore;

use super::fetch_failed;

#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub profile: Profile,
    pub dentist: Option<Dentist>,
}

impl ResolvedProfile {
    pub fn role(&self) -> UserRole {
        self.profile.role
    }
}

pub async fn resolve(store: &dyn PracticeStore, user_id: Uuid) -> Result<ResolvedProfile, DashboardError> {
    let profile = store
        .profile_by_user(user_id)
        .await
        .map_err(|e| fetch_failed("profile", e))?
        .ok_or_else(|| DashboardError::NotFound("Profile not found".into()))?;

    let dentist = if profile.role == UserRole::Dentist {
        store
            .dentist_by_profile(profile.id)
            .await
            .map_err(|e| fetch_failed("dentist record", e))?
    } else {
        None
    };

    Ok(ResolvedProfile { profile, dentist })
}

pub async fn require_dentist(store: &dyn PracticeStore, user_id: Uuid) -> Result<(Profile, Dentist), DashboardError> {
    let resolved = resolve(store, user_id).await?;
    let role = resolved.role();
    match resolved.dentist {
        Some(dentist) if dentist.is_active && role == UserRole::Dentist => {
            Ok((resolved.profile, dentist))
        }
        _ => Err(DashboardError::Forbidden("Dentist access required".into())),
    }
}
