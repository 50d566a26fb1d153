use serde::Serialize;

use crate::domain::user::User;

/// Per-request view of who is calling.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "profile", rename_all = "snake_case")]
pub enum SessionContext {
    SignedOut,
    /// The token is valid but the profile could not be read yet. Clients
    /// keep their tokens and ask again.
    Loading,
    SignedIn(User),
}

impl SessionContext {
    /// Session for a looked-up profile. Missing or deactivated accounts
    /// sign out.
    pub fn from_profile(profile: Option<User>) -> Self {
        match profile {
            Some(user) if user.is_active => Self::SignedIn(user),
            _ => Self::SignedOut,
        }
    }

    pub fn profile(&self) -> Option<&User> {
        match self {
            Self::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::Role;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn profile(is_active: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@example.org".into(),
            display_name: "A".into(),
            role: Role::Staff,
            department: Some("ICU".into()),
            is_active,
            last_login_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn active_profile_signs_in() {
        let session = SessionContext::from_profile(Some(profile(true)));
        assert!(session.profile().is_some());
    }

    #[test]
    fn inactive_or_missing_profile_signs_out() {
        assert!(matches!(
            SessionContext::from_profile(Some(profile(false))),
            SessionContext::SignedOut
        ));
        assert!(matches!(
            SessionContext::from_profile(None),
            SessionContext::SignedOut
        ));
    }

    #[test]
    fn loading_has_no_profile() {
        assert!(SessionContext::Loading.profile().is_none());
        let value = serde_json::to_value(SessionContext::Loading).unwrap();
        assert_eq!(value["state"], "loading");
    }

    #[test]
    fn serializes_with_state_tag() {
        let value = serde_json::to_value(SessionContext::SignedOut).unwrap();
        assert_eq!(value["state"], "signed_out");
    }
}
