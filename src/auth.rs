use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn from_label(label: &str) -> Option<Role> {
        match label {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated principal. Sign-in happens elsewhere; this system only reads
/// the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessPolicy {
    pub require_auth: bool,
}

/// Returns whether `caller` may run a mutating operation under `policy`.
pub fn authorize(policy: AccessPolicy, caller: Option<&User>) -> bool {
    !policy.require_auth || caller.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: 1,
            open_id: "open-1".into(),
            name: Some("Ana".into()),
            email: None,
            login_method: Some("oauth".into()),
            role,
            created_at: now,
            updated_at: now,
            last_signed_in: now,
        }
    }

    #[test]
    fn open_policy_allows_anonymous() {
        assert!(authorize(AccessPolicy::default(), None));
    }

    #[test]
    fn closed_policy_needs_a_caller() {
        let policy = AccessPolicy { require_auth: true };
        assert!(!authorize(policy, None));
        assert!(authorize(policy, Some(&user(Role::User))));
        assert!(authorize(policy, Some(&user(Role::Admin))));
    }

    #[test]
    fn role_labels() {
        assert_eq!(Role::from_label("admin"), Some(Role::Admin));
        assert_eq!(Role::from_label("Admin"), None);
    }
}
