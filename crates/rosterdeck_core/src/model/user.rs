//! User entity model.
//!
//! # Responsibility
//! - Define the persisted user record and its typed draft/patch inputs.
//! - Provide defaults applied when a user is created from partial data.
//!
//! # Invariants
//! - `id` is assigned by the collection service and never patched.
//! - Serialized field names are camelCase.

use crate::model::entity::{Entity, EntityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Avatar assigned to users created without one.
pub const DEFAULT_AVATAR: &str = "https://randomuser.me/api/portraits/lego/1.jpg";
/// Department assigned to users created without one.
pub const DEFAULT_DEPARTMENT: &str = "New";
/// Location assigned to users created without one.
pub const DEFAULT_LOCATION: &str = "Unknown";

/// Access role displayed on user cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Editor,
    #[default]
    Viewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Editor, Role::Viewer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Editor => "Editor",
            Self::Viewer => "Viewer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

/// Managed user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub location: String,
    /// Calendar day in `YYYY-MM-DD` form.
    #[serde(default)]
    pub join_date: String,
}

/// Create-time input for [`User`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub avatar: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
}

/// Partial update for [`User`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub avatar: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
}

/// Toggleable boolean fields of [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFlag {
    Active,
}

impl Entity for User {
    type Draft = UserDraft;
    type Patch = UserPatch;
    type Flag = UserFlag;

    const COLLECTION: &'static str = "users";

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: UserDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.unwrap_or_default(),
            email: draft.email.unwrap_or_default(),
            role: draft.role.unwrap_or_default(),
            is_active: draft.is_active.unwrap_or(false),
            avatar: draft.avatar.unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
            department: draft
                .department
                .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
            location: draft.location.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            join_date: created_at.format("%Y-%m-%d").to_string(),
        }
    }

    fn patched(&self, patch: &UserPatch) -> Self {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(email) = &patch.email {
            next.email = email.clone();
        }
        if let Some(role) = patch.role {
            next.role = role;
        }
        if let Some(is_active) = patch.is_active {
            next.is_active = is_active;
        }
        if let Some(avatar) = &patch.avatar {
            next.avatar = avatar.clone();
        }
        if let Some(department) = &patch.department {
            next.department = department.clone();
        }
        if let Some(location) = &patch.location {
            next.location = location.clone();
        }
        next
    }

    fn flag(&self, flag: UserFlag) -> bool {
        match flag {
            UserFlag::Active => self.is_active,
        }
    }

    fn with_flag_toggled(&self, flag: UserFlag) -> Self {
        let mut next = self.clone();
        match flag {
            UserFlag::Active => next.is_active = !next.is_active,
        }
        next
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
    }

    #[test]
    fn draft_fills_defaults() {
        let user = User::from_draft(
            7,
            UserDraft {
                name: Some("Ada".to_string()),
                ..UserDraft::default()
            },
            created_at(),
        );

        assert_eq!(user.id, 7);
        assert_eq!(user.role, Role::Viewer);
        assert!(!user.is_active);
        assert_eq!(user.avatar, DEFAULT_AVATAR);
        assert_eq!(user.department, DEFAULT_DEPARTMENT);
        assert_eq!(user.location, DEFAULT_LOCATION);
        assert_eq!(user.join_date, "2024-03-09");
    }

    #[test]
    fn patch_keeps_id_and_untouched_fields() {
        let user = User::from_draft(1, UserDraft::default(), created_at());
        let patched = user.patched(&UserPatch {
            email: Some("ada@example.com".to_string()),
            ..UserPatch::default()
        });

        assert_eq!(patched.id, 1);
        assert_eq!(patched.email, "ada@example.com");
        assert_eq!(patched.name, user.name);
    }

    #[test]
    fn serialized_shape_uses_camel_case() {
        let user = User::from_draft(3, UserDraft::default(), created_at());
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("isActive").is_some());
        assert!(value.get("joinDate").is_some());
        assert_eq!(value["role"], "Viewer");
    }

    #[test]
    fn role_parse_accepts_only_known_labels() {
        assert_eq!(Role::parse("Editor"), Some(Role::Editor));
        assert_eq!(Role::parse("editor"), None);
    }
}
