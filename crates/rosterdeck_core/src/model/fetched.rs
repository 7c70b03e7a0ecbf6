//! Wire shapes returned by the remote collection endpoints.
//!
//! # Responsibility
//! - Decode remote records leniently (optional nested objects).
//! - Map remote records onto managed entities for explicit import.

use crate::model::entity::EntityId;
use crate::model::task::{Priority, Task, TaskStatus, DEFAULT_CATEGORY};
use crate::model::user::{Role, User, DEFAULT_AVATAR};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchedAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchedCompany {
    pub name: String,
}

/// Remote user record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchedUser {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: Option<FetchedAddress>,
    #[serde(default)]
    pub company: Option<FetchedCompany>,
}

impl FetchedUser {
    /// Converts into a managed user; remote users are imported as active viewers.
    pub fn into_user(self, imported_at: DateTime<Utc>) -> User {
        let department = self
            .company
            .map(|company| company.name)
            .unwrap_or_else(|| "Unknown".to_string());
        let location = match self.address {
            Some(address) => format!("{}, {}", non_empty_or_unknown(&address.city), address.street),
            None => "Unknown".to_string(),
        };

        User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: Role::Viewer,
            is_active: true,
            avatar: DEFAULT_AVATAR.to_string(),
            department,
            location,
            join_date: imported_at.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Remote todo record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchedTodo {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl FetchedTodo {
    pub fn into_task(self, imported_at: DateTime<Utc>) -> Task {
        Task {
            id: self.id,
            description: format!("Sample description for {}", self.title),
            title: self.title,
            due_date: Some(imported_at.date_naive()),
            category: DEFAULT_CATEGORY.to_string(),
            priority: Priority::Medium,
            status: if self.completed {
                TaskStatus::Completed
            } else {
                TaskStatus::ToDo
            },
            created_at: imported_at,
        }
    }
}

/// Remote post record; only titles are surfaced to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedPost {
    pub id: u64,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Extracts post titles in response order.
pub fn post_titles(posts: Vec<FetchedPost>) -> Vec<String> {
    posts.into_iter().map(|post| post.title).collect()
}

fn non_empty_or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "Unknown"
    } else {
        value
    }
}
