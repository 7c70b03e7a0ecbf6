//! Task entity model.
//!
//! # Responsibility
//! - Define the persisted task record and its typed draft/patch inputs.
//! - Provide due-date helpers used by dashboard statistics.
//! - Track workflow status; `TaskFlag::Completed` toggles between
//!   `Completed` and `ToDo`.
//!
//! # Invariants
//! - `id` is assigned by the collection service and never patched.
//! - `created_at` is set once at creation and never patched.

use crate::model::entity::{Entity, EntityId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned to tasks created without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Task urgency shown in list badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|priority| priority.as_str() == value)
    }
}

/// Workflow state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To do", alias = "Tod do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    Halted,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::ToDo,
        TaskStatus::InProgress,
        TaskStatus::Halted,
        TaskStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToDo => "To do",
            Self::InProgress => "In Progress",
            Self::Halted => "Halted",
            Self::Completed => "Completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }

    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Managed task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Returns whether the task is still open after its due date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_completed() && self.due_date.is_some_and(|due| due < today)
    }
}

/// Create-time input for [`Task`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}

/// Partial update for [`Task`].
///
/// `due_date: Some(None)` clears the due date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}

/// Toggleable boolean fields of [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFlag {
    Completed,
}

impl Entity for Task {
    type Draft = TaskDraft;
    type Patch = TaskPatch;
    type Flag = TaskFlag;

    const COLLECTION: &'static str = "todos";

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: TaskDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title.unwrap_or_default(),
            description: draft.description.unwrap_or_default(),
            due_date: draft.due_date.or_else(|| Some(created_at.date_naive())),
            category: draft.category.unwrap_or_else(default_category),
            priority: draft.priority.unwrap_or_default(),
            status: draft.status.unwrap_or_default(),
            created_at,
        }
    }

    fn patched(&self, patch: &TaskPatch) -> Self {
        let mut next = self.clone();
        if let Some(title) = &patch.title {
            next.title = title.clone();
        }
        if let Some(description) = &patch.description {
            next.description = description.clone();
        }
        if let Some(due_date) = patch.due_date {
            next.due_date = due_date;
        }
        if let Some(category) = &patch.category {
            next.category = category.clone();
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        next
    }

    fn flag(&self, flag: TaskFlag) -> bool {
        match flag {
            TaskFlag::Completed => self.status.is_completed(),
        }
    }

    fn with_flag_toggled(&self, flag: TaskFlag) -> Self {
        let mut next = self.clone();
        match flag {
            TaskFlag::Completed => {
                next.status = if next.status.is_completed() {
                    TaskStatus::ToDo
                } else {
                    TaskStatus::Completed
                };
            }
        }
        next
    }

    fn display_name(&self) -> &str {
        &self.title
    }
}
