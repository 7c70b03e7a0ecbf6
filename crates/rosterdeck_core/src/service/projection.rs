//! Read-only projections over entity collections.
//!
//! # Responsibility
//! - Search/status filtering for list views.
//! - Name-sorted listings and flag-based sections.
//! - Dashboard statistics.
//!
//! # Invariants
//! - Projections are pure: they never mutate or reorder the input, and
//!   applying the same filter twice yields the same result as applying it
//!   once.
//! - Returned items share `Arc` identity with the input collection.

use crate::model::entity::Entity;
use crate::model::task::{Task, TaskStatus};
use crate::model::user::{Role, User};
use chrono::NaiveDate;
use std::sync::Arc;

/// Entity that supports free-text search and a categorical status filter.
pub trait Filterable: Entity {
    type Status: Copy + Default;

    /// `needle` is already lowercased and non-empty.
    fn matches_text(&self, needle: &str) -> bool;

    fn matches_status(&self, status: Self::Status) -> bool;
}

/// Status filter for user lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserStatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl UserStatusFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// Status filter for task lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskStatusFilter {
    #[default]
    All,
    /// Every status except `Completed`.
    Pending,
    Only(TaskStatus),
}

impl TaskStatusFilter {
    /// Accepts `all`, `pending` or a status label such as `In Progress`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "pending" => Some(Self::Pending),
            label => TaskStatus::parse(label).map(Self::Only),
        }
    }
}

impl Filterable for User {
    type Status = UserStatusFilter;

    fn matches_text(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.email.to_lowercase().contains(needle)
    }

    fn matches_status(&self, status: UserStatusFilter) -> bool {
        match status {
            UserStatusFilter::All => true,
            UserStatusFilter::Active => self.is_active,
            UserStatusFilter::Inactive => !self.is_active,
        }
    }
}

impl Filterable for Task {
    type Status = TaskStatusFilter;

    fn matches_text(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }

    fn matches_status(&self, status: TaskStatusFilter) -> bool {
        match status {
            TaskStatusFilter::All => true,
            TaskStatusFilter::Pending => !self.status.is_completed(),
            TaskStatusFilter::Only(status) => self.status == status,
        }
    }
}

/// Items matching `query` (case-insensitive substring) and `status`.
///
/// A blank query matches everything.
pub fn filter_collection<E: Filterable>(
    items: &[Arc<E>],
    query: &str,
    status: E::Status,
) -> Vec<Arc<E>> {
    let needle = query.trim().to_lowercase();
    items
        .iter()
        .filter(|item| needle.is_empty() || item.matches_text(&needle))
        .filter(|item| item.matches_status(status))
        .cloned()
        .collect()
}

/// Items ordered by display name, case-insensitively; ties keep input order.
pub fn sorted_by_name<E: Entity>(items: &[Arc<E>]) -> Vec<Arc<E>> {
    let mut sorted = items.to_vec();
    sorted.sort_by_cached_key(|item| item.display_name().to_lowercase());
    sorted
}

/// Splits items into `(set, unset)` by `flag`, each sorted by name.
pub fn sections_by_flag<E: Entity>(items: &[Arc<E>], flag: E::Flag) -> (Vec<Arc<E>>, Vec<Arc<E>>) {
    let (set, unset): (Vec<_>, Vec<_>) = items.iter().cloned().partition(|item| item.flag(flag));
    (sorted_by_name(&set), sorted_by_name(&unset))
}

/// Counters shown on the user dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub admins: usize,
    pub editors: usize,
    pub viewers: usize,
}

impl UserStats {
    pub fn from_users(users: &[Arc<User>]) -> Self {
        users.iter().fold(Self::default(), |mut stats, user| {
            stats.total += 1;
            if user.is_active {
                stats.active += 1;
            } else {
                stats.inactive += 1;
            }
            match user.role {
                Role::Admin => stats.admins += 1,
                Role::Editor => stats.editors += 1,
                Role::Viewer => stats.viewers += 1,
            }
            stats
        })
    }
}

/// Counters shown on the task dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub overdue: usize,
}

impl TaskStats {
    /// `today` decides which open tasks are overdue.
    pub fn from_tasks(tasks: &[Arc<Task>], today: NaiveDate) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            match task.status {
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::InProgress => {
                    stats.in_progress += 1;
                    stats.pending += 1;
                }
                TaskStatus::ToDo | TaskStatus::Halted => stats.pending += 1,
            }
            if task.is_overdue(today) {
                stats.overdue += 1;
            }
            stats
        })
    }

    /// Share of completed tasks, in whole percent.
    pub fn completion_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskDraft;
    use crate::model::user::{UserDraft, UserFlag};
    use chrono::{TimeZone, Utc};

    fn user(id: u64, name: &str, email: &str, active: bool, role: Role) -> Arc<User> {
        Arc::new(User::from_draft(
            id,
            UserDraft {
                name: Some(name.to_string()),
                email: Some(email.to_string()),
                is_active: Some(active),
                role: Some(role),
                ..UserDraft::default()
            },
            Utc::now(),
        ))
    }

    fn task(id: u64, title: &str, due: Option<NaiveDate>, status: TaskStatus) -> Arc<Task> {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut task = Task::from_draft(
            id,
            TaskDraft {
                title: Some(title.to_string()),
                description: Some(format!("about {title}")),
                status: Some(status),
                ..TaskDraft::default()
            },
            created_at,
        );
        task.due_date = due;
        Arc::new(task)
    }

    fn users() -> Vec<Arc<User>> {
        vec![
            user(1, "Leanne", "leanne@april.biz", true, Role::Admin),
            user(2, "ervin", "ervin@melissa.tv", false, Role::Viewer),
            user(3, "Clementine", "nathan@yesenia.net", true, Role::Editor),
        ]
    }

    #[test]
    fn user_filter_matches_name_or_email_case_insensitively() {
        let items = users();
        let hits = filter_collection(&items, "NATHAN", UserStatusFilter::All);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 3);

        let hits = filter_collection(&items, "  ", UserStatusFilter::Inactive);
        assert_eq!(hits.iter().map(|u| u.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn filter_is_idempotent_and_shares_identity() {
        let items = users();
        let once = filter_collection(&items, "e", UserStatusFilter::Active);
        let twice = filter_collection(&once, "e", UserStatusFilter::Active);
        assert_eq!(once, twice);
        assert!(Arc::ptr_eq(&once[0], &items[0]));
    }

    #[test]
    fn task_filter_searches_title_and_description() {
        let items = vec![
            task(1, "Buy milk", None, TaskStatus::ToDo),
            task(2, "Write report", None, TaskStatus::Completed),
        ];
        let hits = filter_collection(&items, "about write", TaskStatusFilter::All);
        assert_eq!(hits.len(), 1);
        let done = TaskStatusFilter::Only(TaskStatus::Completed);
        assert!(filter_collection(&items, "milk", done).is_empty());
        assert_eq!(TaskStatusFilter::parse("pending"), Some(TaskStatusFilter::Pending));
    }

    #[test]
    fn task_filter_covers_every_status() {
        let items: Vec<Arc<Task>> = TaskStatus::ALL
            .into_iter()
            .enumerate()
            .map(|(index, status)| task(index as u64 + 1, status.as_str(), None, status))
            .collect();

        for status in TaskStatus::ALL {
            let filter = TaskStatusFilter::parse(status.as_str()).unwrap();
            let hits = filter_collection(&items, "", filter);
            assert_eq!(hits.len(), 1, "{}", status.as_str());
            assert_eq!(hits[0].status, status);
        }
        assert_eq!(filter_collection(&items, "", TaskStatusFilter::Pending).len(), 3);
        assert_eq!(TaskStatusFilter::parse("someday"), None);
    }

    #[test]
    fn sections_split_by_flag_and_sort_by_name() {
        let (active, inactive) = sections_by_flag(&users(), UserFlag::Active);
        assert_eq!(
            active.iter().map(|u| u.name.as_str()).collect::<Vec<_>>(),
            vec!["Clementine", "Leanne"]
        );
        assert_eq!(inactive.len(), 1);
        assert_eq!(sorted_by_name(&users())[1].name, "ervin");
    }

    #[test]
    fn stats_count_roles_and_overdue_tasks() {
        let stats = UserStats::from_users(&users());
        assert_eq!((stats.total, stats.active, stats.inactive), (3, 2, 1));
        assert_eq!((stats.admins, stats.editors, stats.viewers), (1, 1, 1));

        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 6, 9);
        let tasks = vec![
            task(1, "late", yesterday, TaskStatus::ToDo),
            task(2, "late but done", yesterday, TaskStatus::Completed),
            task(3, "due today", Some(today), TaskStatus::InProgress),
            task(4, "no date", None, TaskStatus::Halted),
        ];
        let stats = TaskStats::from_tasks(&tasks, today);
        assert_eq!(
            stats,
            TaskStats {
                total: 4,
                completed: 1,
                pending: 3,
                in_progress: 1,
                overdue: 1,
            }
        );
        assert_eq!(stats.completion_percent(), 25);
    }
}
