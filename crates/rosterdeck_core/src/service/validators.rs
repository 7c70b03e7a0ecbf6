//! Form schemas and validators for user and task editors.
//!
//! # Responsibility
//! - Declare the fields of the user and task forms.
//! - Validate submitted values and convert them into typed drafts/patches.
//!
//! # Invariants
//! - Validators return every failing field at once; an empty map is valid.
//! - Conversions only run on values that passed validation, so unparsable
//!   fields fall back to entity defaults instead of failing.

use crate::form::{FieldErrors, FieldSpec, FormSchema, FormValues};
use crate::model::task::{Priority, Task, TaskDraft, TaskPatch, DEFAULT_CATEGORY};
use crate::model::user::{Role, User, UserDraft, UserPatch};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Date format used by due-date inputs.
pub const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";

/// Categories offered by the task editor.
pub const TASK_CATEGORIES: [&str; 6] =
    ["General", "Work", "Personal", "Shopping", "Health", "Other"];

pub mod user_fields {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const ROLE: &str = "role";
    pub const IS_ACTIVE: &str = "is_active";
}

pub mod task_fields {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const DUE_DATE: &str = "due_date";
    pub const CATEGORY: &str = "category";
    pub const PRIORITY: &str = "priority";
}

pub fn user_form_schema() -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::text(user_fields::NAME),
        FieldSpec::text(user_fields::EMAIL),
        FieldSpec::select(
            user_fields::ROLE,
            Role::ALL.map(Role::as_str),
            Role::default().as_str(),
        ),
        FieldSpec::checkbox(user_fields::IS_ACTIVE, false),
    ])
}

/// Name and email are required; email must look like `local@domain.tld`.
pub fn validate_user(values: &FormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if values.text(user_fields::NAME).trim().is_empty() {
        errors.insert(user_fields::NAME.to_string(), "Name is required".to_string());
    }

    let email = values.text(user_fields::EMAIL).trim();
    if email.is_empty() {
        errors.insert(user_fields::EMAIL.to_string(), "Email is required".to_string());
    } else if !EMAIL_RE.is_match(email) {
        errors.insert(user_fields::EMAIL.to_string(), "Email is invalid".to_string());
    }
    errors
}

/// Seed for editing an existing user.
pub fn user_form_seed(user: &User) -> FormValues {
    FormValues::new()
        .with(user_fields::NAME, user.name.as_str())
        .with(user_fields::EMAIL, user.email.as_str())
        .with(user_fields::ROLE, user.role.as_str())
        .with(user_fields::IS_ACTIVE, user.is_active)
}

pub fn user_draft_from_form(values: &FormValues) -> UserDraft {
    UserDraft {
        name: Some(values.text(user_fields::NAME).trim().to_string()),
        email: Some(values.text(user_fields::EMAIL).trim().to_string()),
        role: Role::parse(values.text(user_fields::ROLE)),
        is_active: Some(values.flag(user_fields::IS_ACTIVE)),
        ..UserDraft::default()
    }
}

pub fn user_patch_from_form(values: &FormValues) -> UserPatch {
    let draft = user_draft_from_form(values);
    UserPatch {
        name: draft.name,
        email: draft.email,
        role: draft.role,
        is_active: draft.is_active,
        ..UserPatch::default()
    }
}

/// Task form; the due date defaults to `today`.
pub fn task_form_schema(today: NaiveDate) -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::text(task_fields::TITLE),
        FieldSpec::text(task_fields::DESCRIPTION),
        FieldSpec::text(task_fields::DUE_DATE)
            .with_default(today.format(DATE_INPUT_FORMAT).to_string()),
        FieldSpec::select(task_fields::CATEGORY, TASK_CATEGORIES, DEFAULT_CATEGORY),
        FieldSpec::select(
            task_fields::PRIORITY,
            Priority::ALL.map(Priority::as_str),
            Priority::default().as_str(),
        ),
    ])
}

/// Title and due date are required; the due date must be `YYYY-MM-DD`.
pub fn validate_task(values: &FormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if values.text(task_fields::TITLE).trim().is_empty() {
        errors.insert(task_fields::TITLE.to_string(), "Title is required".to_string());
    }

    let due_date = values.text(task_fields::DUE_DATE).trim();
    if due_date.is_empty() {
        errors.insert(
            task_fields::DUE_DATE.to_string(),
            "Due date is required".to_string(),
        );
    } else if parse_date_input(due_date).is_none() {
        errors.insert(
            task_fields::DUE_DATE.to_string(),
            "Due date must be YYYY-MM-DD".to_string(),
        );
    }
    errors
}

/// Edit seed for `task`; a category outside [`TASK_CATEGORIES`] falls back
/// to [`DEFAULT_CATEGORY`].
pub fn task_form_seed(task: &Task) -> FormValues {
    let due_date = task
        .due_date
        .map(|date| date.format(DATE_INPUT_FORMAT).to_string())
        .unwrap_or_default();
    let category = if TASK_CATEGORIES.contains(&task.category.as_str()) {
        task.category.as_str()
    } else {
        DEFAULT_CATEGORY
    };
    FormValues::new()
        .with(task_fields::TITLE, task.title.as_str())
        .with(task_fields::DESCRIPTION, task.description.as_str())
        .with(task_fields::DUE_DATE, due_date)
        .with(task_fields::CATEGORY, category)
        .with(task_fields::PRIORITY, task.priority.as_str())
}

pub fn task_draft_from_form(values: &FormValues) -> TaskDraft {
    let category = values.text(task_fields::CATEGORY);
    TaskDraft {
        title: Some(values.text(task_fields::TITLE).trim().to_string()),
        description: Some(values.text(task_fields::DESCRIPTION).trim().to_string()),
        due_date: parse_date_input(values.text(task_fields::DUE_DATE)),
        category: (!category.is_empty()).then(|| category.to_string()),
        priority: Priority::parse(values.text(task_fields::PRIORITY)),
        status: None,
    }
}

pub fn task_patch_from_form(values: &FormValues) -> TaskPatch {
    let draft = task_draft_from_form(values);
    TaskPatch {
        title: draft.title,
        description: draft.description,
        due_date: Some(draft.due_date),
        category: draft.category,
        priority: draft.priority,
        status: None,
    }
}

pub fn parse_date_input(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_INPUT_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FormController, SubmitOutcome};

    #[test]
    fn user_validator_reports_all_missing_fields() {
        let errors = validate_user(&user_form_schema().default_values());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors["name"], "Name is required");
        assert_eq!(errors["email"], "Email is required");
    }

    #[test]
    fn user_validator_rejects_malformed_email() {
        let values = FormValues::new()
            .with("name", "Ada")
            .with("email", "ada.example.com");
        assert_eq!(validate_user(&values)["email"], "Email is invalid");

        let values = values.with("email", "ada@example.com");
        assert!(validate_user(&values).is_empty());
    }

    #[test]
    fn user_form_submits_typed_draft() {
        let form = FormController::new(user_form_schema(), validate_user);
        form.handle_change("name", " Ada ").unwrap();
        form.handle_change("email", "ada@example.com").unwrap();
        form.handle_change("role", "Editor").unwrap();
        form.handle_change("is_active", "on").unwrap();

        let outcome = form.handle_submit(user_draft_from_form);

        let SubmitOutcome::Submitted(draft) = outcome else {
            panic!("expected valid submission");
        };
        assert_eq!(draft.name.as_deref(), Some("Ada"));
        assert_eq!(draft.role, Some(Role::Editor));
        assert_eq!(draft.is_active, Some(true));
        assert_eq!(draft.department, None);
    }

    #[test]
    fn task_validator_requires_title_and_well_formed_due_date() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let defaults = task_form_schema(today).default_values();
        let errors = validate_task(&defaults);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["title"], "Title is required");

        let values = defaults.with("title", "Plan").with("due_date", "05/01/2024");
        assert_eq!(validate_task(&values)["due_date"], "Due date must be YYYY-MM-DD");

        let values = values.with("due_date", "");
        assert_eq!(validate_task(&values)["due_date"], "Due date is required");
    }

    #[test]
    fn task_seed_round_trips_through_patch() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let schema = task_form_schema(today);
        let values = schema
            .seeded_values(
                &FormValues::new()
                    .with("title", "Buy milk")
                    .with("category", "Shopping")
                    .with("priority", "High"),
            )
            .unwrap();

        let patch = task_patch_from_form(&values);
        assert_eq!(patch.title.as_deref(), Some("Buy milk"));
        assert_eq!(patch.category.as_deref(), Some("Shopping"));
        assert_eq!(patch.priority, Some(Priority::High));
        assert_eq!(patch.due_date, Some(Some(today)));
    }

    #[test]
    fn stored_task_without_known_category_still_seeds_edit_form() {
        let stored: Vec<Task> = serde_json::from_str(
            r#"[{"id": 7, "title": "Stored", "createdAt": "2024-01-01T00:00:00Z"},
                {"id": 8, "title": "Odd", "category": "Errands", "createdAt": "2024-01-01T00:00:00Z"}]"#,
        )
        .unwrap();
        let schema = task_form_schema(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        for task in &stored {
            let values = schema.seeded_values(&task_form_seed(task)).unwrap();
            assert_eq!(values.text("category"), DEFAULT_CATEGORY);
        }
    }
}
