//! Schema-driven form controller.
//!
//! # Responsibility
//! - Track field values, validation errors, touched fields and submission
//!   state for one form instance.
//! - Coerce raw widget input by field kind before it reaches the values map.
//!
//! # Invariants
//! - Errors are recomputed over all values on every change when a validator
//!   is configured; the controller never decides which fields are required.
//! - `on_valid` runs only when the validator reports no errors, and
//!   `submitting` is `true` exactly while it runs.
//! - Rejected input (unknown field, invalid choice) leaves state untouched.

mod schema;

pub use schema::{FieldErrors, FieldKind, FieldSpec, FieldValue, FormSchema, FormValues};

use crate::store::{Mergeable, Store, Subscription};
use log::{debug, info};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;

/// Rejected form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// Field is not declared in the schema.
    UnknownField(String),
    /// Select input is not one of the declared options.
    InvalidChoice { field: String, value: String },
    /// Seed value has the wrong type for its field.
    InvalidSeed {
        field: String,
        expected: &'static str,
    },
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField(field) => write!(f, "unknown form field: `{field}`"),
            Self::InvalidChoice { field, value } => {
                write!(f, "invalid choice `{value}` for field `{field}`")
            }
            Self::InvalidSeed { field, expected } => {
                write!(f, "seed value for `{field}` must be {expected}")
            }
        }
    }
}

impl Error for FormError {}

/// Snapshot of one form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub values: FormValues,
    pub errors: FieldErrors,
    pub touched: BTreeSet<String>,
    pub submitting: bool,
}

impl FormState {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Typed partial update for [`FormState`].
#[derive(Debug, Clone, Default)]
pub struct FormPatch {
    pub values: Option<FormValues>,
    pub errors: Option<FieldErrors>,
    pub touched: Option<BTreeSet<String>>,
    pub submitting: Option<bool>,
}

impl Mergeable for FormState {
    type Patch = FormPatch;

    fn merge(&self, patch: FormPatch) -> Self {
        Self {
            values: patch.values.unwrap_or_else(|| self.values.clone()),
            errors: patch.errors.unwrap_or_else(|| self.errors.clone()),
            touched: patch.touched.unwrap_or_else(|| self.touched.clone()),
            submitting: patch.submitting.unwrap_or(self.submitting),
        }
    }
}

/// Whole-form validation function.
pub type Validator = Arc<dyn Fn(&FormValues) -> FieldErrors + Send + Sync>;

/// Result of a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome<R> {
    /// Values were valid and the callback returned `R`.
    Submitted(R),
    /// Validation failed; the callback was not called.
    Invalid,
}

impl<R> SubmitOutcome<R> {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }
}

/// Controller for one form instance.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct FormController {
    schema: Arc<FormSchema>,
    validator: Option<Validator>,
    store: Store<FormState>,
}

impl FormController {
    /// Creates a controller validated by `validator`, starting from defaults.
    pub fn new<V>(schema: FormSchema, validator: V) -> Self
    where
        V: Fn(&FormValues) -> FieldErrors + Send + Sync + 'static,
    {
        Self::build(schema, Some(Arc::new(validator)))
    }

    /// Creates a controller that accepts any values.
    pub fn without_validator(schema: FormSchema) -> Self {
        Self::build(schema, None)
    }

    fn build(schema: FormSchema, validator: Option<Validator>) -> Self {
        let initial = FormState {
            values: schema.default_values(),
            ..FormState::default()
        };
        Self {
            schema: Arc::new(schema),
            validator,
            store: Store::new(initial),
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn state(&self) -> Arc<FormState> {
        self.store.get_state()
    }

    pub fn values(&self) -> FormValues {
        self.state().values.clone()
    }

    pub fn subscribe<C>(&self, callback: C) -> Subscription
    where
        C: Fn(&Arc<FormState>) + Send + Sync + 'static,
    {
        self.store.subscribe(callback)
    }

    /// Resets the form to `seed` overlaid on field defaults.
    ///
    /// Errors, touched fields and the submitting flag are cleared.
    pub fn initialize(&self, seed: Option<&FormValues>) -> Result<(), FormError> {
        let values = match seed {
            Some(seed) => self.schema.seeded_values(seed)?,
            None => self.schema.default_values(),
        };
        self.store.set_state(FormPatch {
            values: Some(values),
            errors: Some(FieldErrors::new()),
            touched: Some(BTreeSet::new()),
            submitting: Some(false),
        });
        debug!(
            "event=form_initialize module=form status=ok seeded={}",
            seed.is_some()
        );
        Ok(())
    }

    /// Applies raw input to `field`, marks it touched and revalidates.
    pub fn handle_change(&self, field: &str, raw: &str) -> Result<(), FormError> {
        let spec = self
            .schema
            .field(field)
            .ok_or_else(|| FormError::UnknownField(field.to_string()))?;
        let value = spec.coerce(raw)?;

        let field = field.to_string();
        let validator = self.validator.clone();
        self.store.update_state(move |state| {
            let mut values = state.values.clone();
            values.insert(field.clone(), value);
            let mut touched = state.touched.clone();
            touched.insert(field);
            let errors = validator.map(|validate| validate(&values));
            Some(FormPatch {
                values: Some(values),
                errors,
                touched: Some(touched),
                submitting: None,
            })
        });
        Ok(())
    }

    /// Error for `field`, shown only once the field has been touched.
    pub fn visible_error(&self, field: &str) -> Option<String> {
        let state = self.state();
        if !state.touched.contains(field) {
            return None;
        }
        state.errors.get(field).cloned()
    }

    /// Validates and, when valid, passes the values to `on_valid`.
    pub fn handle_submit<R, F>(&self, on_valid: F) -> SubmitOutcome<R>
    where
        F: FnOnce(&FormValues) -> R,
    {
        let Some(values) = self.begin_submit() else {
            return SubmitOutcome::Invalid;
        };
        let result = on_valid(&values);
        self.finish_submit();
        SubmitOutcome::Submitted(result)
    }

    /// Async variant of [`Self::handle_submit`]; `submitting` stays `true`
    /// while the returned future is pending.
    pub async fn handle_submit_async<R, F, Fut>(&self, on_valid: F) -> SubmitOutcome<R>
    where
        F: FnOnce(FormValues) -> Fut,
        Fut: Future<Output = R>,
    {
        let Some(values) = self.begin_submit() else {
            return SubmitOutcome::Invalid;
        };
        let result = on_valid(values).await;
        self.finish_submit();
        SubmitOutcome::Submitted(result)
    }

    pub fn dispose(&self) {
        self.store.dispose();
    }

    fn validate(&self, values: &FormValues) -> FieldErrors {
        self.validator
            .as_ref()
            .map(|validate| validate(values))
            .unwrap_or_default()
    }

    /// Returns the values to submit, or `None` after recording errors.
    fn begin_submit(&self) -> Option<FormValues> {
        let values = self.state().values.clone();
        let errors = self.validate(&values);

        if !errors.is_empty() {
            info!(
                "event=form_submit module=form status=invalid error_count={}",
                errors.len()
            );
            let touched = self.schema.field_names().map(str::to_string).collect();
            self.store.set_state(FormPatch {
                errors: Some(errors),
                touched: Some(touched),
                ..FormPatch::default()
            });
            return None;
        }

        self.store.set_state(FormPatch {
            errors: Some(errors),
            submitting: Some(true),
            ..FormPatch::default()
        });
        Some(values)
    }

    fn finish_submit(&self) {
        self.store.set_state(FormPatch {
            submitting: Some(false),
            ..FormPatch::default()
        });
        debug!("event=form_submit module=form status=ok");
    }
}
