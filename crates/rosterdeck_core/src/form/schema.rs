//! Field schema and typed form values.

use super::FormError;
use std::collections::BTreeMap;

/// Raw inputs accepted as a checked checkbox.
const TRUTHY_INPUTS: [&str; 4] = ["true", "on", "1", "yes"];

/// Coercion rule for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, stored as given.
    Text,
    /// Boolean toggle.
    Checkbox,
    /// One value out of a fixed option list.
    Select { options: Vec<String> },
}

/// Typed value held for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Field name to value map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<String, FieldValue>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for seeds.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Text value of `field`; empty for missing or non-text fields.
    pub fn text(&self, field: &str) -> &str {
        self.get(field).and_then(FieldValue::as_text).unwrap_or("")
    }

    /// Checkbox value of `field`; `false` for missing or non-bool fields.
    pub fn flag(&self, field: &str) -> bool {
        self.get(field).and_then(FieldValue::as_bool).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Field name to error message map; empty means valid.
pub type FieldErrors = BTreeMap<String, String>;

/// Declaration of one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub default: FieldValue,
}

impl FieldSpec {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
            default: FieldValue::Text(String::new()),
        }
    }

    pub fn checkbox(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Checkbox,
            default: FieldValue::Bool(default),
        }
    }

    /// Select field defaulting to `default`, which should be one of `options`.
    pub fn select<I, S>(name: impl Into<String>, options: I, default: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: FieldKind::Select {
                options: options.into_iter().map(Into::into).collect(),
            },
            default: FieldValue::Text(default.into()),
        }
    }

    pub fn with_default(mut self, default: impl Into<FieldValue>) -> Self {
        self.default = default.into();
        self
    }

    /// Converts raw widget input into this field's typed value.
    pub fn coerce(&self, raw: &str) -> Result<FieldValue, FormError> {
        match &self.kind {
            FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::Checkbox => {
                let normalized = raw.trim().to_ascii_lowercase();
                Ok(FieldValue::Bool(TRUTHY_INPUTS.contains(&normalized.as_str())))
            }
            FieldKind::Select { options } => {
                if options.iter().any(|option| option == raw) {
                    Ok(FieldValue::Text(raw.to_string()))
                } else {
                    Err(FormError::InvalidChoice {
                        field: self.name.clone(),
                        value: raw.to_string(),
                    })
                }
            }
        }
    }

    /// Checks an already-typed value, as supplied by a seed.
    pub fn accept(&self, value: &FieldValue) -> Result<(), FormError> {
        match (&self.kind, value) {
            (FieldKind::Text, FieldValue::Text(_)) => Ok(()),
            (FieldKind::Checkbox, FieldValue::Bool(_)) => Ok(()),
            (FieldKind::Select { .. }, FieldValue::Text(choice)) => {
                self.coerce(choice).map(|_| ())
            }
            (FieldKind::Checkbox, _) => Err(FormError::InvalidSeed {
                field: self.name.clone(),
                expected: "bool",
            }),
            _ => Err(FormError::InvalidSeed {
                field: self.name.clone(),
                expected: "text",
            }),
        }
    }
}

/// Ordered field declarations for one form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|spec| spec.name.as_str())
    }

    pub fn default_values(&self) -> FormValues {
        let mut values = FormValues::new();
        for spec in &self.fields {
            values.insert(spec.name.clone(), spec.default.clone());
        }
        values
    }

    /// Overlays `seed` on the defaults, rejecting unknown or mistyped fields.
    pub fn seeded_values(&self, seed: &FormValues) -> Result<FormValues, FormError> {
        let mut values = self.default_values();
        for (field, value) in seed.iter() {
            let spec = self
                .field(field)
                .ok_or_else(|| FormError::UnknownField(field.to_string()))?;
            spec.accept(value)?;
            values.insert(field, value.clone());
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FormSchema {
        FormSchema::new(vec![
            FieldSpec::text("name"),
            FieldSpec::checkbox("active", true),
            FieldSpec::select("role", ["Admin", "Viewer"], "Viewer"),
        ])
    }

    #[test]
    fn checkbox_accepts_common_truthy_inputs() {
        let spec = FieldSpec::checkbox("active", false);
        for raw in ["true", "ON", " yes ", "1"] {
            assert_eq!(spec.coerce(raw).unwrap(), FieldValue::Bool(true), "{raw}");
        }
        for raw in ["", "false", "off", "0", "nope"] {
            assert_eq!(spec.coerce(raw).unwrap(), FieldValue::Bool(false), "{raw}");
        }
    }

    #[test]
    fn select_rejects_values_outside_options() {
        let spec = FieldSpec::select("role", ["Admin", "Viewer"], "Viewer");
        assert!(spec.coerce("Admin").is_ok());
        assert!(matches!(
            spec.coerce("Owner"),
            Err(FormError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn defaults_cover_every_field() {
        let values = schema().default_values();
        assert_eq!(values.len(), 3);
        assert_eq!(values.text("name"), "");
        assert!(values.flag("active"));
        assert_eq!(values.text("role"), "Viewer");
    }

    #[test]
    fn seed_overrides_defaults_and_keeps_the_rest() {
        let seed = FormValues::new().with("name", "Ada").with("active", false);
        let values = schema().seeded_values(&seed).unwrap();
        assert_eq!(values.text("name"), "Ada");
        assert!(!values.flag("active"));
        assert_eq!(values.text("role"), "Viewer");
    }

    #[test]
    fn seed_with_unknown_or_mistyped_field_is_rejected() {
        let unknown = FormValues::new().with("nickname", "x");
        assert!(matches!(
            schema().seeded_values(&unknown),
            Err(FormError::UnknownField(field)) if field == "nickname"
        ));

        let mistyped = FormValues::new().with("active", "yes");
        assert!(matches!(
            schema().seeded_values(&mistyped),
            Err(FormError::InvalidSeed { expected: "bool", .. })
        ));
    }
}
