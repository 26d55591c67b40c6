//! Create and patch schemas for issue payloads.
//!
//! Both schemas take an arbitrary JSON record and either return the typed
//! payload or a [`FieldErrors`] map holding one message per offending field.
//! Lengths are counted in UTF-16 code units so that limits agree with the
//! browser-side checks and the database column sizes.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::{Status, UserId};

pub const TITLE_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 65_535;
pub const ASSIGNEE_MAX_LEN: usize = 255;

const REQUIRED: &str = "Required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Description,
    Status,
    #[serde(alias = "assignedTouserId")]
    AssignedToUserId,
    /// Errors that belong to the record as a whole.
    #[serde(rename = "_form")]
    Form,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Status => "status",
            Field::AssignedToUserId => "assignedToUserId",
            Field::Form => "_form",
        }
    }

    /// Looks up a field by its wire name. Older servers spell the assignee
    /// key `assignedTouserId`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Field::Title),
            "description" => Some(Field::Description),
            "status" => Some(Field::Status),
            "assignedToUserId" | "assignedTouserId" => Some(Field::AssignedToUserId),
            "_form" => Some(Field::Form),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level violations keyed by field name. The first message recorded for
/// a field wins.
///
/// Decoding skips keys that name no known field, so an error envelope from a
/// server with extra fields still decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl<'de> Deserialize<'de> for FieldErrors {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut errors = FieldErrors::new();
        for (name, message) in raw {
            if let Some(field) = Field::from_name(&name) {
                errors.insert(field, message);
            }
        }
        Ok(errors)
    }
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(Field::Form, message);
        errors
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn into_result<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, FieldErrors> {
        if !self.is_empty() {
            return Err(self);
        }
        // Every rule that could leave a value unset also records an error.
        value().ok_or_else(|| FieldErrors::form(REQUIRED))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (field, message)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Validated payload for `POST /api/issues`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssue {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: Status,
}

impl CreateIssue {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            status: Status::default(),
        }
    }

    /// Re-checks an already typed payload against the create rules.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        TITLE.check_into(&self.title, &mut errors);
        DESCRIPTION.check_into(&self.description, &mut errors);
        errors.into_result(|| Some(()))
    }
}

/// Validated payload for `PATCH /api/issues/{id}`.
///
/// `assigned_to_user_id` is tri-state: `None` leaves the assignee untouched,
/// `Some(None)` clears it and `Some(Some(_))` assigns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchIssue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to_user_id: Option<Option<UserId>>,
}

impl PatchIssue {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assigned_to_user_id.is_none()
    }

    /// Re-checks an already typed payload against the patch rules.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            TITLE.check_into(title, &mut errors);
        }
        if let Some(description) = &self.description {
            DESCRIPTION.check_into(description, &mut errors);
        }
        if let Some(Some(user_id)) = &self.assigned_to_user_id {
            ASSIGNEE.check_into(user_id.as_str(), &mut errors);
        }
        errors.into_result(|| Some(()))
    }
}

fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn validate_create(input: &Value) -> Result<CreateIssue, FieldErrors> {
    let record = as_record(input)?;
    let mut errors = FieldErrors::new();

    let title = TITLE.read(record, Presence::Required, &mut errors);
    let description = DESCRIPTION.read(record, Presence::Required, &mut errors);
    let status = read_status(record, &mut errors).unwrap_or_default();

    errors.into_result(|| {
        Some(CreateIssue {
            title: title?,
            description: description?,
            status,
        })
    })
}

pub fn validate_patch(input: &Value) -> Result<PatchIssue, FieldErrors> {
    let record = as_record(input)?;
    let mut errors = FieldErrors::new();

    let title = TITLE.read(record, Presence::Optional, &mut errors);
    let description = DESCRIPTION.read(record, Presence::Optional, &mut errors);
    let status = read_status(record, &mut errors);
    let assigned_to_user_id = read_assignee(record, &mut errors);

    errors.into_result(|| {
        Some(PatchIssue {
            title,
            description,
            status,
            assigned_to_user_id,
        })
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
}

struct StringRule {
    field: Field,
    empty_message: &'static str,
    max_len: usize,
}

const TITLE: StringRule = StringRule {
    field: Field::Title,
    empty_message: "Title is Required",
    max_len: TITLE_MAX_LEN,
};

const DESCRIPTION: StringRule = StringRule {
    field: Field::Description,
    empty_message: "Description is required",
    max_len: DESCRIPTION_MAX_LEN,
};

const ASSIGNEE: StringRule = StringRule {
    field: Field::AssignedToUserId,
    empty_message: "AssignedToUserId is required.",
    max_len: ASSIGNEE_MAX_LEN,
};

impl StringRule {
    fn check(&self, value: &str) -> Result<(), String> {
        let len = utf16_len(value);
        if len == 0 {
            Err(self.empty_message.to_string())
        } else if len > self.max_len {
            Err(format!(
                "String must contain at most {} character(s)",
                self.max_len
            ))
        } else {
            Ok(())
        }
    }

    fn check_into(&self, value: &str, errors: &mut FieldErrors) -> bool {
        match self.check(value) {
            Ok(()) => true,
            Err(message) => {
                errors.insert(self.field, message);
                false
            }
        }
    }

    fn read(
        &self,
        record: &Map<String, Value>,
        presence: Presence,
        errors: &mut FieldErrors,
    ) -> Option<String> {
        match record.get(self.field.as_str()) {
            None => {
                if presence == Presence::Required {
                    errors.insert(self.field, REQUIRED);
                }
                None
            }
            Some(Value::String(value)) => self
                .check_into(value, errors)
                .then(|| value.clone()),
            Some(other) => {
                errors.insert(self.field, expected_string(other));
                None
            }
        }
    }
}

fn read_status(record: &Map<String, Value>, errors: &mut FieldErrors) -> Option<Status> {
    match record.get(Field::Status.as_str())? {
        Value::String(raw) => match raw.parse::<Status>() {
            Ok(status) => Some(status),
            Err(err) => {
                errors.insert(Field::Status, err.to_string());
                None
            }
        },
        other => {
            errors.insert(
                Field::Status,
                format!(
                    "Expected 'OPEN' | 'IN_PROGRESS' | 'CLOSED', received {}",
                    json_type(other)
                ),
            );
            None
        }
    }
}

fn read_assignee(
    record: &Map<String, Value>,
    errors: &mut FieldErrors,
) -> Option<Option<UserId>> {
    match record.get(Field::AssignedToUserId.as_str())? {
        Value::Null => Some(None),
        Value::String(raw) => ASSIGNEE
            .check_into(raw, errors)
            .then(|| Some(UserId(raw.clone()))),
        other => {
            errors.insert(Field::AssignedToUserId, expected_string(other));
            None
        }
    }
}

fn as_record(input: &Value) -> Result<&Map<String, Value>, FieldErrors> {
    input.as_object().ok_or_else(|| {
        FieldErrors::form(format!(
            "Expected object, received {}",
            json_type(input)
        ))
    })
}

fn expected_string(value: &Value) -> String {
    format!("Expected string, received {}", json_type(value))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count()
}

#[cfg(test)]
#[path = "tests/schema_tests.rs"]
mod tests;
