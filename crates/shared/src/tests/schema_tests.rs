use serde_json::json;

use super::*;

#[test]
fn create_accepts_minimal_payload_and_defaults_status() {
    let issue = validate_create(&json!({
        "title": "Bug A",
        "description": "Steps to repro",
    }))
    .expect("valid payload");

    assert_eq!(issue.title, "Bug A");
    assert_eq!(issue.description, "Steps to repro");
    assert_eq!(issue.status, Status::Open);
}

#[test]
fn create_keeps_explicit_status() {
    let issue = validate_create(&json!({
        "title": "Bug A",
        "description": "Steps to repro",
        "status": "IN_PROGRESS",
    }))
    .expect("valid payload");

    assert_eq!(issue.status, Status::InProgress);
}

#[test]
fn create_rejects_empty_title_and_description_per_field() {
    let errors = validate_create(&json!({ "title": "", "description": "" }))
        .expect_err("empty fields must fail");

    assert_eq!(errors.len(), 2);
    assert_eq!(errors.get(Field::Title), Some("Title is Required"));
    assert_eq!(errors.get(Field::Description), Some("Description is required"));
}

#[test]
fn create_reports_missing_fields_as_required() {
    let errors = validate_create(&json!({})).expect_err("missing fields must fail");

    assert_eq!(errors.get(Field::Title), Some("Required"));
    assert_eq!(errors.get(Field::Description), Some("Required"));
}

#[test]
fn create_enforces_upper_length_bounds() {
    let at_limit = validate_create(&json!({
        "title": "t".repeat(TITLE_MAX_LEN),
        "description": "d".repeat(DESCRIPTION_MAX_LEN),
    }));
    assert!(at_limit.is_ok());

    let errors = validate_create(&json!({
        "title": "t".repeat(TITLE_MAX_LEN + 1),
        "description": "d".repeat(DESCRIPTION_MAX_LEN + 1),
    }))
    .expect_err("over-long fields must fail");

    assert_eq!(
        errors.get(Field::Title),
        Some("String must contain at most 255 character(s)")
    );
    assert_eq!(
        errors.get(Field::Description),
        Some("String must contain at most 65535 character(s)")
    );
}

#[test]
fn patch_enforces_upper_length_bounds() {
    let at_limit = validate_patch(&json!({
        "title": "t".repeat(TITLE_MAX_LEN),
        "description": "d".repeat(DESCRIPTION_MAX_LEN),
    }))
    .expect("fields at the limit are valid");
    assert_eq!(at_limit.title.map(|title| title.len()), Some(TITLE_MAX_LEN));

    let errors = validate_patch(&json!({
        "title": "t".repeat(TITLE_MAX_LEN + 1),
        "description": "d".repeat(DESCRIPTION_MAX_LEN + 1),
    }))
    .expect_err("over-long fields must fail");

    assert_eq!(
        errors.get(Field::Title),
        Some("String must contain at most 255 character(s)")
    );
    assert_eq!(
        errors.get(Field::Description),
        Some("String must contain at most 65535 character(s)")
    );
    assert!(!errors.contains(Field::Status));
}

#[test]
fn lengths_are_counted_in_utf16_units() {
    // Each emoji is two UTF-16 code units.
    let title = "\u{1F41B}".repeat(128);
    let errors = validate_create(&json!({ "title": title, "description": "x" }))
        .expect_err("256 units must exceed the title limit");
    assert!(errors.contains(Field::Title));

    let title = "\u{1F41B}".repeat(127);
    assert!(validate_create(&json!({ "title": title, "description": "x" })).is_ok());
}

#[test]
fn create_rejects_unknown_status() {
    let errors = validate_create(&json!({
        "title": "Bug A",
        "description": "Steps",
        "status": "REOPENED",
    }))
    .expect_err("unknown status must fail");

    assert_eq!(
        errors.get(Field::Status),
        Some("Invalid enum value. Expected 'OPEN' | 'IN_PROGRESS' | 'CLOSED', received 'REOPENED'")
    );
    assert_eq!(errors.len(), 1);
}

#[test]
fn create_rejects_non_string_fields() {
    let errors = validate_create(&json!({ "title": 7, "description": null }))
        .expect_err("wrong types must fail");

    assert_eq!(errors.get(Field::Title), Some("Expected string, received number"));
    assert_eq!(errors.get(Field::Description), Some("Expected string, received null"));
}

#[test]
fn non_object_input_is_a_form_error() {
    let errors = validate_create(&json!(["title"])).expect_err("arrays are not records");
    assert_eq!(errors.get(Field::Form), Some("Expected object, received array"));
}

#[test]
fn patch_accepts_empty_record() {
    let patch = validate_patch(&json!({})).expect("everything is optional");
    assert!(patch.is_empty());
}

#[test]
fn patch_rejects_empty_assignee_without_status() {
    let errors = validate_patch(&json!({ "assignedToUserId": "" }))
        .expect_err("empty assignee must fail");

    assert_eq!(
        errors.get(Field::AssignedToUserId),
        Some("AssignedToUserId is required.")
    );
    assert!(!errors.contains(Field::Status));
}

#[test]
fn patch_distinguishes_null_and_absent_assignee() {
    let cleared = validate_patch(&json!({ "assignedToUserId": null })).expect("null allowed");
    assert_eq!(cleared.assigned_to_user_id, Some(None));

    let assigned =
        validate_patch(&json!({ "assignedToUserId": "user-1" })).expect("assignee allowed");
    assert_eq!(
        assigned.assigned_to_user_id,
        Some(Some(UserId("user-1".into())))
    );

    let untouched = validate_patch(&json!({ "title": "New" })).expect("title only");
    assert_eq!(untouched.assigned_to_user_id, None);
}

#[test]
fn patch_validates_status_only_when_present() {
    let errors = validate_patch(&json!({ "status": "DONE", "title": "Still fine" }))
        .expect_err("bad status must fail");
    assert_eq!(errors.len(), 1);
    assert!(errors.contains(Field::Status));

    let patch = validate_patch(&json!({ "status": "CLOSED" })).expect("valid status");
    assert_eq!(patch.status, Some(Status::Closed));
}

#[test]
fn patch_keeps_length_rules_for_present_fields() {
    let errors = validate_patch(&json!({ "title": "", "description": "ok" }))
        .expect_err("empty title must fail");
    assert_eq!(errors.get(Field::Title), Some("Title is Required"));
}

#[test]
fn patch_serializes_cleared_assignee_as_null() {
    let patch = PatchIssue {
        status: Some(Status::InProgress),
        assigned_to_user_id: Some(None),
        ..PatchIssue::default()
    };

    let body = serde_json::to_value(&patch).expect("serialize");
    assert_eq!(
        body,
        json!({ "status": "IN_PROGRESS", "assignedToUserId": null })
    );

    let back: PatchIssue = serde_json::from_value(body).expect("deserialize");
    assert_eq!(back, patch);
}

#[test]
fn typed_payloads_recheck_the_same_rules() {
    assert!(CreateIssue::new("Bug A", "Steps").validate().is_ok());

    let errors = CreateIssue::new("", "Steps").validate().expect_err("empty title");
    assert_eq!(errors.get(Field::Title), Some("Title is Required"));

    let patch = PatchIssue {
        assigned_to_user_id: Some(Some(UserId(String::new()))),
        ..PatchIssue::default()
    };
    assert!(patch.validate().is_err());
}

#[test]
fn field_errors_serialize_keyed_by_field_name() {
    let errors = validate_create(&json!({ "title": "" })).expect_err("invalid");
    let body = serde_json::to_value(&errors).expect("serialize");

    assert_eq!(
        body,
        json!({ "title": "Title is Required", "description": "Required" })
    );
    assert_eq!(
        errors.to_string(),
        "title: Title is Required; description: Required"
    );
}

#[test]
fn field_errors_decode_skips_unknown_keys() {
    let errors: FieldErrors = serde_json::from_value(json!({
        "name": "Required",
        "title": "Required",
        "assignedTouserId": "AssignedToUserId is required.",
    }))
    .expect("decode");

    assert_eq!(errors.len(), 2);
    assert_eq!(errors.get(Field::Title), Some("Required"));
    assert_eq!(
        errors.get(Field::AssignedToUserId),
        Some("AssignedToUserId is required.")
    );
}

#[test]
fn api_error_with_unknown_field_keys_still_decodes() {
    let api_error: crate::error::ApiError = serde_json::from_value(json!({
        "code": "validation",
        "message": "bad",
        "fields": { "name": "Required" },
    }))
    .expect("decode");

    assert_eq!(api_error.code, crate::error::ErrorCode::Validation);
    assert_eq!(api_error.message, "bad");
    assert_eq!(api_error.fields, Some(FieldErrors::new()));
}
