//! Issue form state machine.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──ok──▶ Navigated
//!  ▲                  │    │
//!  └────cancel────────┘    └─err─▶ Failed ──submit──▶ Submitting
//! ```
//!
//! Validation runs before any request; a failing record stays in place with
//! per-field messages. At most one request is in flight per form.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde_json::{Map, Value};
use shared::{
    domain::{Issue, IssueId, Status},
    schema::{validate_create, validate_patch, CreateIssue, Field, FieldErrors, PatchIssue},
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    api::IssueApi,
    error::ClientError,
    navigation::{Navigator, ISSUE_LIST_ROUTE},
};

pub const GENERIC_SUBMIT_ERROR: &str = "An unexpected Error Occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
    /// Idle again after a failed request; the error banner is showing.
    Failed,
    Navigated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFormValues {
    pub title: String,
    pub description: String,
    pub status: Option<Status>,
}

impl IssueFormValues {
    fn to_record(&self) -> Value {
        let mut record = Map::new();
        record.insert(
            Field::Title.as_str().to_string(),
            Value::String(self.title.clone()),
        );
        record.insert(
            Field::Description.as_str().to_string(),
            Value::String(self.description.clone()),
        );
        if let Some(status) = self.status {
            record.insert(
                Field::Status.as_str().to_string(),
                Value::String(status.as_str().to_string()),
            );
        }
        Value::Object(record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitRequest {
    Create(CreateIssue),
    Update { issue_id: IssueId, patch: PatchIssue },
}

impl SubmitRequest {
    pub async fn send(&self, api: &dyn IssueApi) -> Result<Issue, ClientError> {
        match self {
            SubmitRequest::Create(payload) => api.create_issue(payload).await,
            SubmitRequest::Update { issue_id, patch } => api.update_issue(*issue_id, patch).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("the form has already been submitted")]
    AlreadyNavigated,
    #[error("invalid fields: {0}")]
    Invalid(FieldErrors),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Navigated { issue: Issue, route: &'static str },
    Failed { banner: String },
    Cancelled,
}

/// Handle to a submission running on the tokio runtime.
///
/// Dropping the task aborts the request and frees the form for another
/// attempt without navigating.
#[must_use = "a dropped SubmitTask aborts its request; pass it to IssueForm::finish"]
pub struct SubmitTask {
    handle: Option<JoinHandle<Result<Issue, ClientError>>>,
    cancelled: AtomicBool,
    dropped: Arc<AtomicBool>,
}

impl SubmitTask {
    /// Aborts the request. [`IssueForm::finish`] then reports
    /// [`SubmitOutcome::Cancelled`] and returns the form to idle, even when
    /// the response had already arrived.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for SubmitTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            self.dropped.store(true, Ordering::SeqCst);
            debug!("form: submission task dropped before finish");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOption {
    pub value: Status,
    pub label: &'static str,
}

impl From<Status> for StatusOption {
    fn from(value: Status) -> Self {
        Self {
            value,
            label: value.label(),
        }
    }
}

/// Render snapshot of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub title: String,
    pub description: String,
    pub status: Option<Status>,
    pub field_errors: FieldErrors,
    pub banner: Option<String>,
    pub submitting: bool,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
    /// Empty unless an existing issue is being edited.
    pub status_options: Vec<StatusOption>,
}

pub struct IssueForm {
    api: Arc<dyn IssueApi>,
    navigator: Arc<dyn Navigator>,
    existing: Option<Issue>,
    values: IssueFormValues,
    field_errors: FieldErrors,
    banner: Option<String>,
    state: SubmitState,
    /// Set by the spawned task's handle when it is dropped unfinished.
    task_dropped: Option<Arc<AtomicBool>>,
}

impl IssueForm {
    pub fn new(api: Arc<dyn IssueApi>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            navigator,
            existing: None,
            values: IssueFormValues::default(),
            field_errors: FieldErrors::new(),
            banner: None,
            state: SubmitState::Idle,
            task_dropped: None,
        }
    }

    pub fn edit(issue: Issue, api: Arc<dyn IssueApi>, navigator: Arc<dyn Navigator>) -> Self {
        let values = IssueFormValues {
            title: issue.title.clone(),
            description: issue.description.clone(),
            status: Some(issue.status),
        };
        Self {
            existing: Some(issue),
            values,
            ..Self::new(api, navigator)
        }
    }

    pub fn is_editing(&self) -> bool {
        self.existing.is_some()
    }

    pub fn existing(&self) -> Option<&Issue> {
        self.existing.as_ref()
    }

    pub fn state(&self) -> SubmitState {
        match self.state {
            SubmitState::Submitting if self.spawned_task_dropped() => SubmitState::Idle,
            state => state,
        }
    }

    fn spawned_task_dropped(&self) -> bool {
        self.task_dropped
            .as_ref()
            .is_some_and(|dropped| dropped.load(Ordering::SeqCst))
    }

    /// Settles a `Submitting` state whose spawned task was dropped.
    fn reclaim_dropped_task(&mut self) {
        if self.state == SubmitState::Submitting && self.spawned_task_dropped() {
            info!("form: submission abandoned");
            self.state = SubmitState::Idle;
        }
        if self.state != SubmitState::Submitting {
            self.task_dropped = None;
        }
    }

    pub fn values(&self) -> &IssueFormValues {
        &self.values
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn field_error(&self, field: Field) -> Option<&str> {
        self.field_errors.get(field)
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.values.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.values.description = description.into();
    }

    /// Only applies when editing; new issues always start open.
    pub fn set_status(&mut self, status: Status) {
        if !self.is_editing() {
            debug!(%status, "form: status is not editable on new issues");
            return;
        }
        self.values.status = Some(status);
    }

    pub fn submit_enabled(&self) -> bool {
        matches!(self.state(), SubmitState::Idle | SubmitState::Failed)
    }

    pub fn submit_label(&self) -> &'static str {
        if self.state() == SubmitState::Submitting {
            "Please Wait"
        } else if self.is_editing() {
            "Update Issue"
        } else {
            "Submit New Issue"
        }
    }

    pub fn view(&self) -> FormView {
        let status_options = if self.is_editing() {
            Status::ALL.into_iter().map(StatusOption::from).collect()
        } else {
            Vec::new()
        };
        FormView {
            title: self.values.title.clone(),
            description: self.values.description.clone(),
            status: self.values.status,
            field_errors: self.field_errors.clone(),
            banner: self.banner.clone(),
            submitting: self.state() == SubmitState::Submitting,
            submit_enabled: self.submit_enabled(),
            submit_label: self.submit_label(),
            status_options,
        }
    }

    /// Validates the current values and, when they pass, moves to
    /// `Submitting` and returns the request to send.
    ///
    /// A new attempt clears the banner left by the previous failure.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, SubmitRejected> {
        self.reclaim_dropped_task();
        match self.state {
            SubmitState::Submitting => return Err(SubmitRejected::AlreadySubmitting),
            SubmitState::Navigated => return Err(SubmitRejected::AlreadyNavigated),
            SubmitState::Idle | SubmitState::Failed => {}
        }

        let record = self.values.to_record();
        let validated = match &self.existing {
            Some(issue) => validate_patch(&record).map(|patch| SubmitRequest::Update {
                issue_id: issue.id,
                patch,
            }),
            None => validate_create(&record).map(SubmitRequest::Create),
        };

        match validated {
            Ok(request) => {
                self.field_errors.clear();
                self.banner = None;
                self.state = SubmitState::Submitting;
                debug!(editing = self.is_editing(), "form: submitting");
                Ok(request)
            }
            Err(errors) => {
                debug!(fields = %errors, "form: validation failed");
                self.field_errors = errors.clone();
                Err(SubmitRejected::Invalid(errors))
            }
        }
    }

    /// Applies the result of the in-flight request.
    pub fn complete(&mut self, result: Result<Issue, ClientError>) -> SubmitOutcome {
        self.reclaim_dropped_task();
        if self.state != SubmitState::Submitting {
            debug!(state = ?self.state, "form: ignoring result without pending submission");
            return SubmitOutcome::Cancelled;
        }

        match result {
            Ok(issue) => {
                self.state = SubmitState::Navigated;
                self.navigator.push(ISSUE_LIST_ROUTE);
                self.navigator.refresh();
                info!(issue_id = issue.id.0, route = ISSUE_LIST_ROUTE, "form: submitted");
                SubmitOutcome::Navigated {
                    issue,
                    route: ISSUE_LIST_ROUTE,
                }
            }
            Err(err) => {
                warn!(error = %err, "form: submission failed");
                self.state = SubmitState::Failed;
                self.banner = Some(GENERIC_SUBMIT_ERROR.to_string());
                SubmitOutcome::Failed {
                    banner: GENERIC_SUBMIT_ERROR.to_string(),
                }
            }
        }
    }

    /// Abandons the in-flight submission without navigating.
    pub fn cancel(&mut self) -> SubmitOutcome {
        if self.state == SubmitState::Submitting {
            self.state = SubmitState::Idle;
            info!("form: submission cancelled");
        }
        self.task_dropped = None;
        SubmitOutcome::Cancelled
    }

    /// Validates, sends exactly one request and applies its result.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, SubmitRejected> {
        let request = self.begin_submit()?;
        let result = request.send(self.api.as_ref()).await;
        Ok(self.complete(result))
    }

    /// Like [`IssueForm::submit`], but the request runs as its own task so
    /// the caller can keep rendering or cancel it.
    #[must_use = "a dropped SubmitTask aborts its request"]
    pub fn spawn_submit(&mut self) -> Result<SubmitTask, SubmitRejected> {
        let request = self.begin_submit()?;
        let api = Arc::clone(&self.api);
        let handle = tokio::spawn(async move { request.send(api.as_ref()).await });
        let dropped = Arc::new(AtomicBool::new(false));
        self.task_dropped = Some(Arc::clone(&dropped));
        Ok(SubmitTask {
            handle: Some(handle),
            cancelled: AtomicBool::new(false),
            dropped,
        })
    }

    /// Waits for a spawned submission and applies its result. A task that
    /// was cancelled always settles as [`SubmitOutcome::Cancelled`].
    pub async fn finish(&mut self, mut task: SubmitTask) -> SubmitOutcome {
        let Some(handle) = task.handle.take() else {
            return self.cancel();
        };
        let joined = handle.await;
        self.task_dropped = None;
        if task.is_cancelled() {
            return self.cancel();
        }
        match joined {
            Ok(result) => self.complete(result),
            Err(err) if err.is_cancelled() => self.cancel(),
            Err(err) => self.complete(Err(ClientError::TaskAborted(err.to_string()))),
        }
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
