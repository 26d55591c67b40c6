//! Client-side layer of the issue tracker: session context, the issues API
//! client and the create/edit issue form.

pub mod api;
pub mod error;
pub mod form;
pub mod navigation;
pub mod session;

pub use api::{HttpIssueClient, IssueApi};
pub use error::ClientError;
pub use form::{
    FormView, IssueForm, IssueFormValues, StatusOption, SubmitOutcome, SubmitRejected,
    SubmitRequest, SubmitState, SubmitTask, GENERIC_SUBMIT_ERROR,
};
pub use navigation::{Navigator, TracingNavigator, ISSUE_LIST_ROUTE};
pub use session::{AuthProvider, Session, SessionContext, SessionStatus};
