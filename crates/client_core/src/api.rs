use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use shared::{
    domain::{Issue, IssueId},
    error::ApiError,
    protocol::{issue_path, ISSUES_PATH},
    schema::{CreateIssue, PatchIssue},
};
use tracing::{info, warn};

use crate::{error::ClientError, session::SessionContext};

/// Remote operations the issue form depends on.
#[async_trait]
pub trait IssueApi: Send + Sync {
    async fn create_issue(&self, payload: &CreateIssue) -> Result<Issue, ClientError>;
    async fn update_issue(
        &self,
        issue_id: IssueId,
        payload: &PatchIssue,
    ) -> Result<Issue, ClientError>;
}

pub struct HttpIssueClient {
    http: Client,
    server_url: String,
    session: SessionContext,
}

impl HttpIssueClient {
    pub fn new(server_url: impl Into<String>, session: SessionContext) -> Self {
        Self::with_http_client(Client::new(), server_url, session)
    }

    pub fn with_http_client(
        http: Client,
        server_url: impl Into<String>,
        session: SessionContext,
    ) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            server_url,
            session,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    async fn authorized(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .http
            .request(method, format!("{}{path}", self.server_url));
        match self.session.bearer_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_issue<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: String,
        body: &B,
    ) -> Result<Issue, ClientError> {
        let res = self
            .authorized(method, &path)
            .await
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                route: path.clone(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            let api_error = res.json::<ApiError>().await.ok();
            warn!(route = %path, %status, "issues: request rejected");
            return Err(ClientError::Status {
                route: path,
                status,
                api_error,
            });
        }

        res.json::<Issue>()
            .await
            .map_err(|source| ClientError::Decode {
                route: path,
                source,
            })
    }
}

#[async_trait]
impl IssueApi for HttpIssueClient {
    async fn create_issue(&self, payload: &CreateIssue) -> Result<Issue, ClientError> {
        let issue = self
            .send_issue(Method::POST, ISSUES_PATH.to_string(), payload)
            .await?;
        info!(issue_id = issue.id.0, "issues: created");
        Ok(issue)
    }

    async fn update_issue(
        &self,
        issue_id: IssueId,
        payload: &PatchIssue,
    ) -> Result<Issue, ClientError> {
        let issue = self
            .send_issue(Method::PATCH, issue_path(issue_id), payload)
            .await?;
        info!(issue_id = issue_id.0, status = %issue.status, "issues: updated");
        Ok(issue)
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
