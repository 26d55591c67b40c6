use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    AuthProvider, HttpIssueClient, IssueForm, Session, SessionContext, SubmitOutcome,
    SubmitRejected, TracingNavigator,
};
use shared::domain::{Issue, IssueId, Status};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser, Debug)]
#[command(name = "issues", about = "Create and edit tracker issues")]
struct Cli {
    /// Base URL of the issue tracker, e.g. http://127.0.0.1:3000
    #[arg(long, global = true)]
    server_url: Option<String>,
    /// Config file; defaults to ./issues.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a new issue.
    Create(IssueFields),
    /// Update an existing issue.
    Edit {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        fields: IssueFields,
        #[arg(long, value_parser = parse_status)]
        status: Status,
    },
}

#[derive(Args, Debug)]
struct IssueFields {
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, conflicts_with = "description_file")]
    description: Option<String>,
    /// Read the markdown description from a file.
    #[arg(long)]
    description_file: Option<PathBuf>,
}

impl IssueFields {
    fn description(&self) -> Result<String> {
        match (&self.description, &self.description_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("failed to read description from '{}'", path.display())),
            (None, None) => Ok(String::new()),
        }
    }
}

fn parse_status(raw: &str) -> Result<Status, String> {
    raw.trim()
        .to_ascii_uppercase()
        .replace(['-', ' '], "_")
        .parse::<Status>()
        .map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    let server_url = config::normalize_server_url(&settings.server_url)?;

    let provider = AuthProvider::new(SessionContext::new());
    provider
        .wrap(|session| run(cli.command, server_url, settings.session_token, session))
        .await
}

async fn run(
    command: Command,
    server_url: String,
    session_token: Option<String>,
    session: SessionContext,
) -> Result<()> {
    let http = reqwest::Client::new();
    match session_token {
        Some(token) => session.set_authenticated(Session::from_token(token)).await,
        None => {
            if let Err(err) = session.refresh(&http, &server_url).await {
                warn!("session: could not load session: {err}");
                session.sign_out().await;
            }
        }
    }
    if !session.is_authenticated().await {
        warn!("session: not signed in; the server may reject the request");
    }

    let api = Arc::new(HttpIssueClient::with_http_client(http, &server_url, session));
    let navigator = Arc::new(TracingNavigator);

    let mut form = match command {
        Command::Create(fields) => {
            let mut form = IssueForm::new(api, navigator);
            form.set_title(fields.title.clone());
            form.set_description(fields.description()?);
            form
        }
        Command::Edit { id, fields, status } => {
            let issue = Issue {
                id: IssueId(id),
                title: fields.title.clone(),
                description: fields.description()?,
                status,
                assigned_to_user_id: None,
                created_at: None,
                updated_at: None,
            };
            IssueForm::edit(issue, api, navigator)
        }
    };
    let verb = if form.is_editing() { "Updated" } else { "Created" };

    match form.submit().await {
        Ok(SubmitOutcome::Navigated { issue, route }) => {
            info!(issue_id = issue.id.0, route, "issues: done");
            println!(
                "{verb} issue #{}: {} [{}]",
                issue.id,
                issue.title,
                issue.status.label()
            );
            Ok(())
        }
        Ok(SubmitOutcome::Failed { banner }) => bail!(banner),
        Ok(SubmitOutcome::Cancelled) => bail!("submission cancelled"),
        Err(SubmitRejected::Invalid(errors)) => {
            for (field, message) in errors.iter() {
                eprintln!("{field}: {message}");
            }
            bail!("issue not submitted: {} invalid field(s)", errors.len())
        }
        Err(other) => Err(other.into()),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
