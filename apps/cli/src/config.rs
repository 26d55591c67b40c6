use std::{fs, io::ErrorKind, path::Path};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "issues.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub session_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".into(),
            session_token: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    session_token: Option<String>,
}

/// Defaults, then the config file, then environment variables.
///
/// A missing file is only an error when its path was given explicitly.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, explicit) = match config_path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg = parse_file_settings(&raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
            apply_file(&mut settings, file_cfg);
        }
        Err(err) if err.kind() == ErrorKind::NotFound && !explicit => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn parse_file_settings(raw: &str) -> anyhow::Result<FileSettings> {
    Ok(toml::from_str(raw)?)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.session_token {
        settings.session_token = Some(v);
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ISSUES_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("ISSUES_SESSION_TOKEN") {
        settings.session_token = Some(v);
    }
    if let Some(v) = lookup("APP__SESSION_TOKEN") {
        settings.session_token = Some(v);
    }

    if settings
        .session_token
        .as_deref()
        .is_some_and(|token| token.trim().is_empty())
    {
        settings.session_token = None;
    }
}

/// Checks that the server URL is an absolute http(s) URL and strips any
/// trailing slash.
pub fn normalize_server_url(raw: &str) -> anyhow::Result<String> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid server url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("server url '{raw}' must use http or https");
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_and_app_prefix_wins() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            parse_file_settings("server_url = \"http://file:3000\"\nsession_token = \"file\"")
                .expect("parse"),
        );
        assert_eq!(settings.server_url, "http://file:3000");

        apply_env(
            &mut settings,
            env_from(&[
                ("ISSUES_SERVER_URL", "http://env:3000"),
                ("APP__SERVER_URL", "http://app:3000"),
                ("ISSUES_SESSION_TOKEN", "env-token"),
            ]),
        );

        assert_eq!(settings.server_url, "http://app:3000");
        assert_eq!(settings.session_token.as_deref(), Some("env-token"));
    }

    #[test]
    fn blank_token_means_no_token() {
        let mut settings = Settings::default();
        apply_env(&mut settings, env_from(&[("ISSUES_SESSION_TOKEN", "  ")]));
        assert_eq!(settings.session_token, None);
    }

    #[test]
    fn rejects_mistyped_values_in_file() {
        assert!(parse_file_settings("server_url = 5").is_err());
    }

    #[test]
    fn normalizes_server_url() {
        assert_eq!(
            normalize_server_url("http://localhost:3000/").expect("valid"),
            "http://localhost:3000"
        );
        assert_eq!(
            normalize_server_url(" https://issues.example.com/app/ ").expect("valid"),
            "https://issues.example.com/app"
        );
        assert!(normalize_server_url("ftp://example.com").is_err());
        assert!(normalize_server_url("not a url").is_err());
    }

    #[test]
    fn explicit_missing_config_file_is_an_error() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let missing = env::temp_dir().join(format!("issues_cli_missing_{suffix}.toml"));

        let err = load_settings(Some(missing.as_path())).expect_err("missing explicit file");
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn reads_explicit_config_file() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("issues_cli_config_{suffix}.toml"));
        fs::write(&path, "session_token = \"from-file\"\n").expect("write config");

        let settings = load_settings(Some(path.as_path())).expect("load");
        fs::remove_file(&path).expect("cleanup");

        if env::var("ISSUES_SESSION_TOKEN").is_err() && env::var("APP__SESSION_TOKEN").is_err() {
            assert_eq!(settings.session_token.as_deref(), Some("from-file"));
        }
    }
}
