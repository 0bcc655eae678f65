//! Environment configuration of the runner.

use crate::error::RunnerError;
use std::path::PathBuf;

/// Connection settings and playbook location
#[derive(Clone)]
pub struct Settings {
    pub controller_url: String,
    pub username: String,
    pub password: String,
    pub verify_tls: bool,
    pub playbook: PathBuf,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("controller_url", &self.controller_url)
            .field("username", &self.username)
            .field("verify_tls", &self.verify_tls)
            .field("playbook", &self.playbook)
            .finish_non_exhaustive()
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, RunnerError> {
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RunnerError::InvalidConfig(format!("{} environment variable is required", name)))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, RunnerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(RunnerError::InvalidConfig(format!("{} must be true or false, got '{}'", name, other))),
    }
}

impl Settings {
    /// Read settings from the process environment; `args` are the CLI arguments after the program name
    pub fn from_env(args: &[String]) -> Result<Self, RunnerError> {
        Self::from_lookup(|name| std::env::var(name).ok(), args)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, args: &[String]) -> Result<Self, RunnerError> {
        let controller_url = required(&lookup, "CONTROLLER_URL")?;
        let username = required(&lookup, "CONTROLLER_USERNAME")?;
        let password = required(&lookup, "CONTROLLER_PASSWORD")?;
        let verify_tls = match lookup("CONTROLLER_VERIFY_TLS") {
            Some(value) => parse_bool("CONTROLLER_VERIFY_TLS", &value)?,
            None => true,
        };
        let playbook = args
            .first()
            .cloned()
            .or_else(|| lookup("PLAYBOOK"))
            .map(PathBuf::from)
            .ok_or_else(|| {
                RunnerError::InvalidConfig("playbook path is required as first argument or PLAYBOOK".to_string())
            })?;
        Ok(Self {
            controller_url,
            username,
            password,
            verify_tls,
            playbook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("CONTROLLER_URL", "https://controller.example.com"),
        ("CONTROLLER_USERNAME", "admin"),
        ("CONTROLLER_PASSWORD", "secret"),
    ];

    #[test]
    fn test_argument_wins_over_env_playbook() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PLAYBOOK", "/etc/fleet/env.yaml"));
        let settings = Settings::from_lookup(env(&pairs), &["tags.yaml".to_string()]).unwrap();
        assert_eq!(settings.playbook, PathBuf::from("tags.yaml"));
        assert!(settings.verify_tls);

        let settings = Settings::from_lookup(env(&pairs), &[]).unwrap();
        assert_eq!(settings.playbook, PathBuf::from("/etc/fleet/env.yaml"));
    }

    #[test]
    fn test_missing_and_malformed_values() {
        let err = Settings::from_lookup(env(&BASE[..2]), &["p.yaml".to_string()]).unwrap_err();
        assert!(err.to_string().contains("CONTROLLER_PASSWORD"));

        let mut pairs = BASE.to_vec();
        pairs.push(("CONTROLLER_VERIFY_TLS", "maybe"));
        assert!(Settings::from_lookup(env(&pairs), &["p.yaml".to_string()]).is_err());

        assert!(Settings::from_lookup(env(&BASE), &[]).is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let settings = Settings::from_lookup(env(&BASE), &["p.yaml".to_string()]).unwrap();
        assert!(!format!("{:?}", settings).contains("secret"));
    }
}
