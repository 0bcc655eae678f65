//! YAML playbook: which workflow to run, in which state, with which entries.
//!
//! ```yaml
//! workflow: tags
//! state: merged
//! config_verify: true
//! device_tag_update_batch: 100
//! config:
//!   - tag:
//!       name: Campus-Edge
//! ```

use crate::error::RunnerError;
use controller_client::ControllerClientTrait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use workflow_engine::{
    run_access_point_workflow, run_sda_host_port_workflow, run_tags_workflow, AccessPointEntry, OutcomeReport,
    RunOptions, SdaHostPortEntry, State, TagsEntry,
};

/// Workflow selected by a playbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    AccessPoint,
    SdaHostPort,
    Tags,
}

/// Parsed playbook
#[derive(Debug, Clone, Deserialize)]
pub struct Playbook {
    pub workflow: WorkflowKind,
    #[serde(default)]
    pub state: State,
    #[serde(flatten)]
    pub options: RunOptions,
    pub config: Vec<serde_yaml::Value>,
}

impl Playbook {
    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let source = std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn parse(source: &str) -> Result<Self, RunnerError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Typed config entries; the error names the first bad entry
    fn entries<T: DeserializeOwned>(&self) -> Result<Vec<T>, RunnerError> {
        self.config
            .iter()
            .enumerate()
            .map(|(index, value)| {
                serde_yaml::from_value(value.clone())
                    .map_err(|e| RunnerError::Playbook(format!("config entry {}: {}", index + 1, e)))
            })
            .collect()
    }

    /// Run the selected workflow
    pub async fn run(&self, client: &dyn ControllerClientTrait) -> Result<OutcomeReport, RunnerError> {
        info!(
            "Running {:?} workflow with {} entries in {} state",
            self.workflow,
            self.config.len(),
            self.state
        );
        let report = match self.workflow {
            WorkflowKind::AccessPoint => {
                let entries: Vec<AccessPointEntry> = self.entries()?;
                run_access_point_workflow(client, &entries, self.state, &self.options).await
            }
            WorkflowKind::SdaHostPort => {
                let entries: Vec<SdaHostPortEntry> = self.entries()?;
                run_sda_host_port_workflow(client, &entries, self.state, &self.options).await
            }
            WorkflowKind::Tags => {
                let entries: Vec<TagsEntry> = self.entries()?;
                run_tags_workflow(client, &entries, self.state, &self.options).await
            }
        };
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller_client::MockControllerClient;

    const TAGS: &str = r#"
workflow: tags
state: merged
poll_interval: 1
settle_interval: 0
device_tag_update_batch: 50
config:
  - tag:
      name: Campus-Edge
      description: Edge switches
"#;

    #[test]
    fn test_options_are_read_next_to_the_workflow() {
        let playbook = Playbook::parse(TAGS).unwrap();
        assert_eq!(playbook.workflow, WorkflowKind::Tags);
        assert_eq!(playbook.state, State::Merged);
        assert_eq!(playbook.options.device_tag_update_batch.get(), 50);
        assert_eq!(playbook.options.task_timeout, 1200);
        assert_eq!(playbook.config.len(), 1);
    }

    #[test]
    fn test_bad_playbooks() {
        assert!(Playbook::parse("workflow: wlan\nconfig: []\n").is_err());
        assert!(Playbook::parse("workflow: tags\nstate: replaced\nconfig: []\n").is_err());
        assert!(Playbook::parse("workflow: tags\ndevice_tag_read_batch: 0\nconfig: []\n").is_err());
    }

    #[tokio::test]
    async fn test_entry_schema_errors_name_the_entry() {
        let playbook = Playbook::parse("workflow: sda_host_port\nconfig:\n  - ip_address: 10.0.0.1\n    unknown: 1\n").unwrap();
        let mock = MockControllerClient::new("https://mock");
        let err = playbook.run(&mock).await.unwrap_err();
        assert!(err.to_string().contains("config entry 1"));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_selected_workflow() {
        let playbook = Playbook::parse(TAGS).unwrap();
        let mock = MockControllerClient::new("https://mock");

        let report = playbook.run(&mock).await.unwrap();

        assert!(report.changed);
        assert!(!report.failed);
        assert_eq!(mock.writes_for("create_tag").len(), 1);
    }
}
