//! Workflow document types, loading, and path-list expansion.
//!
//! A workflow is a named, ordered list of tasks (`(id, type, params)`). This
//! crate owns the free-form document shape; task-specific params are
//! projected out of `serde_json::Value` by `fleetbench-engine`.

mod error;
mod paths;

pub use error::{ConfigError, Result};
pub use paths::expand_path_list;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named, ordered sequence of tasks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tasks: Vec<Task>,
}

/// A single typed unit of work within a [`Workflow`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_params")]
    pub params: serde_json::Value,
}

fn default_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Workflow {
    /// Parses a workflow document (YAML or JSON; YAML is a JSON superset).
    pub fn from_str(data: &str) -> Result<Self> {
        let workflow: Workflow = serde_yaml::from_str(data)?;
        workflow.validate()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        Self::from_str(&data)
    }

    fn validate(self) -> Result<Self> {
        if self.name.is_empty() {
            return Err(ConfigError::Validation("workflow: 'name' is required".into()));
        }
        if self.tasks.is_empty() {
            return Err(ConfigError::Validation(
                "workflow: 'tasks' must be non-empty".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for task in &self.tasks {
            if task.id.is_empty() {
                return Err(ConfigError::Validation("task: 'id' is required".into()));
            }
            if task.task_type.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "task {}: 'type' is required",
                    task.id
                )));
            }
            if !seen.insert(task.id.clone()) {
                return Err(ConfigError::Validation(format!(
                    "task {}: duplicate task id",
                    task.id
                )));
            }
        }
        Ok(self)
    }
}

/// Loads every workflow named by a comma-separated, brace-expandable path
/// list. A path that names a directory contributes every `*.yml`/`*.yaml`
/// file directly inside it (non-recursive), matching the CLI's `tasks`/
/// `workflow` flag semantics.
pub fn load_workflows(path_list: &str) -> Result<Vec<Workflow>> {
    let mut workflows = Vec::new();
    for path in expand_path_list(path_list)? {
        let path = Path::new(&path);
        if path.is_dir() {
            let mut entries: Vec<_> = std::fs::read_dir(path)
                .map_err(|e| ConfigError::Io(path.display().to_string(), e))?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("yml") | Some("yaml")
                    )
                })
                .collect();
            entries.sort();
            for entry in entries {
                workflows.push(Workflow::from_file(&entry)?);
            }
        } else {
            workflows.push(Workflow::from_file(path)?);
        }
    }
    Ok(workflows)
}

/// Kubernetes client connection settings, analogous to the original's
/// `pkg/config.KubeConfig`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct KubeClientConfig {
    #[serde(default)]
    pub kubeconfig: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub qps: Option<f32>,
    #[serde(default)]
    pub burst: Option<i32>,
}

/// Cleanup behavior applied by the engine after a workflow run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(with = "humantime_serde_duration", default = "default_cleanup_timeout")]
    pub timeout: std::time::Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: default_cleanup_timeout(),
        }
    }
}

fn default_cleanup_timeout() -> std::time::Duration {
    std::time::Duration::from_secs(5 * 60)
}

/// Minimal duration (de)serialization for config fields expressed as
/// human strings ("5m", "30s"). Kept local rather than pulling in the
/// `humantime` crate for a single field pair.
mod humantime_serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("{}s", d.as_secs()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
        let raw = raw.trim();
        let (num, unit) = raw.split_at(
            raw.find(|c: char| !c.is_ascii_digit() && c != '.')
                .ok_or_else(|| format!("invalid duration {raw:?}"))?,
        );
        let value: f64 = num
            .parse()
            .map_err(|_| format!("invalid duration {raw:?}"))?;
        let secs = match unit {
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            "ms" => value / 1000.0,
            _ => return Err(format!("unsupported duration unit {unit:?}")),
        };
        Ok(Duration::from_secs_f64(secs))
    }
}

pub use humantime_serde_duration::parse_duration;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_workflow() {
        let doc = r#"
name: demo
tasks:
  - id: t1
    type: Sleep
    params:
      duration: 1s
"#;
        let wf = Workflow::from_str(doc).unwrap();
        assert_eq!(wf.name, "demo");
        assert_eq!(wf.tasks.len(), 1);
        assert_eq!(wf.tasks[0].task_type, "Sleep");
    }

    #[test]
    fn rejects_missing_name() {
        let doc = "tasks:\n  - id: t1\n    type: Sleep\n";
        assert!(Workflow::from_str(doc).is_err());
    }

    #[test]
    fn rejects_duplicate_task_id() {
        let doc = r#"
name: demo
tasks:
  - id: t1
    type: Sleep
  - id: t1
    type: Pause
"#;
        assert!(Workflow::from_str(doc).is_err());
    }

    #[test]
    fn rejects_empty_tasks() {
        let doc = "name: demo\ntasks: []\n";
        assert!(Workflow::from_str(doc).is_err());
    }

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(
            parse_duration("2s").unwrap(),
            std::time::Duration::from_secs(2)
        );
        assert_eq!(
            parse_duration("1m").unwrap(),
            std::time::Duration::from_secs(60)
        );
        assert_eq!(
            parse_duration("500ms").unwrap(),
            std::time::Duration::from_millis(500)
        );
    }
}
