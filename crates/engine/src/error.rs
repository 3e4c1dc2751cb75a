//! Error type shared by task construction and execution, following the
//! teacher's `tasks::types::Error` shape: a flat enum of `#[from]`-wrapped
//! collaborator errors plus a handful of named validation variants.

#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("config error: {0}")]
    Config(#[from] fleetbench_config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("template parse error: {0}")]
    TemplateParse(#[from] handlebars::TemplateError),

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("task {0}: {1}")]
    Validation(String, String),

    #[error("task {0}: unreferenced task id {1}")]
    UnreferencedTaskId(String, String),

    #[error("registry: duplicate task id {0}")]
    DuplicateTaskId(String),

    #[error("registry: missing task id {0}")]
    MissingTaskId(String),

    #[error("task {0}: deadline exceeded, outstanding: {1:?}")]
    DeadlineExceeded(String, Vec<String>),

    #[error("task {0}: assertion failed: {1}")]
    Assertion(String, String),

    #[error("task {0}: unsupported task type {1:?}")]
    UnsupportedTaskType(String, String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
