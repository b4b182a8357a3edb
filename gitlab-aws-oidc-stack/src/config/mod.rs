//! Stack configuration parsing and management.
//!
//! The configuration is a TOML file describing which GitLab instance to trust,
//! which repository and branches may assume the pipeline role, and where the
//! stack is deployed.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StackError, StackResult};

pub const DEFAULT_STACK_NAME: &str = "GitlabCICDIdentityStack";
pub const DEFAULT_IMAGE_REPOSITORY: &str = "dbt-run";

/// Input of the stack: everything the synthesized template is derived from.
///
/// Scalar fields come before the `env` and `tags` tables so the struct
/// serializes back to valid TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfiguration {
    /// Identifier of the stack in the deployment engine.
    #[serde(default = "default_stack_name")]
    pub stack_name: String,

    /// Used to derive the role name `gitlab-oidc-<project_name>`.
    pub project_name: String,

    /// Full repository path, e.g. `group/subgroup/project`.
    pub allowed_repo_to_push: String,

    /// Branches whose pipelines may assume the role. `*` is allowed but is taken
    /// as a literal token.
    pub allowed_branches_to_push: Vec<String>,

    /// GitLab hostname without `https://` and without a trailing slash.
    pub gitlab_host: String,

    /// SHA-1 fingerprints of the issuer's TLS certificate chain.
    #[serde(default)]
    pub thumbprints: Vec<String>,

    /// ECR repository the pipeline may push images to.
    #[serde(default = "default_image_repository")]
    pub image_repository: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub env: Environment,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Target account and region. Unset values are resolved by CloudFormation at deploy time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

fn default_stack_name() -> String {
    DEFAULT_STACK_NAME.to_string()
}

fn default_image_repository() -> String {
    DEFAULT_IMAGE_REPOSITORY.to_string()
}

impl StackConfiguration {
    /// Configuration with the required fields set and defaults for everything else
    pub fn new(
        project_name: impl Into<String>,
        allowed_repo_to_push: impl Into<String>,
        allowed_branches_to_push: Vec<String>,
        gitlab_host: impl Into<String>,
    ) -> Self {
        Self {
            stack_name: default_stack_name(),
            project_name: project_name.into(),
            allowed_repo_to_push: allowed_repo_to_push.into(),
            allowed_branches_to_push,
            gitlab_host: gitlab_host.into(),
            thumbprints: Vec::new(),
            image_repository: default_image_repository(),
            description: None,
            env: Environment::default(),
            tags: BTreeMap::new(),
        }
    }

    /// Configuration written by `init`, matching the deployment this stack was built for
    pub fn sample() -> Self {
        let project_name = "xw-batch-deployment";
        let mut config = Self::new(
            project_name,
            "engineering/data-engineering/xw-data-toolkit",
            vec!["main".to_string()],
            "gitlab.kreuzwerker.de",
        );
        config.thumbprints = vec!["933c6ddee95c9c41a40f9f50493d82be03ad87bf".to_string()];
        config.env.region = Some("eu-central-1".to_string());
        config
            .tags
            .insert("project".to_string(), project_name.to_string());
        config.tags.insert(
            "repoLink".to_string(),
            "https://gitlab.kreuzwerker.de/engineering/data-engineering/xw-data-toolkit"
                .to_string(),
        );
        config
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> StackResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StackError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            StackError::Config(message) => {
                StackError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> StackResult<Self> {
        toml::from_str(content).map_err(|e| StackError::config(format!("Invalid TOML: {e}")))
    }

    /// Serialize configuration to TOML.
    pub fn to_toml(&self) -> StackResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| StackError::config(format!("Failed to serialize configuration: {e}")))
    }
}
