//! This crate provides the synthesis logic for the GitLab OIDC federation stack:
//! - Stack configuration loading (TOML)
//! - Trust policy and permission policy synthesis
//! - CloudFormation template generation with synthesis-time validation
//! - Template assertions for testing synthesized templates
//!

pub mod assertions;
mod config;
mod error;
mod stack;
mod synthesis;
pub mod template;
mod types;

// Re-exports for a small, focused public API
pub use config::{Environment, StackConfiguration, DEFAULT_IMAGE_REPOSITORY, DEFAULT_STACK_NAME};
pub use error::{StackError, StackResult};
pub use stack::{
    AssumableRole, FederationProvider, GitlabOidcStack, POLICY_LOGICAL_ID, PROVIDER_LOGICAL_ID,
    ROLE_ARN_OUTPUT, ROLE_LOGICAL_ID,
};
pub use synthesis::{
    branch_subject_pattern, branch_subject_patterns, build_permission_policy, build_trust_policy,
    ecr_repository_arn, subject_claim_key, DEPLOYMENT_ROLE_PATTERNS, ECR_AUTH_ACTION,
    ECR_PUSH_ACTIONS, EXCLUDED_ROLE_PATTERN, WEB_IDENTITY_ACTION,
};
pub use template::Template;
pub use types::{
    ActionType, ConditionBlock, Effect, PolicyDocument, Principal, ResourceType, Statement,
    POLICY_VERSION,
};
