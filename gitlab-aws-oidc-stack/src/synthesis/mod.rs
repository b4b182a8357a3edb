//! Policy synthesis (deterministic trust and permission policy generation)

pub mod policy_builder;

pub use policy_builder::{
    branch_subject_pattern, branch_subject_patterns, build_permission_policy, build_trust_policy,
    ecr_repository_arn, subject_claim_key, DEPLOYMENT_ROLE_PATTERNS, ECR_AUTH_ACTION,
    ECR_PUSH_ACTIONS, EXCLUDED_ROLE_PATTERN, WEB_IDENTITY_ACTION,
};
