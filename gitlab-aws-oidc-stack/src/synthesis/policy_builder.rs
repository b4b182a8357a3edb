//! Builders for the role's trust policy and its permission policy
//!
//! Subject patterns follow the `sub` claim format GitLab puts into CI job ID
//! tokens, see <https://docs.gitlab.com/ee/ci/cloud_services/aws/>.

use log::debug;
use std::collections::BTreeMap;

use crate::template::{CfnValue, PseudoParameter};
use crate::types::{ConditionBlock, PolicyDocument, Principal, Statement};

pub const WEB_IDENTITY_ACTION: &str = "sts:AssumeRoleWithWebIdentity";

/// CDK bootstrap roles a pipeline needs for `cdk diff` / `cdk deploy`
pub const DEPLOYMENT_ROLE_PATTERNS: [&str; 4] = [
    "arn:aws:iam::*:role/cdk-*-lookup-role-*",
    "arn:aws:iam::*:role/cdk-*-image-publishing-role-*",
    "arn:aws:iam::*:role/cdk-*-file-publishing-role-*",
    "arn:aws:iam::*:role/cdk-*-deploy-role-*",
];

/// The CloudFormation execution role has administrator access and must never be
/// assumable from a pipeline.
pub const EXCLUDED_ROLE_PATTERN: &str = "arn:aws:iam::*:role/cdk-*-cfn-exec-role-*";

/// Actions needed to push an image, see
/// <https://docs.aws.amazon.com/AmazonECR/latest/userguide/image-push.html>
pub const ECR_PUSH_ACTIONS: [&str; 5] = [
    "ecr:CompleteLayerUpload",
    "ecr:UploadLayerPart",
    "ecr:InitiateLayerUpload",
    "ecr:BatchCheckLayerAvailability",
    "ecr:PutImage",
];

/// Does not support resource-level permissions, so it is granted on `*`.
pub const ECR_AUTH_ACTION: &str = "ecr:GetAuthorizationToken";

/// Subject claim value GitLab issues for a pipeline on `branch` of `repo`
pub fn branch_subject_pattern(repo: &str, branch: &str) -> String {
    format!("project_path:{repo}:ref_type:branch:ref:{branch}")
}

/// One subject pattern per branch, in the order the branches were given.
///
/// Branches are taken literally; a `*` branch stays `*`.
pub fn branch_subject_patterns(repo: &str, branches: &[String]) -> Vec<String> {
    let patterns: Vec<String> = branches
        .iter()
        .map(|branch| branch_subject_pattern(repo, branch))
        .collect();
    debug!("Trusted subject patterns for {}: {:?}", repo, patterns);
    patterns
}

/// Condition key holding the token's subject, e.g. `gitlab.example.com:sub`
pub fn subject_claim_key(host: &str) -> String {
    format!("{host}:sub")
}

/// Trust policy letting tokens from `provider` assume the role when their subject
/// exactly matches one of `subjects`
pub fn build_trust_policy(provider: CfnValue, host: &str, subjects: Vec<String>) -> PolicyDocument {
    let mut string_equals = BTreeMap::new();
    string_equals.insert(subject_claim_key(host), subjects);

    let mut condition: ConditionBlock = BTreeMap::new();
    condition.insert("StringEquals".to_string(), string_equals);

    PolicyDocument::new(vec![Statement::allow(WEB_IDENTITY_ACTION)
        .with_principal(Principal {
            federated: provider,
        })
        .with_condition(condition)])
}

/// ARN of the image repository, with unknown region or account left to CloudFormation
pub fn ecr_repository_arn(
    region: Option<&str>,
    account: Option<&str>,
    repository: &str,
) -> CfnValue {
    let region = region.map_or_else(|| CfnValue::pseudo(PseudoParameter::Region), CfnValue::from);
    let account =
        account.map_or_else(|| CfnValue::pseudo(PseudoParameter::AccountId), CfnValue::from);

    CfnValue::concat([
        CfnValue::from("arn:aws:ecr:"),
        region,
        ":".into(),
        account,
        ":repository/".into(),
        repository.into(),
    ])
}

/// Permission policy of the pipeline role.
///
/// Statements in order: assume the CDK deployment roles, push layers to the one
/// image repository, fetch a registry authorization token.
pub fn build_permission_policy(image_repository_arn: CfnValue) -> PolicyDocument {
    PolicyDocument::new(vec![
        Statement::allow("sts:AssumeRole").with_resource(&DEPLOYMENT_ROLE_PATTERNS[..]),
        Statement::allow(&ECR_PUSH_ACTIONS[..]).with_resource(image_repository_arn),
        Statement::allow(ECR_AUTH_ACTION).with_resource("*"),
    ])
}
