//! The GitLab OIDC federation stack
//!
//! Turns a [`StackConfiguration`] into a federation provider trusting the GitLab
//! instance and a role GitLab pipelines can assume, then synthesizes both into a
//! CloudFormation [`Template`].

mod validate;

use log::{debug, info};
use std::collections::BTreeMap;

use crate::config::StackConfiguration;
use crate::error::StackResult;
use crate::synthesis::{
    branch_subject_patterns, build_permission_policy, build_trust_policy, ecr_repository_arn,
    subject_claim_key,
};
use crate::template::{
    CfnValue, Export, OidcProviderProperties, Output, PolicyProperties, Resource, RoleProperties,
    Tag, Template,
};
use crate::types::PolicyDocument;

pub const PROVIDER_LOGICAL_ID: &str = "GitlabPipeline";
pub const ROLE_LOGICAL_ID: &str = "GitlabPipelineRole";
pub const POLICY_LOGICAL_ID: &str = "GitlabPipelineRoleDefaultPolicy";
pub const ROLE_ARN_OUTPUT: &str = "PipelineRoleArn";

/// Trust in the GitLab instance's token issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationProvider {
    pub issuer_url: String,
    pub client_ids: Vec<String>,
    pub thumbprints: Vec<String>,
}

impl FederationProvider {
    fn new(host: &str, thumbprints: &[String]) -> Self {
        let issuer_url = format!("https://{host}");
        Self {
            client_ids: vec![issuer_url.clone()],
            issuer_url,
            thumbprints: thumbprints.to_vec(),
        }
    }
}

/// The role pipelines assume, with its trust condition and permission policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumableRole {
    pub name: String,
    pub description: String,
    /// Condition key the subjects are matched against, `<host>:sub`
    pub subject_claim_key: String,
    /// Exact-match allow list, one entry per allowed branch
    pub allowed_subjects: Vec<String>,
    pub permission_policy: PolicyDocument,
}

/// Stack definition derived from a configuration. Construction never fails and
/// holds no state beyond what the configuration implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitlabOidcStack {
    stack_name: String,
    description: Option<String>,
    gitlab_host: String,
    tags: BTreeMap<String, String>,
    provider: FederationProvider,
    role: AssumableRole,
}

impl GitlabOidcStack {
    pub fn new(config: &StackConfiguration) -> Self {
        let provider = FederationProvider::new(&config.gitlab_host, &config.thumbprints);

        let allowed_subjects = branch_subject_patterns(
            &config.allowed_repo_to_push,
            &config.allowed_branches_to_push,
        );

        let image_repository_arn = ecr_repository_arn(
            config.env.region.as_deref(),
            config.env.account.as_deref(),
            &config.image_repository,
        );

        let role = AssumableRole {
            name: format!("gitlab-oidc-{}", config.project_name),
            description: format!(
                "Role to assume from gitlab pipeline of {}",
                config.project_name
            ),
            subject_claim_key: subject_claim_key(&config.gitlab_host),
            allowed_subjects,
            permission_policy: build_permission_policy(image_repository_arn),
        };

        debug!(
            "Defined stack {} with role {} trusting {}",
            config.stack_name, role.name, provider.issuer_url
        );

        Self {
            stack_name: config.stack_name.clone(),
            description: config.description.clone(),
            gitlab_host: config.gitlab_host.clone(),
            tags: config.tags.clone(),
            provider,
            role,
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn provider(&self) -> &FederationProvider {
        &self.provider
    }

    pub fn role(&self) -> &AssumableRole {
        &self.role
    }

    /// Reference to the role's ARN, resolved at deploy time
    pub fn role_arn(&self) -> CfnValue {
        CfnValue::get_att(ROLE_LOGICAL_ID, "Arn")
    }

    /// Description of the `PipelineRoleArn` output
    pub fn role_arn_description(&self) -> String {
        format!(
            "The arn of the role which can be assumed from a gitlab pipeline on {} within the following repos+branches: {}",
            self.provider.issuer_url,
            self.role.allowed_subjects.join(",")
        )
    }

    /// Validate the stack and produce its template
    pub fn synthesize(&self) -> StackResult<Template> {
        validate::validate_stack(self)?;

        let tags = Tag::from_map(&self.tags);
        let mut resources = BTreeMap::new();

        resources.insert(
            PROVIDER_LOGICAL_ID.to_string(),
            Resource::OidcProvider(OidcProviderProperties {
                url: self.provider.issuer_url.clone(),
                client_id_list: self.provider.client_ids.clone(),
                thumbprint_list: self.provider.thumbprints.clone(),
                tags: tags.clone(),
            }),
        );

        resources.insert(
            ROLE_LOGICAL_ID.to_string(),
            Resource::Role(RoleProperties {
                assume_role_policy_document: build_trust_policy(
                    CfnValue::reference(PROVIDER_LOGICAL_ID),
                    &self.gitlab_host,
                    self.role.allowed_subjects.clone(),
                ),
                description: Some(self.role.description.clone()),
                role_name: Some(self.role.name.clone()),
                tags,
            }),
        );

        resources.insert(
            POLICY_LOGICAL_ID.to_string(),
            Resource::Policy(PolicyProperties {
                policy_document: self.role.permission_policy.clone(),
                policy_name: POLICY_LOGICAL_ID.to_string(),
                roles: vec![CfnValue::reference(ROLE_LOGICAL_ID)],
            }),
        );

        let mut outputs = BTreeMap::new();
        outputs.insert(
            ROLE_ARN_OUTPUT.to_string(),
            Output {
                description: Some(self.role_arn_description()),
                value: self.role_arn(),
                export: Some(Export {
                    name: ROLE_ARN_OUTPUT.to_string(),
                }),
            },
        );

        debug!(
            "Role {} may perform: {}",
            self.role.name,
            self.role.permission_policy.actions().join(", ")
        );
        info!(
            "Synthesized stack {} with {} resources and {} trusted subjects",
            self.stack_name,
            resources.len(),
            self.role.allowed_subjects.len()
        );

        Ok(Template {
            description: self.description.clone(),
            resources,
            outputs,
        })
    }
}
