use gitlab_aws_oidc_stack::assertions::{Match, SynthesizedTemplate};
use gitlab_aws_oidc_stack::{
    GitlabOidcStack, StackConfiguration, StackError, POLICY_LOGICAL_ID, ROLE_ARN_OUTPUT,
    ROLE_LOGICAL_ID,
};
use proptest::prelude::*;
use rstest::rstest;
use serde_json::json;

const PROJECT_NAME: &str = "whatever";
const ALLOWED_REPO: &str = "department-name/team-name/repo-name";
const GITLAB_HOST: &str = "gitlab.example.com";

fn stack_config(branches: &[&str]) -> StackConfiguration {
    StackConfiguration::new(
        PROJECT_NAME,
        ALLOWED_REPO,
        branches.iter().map(|b| (*b).to_string()).collect(),
        GITLAB_HOST,
    )
}

fn synthesize(config: &StackConfiguration) -> SynthesizedTemplate {
    let template = GitlabOidcStack::new(config)
        .synthesize()
        .expect("stack should synthesize");
    SynthesizedTemplate::from_template(&template).expect("template should serialize")
}

#[test]
fn oidc_provider_created() {
    let template = synthesize(&stack_config(&["main", "develop"]));

    template
        .resource_count_is("AWS::IAM::OIDCProvider", 1)
        .unwrap();
    template
        .has_resource_properties(
            "AWS::IAM::OIDCProvider",
            json!({
                "Url": "https://gitlab.example.com",
                "ClientIdList": ["https://gitlab.example.com"]
            }),
        )
        .unwrap();
}

#[test]
fn iam_role_with_multiple_branch_patterns_exists() {
    let template = synthesize(&stack_config(&["main", "develop"]));

    template
        .has_resource_properties(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": {
                    "Statement": [{
                        "Action": "sts:AssumeRoleWithWebIdentity",
                        "Condition": {
                            "StringEquals": {
                                "gitlab.example.com:sub": [
                                    "project_path:department-name/team-name/repo-name:ref_type:branch:ref:main",
                                    "project_path:department-name/team-name/repo-name:ref_type:branch:ref:develop"
                                ]
                            }
                        },
                        "Effect": "Allow"
                    }]
                }
            }),
        )
        .unwrap();
}

#[test]
fn iam_role_with_single_branch_pattern_exists() {
    let template = synthesize(&stack_config(&["main"]));

    template
        .has_resource_properties(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": {
                    "Statement": [{
                        "Action": "sts:AssumeRoleWithWebIdentity",
                        "Condition": {
                            "StringEquals": {
                                "gitlab.example.com:sub": [
                                    "project_path:department-name/team-name/repo-name:ref_type:branch:ref:main"
                                ]
                            }
                        },
                        "Effect": "Allow",
                        "Principal": {"Federated": {"Ref": "GitlabPipeline"}}
                    }]
                }
            }),
        )
        .unwrap();
}

#[test]
fn iam_policy_for_oidc_role_allows_required_actions() {
    let template = synthesize(&stack_config(&["main"]));

    template
        .has_resource_properties(
            "AWS::IAM::Policy",
            Match::object_like([
                (
                    "Roles",
                    Match::array_with([json!({"Ref": ROLE_LOGICAL_ID})]),
                ),
                (
                    "PolicyDocument",
                    Match::object_like([(
                        "Statement",
                        Match::array_with([
                            json!({
                                "Action": "sts:AssumeRole",
                                "Effect": "Allow",
                                "Resource": [
                                    "arn:aws:iam::*:role/cdk-*-lookup-role-*",
                                    "arn:aws:iam::*:role/cdk-*-image-publishing-role-*",
                                    "arn:aws:iam::*:role/cdk-*-file-publishing-role-*",
                                    "arn:aws:iam::*:role/cdk-*-deploy-role-*"
                                ]
                            }),
                            json!({
                                "Action": "ecr:GetAuthorizationToken",
                                "Effect": "Allow",
                                "Resource": "*"
                            }),
                        ]),
                    )]),
                ),
            ]),
        )
        .unwrap();
}

#[test]
fn iam_policy_never_allows_cfn_exec_role() {
    let template = synthesize(&stack_config(&["main", "develop"]));
    let policies = template.resources_of_type("AWS::IAM::Policy");
    assert_eq!(policies.len(), 1);

    let rendered = policies[0].1.to_string();
    assert!(!rendered.contains("cfn-exec-role"), "policy was: {rendered}");
}

#[test]
fn pipeline_role_arn_output_exported() {
    let template = synthesize(&stack_config(&["main"]));

    template
        .has_output(
            ROLE_ARN_OUTPUT,
            json!({
                "Value": {"Fn::GetAtt": [ROLE_LOGICAL_ID, "Arn"]},
                "Export": {"Name": "PipelineRoleArn"}
            }),
        )
        .unwrap();
    template
        .has_output(
            ROLE_ARN_OUTPUT,
            Match::object_like([(
                "Description",
                Match::string_like_regexp(r"on https://gitlab\.example\.com within .*ref:main$")
                    .unwrap(),
            )]),
        )
        .unwrap();
}

#[test]
fn ecr_statement_uses_configured_environment() {
    let mut config = stack_config(&["main"]);
    config.env.region = Some("eu-central-1".to_string());
    config.env.account = Some("123456789012".to_string());
    config.image_repository = "images".to_string();
    let template = synthesize(&config);

    template
        .has_resource_properties(
            "AWS::IAM::Policy",
            Match::object_like([(
                "PolicyDocument",
                Match::object_like([(
                    "Statement",
                    Match::array_with([Match::object_like([(
                        "Resource",
                        json!("arn:aws:ecr:eu-central-1:123456789012:repository/images"),
                    )])]),
                )]),
            )]),
        )
        .unwrap();
}

#[test]
fn thumbprints_and_tags_reach_the_provider() {
    let mut config = stack_config(&["main"]);
    config.thumbprints = vec!["933c6ddee95c9c41a40f9f50493d82be03ad87bf".to_string()];
    config
        .tags
        .insert("project".to_string(), PROJECT_NAME.to_string());
    let template = synthesize(&config);

    template
        .has_resource_properties(
            "AWS::IAM::OIDCProvider",
            Match::exact(json!({
                "Url": "https://gitlab.example.com",
                "ClientIdList": ["https://gitlab.example.com"],
                "ThumbprintList": ["933c6ddee95c9c41a40f9f50493d82be03ad87bf"],
                "Tags": [{"Key": "project", "Value": "whatever"}]
            })),
        )
        .unwrap();
}

#[rstest]
#[case("gitlab.example.com")]
#[case("gitlab.kreuzwerker.de")]
#[case("git.internal.example.org")]
fn provider_url_and_client_ids_follow_host(#[case] host: &str) {
    let mut config = stack_config(&["main"]);
    config.gitlab_host = host.to_string();
    let template = synthesize(&config);
    let issuer = format!("https://{host}");

    template
        .has_resource_properties(
            "AWS::IAM::OIDCProvider",
            json!({"Url": issuer, "ClientIdList": [issuer]}),
        )
        .unwrap();
    template
        .has_resource_properties(
            "AWS::IAM::Role",
            Match::object_like([(
                "AssumeRolePolicyDocument",
                Match::object_like([(
                    "Statement",
                    Match::array_with([Match::object_like([(
                        "Condition",
                        Match::object_like([(
                            "StringEquals",
                            Match::object_like([(format!("{host}:sub"), Match::any_value())]),
                        )]),
                    )])]),
                )]),
            )]),
        )
        .unwrap();
}

#[test]
fn empty_branch_list_still_synthesizes() {
    let template = synthesize(&stack_config(&[]));

    template
        .has_resource_properties(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": {
                    "Statement": [{
                        "Condition": {"StringEquals": {"gitlab.example.com:sub": []}}
                    }]
                }
            }),
        )
        .unwrap();
}

#[test]
fn invalid_inputs_fail_synthesis() {
    let mut config = stack_config(&["main"]);
    config.thumbprints = vec!["933c6ddee95c9c41".to_string()];
    assert!(matches!(
        GitlabOidcStack::new(&config).synthesize(),
        Err(StackError::InvalidThumbprint { .. })
    ));

    let mut config = stack_config(&["main"]);
    config.project_name = "p".repeat(60);
    assert!(matches!(
        GitlabOidcStack::new(&config).synthesize(),
        Err(StackError::InvalidRoleName { .. })
    ));

    let mut config = stack_config(&["main"]);
    config.stack_name = "Gitlab Stack".to_string();
    assert!(matches!(
        GitlabOidcStack::new(&config).synthesize(),
        Err(StackError::InvalidStackName { .. })
    ));
}

#[test]
fn snapshot_of_whole_stack_stays_stable() {
    // Needs an update for almost every change to the stack. Mostly useful for
    // refactorings: check whether the diff makes sense, then update the fixture.
    let template = synthesize(&stack_config(&["main"]));
    let expected = SynthesizedTemplate::from_json(include_str!("fixtures/single_branch_stack.json"))
        .expect("fixture should be valid JSON");

    assert_eq!(template.to_json(), expected.to_json());
}

#[test]
fn synthesized_json_parses_back_into_template() {
    let template = GitlabOidcStack::new(&stack_config(&["main", "develop"]))
        .synthesize()
        .unwrap();
    let json = template.to_json().unwrap();
    assert_eq!(gitlab_aws_oidc_stack::Template::from_json(&json).unwrap(), template);
}

fn without_key(mut value: serde_json::Value, key: &str) -> serde_json::Value {
    if let Some(object) = value.as_object_mut() {
        object.remove(key);
    }
    value
}

proptest! {
    #[test]
    fn trust_condition_has_one_entry_per_branch(
        repo in "[a-z][a-z0-9-]{0,12}(/[a-z][a-z0-9-]{0,12}){0,3}",
        branches in prop::collection::vec("[A-Za-z0-9*][A-Za-z0-9._/*-]{0,24}", 1..8),
    ) {
        let config = StackConfiguration::new(PROJECT_NAME, repo.clone(), branches.clone(), GITLAB_HOST);
        let stack = GitlabOidcStack::new(&config);
        let subjects = &stack.role().allowed_subjects;

        prop_assert_eq!(subjects.len(), branches.len());
        for (subject, branch) in subjects.iter().zip(&branches) {
            prop_assert_eq!(subject, &format!("project_path:{repo}:ref_type:branch:ref:{branch}"));
        }
    }

    #[test]
    fn project_name_only_changes_role_name_and_description(
        first in "[a-z][a-z0-9-]{0,30}",
        second in "[a-z][a-z0-9-]{0,30}",
    ) {
        prop_assume!(first != second);

        let render = |project: &str| {
            let mut config = stack_config(&["main", "develop"]);
            config.project_name = project.to_string();
            synthesize(&config).to_json().clone()
        };
        let a = render(&first);
        let b = render(&second);

        let role_a = &a["Resources"][ROLE_LOGICAL_ID]["Properties"];
        let role_b = &b["Resources"][ROLE_LOGICAL_ID]["Properties"];
        prop_assert_ne!(&role_a["RoleName"], &role_b["RoleName"]);
        prop_assert_ne!(&role_a["Description"], &role_b["Description"]);
        prop_assert_eq!(
            without_key(without_key(role_a.clone(), "RoleName"), "Description"),
            without_key(without_key(role_b.clone(), "RoleName"), "Description")
        );

        prop_assert_eq!(
            a["Resources"][POLICY_LOGICAL_ID].to_string(),
            b["Resources"][POLICY_LOGICAL_ID].to_string()
        );
        prop_assert_eq!(&a["Outputs"], &b["Outputs"]);
    }
}
