//! Synthesis-time checks on the stack definition.
//!
//! Values CloudFormation or IAM would reject are errors. Values that deploy but
//! leave the role unusable are logged as warnings and synthesis continues.

use log::warn;

use super::GitlabOidcStack;
use crate::error::{StackError, StackResult};

const THUMBPRINT_LEN: usize = 40;
const ROLE_NAME_MAX_LEN: usize = 64;
const STACK_NAME_MAX_LEN: usize = 128;

pub(super) fn validate_stack(stack: &GitlabOidcStack) -> StackResult<()> {
    validate_stack_name(&stack.stack_name)?;
    validate_role_name(&stack.role.name)?;
    for thumbprint in &stack.provider.thumbprints {
        validate_thumbprint(thumbprint)?;
    }

    warn_on_host(&stack.gitlab_host);
    if stack.role.allowed_subjects.is_empty() {
        warn!(
            "No branches allowed for role {}: nobody will be able to assume it",
            stack.role.name
        );
    }
    Ok(())
}

/// A thumbprint is the hex SHA-1 fingerprint of a certificate
fn validate_thumbprint(thumbprint: &str) -> StackResult<()> {
    if thumbprint.len() != THUMBPRINT_LEN {
        return Err(StackError::invalid_thumbprint(
            thumbprint,
            format!(
                "expected {THUMBPRINT_LEN} hex characters, got {}",
                thumbprint.len()
            ),
        ));
    }
    if let Some(c) = thumbprint.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(StackError::invalid_thumbprint(
            thumbprint,
            format!("invalid character '{c}'"),
        ));
    }
    Ok(())
}

/// IAM role names: 1 to 64 characters of `[A-Za-z0-9+=,.@_-]`
fn validate_role_name(name: &str) -> StackResult<()> {
    if name.is_empty() || name.len() > ROLE_NAME_MAX_LEN {
        return Err(StackError::invalid_role_name(
            name,
            format!(
                "must be between 1 and {ROLE_NAME_MAX_LEN} characters, got {}",
                name.len()
            ),
        ));
    }
    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && !"+=,.@_-".contains(c) {
            return Err(StackError::invalid_role_name(
                name,
                format!("invalid character '{c}'"),
            ));
        }
    }
    Ok(())
}

/// CloudFormation stack names start with a letter and contain letters, digits and hyphens
fn validate_stack_name(name: &str) -> StackResult<()> {
    if name.is_empty() || name.len() > STACK_NAME_MAX_LEN {
        return Err(StackError::invalid_stack_name(
            name,
            format!(
                "must be between 1 and {STACK_NAME_MAX_LEN} characters, got {}",
                name.len()
            ),
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(StackError::invalid_stack_name(
            name,
            "must start with a letter",
        ));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
    {
        return Err(StackError::invalid_stack_name(
            name,
            format!("invalid character '{c}'"),
        ));
    }
    Ok(())
}

fn warn_on_host(host: &str) {
    for problem in host_problems(host) {
        warn!("GitLab host '{}' {}", host, problem);
    }
}

/// Reasons `host` is not a bare hostname, in check order
fn host_problems(host: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if host.is_empty() {
        problems.push("is empty");
    }
    if host.contains("://") {
        problems.push("contains a scheme; the issuer URL prepends https://");
    } else if host.contains('/') {
        problems.push("contains a slash; the issuer URL and the sub claim key will include the path");
    }
    if host.contains(char::is_whitespace) {
        problems.push("contains whitespace");
    }
    problems
}
