//! CloudFormation template model
//!
//! Typed representation of the template the stack synthesizes to. Field order of
//! each struct is the key order of the emitted JSON and all maps are sorted, so the
//! same stack always serializes to the same bytes.

mod value;

pub use value::{CfnValue, PseudoParameter};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StackResult;
use crate::types::PolicyDocument;

/// A synthesized CloudFormation template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub resources: BTreeMap<String, Resource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn to_json(&self) -> StackResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> StackResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> StackResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }
}

/// Resources the stack can emit, keyed by their CloudFormation type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Properties")]
pub enum Resource {
    #[serde(rename = "AWS::IAM::OIDCProvider")]
    OidcProvider(OidcProviderProperties),
    #[serde(rename = "AWS::IAM::Role")]
    Role(RoleProperties),
    #[serde(rename = "AWS::IAM::Policy")]
    Policy(PolicyProperties),
}

impl Resource {
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::OidcProvider(_) => "AWS::IAM::OIDCProvider",
            Self::Role(_) => "AWS::IAM::Role",
            Self::Policy(_) => "AWS::IAM::Policy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OidcProviderProperties {
    pub url: String,
    pub client_id_list: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub thumbprint_list: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleProperties {
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Tag>,
}

/// Inline policy attached to one or more roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyProperties {
    pub policy_document: PolicyDocument,
    pub policy_name: String,
    pub roles: Vec<CfnValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    /// Convert a tag map into CloudFormation tags, ordered by key
    pub fn from_map(tags: &BTreeMap<String, String>) -> Vec<Self> {
        tags.iter()
            .map(|(key, value)| Self {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub value: CfnValue,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub export: Option<Export>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: String,
}
