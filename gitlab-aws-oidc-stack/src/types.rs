//! IAM policy document types shared by the trust policy and the permission policy

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::template::CfnValue;

pub const POLICY_VERSION: &str = "2012-10-17";

/// Condition block: operator (e.g. `StringEquals`) to condition key to allowed values
pub type ConditionBlock = BTreeMap<String, BTreeMap<String, Vec<String>>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub statement: Vec<Statement>,
    pub version: String,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            statement,
            version: POLICY_VERSION.to_string(),
        }
    }

    /// All actions granted by the document, in statement order
    pub fn actions(&self) -> Vec<&str> {
        self.statement
            .iter()
            .flat_map(|s| s.action.as_slice())
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: ActionType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub condition: Option<ConditionBlock>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub principal: Option<Principal>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub resource: Option<ResourceType>,
}

impl Statement {
    pub fn allow(action: impl Into<ActionType>) -> Self {
        Self {
            action: action.into(),
            condition: None,
            effect: Effect::Allow,
            principal: None,
            resource: None,
        }
    }

    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<ResourceType>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: ConditionBlock) -> Self {
        self.condition = Some(condition);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
}

/// A single action is emitted as a string, several as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionType {
    Single(String),
    Multiple(Vec<String>),
}

impl ActionType {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Single(action) => std::slice::from_ref(action),
            Self::Multiple(actions) => actions,
        }
    }
}

impl From<&str> for ActionType {
    fn from(action: &str) -> Self {
        Self::Single(action.to_string())
    }
}

impl From<&[&str]> for ActionType {
    fn from(actions: &[&str]) -> Self {
        match actions {
            [single] => Self::from(*single),
            _ => Self::Multiple(actions.iter().map(|a| (*a).to_string()).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceType {
    Single(CfnValue),
    Multiple(Vec<CfnValue>),
}

impl ResourceType {
    /// Literal resource strings; intrinsic values are skipped
    #[cfg(test)]
    pub(crate) fn literals(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => value.as_literal().into_iter().collect(),
            Self::Multiple(values) => values.iter().filter_map(CfnValue::as_literal).collect(),
        }
    }
}

impl From<CfnValue> for ResourceType {
    fn from(value: CfnValue) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for ResourceType {
    fn from(value: &str) -> Self {
        Self::Single(value.into())
    }
}

impl From<&[&str]> for ResourceType {
    fn from(values: &[&str]) -> Self {
        Self::Multiple(values.iter().map(|v| CfnValue::from(*v)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Principal {
    pub federated: CfnValue,
}
