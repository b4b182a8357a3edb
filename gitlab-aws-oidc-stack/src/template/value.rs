//! Template values: literals and the intrinsic functions the stack needs

use serde::{Deserialize, Serialize};

/// A value that is either a literal string or resolved by CloudFormation at deploy time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CfnValue {
    Literal(String),
    Ref {
        #[serde(rename = "Ref")]
        logical_id: String,
    },
    GetAtt {
        #[serde(rename = "Fn::GetAtt")]
        target: (String, String),
    },
    Join {
        #[serde(rename = "Fn::Join")]
        parts: (String, Vec<CfnValue>),
    },
}

/// Pseudo parameters CloudFormation provides in every stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoParameter {
    AccountId,
    Region,
}

impl PseudoParameter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Region => "AWS::Region",
        }
    }
}

impl CfnValue {
    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref {
            logical_id: logical_id.into(),
        }
    }

    pub fn pseudo(parameter: PseudoParameter) -> Self {
        Self::reference(parameter.as_str())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            target: (logical_id.into(), attribute.into()),
        }
    }

    /// Join `parts` with an empty delimiter, folding adjacent literals together.
    ///
    /// A single remaining part is returned as is, so joining only literals yields a
    /// literal and no `Fn::Join` is emitted.
    pub fn concat(parts: impl IntoIterator<Item = CfnValue>) -> Self {
        let mut folded: Vec<CfnValue> = Vec::new();
        for part in parts {
            if let CfnValue::Literal(next) = &part {
                if next.is_empty() {
                    continue;
                }
                if let Some(CfnValue::Literal(previous)) = folded.last_mut() {
                    previous.push_str(next);
                    continue;
                }
            }
            folded.push(part);
        }

        match folded.len() {
            0 => Self::Literal(String::new()),
            1 => folded.remove(0),
            _ => Self::Join {
                parts: (String::new(), folded),
            },
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for CfnValue {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for CfnValue {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}
