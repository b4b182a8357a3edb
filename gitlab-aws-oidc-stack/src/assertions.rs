//! Assertions over synthesized templates.
//!
//! Patterns are matched against the template's JSON form. A plain JSON value
//! converted into a [`Match`] matches objects partially at every depth (extra keys
//! in the template are ignored) while arrays must match element for element. Use
//! [`Match::array_with`] for subsequence matching on arrays and [`Match::exact`]
//! to forbid extra object keys.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error::StackResult;
use crate::template::Template;

/// Why a pattern did not match, with the JSON path of the first mismatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct MatchFailure {
    pub path: String,
    pub message: String,
}

impl MatchFailure {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: if path.is_empty() {
                "$".to_string()
            } else {
                path.to_string()
            },
            message: message.into(),
        }
    }
}

/// A pattern a JSON value is matched against
#[derive(Debug, Clone)]
pub enum Match {
    Literal { value: Value, partial_objects: bool },
    ObjectLike(Vec<(String, Match)>),
    ArrayWith(Vec<Match>),
    AnyValue,
    Absent,
    StringLikeRegexp(Regex),
}

impl Match {
    /// The value must be equal at every depth, without extra object keys
    pub fn exact(value: Value) -> Self {
        Self::Literal {
            value,
            partial_objects: false,
        }
    }

    /// The value must contain at least the given keys, each matching its pattern
    pub fn object_like<K, M>(entries: impl IntoIterator<Item = (K, M)>) -> Self
    where
        K: Into<String>,
        M: Into<Match>,
    {
        Self::ObjectLike(
            entries
                .into_iter()
                .map(|(k, m)| (k.into(), m.into()))
                .collect(),
        )
    }

    /// The value must be an array containing the patterns in order, not necessarily adjacent
    pub fn array_with<M: Into<Match>>(patterns: impl IntoIterator<Item = M>) -> Self {
        Self::ArrayWith(patterns.into_iter().map(Into::into).collect())
    }

    pub fn any_value() -> Self {
        Self::AnyValue
    }

    /// Inside [`Match::object_like`]: the key must not be present
    pub fn absent() -> Self {
        Self::Absent
    }

    pub fn string_like_regexp(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::StringLikeRegexp(Regex::new(pattern)?))
    }

    /// Match `actual`, where `None` means the key was missing from its parent object
    pub fn test(&self, actual: Option<&Value>) -> Result<(), MatchFailure> {
        self.test_at("", actual)
    }

    fn test_at(&self, path: &str, actual: Option<&Value>) -> Result<(), MatchFailure> {
        match (self, actual) {
            (Self::Absent, None) => Ok(()),
            (Self::Absent, Some(value)) => Err(MatchFailure::new(
                path,
                format!("expected key to be absent, found {value}"),
            )),
            (_, None) => Err(MatchFailure::new(path, "missing key")),
            (Self::AnyValue, Some(Value::Null)) => {
                Err(MatchFailure::new(path, "expected any value, found null"))
            }
            (Self::AnyValue, Some(_)) => Ok(()),
            (
                Self::Literal {
                    value,
                    partial_objects,
                },
                Some(actual),
            ) => match_literal(path, value, actual, *partial_objects),
            (Self::ObjectLike(entries), Some(actual)) => {
                let Value::Object(object) = actual else {
                    return Err(MatchFailure::new(
                        path,
                        format!("expected an object, found {actual}"),
                    ));
                };
                for (key, pattern) in entries {
                    pattern.test_at(&child_path(path, key), object.get(key))?;
                }
                Ok(())
            }
            (Self::ArrayWith(patterns), Some(actual)) => {
                let Value::Array(items) = actual else {
                    return Err(MatchFailure::new(
                        path,
                        format!("expected an array, found {actual}"),
                    ));
                };
                let mut remaining = items.iter();
                for (index, pattern) in patterns.iter().enumerate() {
                    let found = remaining
                        .by_ref()
                        .any(|item| pattern.test_at(path, Some(item)).is_ok());
                    if !found {
                        return Err(MatchFailure::new(
                            path,
                            format!("array does not contain pattern #{index} ({pattern}) in order"),
                        ));
                    }
                }
                Ok(())
            }
            (Self::StringLikeRegexp(regex), Some(Value::String(s))) => {
                if regex.is_match(s) {
                    Ok(())
                } else {
                    Err(MatchFailure::new(
                        path,
                        format!("'{s}' does not match /{}/", regex.as_str()),
                    ))
                }
            }
            (Self::StringLikeRegexp(_), Some(actual)) => Err(MatchFailure::new(
                path,
                format!("expected a string, found {actual}"),
            )),
        }
    }
}

impl From<Value> for Match {
    fn from(value: Value) -> Self {
        Self::Literal {
            value,
            partial_objects: true,
        }
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value, .. } => write!(f, "{value}"),
            Self::ObjectLike(entries) => {
                let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                write!(f, "objectLike({})", keys.join(", "))
            }
            Self::ArrayWith(patterns) => write!(f, "arrayWith({} patterns)", patterns.len()),
            Self::AnyValue => f.write_str("anyValue"),
            Self::Absent => f.write_str("absent"),
            Self::StringLikeRegexp(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        format!("$.{key}")
    } else {
        format!("{path}.{key}")
    }
}

fn match_literal(
    path: &str,
    expected: &Value,
    actual: &Value,
    partial_objects: bool,
) -> Result<(), MatchFailure> {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => {
            for (key, value) in expected {
                let key_path = child_path(path, key);
                let Some(actual_value) = actual.get(key) else {
                    return Err(MatchFailure::new(&key_path, "missing key"));
                };
                match_literal(&key_path, value, actual_value, partial_objects)?;
            }
            if !partial_objects {
                if let Some(extra) = actual.keys().find(|k| !expected.contains_key(*k)) {
                    return Err(MatchFailure::new(
                        &child_path(path, extra),
                        "unexpected key",
                    ));
                }
            }
            Ok(())
        }
        (Value::Array(expected), Value::Array(actual)) => {
            if expected.len() != actual.len() {
                return Err(MatchFailure::new(
                    path,
                    format!(
                        "expected array of {} elements, found {}",
                        expected.len(),
                        actual.len()
                    ),
                ));
            }
            for (index, (e, a)) in expected.iter().zip(actual).enumerate() {
                match_literal(&format!("{path}[{index}]"), e, a, partial_objects)?;
            }
            Ok(())
        }
        (expected, actual) if expected == actual => Ok(()),
        (expected, actual) => Err(MatchFailure::new(
            path,
            format!("expected {expected}, found {actual}"),
        )),
    }
}

/// JSON view of a synthesized template for assertions
#[derive(Debug, Clone)]
pub struct SynthesizedTemplate {
    json: Value,
}

impl SynthesizedTemplate {
    pub fn from_template(template: &Template) -> StackResult<Self> {
        Ok(Self {
            json: serde_json::to_value(template)?,
        })
    }

    pub fn from_json(json: &str) -> StackResult<Self> {
        Ok(Self {
            json: serde_json::from_str(json)?,
        })
    }

    pub fn to_json(&self) -> &Value {
        &self.json
    }

    /// Logical ids and bodies of all resources with the given type
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &Value)> {
        self.json
            .get("Resources")
            .and_then(Value::as_object)
            .map(|resources| {
                resources
                    .iter()
                    .filter(|(_, r)| r.get("Type").and_then(Value::as_str) == Some(resource_type))
                    .map(|(id, r)| (id.as_str(), r))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn resource_count_is(&self, resource_type: &str, count: usize) -> Result<(), MatchFailure> {
        let found = self.resources_of_type(resource_type).len();
        if found == count {
            Ok(())
        } else {
            Err(MatchFailure::new(
                "$.Resources",
                format!("expected {count} resources of type {resource_type}, found {found}"),
            ))
        }
    }

    /// Passes if at least one resource of `resource_type` has properties matching `pattern`
    pub fn has_resource_properties(
        &self,
        resource_type: &str,
        pattern: impl Into<Match>,
    ) -> Result<(), MatchFailure> {
        let pattern = pattern.into();
        let candidates = self.resources_of_type(resource_type);
        if candidates.is_empty() {
            return Err(MatchFailure::new(
                "$.Resources",
                format!("no resource of type {resource_type}"),
            ));
        }

        let mut failures = Vec::new();
        for (logical_id, resource) in candidates {
            match pattern.test(resource.get("Properties")) {
                Ok(()) => return Ok(()),
                Err(failure) => failures.push(format!("{logical_id}: {failure}")),
            }
        }
        Err(MatchFailure::new(
            "$.Resources",
            format!(
                "no {resource_type} matches the pattern ({})",
                failures.join("; ")
            ),
        ))
    }

    pub fn has_output(&self, output_id: &str, pattern: impl Into<Match>) -> Result<(), MatchFailure> {
        let pattern: Match = pattern.into();
        let output = self.json.get("Outputs").and_then(|o| o.get(output_id));
        pattern
            .test(output)
            .map_err(|f| MatchFailure::new(&format!("$.Outputs.{output_id}"), f.to_string()))
    }
}
