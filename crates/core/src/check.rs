//! Reference evaluator for [`ValidatorExpr`].
//!
//! Runs a validator against a JSON value and reports issues the way the
//! emitted combinators would. Lazy references are looked up only when the
//! evaluation reaches them, so recursive validators work on finite input.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::ir::{
    Bound, DispatchArm, Literal, NumberValidator, ObjectValidator, Refinement, ResponseDispatch,
    StringValidator, UnknownKeys, ValidatorExpr,
};
use crate::resolve::ModelIndex;

/// Validators of Named Schemas, by schema name.
pub trait ValidatorLookup {
    fn validator(&self, name: &str) -> Option<&ValidatorExpr>;
}

impl ValidatorLookup for ModelIndex {
    fn validator(&self, name: &str) -> Option<&ValidatorExpr> {
        self.compiled(name).map(|model| &model.validator)
    }
}

impl ValidatorLookup for IndexMap<String, ValidatorExpr> {
    fn validator(&self, name: &str) -> Option<&ValidatorExpr> {
        self.get(name)
    }
}

/// The validator itself is malformed.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("no validator registered for '{name}'")]
    Unresolved { name: String },
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Location relative to the checked value; empty for the value itself.
    pub path: Vec<PathSegment>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}", self.message);
        }
        for (i, segment) in self.path.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        write!(f, ": {}", self.message)
    }
}

/// Check `value` against `validator`. An empty list means the value passed.
pub fn check(
    validator: &ValidatorExpr,
    value: &Value,
    lookup: &dyn ValidatorLookup,
) -> Result<Vec<Issue>, CheckError> {
    let mut checker = Checker {
        lookup,
        patterns: HashMap::new(),
        path: Vec::new(),
        issues: Vec::new(),
    };
    checker.check(validator, value)?;
    Ok(checker.issues)
}

struct Checker<'a> {
    lookup: &'a dyn ValidatorLookup,
    patterns: HashMap<String, Regex>,
    path: Vec<PathSegment>,
    issues: Vec<Issue>,
}

fn received(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn literal_matches(literal: &Literal, value: &Value) -> bool {
    match (literal, value) {
        (Literal::Int(expected), Value::Number(n)) => n.as_f64() == Some(*expected as f64),
        (Literal::Number(expected), Value::Number(n)) => n.as_f64() == Some(*expected),
        _ => literal.to_json() == *value,
    }
}

fn within(n: f64, min: Option<&Bound>, max: Option<&Bound>) -> Option<String> {
    if let Some(b) = min {
        if b.exclusive && n <= b.value {
            return Some(format!("Number must be greater than {}", b.value));
        }
        if !b.exclusive && n < b.value {
            return Some(format!("Number must be greater than or equal to {}", b.value));
        }
    }
    if let Some(b) = max {
        if b.exclusive && n >= b.value {
            return Some(format!("Number must be less than {}", b.value));
        }
        if !b.exclusive && n > b.value {
            return Some(format!("Number must be less than or equal to {}", b.value));
        }
    }
    None
}

impl Checker<'_> {
    fn issue(&mut self, message: impl Into<String>) {
        self.issues.push(Issue {
            path: self.path.clone(),
            message: message.into(),
        });
    }

    fn expected(&mut self, expected: &str, value: &Value) {
        self.issue(format!("Expected {expected}, received {}", received(value)));
    }

    fn at(
        &mut self,
        segment: PathSegment,
        validator: &ValidatorExpr,
        value: &Value,
    ) -> Result<(), CheckError> {
        self.path.push(segment);
        let result = self.check(validator, value);
        self.path.pop();
        result
    }

    /// Whether `value` passes, leaving no issues behind.
    fn passes(&mut self, validator: &ValidatorExpr, value: &Value) -> Result<bool, CheckError> {
        let mark = self.issues.len();
        self.check(validator, value)?;
        let passed = self.issues.len() == mark;
        self.issues.truncate(mark);
        Ok(passed)
    }

    fn check(&mut self, validator: &ValidatorExpr, value: &Value) -> Result<(), CheckError> {
        match validator {
            ValidatorExpr::Unknown => {}
            ValidatorExpr::Never => self.expected("never", value),
            ValidatorExpr::String(string) => self.string(string, value)?,
            ValidatorExpr::Number(number) => self.number(number, value),
            ValidatorExpr::Boolean => {
                if !value.is_boolean() {
                    self.expected("boolean", value);
                }
            }
            ValidatorExpr::Null => {
                if !value.is_null() {
                    self.expected("null", value);
                }
            }
            ValidatorExpr::Binary => self.expected("binary", value),
            ValidatorExpr::Literal { literal } => {
                if !literal_matches(literal, value) {
                    self.issue(format!(
                        "Invalid literal value, expected {}",
                        literal.to_json()
                    ));
                }
            }
            ValidatorExpr::Union { members } => {
                for member in members {
                    if self.passes(member, value)? {
                        return Ok(());
                    }
                }
                self.issue("Invalid input");
            }
            ValidatorExpr::Intersection { members } => {
                for member in members {
                    self.check(member, value)?;
                }
            }
            ValidatorExpr::Array {
                items,
                min_items,
                max_items,
            } => {
                let Some(elements) = value.as_array() else {
                    self.expected("array", value);
                    return Ok(());
                };
                self.item_count(elements.len(), *min_items, *max_items);
                for (i, element) in elements.iter().enumerate() {
                    self.at(PathSegment::Index(i), items, element)?;
                }
            }
            ValidatorExpr::Tuple { prefix, rest } => {
                let Some(elements) = value.as_array() else {
                    self.expected("array", value);
                    return Ok(());
                };
                let max = rest.is_none().then_some(prefix.len() as u64);
                self.item_count(elements.len(), Some(prefix.len() as u64), max);
                for (i, element) in elements.iter().enumerate() {
                    let validator = match (prefix.get(i), rest) {
                        (Some(v), _) => v,
                        (None, Some(rest)) => rest,
                        (None, None) => break,
                    };
                    self.at(PathSegment::Index(i), validator, element)?;
                }
            }
            ValidatorExpr::Object(object) => self.object(object, value)?,
            ValidatorExpr::LazyRef { name } => {
                let lookup = self.lookup;
                let target = lookup
                    .validator(name)
                    .ok_or_else(|| CheckError::Unresolved { name: name.clone() })?;
                self.check(target, value)?;
            }
            ValidatorExpr::Nullable { inner } => {
                if !value.is_null() {
                    self.check(inner, value)?;
                }
            }
            ValidatorExpr::Refined { inner, refinements } => {
                let mark = self.issues.len();
                self.check(inner, value)?;
                if self.issues.len() == mark {
                    for refinement in refinements {
                        if !refinement_holds(refinement, value) {
                            self.issue(refinement.message());
                        }
                    }
                }
            }
            ValidatorExpr::Dispatch(dispatch) => self.dispatch(dispatch, value)?,
        }
        Ok(())
    }

    fn item_count(&mut self, len: usize, min: Option<u64>, max: Option<u64>) {
        if let Some(limit) = min
            && (len as u64) < limit
        {
            self.issue(Refinement::MinItems { limit }.message());
        }
        if let Some(limit) = max
            && (len as u64) > limit
        {
            self.issue(Refinement::MaxItems { limit }.message());
        }
    }

    fn string(&mut self, string: &StringValidator, value: &Value) -> Result<(), CheckError> {
        let Some(s) = value.as_str() else {
            self.expected("string", value);
            return Ok(());
        };
        let len = s.chars().count() as u64;
        if let Some(min) = string.min_length
            && len < min
        {
            self.issue(format!("String must contain at least {min} character(s)"));
        }
        if let Some(max) = string.max_length
            && len > max
        {
            self.issue(format!("String must contain at most {max} character(s)"));
        }
        if let Some(pattern) = &string.pattern
            && !self.pattern(pattern)?.is_match(s)
        {
            self.issue(format!("Invalid string: must match pattern /{pattern}/"));
        }
        Ok(())
    }

    fn pattern(&mut self, pattern: &str) -> Result<&Regex, CheckError> {
        match self.patterns.entry(pattern.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let regex = Regex::new(pattern).map_err(|source| CheckError::Pattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
                Ok(entry.insert(regex))
            }
        }
    }

    fn number(&mut self, number: &NumberValidator, value: &Value) {
        let Some(n) = value.as_f64() else {
            self.expected("number", value);
            return;
        };
        if number.integer && n.fract() != 0.0 {
            self.issue("Expected integer, received float");
            return;
        }
        if let Some(message) = within(n, number.min.as_ref(), number.max.as_ref()) {
            self.issue(message);
        }
        if let Some(step) = number.multiple_of
            && !is_multiple(n, step)
        {
            self.issue(format!("Number must be a multiple of {step}"));
        }
    }

    fn object(&mut self, object: &ObjectValidator, value: &Value) -> Result<(), CheckError> {
        let Some(map) = value.as_object() else {
            self.expected("object", value);
            return Ok(());
        };
        for field in &object.fields {
            match map.get(&field.name) {
                Some(v) => self.at(PathSegment::Key(field.name.clone()), &field.validator, v)?,
                None if field.optional => {}
                None => {
                    self.path.push(PathSegment::Key(field.name.clone()));
                    self.issue("Required");
                    self.path.pop();
                }
            }
        }

        let extra: Vec<(&String, &Value)> = map
            .iter()
            .filter(|(k, _)| !object.fields.iter().any(|f| f.name == **k))
            .collect();
        match &object.unknown_keys {
            UnknownKeys::Strict if !extra.is_empty() => {
                let keys: Vec<String> = extra.iter().map(|(k, _)| format!("'{k}'")).collect();
                self.issue(format!(
                    "Unrecognized key(s) in object: {}",
                    keys.join(", ")
                ));
            }
            UnknownKeys::Strict => {}
            UnknownKeys::Catchall { validator } => {
                for (key, v) in extra {
                    self.at(PathSegment::Key(key.clone()), validator, v)?;
                }
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, dispatch: &ResponseDispatch, value: &Value) -> Result<(), CheckError> {
        let Some(envelope) = value.as_object() else {
            self.expected("object", value);
            return Ok(());
        };
        let status = envelope
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok());
        let arm = status
            .and_then(|status| dispatch.branches.iter().find(|b| b.status.matches(status)))
            .map_or(&dispatch.fallback, |b| &b.arm);
        self.arm(arm, envelope)
    }

    fn arm(&mut self, arm: &DispatchArm, envelope: &Map<String, Value>) -> Result<(), CheckError> {
        match arm {
            DispatchArm::Body { validator } => {
                let body = envelope.get("body").unwrap_or(&Value::Null);
                self.at(PathSegment::Key("body".to_string()), validator, body)
            }
            DispatchArm::Media { cases, fallback } => {
                let media_type = envelope.get("mediaType").and_then(Value::as_str);
                match cases.iter().find(|c| Some(c.media_type.as_str()) == media_type) {
                    Some(case) => {
                        let body = envelope.get("body").unwrap_or(&Value::Null);
                        self.at(PathSegment::Key("body".to_string()), &case.validator, body)
                    }
                    None => self.arm(fallback, envelope),
                }
            }
            DispatchArm::Reject { field } => {
                let received = match envelope.get(field.key()) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => "undefined".to_string(),
                };
                self.path.push(PathSegment::Key(field.key().to_string()));
                self.issue(field.unexpected(&received));
                self.path.pop();
                Ok(())
            }
        }
    }
}

fn is_multiple(n: f64, step: f64) -> bool {
    if step == 0.0 {
        return true;
    }
    let quotient = n / step;
    (quotient - quotient.round()).abs() < 1e-9
}

fn refinement_holds(refinement: &Refinement, value: &Value) -> bool {
    match refinement {
        Refinement::MinItems { limit } => value
            .as_array()
            .is_none_or(|a| a.len() as u64 >= *limit),
        Refinement::MaxItems { limit } => value
            .as_array()
            .is_none_or(|a| a.len() as u64 <= *limit),
        Refinement::UniqueItems => value.as_array().is_none_or(|a| {
            a.iter()
                .enumerate()
                .all(|(i, x)| a[i + 1..].iter().all(|y| x != y))
        }),
        Refinement::MinProperties { limit } => value
            .as_object()
            .is_none_or(|o| o.len() as u64 >= *limit),
        Refinement::MaxProperties { limit } => value
            .as_object()
            .is_none_or(|o| o.len() as u64 <= *limit),
        Refinement::Range { min, max } => value
            .as_f64()
            .is_none_or(|n| within(n, min.as_ref(), max.as_ref()).is_none()),
    }
}
