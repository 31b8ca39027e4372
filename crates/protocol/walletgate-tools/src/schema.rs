//! Declared tool parameters and argument validation.
//!
//! Each tool states its parameters up front (name, kind, required/optional/
//! default). Incoming arguments are checked against that list before the
//! handler is called. Every offending field is reported, not just the first.
//! Arguments the tool does not declare are dropped.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::ToolError;

/// Type of a declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Non-empty string.
    String,
    /// Whole number, optionally bounded (inclusive).
    Integer { min: Option<i64>, max: Option<i64> },
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// Positive decimal amount. Accepts `"1.25"` or `1.25`; normalized to a string.
    Amount,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            Self::String | Self::Amount => "string",
            Self::Integer { .. } => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// Whether a parameter must be supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    /// Filled in with this value when absent.
    Default(Value),
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub presence: Presence,
    pub description: String,
}

impl ParamSpec {
    fn new(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            presence: Presence::Required,
            description: description.to_string(),
        }
    }

    /// Required string parameter.
    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    /// Required integer parameter.
    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(
            name,
            ParamKind::Integer {
                min: None,
                max: None,
            },
            description,
        )
    }

    /// Required number parameter.
    pub fn number(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::Number, description)
    }

    /// Required boolean parameter.
    pub fn boolean(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    /// Required amount parameter.
    pub fn amount(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::Amount, description)
    }

    /// Bound an integer parameter (inclusive). No effect on other kinds.
    pub fn range(mut self, min: i64, max: i64) -> Self {
        if let ParamKind::Integer { .. } = self.kind {
            self.kind = ParamKind::Integer {
                min: Some(min),
                max: Some(max),
            };
        }
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.presence = Presence::Default(value);
        self
    }

    pub fn is_required(&self) -> bool {
        matches!(self.presence, Presence::Required)
    }

    /// Check one supplied value, returning its normalized form.
    fn check(&self, value: &Value) -> Result<Value, String> {
        match &self.kind {
            ParamKind::String => match value.as_str() {
                Some("") => Err("must not be empty".to_string()),
                Some(_) => Ok(value.clone()),
                None => Err("must be a string".to_string()),
            },
            ParamKind::Integer { min, max } => {
                let n = value.as_i64().ok_or_else(|| "must be an integer".to_string())?;
                match (min, max) {
                    (Some(lo), Some(hi)) if n < *lo || n > *hi => {
                        Err(format!("must be between {} and {}", lo, hi))
                    }
                    (Some(lo), None) if n < *lo => Err(format!("must be at least {}", lo)),
                    (None, Some(hi)) if n > *hi => Err(format!("must be at most {}", hi)),
                    _ => Ok(value.clone()),
                }
            }
            ParamKind::Number if value.is_number() => Ok(value.clone()),
            ParamKind::Number => Err("must be a number".to_string()),
            ParamKind::Boolean if value.is_boolean() => Ok(value.clone()),
            ParamKind::Boolean => Err("must be a boolean".to_string()),
            ParamKind::Amount => {
                let text = match value {
                    Value::String(s) => s.trim().to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return Err("must be a decimal amount".to_string()),
                };
                if is_positive_decimal(&text) {
                    Ok(Value::String(text))
                } else {
                    Err("must be a positive decimal amount".to_string())
                }
            }
        }
    }

    fn json_schema(&self) -> Value {
        let mut schema = json!({
            "type": self.kind.json_type(),
            "description": self.description,
        });
        if let ParamKind::Integer { min, max } = &self.kind {
            if let Some(min) = min {
                schema["minimum"] = json!(min);
            }
            if let Some(max) = max {
                schema["maximum"] = json!(max);
            }
        }
        if let ParamKind::Amount = self.kind {
            schema["pattern"] = json!(r"^\d*\.?\d+$");
        }
        if let Presence::Default(value) = &self.presence {
            schema["default"] = value.clone();
        }
        schema
    }
}

/// `digits[.digits]` (or `.digits`) with a non-zero value.
fn is_positive_decimal(text: &str) -> bool {
    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    let digits_ok = whole.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit())
        && !(whole.is_empty() && frac.is_empty())
        && !(text.contains('.') && frac.is_empty());
    digits_ok && text.chars().any(|c| c.is_ascii_digit() && c != '0')
}

/// A field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A tool's declared parameter list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    params: Vec<ParamSpec>,
}

impl InputSchema {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    /// A tool that takes no arguments.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Check `args` against the declared parameters.
    ///
    /// `null` counts as absent. Defaults are filled in, amounts normalized,
    /// and undeclared arguments dropped.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<ValidatedArgs, Vec<FieldError>> {
        let mut validated = Map::new();
        let mut errors = Vec::new();

        for param in &self.params {
            match args.get(&param.name).filter(|v| !v.is_null()) {
                Some(value) => match param.check(value) {
                    Ok(value) => {
                        validated.insert(param.name.clone(), value);
                    }
                    Err(message) => errors.push(FieldError::new(&param.name, &message)),
                },
                None => match &param.presence {
                    Presence::Required => errors.push(FieldError::new(&param.name, "is required")),
                    Presence::Default(value) => {
                        validated.insert(param.name.clone(), value.clone());
                    }
                    Presence::Optional => {}
                },
            }
        }

        let dropped: Vec<&str> = args
            .keys()
            .filter(|k| !self.params.iter().any(|p| &p.name == *k))
            .map(String::as_str)
            .collect();
        if !dropped.is_empty() {
            debug!(fields = ?dropped, "Dropping undeclared arguments");
        }

        if errors.is_empty() {
            Ok(ValidatedArgs(validated))
        } else {
            Err(errors)
        }
    }

    /// Render as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Arguments that passed [`InputSchema::validate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs(Map<String, Value>);

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// A string the schema declared as required or defaulted.
    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        self.str(name)
            .ok_or_else(|| ToolError::InvalidArguments(vec![FieldError::new(name, "is required")]))
    }

    /// A non-negative integer the schema declared as required or defaulted.
    pub fn require_u64(&self, name: &str) -> Result<u64, ToolError> {
        self.0.get(name).and_then(Value::as_u64).ok_or_else(|| {
            ToolError::InvalidArguments(vec![FieldError::new(name, "must be a non-negative integer")])
        })
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}
