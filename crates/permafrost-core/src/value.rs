//! Classification of raw text fields into typed metric values.
//!
//! External tools report values as bare text. [`classify`] turns one field
//! into a tagged [`ClassifiedValue`] using a single ordered rule list, so
//! ambiguity resolution (is `"0"` an integer? is `"enabled"` a flag?) lives
//! in one testable place instead of being re-guessed at each call site.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{UnrecognizedValueSnafu, ValueError};

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A-?[1-9][0-9]*\z").expect("valid integer pattern"));
static FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[0-9]+\.[0-9]+\z").expect("valid float pattern"));

/// A raw text field resolved to a typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Whitespace-separated flag words (e.g. a status field like `"OL CHRG"`).
    StringList(Vec<String>),
    String(String),
}

impl ClassifiedValue {
    /// The numeric gauge representation, if this value has one.
    ///
    /// Booleans map to 1.0/0.0; strings and string lists have none.
    pub fn gauge_value(&self) -> Option<f64> {
        match self {
            ClassifiedValue::Integer(v) => Some(*v as f64),
            ClassifiedValue::Float(v) => Some(*v),
            ClassifiedValue::Bool(true) => Some(1.0),
            ClassifiedValue::Bool(false) => Some(0.0),
            ClassifiedValue::StringList(_) | ClassifiedValue::String(_) => None,
        }
    }

    /// The numeric gauge representation, or [`ValueError::UnrecognizedValue`]
    /// naming the offending field.
    pub fn require_gauge_value(&self, field: &str) -> Result<f64, ValueError> {
        self.gauge_value().ok_or_else(|| {
            UnrecognizedValueSnafu {
                field: field.to_string(),
                value: format!("{self:?}"),
            }
            .build()
        })
    }
}

/// Classify one raw text field. Rules are applied in order; the function is
/// total (the final rule always matches).
///
/// 1. `"0"` → `Integer(0)`
/// 2. `-?[1-9][0-9]*` → `Integer`
/// 3. `[0-9]+.[0-9]+` → `Float`
/// 4. `"enabled"` → `Bool(true)`
/// 5. `"disabled"` / `"muted"` → `Bool(false)`
/// 6. internal whitespace → `StringList` (split on whitespace)
/// 7. anything else → `String`
pub fn classify(raw: &str) -> ClassifiedValue {
    if raw == "0" {
        return ClassifiedValue::Integer(0);
    }
    if INTEGER.is_match(raw)
        && let Ok(v) = raw.parse::<i64>()
    {
        return ClassifiedValue::Integer(v);
    }
    if FLOAT.is_match(raw)
        && let Ok(v) = raw.parse::<f64>()
    {
        return ClassifiedValue::Float(v);
    }
    match raw {
        "enabled" => return ClassifiedValue::Bool(true),
        "disabled" | "muted" => return ClassifiedValue::Bool(false),
        _ => {}
    }
    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.len() > 1 {
        return ClassifiedValue::StringList(words.into_iter().map(str::to_owned).collect());
    }
    ClassifiedValue::String(raw.to_string())
}
