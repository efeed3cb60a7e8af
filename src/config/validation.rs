//! Leaf validation against rule descriptors.

use super::catalog::{RuleDescriptor, SectionRules, ValueType};
use crate::error::RuleViolation;
use serde_json::{Map, Value};

/// Check one value against its rule, returning every violation found.
///
/// A type mismatch stops the remaining checks for that value.
pub fn validate_leaf(key: &str, value: &Value, rule: &RuleDescriptor) -> Vec<RuleViolation> {
    let mut violations = Vec::new();
    let mut fail = |message: String| {
        violations.push(RuleViolation {
            key: key.to_string(),
            message,
        })
    };

    if value.is_null() {
        if !rule.nullable {
            fail("null value not allowed".to_string());
        }
        return violations;
    }

    if let Some(expected) = rule.value_type
        && !matches_type(value, expected)
    {
        fail(format!("must be of {expected} type"));
        return violations;
    }

    if let Some(ref allowed) = rule.allowed {
        match value {
            Value::Array(items) => {
                let unallowed: Vec<String> = items
                    .iter()
                    .filter(|item| !allowed.contains(item))
                    .map(|item| item.to_string())
                    .collect();
                if !unallowed.is_empty() {
                    fail(format!("unallowed values {}", unallowed.join(", ")));
                }
            }
            other if !allowed.contains(other) => {
                fail(format!("unallowed value {other}"));
            }
            _ => {}
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = rule.min
            && n < min
        {
            fail(format!("min value is {}", format_bound(min)));
        }
        if let Some(max) = rule.max
            && n > max
        {
            fail(format!("max value is {}", format_bound(max)));
        }
    }

    violations
}

/// Check a whole section: required keys must be present and every key that
/// has a rule must satisfy it. Keys without a rule are accepted.
pub fn validate_section(section: &Map<String, Value>, rules: &SectionRules) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    for (key, rule) in rules {
        match section.get(key) {
            Some(value) => violations.extend(validate_leaf(key, value, rule)),
            None if rule.required => violations.push(RuleViolation {
                key: key.clone(),
                message: "required field".to_string(),
            }),
            None => {}
        }
    }

    violations
}

fn matches_type(value: &Value, expected: ValueType) -> bool {
    match expected {
        ValueType::String => value.is_string(),
        ValueType::Integer => value.is_i64() || value.is_u64(),
        ValueType::Float | ValueType::Number => value.is_number(),
        ValueType::Boolean => value.is_boolean(),
        ValueType::List => value.is_array(),
        ValueType::Dict => value.is_object(),
    }
}

fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 && bound.abs() < 1e15 {
        format!("{}", bound as i64)
    } else {
        bound.to_string()
    }
}
