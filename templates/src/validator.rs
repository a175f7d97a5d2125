//! C4 — Field-Schema Validator
//!
//! Validates a recipient payload against a version's `fieldSchema`.
//! Collects every violation instead of failing on the first one, mirroring
//! the teacher's `AppError::with_detail` accumulation pattern used for
//! multi-field form errors elsewhere in `crab-cloud`.

use serde_json::Value;

fn compile_pattern(pattern: &str) -> Result<regex::Regex, regex::Error> {
    regex::Regex::new(pattern)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationReport {
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct FieldRule {
    #[serde(rename = "type")]
    field_type: Option<String>,
    #[serde(default)]
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<String>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

/// `validate(recipientData, fieldSchema)`. Both must be JSON objects. An
/// empty schema skips validation entirely; null/empty recipient data is an
/// immediate failure once the schema is non-empty.
pub fn validate(recipient_data: &Value, field_schema: &Value) -> ValidationReport {
    let schema = match field_schema.as_object() {
        Some(map) if !map.is_empty() => map,
        _ => return ValidationReport { errors: vec![] },
    };

    let recipient = match recipient_data.as_object() {
        Some(map) if !map.is_empty() => map,
        _ => {
            return ValidationReport {
                errors: vec![FieldError {
                    field: String::new(),
                    message: "recipient data must be a non-empty object".to_string(),
                }],
            };
        }
    };

    let mut errors = Vec::new();

    for (name, rule_value) in schema {
        let rule: FieldRule = match serde_json::from_value(rule_value.clone()) {
            Ok(r) => r,
            Err(_) => continue,
        };

        let value = recipient.get(name);
        let Some(value) = value else {
            if rule.required {
                errors.push(FieldError {
                    field: name.clone(),
                    message: "field is required".to_string(),
                });
            }
            continue;
        };

        if let Some(err) = check_type(value, rule.field_type.as_deref()) {
            errors.push(FieldError { field: name.clone(), message: err });
            continue;
        }

        if let Some(s) = value.as_str() {
            if let Some(min) = rule.min_length {
                if s.len() < min {
                    errors.push(FieldError {
                        field: name.clone(),
                        message: format!("must be at least {min} characters"),
                    });
                }
            }
            if let Some(max) = rule.max_length {
                if s.len() > max {
                    errors.push(FieldError {
                        field: name.clone(),
                        message: format!("must be at most {max} characters"),
                    });
                }
            }
            if let Some(pattern) = &rule.pattern {
                match compile_pattern(pattern) {
                    Ok(re) => {
                        if !re.is_match(s) {
                            errors.push(FieldError {
                                field: name.clone(),
                                message: format!("does not match pattern {pattern}"),
                            });
                        }
                    }
                    Err(_) => errors.push(FieldError {
                        field: name.clone(),
                        message: format!("invalid pattern in schema: {pattern}"),
                    }),
                }
            }
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = rule.minimum {
                if n < min {
                    errors.push(FieldError {
                        field: name.clone(),
                        message: format!("must be >= {min}"),
                    });
                }
            }
            if let Some(max) = rule.maximum {
                if n > max {
                    errors.push(FieldError {
                        field: name.clone(),
                        message: format!("must be <= {max}"),
                    });
                }
            }
        }
    }

    for extra in recipient.keys().filter(|k| !schema.contains_key(*k)) {
        tracing::debug!(field = %extra, "recipient data carries a field not present in fieldSchema");
    }

    ValidationReport { errors }
}

fn check_type(value: &Value, field_type: Option<&str>) -> Option<String> {
    let Some(field_type) = field_type else {
        return None;
    };
    let ok = match field_type {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.as_f64().is_some_and(|n| n.fract() == 0.0),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    };
    if ok {
        None
    } else {
        Some(format!("expected type {field_type}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_schema_skips_validation() {
        let report = validate(&json!({}), &json!({}));
        assert!(report.is_valid());
    }

    #[test]
    fn empty_recipient_with_nonempty_schema_fails() {
        let schema = json!({"name": {"type": "string", "required": true}});
        let report = validate(&json!({}), &schema);
        assert!(!report.is_valid());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let schema = json!({"name": {"type": "string", "required": true}});
        let report = validate(&json!({"other": "x"}), &schema);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, "name");
    }

    #[test]
    fn type_mismatch_is_reported() {
        let schema = json!({"age": {"type": "integer"}});
        let report = validate(&json!({"age": "not a number"}), &schema);
        assert!(!report.is_valid());
    }

    #[test]
    fn integer_accepts_whole_valued_number() {
        let schema = json!({"age": {"type": "integer"}});
        let report = validate(&json!({"age": 42.0}), &schema);
        assert!(report.is_valid());
    }

    #[test]
    fn string_length_and_pattern_bounds_are_honoured() {
        let schema = json!({
            "code": {"type": "string", "minLength": 3, "maxLength": 5, "pattern": "^[A-Z]+$"}
        });
        assert!(!validate(&json!({"code": "ab"}), &schema).is_valid());
        assert!(!validate(&json!({"code": "toolong"}), &schema).is_valid());
        assert!(!validate(&json!({"code": "abc"}), &schema).is_valid());
        assert!(validate(&json!({"code": "ABC"}), &schema).is_valid());
    }

    #[test]
    fn numeric_bounds_are_honoured() {
        let schema = json!({"score": {"type": "number", "minimum": 0.0, "maximum": 100.0}});
        assert!(!validate(&json!({"score": -1}), &schema).is_valid());
        assert!(!validate(&json!({"score": 101}), &schema).is_valid());
        assert!(validate(&json!({"score": 50}), &schema).is_valid());
    }

    #[test]
    fn extra_fields_are_permitted() {
        let schema = json!({"name": {"type": "string"}});
        let report = validate(&json!({"name": "Ada", "unexpected": true}), &schema);
        assert!(report.is_valid());
    }

    #[test]
    fn collects_every_violation_not_just_the_first() {
        let schema = json!({
            "name": {"type": "string", "required": true},
            "age": {"type": "integer", "required": true}
        });
        let report = validate(&json!({}), &schema);
        assert_eq!(report.errors.len(), 2);
    }
}
