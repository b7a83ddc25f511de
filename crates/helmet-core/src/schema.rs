//! values.schema.json validation

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result, ValidationErrorInfo};
use crate::values::Values;

/// Result of schema validation
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    /// Whether validation passed
    pub is_valid: bool,

    /// Validation errors (if any)
    pub errors: Vec<ValidationErrorInfo>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    /// Create a failed validation result with errors
    pub fn failure(errors: Vec<ValidationErrorInfo>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Schema validator with cached compiled schema
pub struct SchemaValidator {
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compile a JSON Schema document
    pub fn new(schema: &JsonValue) -> Result<Self> {
        let compiled = jsonschema::validator_for(schema).map_err(|e| CoreError::InvalidSchema {
            message: e.to_string(),
        })?;

        Ok(Self { compiled })
    }

    /// Validate values against the schema
    pub fn validate(&self, values: &Values) -> ValidationResult {
        let instance = values.inner();
        if self.compiled.is_valid(instance) {
            return ValidationResult::success();
        }

        let errors: Vec<ValidationErrorInfo> = self
            .compiled
            .iter_errors(instance)
            .map(|e| {
                let path = e.instance_path.to_string();
                ValidationErrorInfo {
                    path: if path.is_empty() {
                        "(root)".to_string()
                    } else {
                        path
                    },
                    message: e.to_string().replace('"', "'"),
                }
            })
            .collect();

        ValidationResult::failure(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> SchemaValidator {
        SchemaValidator::new(&json!({
            "type": "object",
            "properties": {
                "replicaCount": {"type": "integer", "minimum": 0, "maximum": 50},
                "image": {
                    "type": "object",
                    "properties": {"repository": {"type": "string"}},
                    "required": ["repository"]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_values() {
        let values = Values::from_yaml("replicaCount: 3\nimage: {repository: nginx}").unwrap();
        let result = validator().validate(&values);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_invalid_values_report_paths() {
        let values = Values::from_yaml("replicaCount: 99\nimage: {}").unwrap();
        let result = validator().validate(&values);

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().any(|e| e.path == "/replicaCount"));
        assert!(result.errors.iter().any(|e| e.path == "/image"));
    }

    #[test]
    fn test_invalid_schema() {
        let err = SchemaValidator::new(&json!({"type": 12})).err().unwrap();
        assert!(matches!(err, CoreError::InvalidSchema { .. }));
    }
}
