//! Response schemas and validated decoding
//!
//! Schemas are plain JSON Schema so they can be checked locally with
//! `jsonschema`; the Gemini client converts them to the API's schema dialect.

use crate::error::GatewayError;
use jsonschema::Validator;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use std::sync::OnceLock;

pub fn compliance_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "decision": { "type": "string", "enum": ["GO", "NO-GO"], "description": "GO or NO-GO" },
            "rationale": { "type": "string" },
            "checks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "item": { "type": "string" },
                        "status": { "type": "string", "enum": ["pass", "fail", "warning"] },
                        "blocking": { "type": "boolean" },
                        "reason": { "type": "string" },
                        "fatalFlaw": { "type": "boolean" }
                    },
                    "required": ["item", "status", "blocking"]
                }
            }
        },
        "required": ["decision", "rationale", "checks"]
    })
}

pub fn architecture_schema() -> JsonValue {
    let string_list = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "properties": {
            "totalPoints": { "type": "number" },
            "competitiveThreshold": { "type": "number", "description": "Percent of total points" },
            "pageLimit": { "type": "number" },
            "formatRequirements": string_list,
            "sections": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "points": { "type": "number" },
                        "subsections": { "type": "number" }
                    },
                    "required": ["name", "points"]
                }
            },
            "logicModel": {
                "type": "object",
                "properties": {
                    "inputs": string_list,
                    "activities": string_list,
                    "outputs": string_list,
                    "outcomes": string_list
                }
            }
        },
        "required": ["sections", "totalPoints"]
    })
}

pub fn budget_schema() -> JsonValue {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "category": { "type": "string" },
                "description": { "type": "string" },
                "amount": { "type": "number", "minimum": 0 },
                "justification": { "type": "string" },
                "allowable": { "type": "boolean" }
            },
            "required": ["category", "amount", "allowable"]
        }
    })
}

pub fn red_team_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "estimatedScore": { "type": "number" },
            "fixes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "area": { "type": "string" },
                        "severity": { "type": "string", "enum": ["high", "medium", "low"] },
                        "recommendation": { "type": "string" }
                    },
                    "required": ["area", "severity", "recommendation"]
                }
            },
            "readinessVerdict": { "type": "string" }
        },
        "required": ["estimatedScore", "fixes"]
    })
}

/// Strip a surrounding Markdown code fence, if the model added one
pub fn strip_code_fence(raw: &str) -> &str {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let re = FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```(?:json|JSON)?\s*(.*?)\s*```\s*$").expect("fence regex is valid")
    });

    match re.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw.trim(),
    }
}

/// Parse a raw reply, check it against `schema`, then decode into `T`
pub fn decode<T: DeserializeOwned>(raw: &str, schema: &JsonValue) -> Result<T, GatewayError> {
    let value: JsonValue = serde_json::from_str(strip_code_fence(raw))?;

    let validator = Validator::new(schema)
        .map_err(|e| GatewayError::SchemaMismatch(format!("invalid schema: {}", e)))?;

    let problems: Vec<String> = validator
        .iter_errors(&value)
        .map(|error| {
            let path = error.instance_path.to_string();
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{}: {}", path, error)
            }
        })
        .collect();

    if !problems.is_empty() {
        return Err(GatewayError::SchemaMismatch(problems.join("; ")));
    }

    serde_json::from_value(value).map_err(|e| GatewayError::SchemaMismatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetItem, ScoringMap};

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[]\n```\n"), "[]");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_decode_budget() {
        let raw = r#"[{"category":"Personnel","description":"PI","amount":90000,
                      "justification":"Lead","allowable":true}]"#;
        let items: Vec<BudgetItem> = decode(raw, &budget_schema()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, 90000.0);
    }

    #[test]
    fn test_negative_amount_is_schema_mismatch() {
        let raw = r#"[{"category":"Travel","amount":-5,"allowable":true}]"#;
        let err = decode::<Vec<BudgetItem>>(raw, &budget_schema()).unwrap_err();
        assert!(matches!(err, GatewayError::SchemaMismatch(_)));
    }

    #[test]
    fn test_missing_required_field_reports_path() {
        let raw = r#"{"decision":"GO","rationale":"ok","checks":[{"item":"Eligibility"}]}"#;
        let err = decode::<JsonValue>(raw, &compliance_schema()).unwrap_err();
        match err {
            GatewayError::SchemaMismatch(msg) => assert!(msg.contains("/checks/0")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_not_json_is_parse_error() {
        let err = decode::<JsonValue>("I cannot help with that.", &compliance_schema()).unwrap_err();
        assert!(matches!(err, GatewayError::Parse(_)));
    }

    #[test]
    fn test_architecture_defaults_optional_fields() {
        let raw = r#"{"totalPoints":100,"sections":[{"name":"Need","points":25}]}"#;
        let map: ScoringMap = decode(raw, &architecture_schema()).unwrap();
        assert_eq!(map.sections[0].subsections, 0.0);
        assert!(map.logic_model.is_none());
        assert!(map.format_requirements.is_empty());
    }
}
