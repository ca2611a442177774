//! The prompt sent to the LLM and the keys it promises to return.
//!
//! Retrieval renders the template and extraction reads the keys back, so both
//! sides share one versioned [`PromptContract`].

use crate::error::ContractError;
use crate::schema::RequirementsSpec;

/// Substitution slot for the retrieved chunks.
pub const CONTEXT_SLOT: &str = "{context}";

/// Top-level keys every requirements spec is expected to carry.
pub const REQUIRED_KEYS: [&str; 4] = ["endpoints", "logic", "schema", "auth"];

const TEMPLATE_V1: &str = r#"You are an assistant that extracts the functional requirements from an SRS document of a project.
Your task is to extract the required points from the given context.
Given the context (pulled from the SRS):

{context}

Please extract and return **only** the following requirements in JSON format with these keys:
- "endpoints": list of objects { "path": "", "method": "", "params": [...], "description": "" }
- "logic": description of the system's business rules and computations
- "schema": description of tables, relationships, and constraints
- "auth": description of authentication and authorization mechanisms
"#;

#[derive(Debug, Clone)]
pub struct PromptContract {
    pub version: u32,
    pub template: String,
    pub required_keys: Vec<&'static str>,
}

impl PromptContract {
    pub fn v1() -> Self {
        Self {
            version: 1,
            template: TEMPLATE_V1.to_string(),
            required_keys: REQUIRED_KEYS.to_vec(),
        }
    }

    /// Check the template still has exactly one context slot and names every
    /// required key as a quoted JSON key.
    pub fn validate(&self) -> Result<(), ContractError> {
        match self.template.matches(CONTEXT_SLOT).count() {
            0 => {
                return Err(ContractError::MissingContextSlot {
                    version: self.version,
                });
            }
            1 => {}
            _ => {
                return Err(ContractError::DuplicateContextSlot {
                    version: self.version,
                });
            }
        }

        for &key in &self.required_keys {
            if !self.template.contains(&format!("\"{key}\"")) {
                return Err(ContractError::MissingKey {
                    version: self.version,
                    key,
                });
            }
        }

        Ok(())
    }

    pub fn render(&self, context: &str) -> String {
        self.template.replacen(CONTEXT_SLOT, context, 1)
    }

    /// Required keys absent from `spec`, in contract order.
    pub fn missing_keys(&self, spec: &RequirementsSpec) -> Vec<&'static str> {
        self.required_keys
            .iter()
            .copied()
            .filter(|key| !spec.as_object().contains_key(*key))
            .collect()
    }
}

impl Default for PromptContract {
    fn default() -> Self {
        Self::v1()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_is_valid() {
        let contract = PromptContract::v1();
        assert_eq!(contract.validate(), Ok(()));
        assert_eq!(contract.required_keys, vec!["endpoints", "logic", "schema", "auth"]);
    }

    #[test]
    fn test_render_fills_context() {
        let prompt = PromptContract::v1().render("Users log in with email and password.");
        assert!(prompt.contains("Users log in with email and password."));
        assert!(!prompt.contains(CONTEXT_SLOT));
        // The literal braces of the example endpoint survive rendering
        assert!(prompt.contains(r#"{ "path": "", "method": """#));
    }

    #[test]
    fn test_render_does_not_expand_slot_in_context() {
        let prompt = PromptContract::v1().render("literal {context} in the document");
        assert!(prompt.contains("literal {context} in the document"));
    }

    #[test]
    fn test_missing_keys_follow_contract() {
        let spec = crate::parse_response(r#"{"logic": "x", "endpoints": []}"#).unwrap();
        assert_eq!(PromptContract::v1().missing_keys(&spec), vec!["schema", "auth"]);

        let mut contract = PromptContract::v1();
        contract.required_keys = vec!["logic"];
        assert!(contract.missing_keys(&spec).is_empty());
    }

    #[test]
    fn test_dropped_key_is_caught() {
        let mut contract = PromptContract::v1();
        contract.template = contract
            .template
            .replace("- \"auth\": description of authentication and authorization mechanisms\n", "");

        assert_eq!(
            contract.validate(),
            Err(ContractError::MissingKey { version: 1, key: "auth" })
        );
    }

    #[test]
    fn test_context_slot_checks() {
        let mut contract = PromptContract::v1();
        contract.template = contract.template.replace(CONTEXT_SLOT, "");
        assert_eq!(
            contract.validate(),
            Err(ContractError::MissingContextSlot { version: 1 })
        );

        let mut contract = PromptContract::v1();
        contract.template.push_str("\n{context}\n");
        assert_eq!(
            contract.validate(),
            Err(ContractError::DuplicateContextSlot { version: 1 })
        );
    }
}
