use async_trait::async_trait;
use folio_common::types::ModelType;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("input_data must be a string or a JSON object")]
    UnsupportedInput,

    #[error("input is {len} characters, the model accepts at most {max}")]
    InputTooLong { len: usize, max: usize },

    #[error("{0}")]
    Other(String),
}

/// One invocation against a registered model.
#[derive(Debug, Clone)]
pub struct InferenceJob {
    pub model_type: ModelType,
    /// Longest accepted text input, in characters
    pub max_input_length: usize,
    pub input_data: Value,
    pub parameters: Value,
}

impl InferenceJob {
    /// The text the model operates on: the string itself, or the first of
    /// `text`, `prompt`, `context`, `question` present in an object.
    /// Objects without any of those yield their JSON encoding.
    pub fn input_text(&self) -> Result<String, InferenceError> {
        match &self.input_data {
            Value::String(s) => Ok(s.clone()),
            Value::Object(map) => Ok(["text", "prompt", "context", "question"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| self.input_data.to_string())),
            _ => Err(InferenceError::UnsupportedInput),
        }
    }

    /// A string parameter, if the caller supplied one.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

/// Produces a result payload for an inference job.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn infer(&self, job: InferenceJob) -> Result<Value, InferenceError>;

    async fn health_check(&self) -> Result<(), InferenceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(input: Value) -> InferenceJob {
        InferenceJob {
            model_type: ModelType::Custom,
            max_input_length: 512,
            input_data: input,
            parameters: json!({"target_language": "fr"}),
        }
    }

    #[test]
    fn input_text_prefers_known_keys() {
        assert_eq!(job(json!("plain")).input_text().unwrap(), "plain");
        assert_eq!(
            job(json!({"other": 1, "prompt": "once upon"})).input_text().unwrap(),
            "once upon"
        );
        assert_eq!(job(json!({"n": 1})).input_text().unwrap(), r#"{"n":1}"#);
    }

    #[test]
    fn non_text_input_is_rejected() {
        for input in [json!(42), json!([1, 2]), json!(true)] {
            assert!(matches!(
                job(input).input_text(),
                Err(InferenceError::UnsupportedInput)
            ));
        }
    }

    #[test]
    fn parameters_are_read_as_strings() {
        let j = job(json!("x"));
        assert_eq!(j.parameter("target_language"), Some("fr"));
        assert_eq!(j.parameter("missing"), None);
    }
}
