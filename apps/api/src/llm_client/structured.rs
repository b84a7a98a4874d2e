//! Structured Call: one instruction plus typed inputs in, one typed result out.
//!
//! The prompt asks the model for `{"reasoning": ..., "<output>": ...}`. The
//! reasoning is read and dropped; only the named output is decoded, then
//! checked by the shape's own `StructuredOutput::validate`. Every decode
//! failure is `LlmError::MalformedResponse`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::llm_client::prompts::{CHAIN_OF_THOUGHT_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{strip_json_fences, CompletionBackend, LlmError};

/// A typed shape a structured call can produce.
///
/// `validate` runs after serde decoding and rejects values that parse but
/// break the shape's invariants.
pub trait StructuredOutput: DeserializeOwned {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl<T: StructuredOutput> StructuredOutput for Vec<T> {
    fn validate(&self) -> Result<(), String> {
        self.iter()
            .enumerate()
            .try_for_each(|(i, item)| item.validate().map_err(|e| format!("item {i}: {e}")))
    }
}

#[derive(Debug, Clone)]
struct InputField {
    name: &'static str,
    desc: &'static str,
    value: Value,
}

#[derive(Debug, Clone)]
struct OutputField {
    name: &'static str,
    desc: &'static str,
    shape: &'static str,
}

/// A single structured request, built per call site.
#[derive(Debug, Clone)]
pub struct StructuredCall {
    instruction: &'static str,
    inputs: Vec<InputField>,
    output: OutputField,
}

impl StructuredCall {
    /// `output_shape` is a JSON example of the value expected under `output_name`.
    pub fn new(
        instruction: &'static str,
        output_name: &'static str,
        output_desc: &'static str,
        output_shape: &'static str,
    ) -> Self {
        Self {
            instruction,
            inputs: Vec::new(),
            output: OutputField {
                name: output_name,
                desc: output_desc,
                shape: output_shape,
            },
        }
    }

    pub fn input(mut self, name: &'static str, desc: &'static str, value: impl Into<Value>) -> Self {
        self.inputs.push(InputField {
            name,
            desc,
            value: value.into(),
        });
        self
    }

    pub fn render_prompt(&self) -> String {
        let mut prompt = String::with_capacity(1024);
        prompt.push_str(self.instruction);
        prompt.push_str("\n\nINPUTS:\n");
        for field in &self.inputs {
            let rendered = match &field.value {
                Value::String(s) => s.clone(),
                other => format!("{other:#}"),
            };
            prompt.push_str(&format!("- {} ({}):\n{}\n\n", field.name, field.desc, rendered));
        }
        prompt.push_str(&format!(
            "OUTPUT:\n- {}: {}\nShape of \"{}\":\n{}\n\n",
            self.output.name, self.output.desc, self.output.name, self.output.shape
        ));
        prompt.push_str(&CHAIN_OF_THOUGHT_INSTRUCTION.replace("{output_name}", self.output.name));
        prompt
    }

    /// Sends the call once and decodes the reply.
    pub async fn invoke<T: StructuredOutput>(
        &self,
        backend: &dyn CompletionBackend,
    ) -> Result<T, LlmError> {
        let raw = backend
            .complete(JSON_ONLY_SYSTEM, &self.render_prompt())
            .await?;
        self.decode(&raw)
    }

    pub fn decode<T: StructuredOutput>(&self, raw: &str) -> Result<T, LlmError> {
        let name = self.output.name;
        let envelope: Value = serde_json::from_str(strip_json_fences(raw))
            .map_err(|e| LlmError::MalformedResponse(format!("reply is not JSON: {e}")))?;

        let Value::Object(mut fields) = envelope else {
            return Err(LlmError::MalformedResponse(
                "reply is not a JSON object".to_string(),
            ));
        };

        if let Some(reasoning) = fields.get("reasoning").and_then(Value::as_str) {
            debug!(output = name, reasoning_chars = reasoning.len(), "Discarding reasoning");
        }

        let value = fields.remove(name).ok_or_else(|| {
            LlmError::MalformedResponse(format!("missing required field '{name}'"))
        })?;

        let output: T = serde_json::from_value(value).map_err(|e| {
            LlmError::MalformedResponse(format!("field '{name}' has the wrong shape: {e}"))
        })?;

        output
            .validate()
            .map_err(|e| LlmError::MalformedResponse(format!("field '{name}' is invalid: {e}")))?;

        Ok(output)
    }
}
