//! How a chat request is made to return JSON.
//!
//! Endpoints that enforce a schema get it through `response_format`; the
//! rest are switched to JSON object mode and told about the schema in text.

use crate::request::{ChatRequest, ResponseFormat};
use modelgate_core::{ChatMessage, ModelError, OutputSchema};
use serde_json::Value;

/// Rewrites a chat request so the endpoint answers with JSON.
pub trait JsonOutputStrategy: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn apply(&self, req: &mut ChatRequest, schema: &OutputSchema) -> Result<(), ModelError>;
}

/// Sends the schema as `response_format: json_schema`.
///
/// In strict mode every object in the schema is closed
/// (`additionalProperties: false`) and lists all of its properties as
/// required, which strict endpoints demand. Optional fields stay nullable
/// through their own type.
#[derive(Debug, Clone)]
pub struct JsonSchemaStrategy {
    pub strict: bool,
}

impl JsonSchemaStrategy {
    pub fn new() -> Self {
        Self { strict: true }
    }

    /// Endpoint-safe schema name: `[a-zA-Z0-9_-]{1,64}`
    fn schema_name(name: &str) -> String {
        let cleaned: String = name
            .chars()
            .filter_map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' => Some(c),
                ' ' | '.' | ':' | '<' | '>' | ',' => Some('_'),
                _ => None,
            })
            .take(64)
            .collect();

        if cleaned.is_empty() {
            "response".to_string()
        } else {
            cleaned
        }
    }
}

impl Default for JsonSchemaStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonOutputStrategy for JsonSchemaStrategy {
    fn name(&self) -> &str {
        "JsonSchemaStrategy"
    }

    fn apply(&self, req: &mut ChatRequest, schema: &OutputSchema) -> Result<(), ModelError> {
        let mut document = schema.schema.clone();
        if self.strict {
            close_objects(&mut document);
        }

        req.response_format = Some(ResponseFormat::JsonSchema {
            name: Self::schema_name(&schema.name),
            schema: document,
            strict: self.strict,
        });
        Ok(())
    }
}

// Keywords whose values are data, not subschemas.
const LITERAL_KEYWORDS: [&str; 4] = ["const", "default", "enum", "examples"];

fn close_objects(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            let property_names: Option<Vec<Value>> = match map.get("properties") {
                Some(Value::Object(properties)) => {
                    Some(properties.keys().cloned().map(Value::String).collect())
                }
                _ => None,
            };

            if let Some(required) = property_names {
                map.insert("required".to_string(), Value::Array(required));
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                if let Some(Value::Object(properties)) = map.get_mut("properties") {
                    properties.values_mut().for_each(close_objects);
                }
            }

            for (key, value) in map.iter_mut() {
                if key != "properties" && !LITERAL_KEYWORDS.contains(&key.as_str()) {
                    close_objects(value);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

/// Where [`JsonModeStrategy`] puts the schema instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstructionPlacement {
    /// A system message ahead of the conversation
    #[default]
    LeadingSystem,
    /// Appended to the most recent user turn
    LastUserTurn,
}

/// Switches the endpoint to JSON object mode and describes the schema in
/// the conversation.
#[derive(Debug, Clone, Default)]
pub struct JsonModeStrategy {
    pub placement: InstructionPlacement,
}

impl JsonModeStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placement(placement: InstructionPlacement) -> Self {
        Self { placement }
    }

    fn instruction(schema: &OutputSchema) -> Result<String, ModelError> {
        let rendered = serde_json::to_string_pretty(&schema.schema)?;
        Ok(format!(
            "Reply with a single JSON value named `{}` conforming to this JSON Schema:\n\
            {}\n\
            Output the JSON only. Do not wrap it in prose or code fences, and include every required field.",
            schema.name, rendered
        ))
    }
}

impl JsonOutputStrategy for JsonModeStrategy {
    fn name(&self) -> &str {
        "JsonModeStrategy"
    }

    fn apply(&self, req: &mut ChatRequest, schema: &OutputSchema) -> Result<(), ModelError> {
        let instruction = Self::instruction(schema)?;
        req.response_format = Some(ResponseFormat::JsonObject);

        let last_user = req.messages.iter_mut().rev().find(|m| m.role == "user");
        match (self.placement, last_user) {
            (InstructionPlacement::LastUserTurn, Some(turn)) => {
                turn.content = format!("{}\n\n{}", turn.content, instruction);
            }
            (InstructionPlacement::LastUserTurn, None) => {
                req.messages.push(ChatMessage::user(instruction));
            }
            (InstructionPlacement::LeadingSystem, _) => {
                req.messages.insert(0, ChatMessage::system(instruction));
            }
        }
        Ok(())
    }
}

/// Strategy for a provider id. Only OpenAI and Azure enforce schemas.
pub fn detect_json_strategy(provider_id: &str) -> Box<dyn JsonOutputStrategy> {
    match provider_id {
        "openai" | "azure" => Box::new(JsonSchemaStrategy::new()),
        _ => Box::new(JsonModeStrategy::new()),
    }
}
