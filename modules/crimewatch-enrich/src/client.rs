//! Minimal Anthropic-style messages client with forced-tool structured output.
//!
//! The classifier's JSON schema is sent as a tool definition and the model is
//! forced to call it, so responses are schema-shaped by construction instead
//! of parsed out of free text.

use anyhow::{anyhow, Result};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const API_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;

pub(crate) struct LlmClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

// --- Wire types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
    tools: Vec<ToolDefinition<'a>>,
    tool_choice: serde_json::Value,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ToolDefinition<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[allow(dead_code)]
        text: String,
    },
    ToolUse {
        input: serde_json::Value,
    },
}

impl LlmClient {
    pub(crate) fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: API_URL.to_string(),
        }
    }

    /// One structured-output call: returns the tool input deserialized as `T`.
    pub(crate) async fn extract<T: DeserializeOwned + JsonSchema>(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<T> {
        let schema = serde_json::to_value(schemars::schema_for!(T))?;

        let tool_name = "structured_response";
        let request = ChatRequest {
            model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![WireMessage {
                role: "user",
                content: user,
            }],
            tools: vec![ToolDefinition {
                name: tool_name,
                description: "Record the structured classification of the input.",
                input_schema: schema,
            }],
            tool_choice: serde_json::json!({ "type": "tool", "name": tool_name }),
        };

        debug!(model, "LLM classification request");

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("LLM API error ({status}): {error_text}"));
        }

        let chat: ChatResponse = response.json().await?;

        for block in chat.content {
            if let ContentBlock::ToolUse { input } = block {
                return serde_json::from_value(input)
                    .map_err(|e| anyhow!("LLM response failed schema validation: {e}"));
            }
        }

        Err(anyhow!("No structured output in LLM response"))
    }
}
