//! Chat Completions wire types.
//!
//! Only the fields Relay sends or reads are modelled; unknown response
//! fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ChatTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
}

/// A conversation message in the provider's format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ChatToolCall>,
    },
    Tool {
        content: String,
        tool_call_id: String,
    },
}

/// A completed tool call in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ChatFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatFunctionCall {
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

/// A tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ChatFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One `data:` payload of a streamed response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallChunk>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionChunk {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_empty_tools_and_unset_options() {
        let request = ChatCompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage::User {
                content: "hi".to_string(),
            }],
            stream: true,
            tools: vec![],
            max_tokens: None,
            stop: None,
            temperature: None,
            tool_choice: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true,
            })
        );
    }

    #[test]
    fn test_assistant_tool_call_and_tool_result_shape() {
        let messages = vec![
            ChatMessage::Assistant {
                content: None,
                tool_calls: vec![ChatToolCall {
                    id: "call_1".to_string(),
                    kind: "function",
                    function: ChatFunctionCall {
                        name: "search".to_string(),
                        arguments: r#"{"q":"rust"}"#.to_string(),
                    },
                }],
            },
            ChatMessage::Tool {
                content: "found".to_string(),
                tool_call_id: "call_1".to_string(),
            },
        ];

        let json = serde_json::to_value(&messages).unwrap();
        assert_eq!(json[0]["role"], "assistant");
        assert!(json[0].get("content").is_none());
        assert_eq!(json[0]["tool_calls"][0]["type"], "function");
        assert_eq!(json[0]["tool_calls"][0]["function"]["name"], "search");
        assert_eq!(json[1], json!({"role": "tool", "content": "found", "tool_call_id": "call_1"}));
    }

    #[test]
    fn test_chunk_tolerates_missing_fields() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"id":"c1","choices":[{"index":0,"delta":{}}],"usage":null}"#).unwrap();
        assert_eq!(chunk.id, "c1");
        assert!(chunk.choices[0].delta.content.is_none());

        let usage_only: ChatCompletionChunk = serde_json::from_str(r#"{"id":"c1","choices":[]}"#).unwrap();
        assert!(usage_only.choices.is_empty());
    }
}
