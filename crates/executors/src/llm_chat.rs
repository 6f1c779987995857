//! The `llmChat` built-in. Grounded on spec.md §4.6: one node type fans
//! out to several chat-completion providers, each with its own wire
//! format; `ollama` is the one provider that runs unauthenticated
//! against a local server, every other provider requires a resolved
//! credential.

use async_trait::async_trait;
use nervemind_executor::{Executor, ExecutorContext, ExecutorError, ExecutorInput, ExecutorMetadata, ExecutorOutput};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::decode_params;

/// A chat-completion backend `llmChat` knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Provider {
    Openai,
    Anthropic,
    Azure,
    Ollama,
    Google,
}

impl Provider {
    fn default_base_url(self) -> &'static str {
        match self {
            Provider::Openai => "https://api.openai.com/v1/chat/completions",
            Provider::Anthropic => "https://api.anthropic.com/v1/messages",
            Provider::Azure => "",
            Provider::Ollama => "http://localhost:11434/api/chat",
            Provider::Google => "https://generativelanguage.googleapis.com/v1beta/models",
        }
    }

    fn needs_credential(self) -> bool {
        !matches!(self, Provider::Ollama)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmChatParams {
    provider: Provider,
    model: String,
    prompt: String,
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
}

/// Calls a configured LLM provider with a single prompt/system pair and
/// returns `{response, usage?}`.
pub struct LlmChatExecutor {
    client: reqwest::Client,
    metadata: ExecutorMetadata,
}

impl LlmChatExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            metadata: ExecutorMetadata::new("llmChat", "LLM Chat", "Send a prompt to a language model").with_category("ai"),
        }
    }

    async fn call(&self, params: &LlmChatParams, ctx: &ExecutorContext) -> Result<Value, ExecutorError> {
        let credential = ctx.credential();
        if params.provider.needs_credential() && credential.is_none() {
            return Err(ExecutorError::config(format!("provider {:?} requires a credential", params.provider)));
        }

        let base_url = params.base_url.clone().unwrap_or_else(|| params.provider.default_base_url().to_string());
        if base_url.is_empty() {
            return Err(ExecutorError::config("baseUrl is required for the azure provider"));
        }

        let (url, body) = match params.provider {
            Provider::Openai | Provider::Azure => {
                let mut messages = Vec::new();
                if let Some(system) = &params.system {
                    messages.push(json!({"role": "system", "content": system}));
                }
                messages.push(json!({"role": "user", "content": params.prompt}));
                (base_url, json!({"model": params.model, "messages": messages, "temperature": params.temperature}))
            }
            Provider::Anthropic => (
                base_url,
                json!({
                    "model": params.model,
                    "system": params.system,
                    "max_tokens": 4096,
                    "messages": [{"role": "user", "content": params.prompt}],
                }),
            ),
            Provider::Ollama => (
                base_url,
                json!({
                    "model": params.model,
                    "stream": false,
                    "messages": [{"role": "user", "content": params.prompt}],
                }),
            ),
            Provider::Google => (format!("{base_url}/{}:generateContent", params.model), json!({
                "contents": [{"parts": [{"text": params.prompt}]}],
            })),
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(credential) = credential {
            request = match params.provider {
                Provider::Openai | Provider::Azure => request.bearer_auth(credential.expose()),
                Provider::Anthropic => request.header("x-api-key", credential.expose()).header("anthropic-version", "2023-06-01"),
                Provider::Google => request,
                Provider::Ollama => request,
            };
            if params.provider == Provider::Google {
                request = self.client.post(format!("{url}?key={}", credential.expose())).json(&body);
            }
        }

        let response = request.send().await.map_err(|e| ExecutorError::exec(format!("request failed: {e}")))?;
        let status = response.status();
        let body: Value = response.json().await.map_err(|e| ExecutorError::exec(format!("invalid JSON response: {e}")))?;
        if !status.is_success() {
            let message = body.get("error").map(ToString::to_string).unwrap_or_else(|| body.to_string());
            return if status.is_server_error() { Err(ExecutorError::exec(message)) } else { Err(ExecutorError::exec_fatal(message)) };
        }

        extract_response(params.provider, &body)
    }
}

impl Default for LlmChatExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_response(provider: Provider, body: &Value) -> Result<Value, ExecutorError> {
    let text = match provider {
        Provider::Openai | Provider::Azure => body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str),
        Provider::Anthropic => body.pointer("/content/0/text").and_then(Value::as_str),
        Provider::Ollama => body.pointer("/message/content").and_then(Value::as_str),
        Provider::Google => body.pointer("/candidates/0/content/parts/0/text").and_then(Value::as_str),
    }
    .ok_or_else(|| ExecutorError::exec_fatal("could not find response text in provider reply"))?;

    let mut out = serde_json::Map::new();
    out.insert("response".to_string(), Value::String(text.to_string()));
    let usage = match provider {
        Provider::Openai | Provider::Azure => body.get("usage").cloned(),
        Provider::Anthropic => body.get("usage").cloned(),
        Provider::Ollama => None,
        Provider::Google => body.get("usageMetadata").cloned(),
    };
    if let Some(usage) = usage {
        out.insert("usage".to_string(), usage);
    }
    Ok(Value::Object(out))
}

#[async_trait]
impl Executor for LlmChatExecutor {
    fn metadata(&self) -> &ExecutorMetadata {
        &self.metadata
    }

    async fn execute(&self, input: ExecutorInput, ctx: &ExecutorContext) -> Result<ExecutorOutput, ExecutorError> {
        let _ = &input;
        let params: LlmChatParams = decode_params(ctx.parameters())?;
        let result = self.call(&params, ctx).await?;
        Ok(ExecutorOutput::single(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_does_not_require_a_credential() {
        assert!(!Provider::Ollama.needs_credential());
        assert!(Provider::Openai.needs_credential());
        assert!(Provider::Anthropic.needs_credential());
    }

    #[test]
    fn extracts_openai_shaped_response() {
        let body = json!({"choices": [{"message": {"content": "hello"}}], "usage": {"total_tokens": 12}});
        let out = extract_response(Provider::Openai, &body).unwrap();
        assert_eq!(out.get("response").and_then(Value::as_str), Some("hello"));
        assert_eq!(out.get("usage").and_then(|u| u.get("total_tokens")).and_then(Value::as_u64), Some(12));
    }

    #[test]
    fn extracts_anthropic_shaped_response() {
        let body = json!({"content": [{"type": "text", "text": "hi there"}]});
        let out = extract_response(Provider::Anthropic, &body).unwrap();
        assert_eq!(out.get("response").and_then(Value::as_str), Some("hi there"));
    }

    #[test]
    fn missing_response_text_is_fatal() {
        let body = json!({"unexpected": true});
        assert!(extract_response(Provider::Ollama, &body).is_err());
    }
}
