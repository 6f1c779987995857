//! The `httpRequest` built-in. Grounded on spec.md §4.6: `{{…}}`
//! interpolation of every string field happens upstream (the scheduler
//! renders a node's `parameters` before dispatch) — this executor only
//! ever sees already-resolved values.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use nervemind_credential::SecretKind;
use nervemind_executor::{
    Executor, ExecutorContext, ExecutorError, ExecutorInput, ExecutorMetadata, ExecutorOutput,
};
use serde::Deserialize;
use serde_json::Value;

use crate::decode_params;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpRequestParams {
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    fail_on_status: bool,
    /// Header name used for `SecretKind::Custom` credentials.
    #[serde(default = "default_auth_header")]
    auth_header: String,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_auth_header() -> String {
    "Authorization".to_string()
}

/// `GET`/`POST`/`PUT`/`PATCH`/`DELETE`/`HEAD` with `{{…}}`-interpolated
/// url/headers/body, credential attachment per `SecretKind`, and a
/// `failOnStatus`-gated treatment of non-2xx responses.
pub struct HttpRequestExecutor {
    client: reqwest::Client,
    metadata: ExecutorMetadata,
}

impl HttpRequestExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self { client: reqwest::Client::new(), metadata: ExecutorMetadata::new("httpRequest", "HTTP Request", "Call an HTTP endpoint").with_category("network") }
    }
}

impl Default for HttpRequestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for HttpRequestExecutor {
    fn metadata(&self) -> &ExecutorMetadata {
        &self.metadata
    }

    async fn execute(&self, input: ExecutorInput, ctx: &ExecutorContext) -> Result<ExecutorOutput, ExecutorError> {
        let params: HttpRequestParams = decode_params(ctx.parameters())?;
        let method: reqwest::Method = params
            .method
            .parse()
            .map_err(|_| ExecutorError::config(format!("unsupported HTTP method {:?}", params.method)))?;

        let mut request = self.client.request(method, &params.url);
        for (name, value) in &params.headers {
            request = request.header(name, value);
        }
        if let Some(timeout_ms) = params.timeout_ms {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(body) = &params.body {
            request = request.json(body);
        }

        if let (Some(credential), Some(kind)) = (ctx.credential(), ctx.credential_kind()) {
            request = match kind {
                SecretKind::BearerToken => request.bearer_auth(credential.expose()),
                SecretKind::BasicAuth => match credential.expose().split_once(':') {
                    Some((user, pass)) => request.basic_auth(user, Some(pass)),
                    None => request.basic_auth(credential.expose(), None::<&str>),
                },
                SecretKind::ApiKey => request.header("X-Api-Key", credential.expose()),
                SecretKind::Custom => request.header(params.auth_header.as_str(), credential.expose()),
            };
        }

        let _ = &input; // httpRequest has no upstream-handle inputs of its own; it reads `parameters` only.

        let response = request.send().await.map_err(|e| ExecutorError::exec(format!("request failed: {e}")))?;
        let status = response.status();
        let headers: serde_json::Map<String, Value> = response
            .headers()
            .iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_str().unwrap_or_default().to_string())))
            .collect();
        let body_text = response.text().await.map_err(|e| ExecutorError::exec(format!("reading body failed: {e}")))?;
        let json_body = serde_json::from_str::<Value>(&body_text).ok();

        if status.as_u16() >= 400 && params.fail_on_status {
            let message = format!("HTTP {} for {}", status.as_u16(), params.url);
            return if status.is_server_error() { Err(ExecutorError::exec(message)) } else { Err(ExecutorError::exec_fatal(message)) };
        }

        let mut out = serde_json::Map::new();
        out.insert("statusCode".to_string(), Value::from(status.as_u16()));
        out.insert("headers".to_string(), Value::Object(headers));
        out.insert("body".to_string(), Value::String(body_text));
        if let Some(json) = json_body {
            out.insert("json".to_string(), json);
        }

        Ok(ExecutorOutput::single(Value::Object(out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_defaults_when_only_url_given() {
        let map = serde_json::json!({"url": "https://example.com"}).as_object().unwrap().clone();
        let params: HttpRequestParams = decode_params(&map).unwrap();
        assert_eq!(params.method, "GET");
        assert!(!params.fail_on_status);
        assert_eq!(params.auth_header, "Authorization");
    }

    #[test]
    fn rejects_unknown_method_string() {
        let map = serde_json::json!({"url": "https://example.com", "method": "NOT-A-METHOD!!"}).as_object().unwrap().clone();
        let params: HttpRequestParams = decode_params(&map).unwrap();
        assert!(params.method.parse::<reqwest::Method>().is_err());
    }
}
