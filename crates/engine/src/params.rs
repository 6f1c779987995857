//! Typed parameter structs for the built-in flow-control node types.
//!
//! `Node::parameters` is a raw `serde_json::Map` at rest (per `spec.md`
//! §9's "Dynamic parameter maps" guidance); each flow-control node decodes
//! its own shape here, failing fast with `EngineError::BadParameters` on a
//! missing or malformed field rather than threading untyped JSON through
//! the scheduler.

use nervemind_core::NodeId;
use serde::Deserialize;

use crate::error::EngineError;

fn decode<'a, T: Deserialize<'a>>(
    node_id: &NodeId,
    node_type: &'static str,
    params: &'a serde_json::Map<String, serde_json::Value>,
) -> Result<T, EngineError> {
    serde_json::from_value(serde_json::Value::Object(params.clone()))
        .map_err(|e| EngineError::BadParameters { node_id: node_id.clone(), node_type, message: e.to_string() })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

/// `left`/`right` are `{{…}}` templates rendered against the current item
/// before comparison; a value that parses as an `f64` compares numerically,
/// otherwise the comparison falls back to string equality semantics.
#[derive(Debug, Clone, Deserialize)]
pub struct IfParams {
    pub left: String,
    pub operator: CompareOp,
    pub right: String,
}

impl IfParams {
    pub fn decode(node_id: &NodeId, params: &serde_json::Map<String, serde_json::Value>) -> Result<Self, EngineError> {
        decode(node_id, "if", params)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwitchParams {
    /// `{{…}}` template rendered against the current item.
    pub discriminator: String,
    /// Case values, in declaration order; case `i` emits on handle `case{i}`.
    pub cases: Vec<String>,
}

impl SwitchParams {
    pub fn decode(node_id: &NodeId, params: &serde_json::Map<String, serde_json::Value>) -> Result<Self, EngineError> {
        decode(node_id, "switch", params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    #[default]
    Passthrough,
    Concat,
    Zip,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeParams {
    #[serde(default)]
    pub mode: MergeMode,
    #[serde(default)]
    pub wait_for_all: bool,
}

impl MergeParams {
    pub fn decode(node_id: &NodeId, params: &serde_json::Map<String, serde_json::Value>) -> Result<Self, EngineError> {
        decode(node_id, "merge", params)
    }
}

/// `items_field` names a field of the loop's input envelope holding a JSON
/// array; one dispatch unit runs the loop body per item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopParams {
    pub items_field: String,
}

impl LoopParams {
    pub fn decode(node_id: &NodeId, params: &serde_json::Map<String, serde_json::Value>) -> Result<Self, EngineError> {
        decode(node_id, "loop", params)
    }
}

/// The wrapped unit is named explicitly by node id (`spec.md` §4.5's
/// "a pointer to a sub-node" variant) rather than inferred from graph
/// topology — this keeps retry/tryCatch scoping unambiguous regardless of
/// how the wrapped node's own downstream connections are wired.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryParams {
    pub body: NodeId,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub initial_delay_ms: Option<u64>,
    #[serde(default)]
    pub multiplier: Option<f64>,
}

impl RetryParams {
    pub fn decode(node_id: &NodeId, params: &serde_json::Map<String, serde_json::Value>) -> Result<Self, EngineError> {
        decode(node_id, "retry", params)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TryCatchParams {
    pub r#try: NodeId,
    pub catch: NodeId,
}

impl TryCatchParams {
    pub fn decode(node_id: &NodeId, params: &serde_json::Map<String, serde_json::Value>) -> Result<Self, EngineError> {
        decode(node_id, "tryCatch", params)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelParams {
    /// Output handle names fanned out to concurrently, in declaration order.
    pub branches: Vec<String>,
}

impl ParallelParams {
    pub fn decode(node_id: &NodeId, params: &serde_json::Map<String, serde_json::Value>) -> Result<Self, EngineError> {
        decode(node_id, "parallel", params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitMode {
    Queue,
    Reject,
    Delay,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitParams {
    pub requests_per_second: f64,
    pub mode: RateLimitMode,
}

impl RateLimitParams {
    pub fn decode(node_id: &NodeId, params: &serde_json::Map<String, serde_json::Value>) -> Result<Self, EngineError> {
        decode(node_id, "rateLimit", params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn if_params_decode() {
        let map = json!({"left": "{{a}}", "operator": "gt", "right": "{{b}}"}).as_object().unwrap().clone();
        let params = IfParams::decode(&NodeId::new("n"), &map).unwrap();
        assert_eq!(params.operator, CompareOp::Gt);
    }

    #[test]
    fn merge_params_default_mode_is_passthrough() {
        let map = json!({}).as_object().unwrap().clone();
        let params = MergeParams::decode(&NodeId::new("n"), &map).unwrap();
        assert_eq!(params.mode, MergeMode::Passthrough);
        assert!(!params.wait_for_all);
    }

    #[test]
    fn retry_params_requires_body() {
        let map = json!({}).as_object().unwrap().clone();
        assert!(RetryParams::decode(&NodeId::new("n"), &map).is_err());
    }

    #[test]
    fn try_catch_params_decode() {
        let map = json!({"try": "a", "catch": "b"}).as_object().unwrap().clone();
        let params = TryCatchParams::decode(&NodeId::new("n"), &map).unwrap();
        assert_eq!(params.r#try, NodeId::new("a"));
        assert_eq!(params.catch, NodeId::new("b"));
    }
}
