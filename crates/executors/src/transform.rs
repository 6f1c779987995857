//! The `set` / `filter` / `sort` built-ins. Per spec.md §4.6 these are
//! pure data transforms over the current item envelope — no network, no
//! credentials, and (since the scheduler already renders `{{…}}`
//! templates in a node's parameters before dispatch) no templating logic
//! of their own.

use async_trait::async_trait;
use nervemind_executor::{Executor, ExecutorContext, ExecutorError, ExecutorInput, ExecutorMetadata, ExecutorOutput};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;

use crate::code::eval;
use crate::decode_params;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetParams {
    fields: serde_json::Map<String, Value>,
    #[serde(default)]
    keep_only_set: bool,
}

/// Merges (or replaces) fields on the current item. Field values are
/// already-rendered literals by the time this runs — the node author
/// writes `{{…}}` templates directly into `fields`' values.
pub struct SetExecutor;

#[async_trait]
impl Executor for SetExecutor {
    fn metadata(&self) -> &ExecutorMetadata {
        static METADATA: std::sync::OnceLock<ExecutorMetadata> = std::sync::OnceLock::new();
        METADATA.get_or_init(|| ExecutorMetadata::new("set", "Set", "Add or replace fields on the current item").with_category("transform"))
    }

    async fn execute(&self, input: ExecutorInput, ctx: &ExecutorContext) -> Result<ExecutorOutput, ExecutorError> {
        let params: SetParams = decode_params(ctx.parameters())?;
        let item = input.default_value();

        let mut out = if params.keep_only_set {
            serde_json::Map::new()
        } else {
            match item {
                Value::Object(map) => map,
                Value::Null => serde_json::Map::new(),
                other => return Err(ExecutorError::config(format!("set requires an object item, got {other}"))),
            }
        };
        for (key, value) in params.fields {
            out.insert(key, value);
        }
        Ok(ExecutorOutput::single(Value::Object(out)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterParams {
    /// A restricted expression (same language as `code`) evaluated
    /// against each array element; elements for which it is falsy are
    /// dropped.
    expression: String,
}

/// Keeps only the elements of an array input for which `expression`
/// evaluates truthy.
pub struct FilterExecutor;

#[async_trait]
impl Executor for FilterExecutor {
    fn metadata(&self) -> &ExecutorMetadata {
        static METADATA: std::sync::OnceLock<ExecutorMetadata> = std::sync::OnceLock::new();
        METADATA.get_or_init(|| ExecutorMetadata::new("filter", "Filter", "Keep array elements matching an expression").with_category("transform"))
    }

    async fn execute(&self, input: ExecutorInput, ctx: &ExecutorContext) -> Result<ExecutorOutput, ExecutorError> {
        let params: FilterParams = decode_params(ctx.parameters())?;
        let Value::Array(items) = input.default_value() else {
            return Err(ExecutorError::config("filter requires an array item"));
        };

        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if is_truthy(&eval(&params.expression, &item).map_err(|e| ExecutorError::config(e.to_string()))?) {
                kept.push(item);
            }
        }
        Ok(ExecutorOutput::single(Value::Array(kept)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SortParams {
    /// A field-path expression (e.g. `"user.age"`) evaluated against each
    /// element to obtain its sort key.
    field: String,
    #[serde(default = "default_order")]
    order: String,
}

fn default_order() -> String {
    "asc".to_string()
}

/// Sorts an array input by the value `field` resolves to on each element.
pub struct SortExecutor;

#[async_trait]
impl Executor for SortExecutor {
    fn metadata(&self) -> &ExecutorMetadata {
        static METADATA: std::sync::OnceLock<ExecutorMetadata> = std::sync::OnceLock::new();
        METADATA.get_or_init(|| ExecutorMetadata::new("sort", "Sort", "Sort array elements by a field").with_category("transform"))
    }

    async fn execute(&self, input: ExecutorInput, ctx: &ExecutorContext) -> Result<ExecutorOutput, ExecutorError> {
        let params: SortParams = decode_params(ctx.parameters())?;
        let Value::Array(mut items) = input.default_value() else {
            return Err(ExecutorError::config("sort requires an array item"));
        };
        let descending = match params.order.as_str() {
            "asc" => false,
            "desc" => true,
            other => return Err(ExecutorError::config(format!("unknown sort order {other:?}"))),
        };

        let mut keyed: Vec<(Value, Value)> = Vec::with_capacity(items.len());
        for item in items.drain(..) {
            let key = eval(&params.field, &item).map_err(|e| ExecutorError::config(e.to_string()))?;
            keyed.push((key, item));
        }
        keyed.sort_by(|(a, _), (b, _)| {
            let ordering = compare_values(a, b);
            if descending { ordering.reverse() } else { ordering }
        });
        Ok(ExecutorOutput::single(Value::Array(keyed.into_iter().map(|(_, item)| item).collect())))
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nervemind_core::{ExecutionId, HandleKey, NodeId};
    use nervemind_executor::ExecutorContext;
    use nervemind_log::ExecutionLogger;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn ctx_with(params: Value) -> ExecutorContext {
        let execution_id = ExecutionId::v4();
        let logger = ExecutionLogger::new(execution_id.clone());
        ExecutorContext::new(execution_id, NodeId::new("n1"), CancellationToken::new(), logger)
            .with_parameters(params.as_object().unwrap().clone())
    }

    #[tokio::test]
    async fn set_merges_fields_into_object_item() {
        let ctx = ctx_with(json!({"fields": {"b": 2}}));
        let input = ExecutorInput::single(json!({"a": 1}));
        let out = SetExecutor.execute(input, &ctx).await.unwrap();
        assert_eq!(out.outputs_by_handle[&HandleKey::default_handle()], json!({"a": 1, "b": 2}));
    }

    #[tokio::test]
    async fn filter_drops_falsy_elements() {
        let ctx = ctx_with(json!({"expression": "value"}));
        let input = ExecutorInput::single(json!([{"value": 1}, {"value": 0}, {"value": "x"}]));
        let out = FilterExecutor.execute(input, &ctx).await.unwrap();
        assert_eq!(out.outputs_by_handle[&HandleKey::default_handle()], json!([{"value": 1}, {"value": "x"}]));
    }

    #[tokio::test]
    async fn sort_orders_by_field_ascending() {
        let ctx = ctx_with(json!({"field": "n"}));
        let input = ExecutorInput::single(json!([{"n": 3}, {"n": 1}, {"n": 2}]));
        let out = SortExecutor.execute(input, &ctx).await.unwrap();
        assert_eq!(out.outputs_by_handle[&HandleKey::default_handle()], json!([{"n": 1}, {"n": 2}, {"n": 3}]));
    }
}
