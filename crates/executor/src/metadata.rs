//! Static descriptor every executor carries, used by the registry and by
//! workflow validation (e.g. which node types may sit on a cycle).

use serde::{Deserialize, Serialize};

/// Whether a declared handle is an input or an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleDirection {
    Input,
    Output,
}

/// One named handle an executor declares, e.g. the `"true"`/`"false"`
/// outputs of an `if` node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleSpec {
    pub name: String,
    pub direction: HandleDirection,
}

impl HandleSpec {
    pub fn input(name: impl Into<String>) -> Self {
        Self { name: name.into(), direction: HandleDirection::Input }
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self { name: name.into(), direction: HandleDirection::Output }
    }
}

/// Static metadata describing one node type.
#[derive(Debug, Clone)]
pub struct ExecutorMetadata {
    /// Unique registry key (e.g. `"http.request"`, `"if"`, `"loop"`).
    pub key: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub handles: Vec<HandleSpec>,
    /// Whether this node type may start a workflow run.
    pub is_trigger: bool,
    /// Whether this node type may legally sit on a dependency cycle
    /// (`loop`, `retry`). Consulted by `nervemind_workflow::validate`.
    pub supports_looping: bool,
    /// Whether this node type requires a resolved credential to run.
    pub requires_credential: bool,
}

impl ExecutorMetadata {
    pub fn new(key: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            category: String::new(),
            handles: vec![HandleSpec::input("default"), HandleSpec::output("default")],
            is_trigger: false,
            supports_looping: false,
            requires_credential: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_handles(mut self, handles: Vec<HandleSpec>) -> Self {
        self.handles = handles;
        self
    }

    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    pub fn supporting_looping(mut self) -> Self {
        self.supports_looping = true;
        self
    }

    pub fn requiring_credential(mut self) -> Self {
        self.requires_credential = true;
        self
    }

    pub fn output_handles(&self) -> impl Iterator<Item = &HandleSpec> {
        self.handles.iter().filter(|h| h.direction == HandleDirection::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_flags() {
        let meta = ExecutorMetadata::new("loop", "Loop", "Iterate over a collection")
            .with_category("control-flow")
            .supporting_looping();

        assert_eq!(meta.key, "loop");
        assert!(meta.supports_looping);
        assert!(!meta.is_trigger);
        assert_eq!(meta.category, "control-flow");
    }

    #[test]
    fn output_handles_filters_direction() {
        let meta = ExecutorMetadata::new("if", "If", "Branch").with_handles(vec![
            HandleSpec::input("default"),
            HandleSpec::output("true"),
            HandleSpec::output("false"),
        ]);
        let outputs: Vec<_> = meta.output_handles().map(|h| h.name.as_str()).collect();
        assert_eq!(outputs, vec!["true", "false"]);
    }
}
