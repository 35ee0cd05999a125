//! Scope vocabulary rewriting.
//!
//! Spec authors write `{{workspace.…}}` references; the orchestrator only
//! understands `{{workflow.…}}`. Compiled output is rewritten to the
//! execution vocabulary, and orchestrator messages are rewritten back
//! before they reach the author.

pub const AUTHORING_SCOPE: &str = "{{workspace.";
pub const EXECUTION_SCOPE: &str = "{{workflow.";

/// Rewrites authoring references into execution references.
///
/// Must run last, over the fully serialized graph: any stage that emits
/// text after this pass would leak authoring references to the orchestrator.
pub fn to_execution_scope(serialized: &str) -> String {
    serialized.replace(AUTHORING_SCOPE, EXECUTION_SCOPE)
}

/// Rewrites execution references in a message into the authoring vocabulary.
pub fn to_authoring_scope(message: &str) -> String {
    message.replace(EXECUTION_SCOPE, AUTHORING_SCOPE)
}

/// Whether any authoring reference survived in the text.
pub fn has_authoring_references(text: &str) -> bool {
    text.contains(AUTHORING_SCOPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_rewrite() {
        let input = "host: {{workspace.parameters.sys-uid}}\nns: {{workspace.namespace}}";
        assert_eq!(
            to_execution_scope(input),
            "host: {{workflow.parameters.sys-uid}}\nns: {{workflow.namespace}}"
        );
    }

    #[test]
    fn test_rewrite_leaves_other_scopes() {
        let input = "{{inputs.parameters.x}} {{tasks.a.outputs.parameters.b}} {{item}}";
        assert_eq!(to_execution_scope(input), input);
    }

    #[test]
    fn test_execution_rewrite_is_idempotent() {
        let once = to_execution_scope("{{workspace.parameters.a}}");
        assert_eq!(to_execution_scope(&once), once);
        assert!(!has_authoring_references(&once));
    }

    #[test]
    fn test_authoring_rewrite_for_messages() {
        let message = "failed to resolve {{workflow.parameters.foo}}";
        assert_eq!(
            to_authoring_scope(message),
            "failed to resolve {{workspace.parameters.foo}}"
        );
    }
}
