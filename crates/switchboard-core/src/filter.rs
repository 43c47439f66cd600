//! Static tool filtering

use crate::types::ToolInfo;
use std::collections::BTreeSet;

/// Predicate restricting which remote tool names are exposed and callable
///
/// Built from a server's `allowed_tools` list. A tool passes when its name is
/// in the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFilter {
    allowed: BTreeSet<String>,
}

impl ToolFilter {
    /// Allow only the named tools
    pub fn allow_only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, tool_name: &str) -> bool {
        self.allowed.contains(tool_name)
    }

    /// Keep only the tools this filter allows, preserving catalog order
    pub fn apply(&self, tools: Vec<ToolInfo>) -> Vec<ToolInfo> {
        tools.into_iter().filter(|t| self.allows(&t.name)).collect()
    }
}
