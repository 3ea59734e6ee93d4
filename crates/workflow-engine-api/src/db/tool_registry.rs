//! Read-through tool-description cache, loaded once from `mcp_tools` at
//! boot and held for the process lifetime. Not required by any handler
//! operation; it is ambient catalogue data mirroring the original's
//! `ToolRegistry`, exposed for authoring/introspection surfaces.

use std::collections::HashMap;
use workflow_engine_core::error::WorkflowError;

use super::pool::DbPool;

pub struct ToolRegistry {
    descriptions: HashMap<String, String>,
}

impl ToolRegistry {
    pub fn load(pool: &DbPool) -> Result<Self, WorkflowError> {
        use diesel::prelude::*;
        use super::schema::mcp_tools::dsl;

        let mut conn = pool.get().map_err(|e| WorkflowError::PersistenceFailure {
            message: format!("failed to acquire db connection: {e}"),
        })?;

        let rows: Vec<(String, Option<String>)> = dsl::mcp_tools
            .select((dsl::name, dsl::description))
            .load(&mut conn)
            .map_err(|e| WorkflowError::PersistenceFailure {
                message: format!("tool registry load failed: {e}"),
            })?;

        let descriptions = rows
            .into_iter()
            .filter_map(|(name, description)| description.map(|d| (name, d)))
            .collect();

        Ok(Self { descriptions })
    }

    pub fn tool_description(&self, name: &str) -> Option<&str> {
        self.descriptions.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_has_no_description() {
        let registry = ToolRegistry {
            descriptions: HashMap::new(),
        };
        assert!(registry.tool_description("unknown").is_none());
    }
}
