use crate::columns::error::ColumnError;
use crate::types::variable::{CanonicalVariable, VariableTable};
use std::collections::HashMap;

/// Translates between short variable names (acronyms such as `T`) and long
/// display names (such as `Temperature`).
#[derive(Debug, Clone)]
pub struct ColumnNameResolver {
    short_to_long: HashMap<String, String>,
    long_to_short: HashMap<String, String>,
}

impl ColumnNameResolver {
    pub fn new(variables: &[CanonicalVariable]) -> Self {
        let short_to_long: HashMap<String, String> = variables
            .iter()
            .map(|v| (v.acronym.to_string(), v.display_name.to_string()))
            .collect();
        let long_to_short = short_to_long
            .iter()
            .map(|(short, long)| (long.clone(), short.clone()))
            .collect();
        Self {
            short_to_long,
            long_to_short,
        }
    }

    pub fn for_table(table: &VariableTable) -> Self {
        Self::new(&table.canonical_variables())
    }

    /// Returns the acronym for either a short or a long name.
    pub fn resolve(&self, name: &str) -> Result<String, ColumnError> {
        if self.short_to_long.contains_key(name) {
            return Ok(name.to_string());
        }
        self.long_to_short
            .get(name)
            .cloned()
            .ok_or_else(|| ColumnError::UnknownVariable(name.to_string()))
    }

    /// Resolves every name in order, failing on the first unknown one.
    pub fn resolve_many<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>, ColumnError> {
        names.iter().map(|n| self.resolve(n.as_ref())).collect()
    }

    pub fn long_name(&self, acronym: &str) -> Option<&str> {
        self.short_to_long.get(acronym).map(String::as_str)
    }
}
