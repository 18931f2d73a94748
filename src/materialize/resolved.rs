// Resolved Table
// Append-only placeholder -> minted identifier map for one unit of work

use crate::materialize::engine::MaterializeError;

use std::collections::HashMap;

/// Append-only map from placeholder name to concrete identifier, scoped to
/// one (biosample, protocol) unit of work.
///
/// It starts with exactly one seed entry, the root biosample, and rejects
/// redefinition, which makes "referenced before creation" mechanically
/// checkable: a placeholder either resolves or it was never materialized.
/// Insertion order is preserved so downstream output is deterministic.
#[derive(Debug, Clone)]
pub struct ResolvedTable {
    index: HashMap<String, usize>,
    entries: Vec<(String, String)>,
}

impl ResolvedTable {
    /// Create a table holding only the root entry.
    pub fn seeded(root_name: &str, root_id: &str) -> Self {
        let mut table = Self {
            index: HashMap::new(),
            entries: Vec::new(),
        };
        table.index.insert(root_name.to_string(), 0);
        table.entries.push((root_name.to_string(), root_id.to_string()));
        table
    }

    /// Name of the seed entry.
    pub fn root_name(&self) -> &str {
        &self.entries[0].0
    }

    /// Resolve a placeholder to its identifier, if it has been materialized.
    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.index
            .get(placeholder)
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Record a freshly minted identifier; a placeholder may be resolved at
    /// most once per unit of work.
    pub fn insert(&mut self, placeholder: &str, id: &str) -> Result<(), MaterializeError> {
        if self.index.contains_key(placeholder) {
            return Err(MaterializeError::DuplicateResolution {
                placeholder: placeholder.to_string(),
            });
        }
        self.index.insert(placeholder.to_string(), self.entries.len());
        self.entries.push((placeholder.to_string(), id.to_string()));
        Ok(())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, id)| (n.as_str(), id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_entry_is_resolvable() {
        let table = ResolvedTable::seeded("Biosample", "nmdc:bsm-1");
        assert_eq!(table.get("Biosample"), Some("nmdc:bsm-1"));
        assert_eq!(table.root_name(), "Biosample");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_then_get() {
        let mut table = ResolvedTable::seeded("Biosample", "nmdc:bsm-1");
        table.insert("extract", "nmdc:procsm-1").unwrap();

        assert_eq!(table.get("extract"), Some("nmdc:procsm-1"));
        assert_eq!(table.get("pellet"), None);
    }

    #[test]
    fn test_redefinition_rejected() {
        let mut table = ResolvedTable::seeded("Biosample", "nmdc:bsm-1");
        table.insert("extract", "nmdc:procsm-1").unwrap();

        let err = table.insert("extract", "nmdc:procsm-2").unwrap_err();
        assert!(matches!(
            err,
            MaterializeError::DuplicateResolution { placeholder } if placeholder == "extract"
        ));
    }

    #[test]
    fn test_iteration_preserves_insertion_order() {
        let mut table = ResolvedTable::seeded("Biosample", "nmdc:bsm-1");
        table.insert("b", "id-b").unwrap();
        table.insert("a", "id-a").unwrap();

        let names: Vec<&str> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Biosample", "b", "a"]);
    }
}
