//! Module catalog: maps a module type name to its terminal definition.
//!
//! Modules in a document may omit `inputs`/`outputs`; those lists are then
//! taken from the module's inline `module_def`, or failing that from the
//! catalog entry for its `module` type.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustyflow::catalog::{ModuleCatalog, ModuleDef};
//!
//! let mut catalog = ModuleCatalog::new();
//! catalog.insert("ncnr.load", ModuleDef::from_ids(&[], &["output"]));
//! assert!(catalog.get("ncnr.load").is_some());
//! ```

use anyhow::Context;
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{ModuleSpec, Polarity, TerminalSpec};

/// Terminal definition of a module type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDef {
    #[serde(default)]
    pub inputs: Vec<TerminalSpec>,
    #[serde(default)]
    pub outputs: Vec<TerminalSpec>,
}

impl ModuleDef {
    /// Build a definition from terminal ids (labels equal to ids).
    pub fn from_ids(inputs: &[&str], outputs: &[&str]) -> Self {
        let terminals = |ids: &[&str]| {
            ids.iter()
                .map(|id| TerminalSpec::new(*id, *id))
                .collect::<Vec<_>>()
        };
        Self {
            inputs: terminals(inputs),
            outputs: terminals(outputs),
        }
    }

    pub fn terminals(&self, polarity: Polarity) -> &[TerminalSpec] {
        match polarity {
            Polarity::Input => &self.inputs,
            Polarity::Output => &self.outputs,
        }
    }
}

/// Ordered mapping from module type name to [`ModuleDef`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleCatalog {
    defs: IndexMap<String, ModuleDef>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON object of `{ "type": { "inputs": [...], "outputs": [...] } }`.
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
        let catalog = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse module catalog {}", path))?;
        Ok(catalog)
    }

    /// Add or replace a definition, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, def: ModuleDef) -> Option<ModuleDef> {
        self.defs.insert(name.into(), def)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDef> {
        self.defs.get(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Type names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    /// Resolve the terminal list of one side of a module spec.
    ///
    /// Lookup order: the spec's own list, then its inline `module_def`, then
    /// the catalog entry for its type. Missing everywhere yields an empty list.
    pub fn resolve_terminals(&self, spec: &ModuleSpec, polarity: Polarity) -> Vec<TerminalSpec> {
        let own = match polarity {
            Polarity::Input => spec.inputs.as_ref(),
            Polarity::Output => spec.outputs.as_ref(),
        };
        if let Some(list) = own {
            return list.clone();
        }
        let def = spec
            .module_def
            .as_ref()
            .or_else(|| spec.module.as_deref().and_then(|name| self.get(name)));
        def.map(|d| d.terminals(polarity).to_vec())
            .unwrap_or_default()
    }
}

impl FromIterator<(String, ModuleDef)> for ModuleCatalog {
    fn from_iter<I: IntoIterator<Item = (String, ModuleDef)>>(iter: I) -> Self {
        Self {
            defs: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ModuleCatalog {
        let mut c = ModuleCatalog::new();
        c.insert("ncnr.load", ModuleDef::from_ids(&[], &["output"]));
        c.insert("ncnr.join", ModuleDef::from_ids(&["data", "base"], &["output"]));
        c
    }

    #[test]
    fn spec_terminals_win() {
        let mut spec = ModuleSpec::of_type("ncnr.join");
        spec.inputs = Some(vec![TerminalSpec::new("only", "only")]);
        let inputs = catalog().resolve_terminals(&spec, Polarity::Input);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].id, "only");
        // Outputs still come from the catalog.
        let outputs = catalog().resolve_terminals(&spec, Polarity::Output);
        assert_eq!(outputs[0].id, "output");
    }

    #[test]
    fn inline_def_shadows_catalog() {
        let mut spec = ModuleSpec::of_type("ncnr.join");
        spec.module_def = Some(ModuleDef::from_ids(&["x"], &[]));
        assert_eq!(catalog().resolve_terminals(&spec, Polarity::Input)[0].id, "x");
        assert!(catalog().resolve_terminals(&spec, Polarity::Output).is_empty());
    }

    #[test]
    fn unknown_type_has_no_terminals() {
        let spec = ModuleSpec::of_type("nope");
        assert!(catalog().resolve_terminals(&spec, Polarity::Input).is_empty());
        assert!(catalog().resolve_terminals(&spec, Polarity::Output).is_empty());
    }

    #[test]
    fn catalog_json_is_a_plain_object() {
        let c: ModuleCatalog = serde_json::from_str(
            r#"{"a": {"inputs": ["in"]}, "b": {"outputs": [{"id": "o", "label": "Out"}]}}"#,
        )
        .unwrap();
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(c.get("b").unwrap().outputs[0].label(), "Out");
        assert!(c.get("a").unwrap().outputs.is_empty());
    }
}
