//! Document model for graph import and export.
//!
//! A [`GraphDoc`] is the on-disk shape of an editor graph:
//!
//! ```json
//! {
//!   "modules": [
//!     { "title": "Load\ndata", "inputs": ["in_a"], "outputs": ["out_0", "out_b"], "x": 200 },
//!     { "title": "background", "x": 300 }
//!   ],
//!   "wires": [{ "source": [0, "out_b"], "target": [1, "in_0"] }]
//! }
//! ```
//!
//! Module position is implicit in array order and wire endpoints refer to it.
//! The editor's internal stable identity is carried in `module_id` only on the
//! way in; it is never written back out.

use anyhow::Context;
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::catalog::ModuleDef;

// ────────────────────────────────────────────────────────────────────────────
// GraphDoc
// ────────────────────────────────────────────────────────────────────────────

/// A complete graph document: ordered modules plus the wires between them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDoc {
    pub modules: Vec<ModuleSpec>,
    pub wires: Vec<Wire>,
}

impl GraphDoc {
    /// Read a document from a JSON file.
    pub fn load_json(path: &Utf8Path) -> anyhow::Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
        let doc = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path))?;
        Ok(doc)
    }

    /// Write the document as pretty-printed JSON.
    pub fn save_json(&self, path: &Utf8Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Write {}", path))?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Modules and terminals
// ────────────────────────────────────────────────────────────────────────────

/// Which side of a module a terminal sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Input,
    Output,
}

impl Polarity {
    /// The polarity a wire has to connect to from this one.
    pub fn opposite(self) -> Self {
        match self {
            Polarity::Input => Polarity::Output,
            Polarity::Output => Polarity::Input,
        }
    }
}

/// A named connection point on a module.
///
/// Documents may spell a terminal as a bare string, which is used as the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TerminalRepr")]
pub struct TerminalSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TerminalSpec {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
        }
    }

    /// Display label, falling back to the id.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TerminalRepr {
    Id(String),
    Full {
        id: String,
        #[serde(default)]
        label: Option<String>,
    },
}

impl From<TerminalRepr> for TerminalSpec {
    fn from(repr: TerminalRepr) -> Self {
        match repr {
            TerminalRepr::Id(id) => Self { id, label: None },
            TerminalRepr::Full { id, label } => Self { id, label },
        }
    }
}

/// A module as it appears in a document.
///
/// Everything except `module_id` is written back on export. Keys the editor
/// does not interpret are kept in `extra` in their original order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Module type name, used to look up terminals in the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<TerminalSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<TerminalSpec>>,
    /// Inline definition taking precedence over the catalog entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_def: Option<ModuleDef>,
    /// Whether wires may be drawn from and to this module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wireable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    /// Internal identity; honored on import when still unused, stripped on export.
    #[serde(
        default,
        alias = "stable_id",
        skip_serializing,
        deserialize_with = "lenient_module_id"
    )]
    pub module_id: Option<u64>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// `module_id` is internal bookkeeping; anything but an unsigned integer is ignored.
fn lenient_module_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64())
}

impl ModuleSpec {
    /// A spec for a module of the given catalog type.
    pub fn of_type(module: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            ..Default::default()
        }
    }

    /// A spec with explicit terminal ids (labels equal to ids).
    pub fn with_terminals(title: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        let terminals = |ids: &[&str]| {
            ids.iter()
                .map(|id| TerminalSpec::new(*id, *id))
                .collect::<Vec<_>>()
        };
        Self {
            title: Some(title.to_string()),
            inputs: Some(terminals(inputs)),
            outputs: Some(terminals(outputs)),
            ..Default::default()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wires
// ────────────────────────────────────────────────────────────────────────────

/// A resolved wire end: module position plus terminal id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(usize, String)", into = "(usize, String)")]
pub struct Endpoint {
    pub module: usize,
    pub terminal: String,
}

impl Endpoint {
    pub fn new(module: usize, terminal: impl Into<String>) -> Self {
        Self {
            module,
            terminal: terminal.into(),
        }
    }
}

impl From<(usize, String)> for Endpoint {
    fn from((module, terminal): (usize, String)) -> Self {
        Self { module, terminal }
    }
}

impl From<Endpoint> for (usize, String) {
    fn from(ep: Endpoint) -> Self {
        (ep.module, ep.terminal)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.terminal)
    }
}

/// One end of a wire: attached to the pointer, or to a terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireEndRepr", into = "WireEndRepr")]
pub enum WireEnd {
    Cursor,
    Terminal(Endpoint),
}

impl WireEnd {
    pub fn is_cursor(&self) -> bool {
        matches!(self, WireEnd::Cursor)
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        match self {
            WireEnd::Cursor => None,
            WireEnd::Terminal(ep) => Some(ep),
        }
    }

    pub fn endpoint_mut(&mut self) -> Option<&mut Endpoint> {
        match self {
            WireEnd::Cursor => None,
            WireEnd::Terminal(ep) => Some(ep),
        }
    }
}

impl From<Endpoint> for WireEnd {
    fn from(ep: Endpoint) -> Self {
        WireEnd::Terminal(ep)
    }
}

impl fmt::Display for WireEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireEnd::Cursor => f.write_str("cursor"),
            WireEnd::Terminal(ep) => ep.fmt(f),
        }
    }
}

const CURSOR_TAG: &str = "cursor";

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireEndRepr {
    Tag(String),
    Terminal(Endpoint),
}

impl TryFrom<WireEndRepr> for WireEnd {
    type Error = String;

    fn try_from(repr: WireEndRepr) -> Result<Self, Self::Error> {
        match repr {
            WireEndRepr::Tag(tag) if tag == CURSOR_TAG => Ok(WireEnd::Cursor),
            WireEndRepr::Tag(tag) => Err(format!(
                "invalid wire end {tag:?}: expected \"cursor\" or [module, terminal]"
            )),
            WireEndRepr::Terminal(ep) => Ok(WireEnd::Terminal(ep)),
        }
    }
}

impl From<WireEnd> for WireEndRepr {
    fn from(end: WireEnd) -> Self {
        match end {
            WireEnd::Cursor => WireEndRepr::Tag(CURSOR_TAG.to_string()),
            WireEnd::Terminal(ep) => WireEndRepr::Terminal(ep),
        }
    }
}

/// A directed connection from an output terminal to an input terminal.
///
/// Committed wires are keyed by their `(source, target)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wire {
    pub source: WireEnd,
    pub target: WireEnd,
}

impl Wire {
    /// A committed wire between two terminals.
    pub fn new(source: Endpoint, target: Endpoint) -> Self {
        Self {
            source: WireEnd::Terminal(source),
            target: WireEnd::Terminal(target),
        }
    }

    /// A provisional wire anchored at `anchor`, with the other end on the cursor.
    pub fn provisional(anchor: Endpoint, polarity: Polarity) -> Self {
        match polarity {
            Polarity::Input => Self {
                source: WireEnd::Cursor,
                target: WireEnd::Terminal(anchor),
            },
            Polarity::Output => Self {
                source: WireEnd::Terminal(anchor),
                target: WireEnd::Cursor,
            },
        }
    }

    /// True if either end is still attached to the cursor.
    pub fn has_cursor(&self) -> bool {
        self.source.is_cursor() || self.target.is_cursor()
    }

    pub fn is_committed(&self) -> bool {
        !self.has_cursor()
    }

    /// Both endpoints, if the wire is committed.
    pub fn endpoints(&self) -> Option<(&Endpoint, &Endpoint)> {
        Some((self.source.endpoint()?, self.target.endpoint()?))
    }

    /// The end on the given side: `Output` is the source, `Input` the target.
    pub fn end(&self, polarity: Polarity) -> &WireEnd {
        match polarity {
            Polarity::Output => &self.source,
            Polarity::Input => &self.target,
        }
    }

    pub fn end_mut(&mut self, polarity: Polarity) -> &mut WireEnd {
        match polarity {
            Polarity::Output => &mut self.source,
            Polarity::Input => &mut self.target,
        }
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{source: {}, target: {}}}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_original_document_shape() {
        let json = r#"{
            "modules": [
                {"title": "Load\ndata", "inputs": ["in_a"], "outputs": ["out_0", "out_b"], "x": 200},
                {"title": "background", "x": 300, "module_id": 7, "color": "red"}
            ],
            "wires": [{"source": [0, "out_b"], "target": [1, "in_0"]}]
        }"#;
        let doc: GraphDoc = serde_json::from_str(json).unwrap();
        assert_eq!(doc.modules.len(), 2);
        let m0 = &doc.modules[0];
        assert_eq!(m0.x, Some(200.0));
        assert_eq!(m0.inputs.as_ref().unwrap()[0].id, "in_a");
        assert_eq!(m0.inputs.as_ref().unwrap()[0].label(), "in_a");
        let m1 = &doc.modules[1];
        assert_eq!(m1.module_id, Some(7));
        assert_eq!(m1.extra.get("color"), Some(&serde_json::json!("red")));
        assert_eq!(
            doc.wires[0],
            Wire::new(Endpoint::new(0, "out_b"), Endpoint::new(1, "in_0"))
        );
    }

    #[test]
    fn module_id_is_never_serialized() {
        let spec = ModuleSpec {
            title: Some("m".to_string()),
            module_id: Some(3),
            ..Default::default()
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert!(value.get("module_id").is_none());
        assert_eq!(value.get("title"), Some(&serde_json::json!("m")));
    }

    #[test]
    fn cursor_end_serializes_as_tag() {
        let wire = Wire::provisional(Endpoint::new(2, "in"), Polarity::Input);
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"source": "cursor", "target": [2, "in"]})
        );
        let back: Wire = serde_json::from_value(value).unwrap();
        assert_eq!(back, wire);
    }

    #[test]
    fn unknown_end_tag_is_rejected() {
        let err = serde_json::from_str::<Wire>(r#"{"source": "mouse", "target": [0, "in"]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn stable_id_is_accepted_as_module_id() {
        let spec: ModuleSpec = serde_json::from_str(r#"{"stable_id": 4}"#).unwrap();
        assert_eq!(spec.module_id, Some(4));
        assert!(spec.extra.is_empty());
    }

    #[test]
    fn non_integer_module_id_is_ignored() {
        let spec: ModuleSpec =
            serde_json::from_str(r#"{"title": "m", "module_id": "abc"}"#).unwrap();
        assert_eq!(spec.module_id, None);
        assert_eq!(spec.title.as_deref(), Some("m"));
        let spec: ModuleSpec = serde_json::from_str(r#"{"module_id": -3}"#).unwrap();
        assert_eq!(spec.module_id, None);
    }

    #[test]
    fn terminal_object_form_keeps_label() {
        let t: TerminalSpec = serde_json::from_str(r#"{"id": "in_0", "label": "data"}"#).unwrap();
        assert_eq!(t.id, "in_0");
        assert_eq!(t.label(), "data");
    }

    #[test]
    fn provisional_wire_orientation() {
        let w = Wire::provisional(Endpoint::new(1, "out"), Polarity::Output);
        assert_eq!(w.source, WireEnd::Terminal(Endpoint::new(1, "out")));
        assert!(w.end(Polarity::Input).is_cursor());
        assert!(w.has_cursor());
        assert!(w.endpoints().is_none());
    }
}
