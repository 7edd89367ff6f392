//! Editor state management.
//!
//! [`EditorState`] owns the [`Graph`] together with the module catalog, the
//! editor configuration and the wire gesture, and is the only place that
//! fires the update signal. Each successful mutation bumps the revision and
//! notifies every listener exactly once, after reindexing and validation
//! have finished.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustyflow::editor::EditorState;
//! use rustyflow::model::{Endpoint, Polarity};
//!
//! let mut state = EditorState::new(config).with_catalog(catalog);
//! state.on_update(|change| println!("rev {}: {} wires", change.revision, change.wires.len()));
//! state.import_json(&text)?;
//! state.wire_start(Endpoint::new(0, "output"), Polarity::Output);
//! state.wire_pull(Some(&Endpoint::new(1, "data")));
//! state.wire_stop();
//! let doc = state.export();
//! ```

use std::fmt;

use tracing::debug;

use super::graph::{Graph, Module, Normalized};
use super::identity::StableId;
use super::wiring::{WireGesture, WireOutcome};
use crate::catalog::ModuleCatalog;
use crate::config::EditorConfig;
use crate::error::{ImportError, ImportResult};
use crate::layout::{self, CompositeLayout, Measurer, Subgraph};
use crate::model::{Endpoint, GraphDoc, ModuleSpec, Polarity, Wire};

// ────────────────────────────────────────────────────────────────────────────
// Update signal
// ────────────────────────────────────────────────────────────────────────────

/// Payload of the update signal: the graph as it is after a change.
#[derive(Debug, Clone, Copy)]
pub struct GraphChanged<'a> {
    pub revision: u64,
    pub modules: &'a [Module],
    pub wires: &'a [Wire],
}

type Listener = Box<dyn FnMut(&GraphChanged<'_>)>;

// ────────────────────────────────────────────────────────────────────────────
// EditorState
// ────────────────────────────────────────────────────────────────────────────

pub struct EditorState {
    graph: Graph,
    catalog: ModuleCatalog,
    config: EditorConfig,
    gesture: WireGesture,
    listeners: Vec<Listener>,
    revision: u64,
    /// Set by every mutation, cleared by the owner after saving.
    dirty: bool,
}

impl fmt::Debug for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorState")
            .field("graph", &self.graph)
            .field("catalog", &self.catalog)
            .field("config", &self.config)
            .field("gesture", &self.gesture)
            .field("listeners", &self.listeners.len())
            .field("revision", &self.revision)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorState {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            graph: Graph::with_combined_type(config.combined_module_type.clone()),
            catalog: ModuleCatalog::new(),
            config,
            gesture: WireGesture::Idle,
            listeners: Vec::new(),
            revision: 0,
            dirty: false,
        }
    }

    pub fn with_catalog(mut self, catalog: ModuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn gesture(&self) -> &WireGesture {
        &self.gesture
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Register a listener for the update signal.
    pub fn on_update(&mut self, listener: impl FnMut(&GraphChanged<'_>) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn commit(&mut self) {
        self.revision += 1;
        self.dirty = true;
        let change = GraphChanged {
            revision: self.revision,
            modules: self.graph.modules(),
            wires: self.graph.wires(),
        };
        for listener in &mut self.listeners {
            listener(&change);
        }
    }

    /// Structural edits shift positions, which the gesture's anchor and
    /// candidates are expressed in.
    fn abort_gesture(&mut self) {
        if self.gesture.abort(&mut self.graph) {
            debug!("wire gesture aborted by structural edit");
        }
    }

    // ── Import / export ─────────────────────────────────────────────────

    /// Replace the whole graph with `doc`. Returns what normalization dropped.
    pub fn import(&mut self, doc: GraphDoc) -> Normalized {
        self.abort_gesture();
        let GraphDoc { modules, wires } = doc;
        let (wires, provisional): (Vec<Wire>, Vec<Wire>) =
            wires.into_iter().partition(Wire::is_committed);
        self.graph
            .replace_modules(modules, &self.catalog, &self.config);
        let mut normalized = self.graph.attach_wires(wires);
        normalized.dangling += provisional.len();
        debug!(
            modules = self.graph.len(),
            wires = self.graph.wires().len(),
            dropped = normalized.dropped(),
            "imported graph"
        );
        self.commit();
        normalized
    }

    /// Parse and import a JSON document. The graph is left untouched on error.
    pub fn import_json(&mut self, text: &str) -> ImportResult<Normalized> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let object = value.as_object().ok_or(ImportError::NotAnObject)?;
        for section in ["modules", "wires"] {
            if !object.get(section).is_some_and(serde_json::Value::is_array) {
                return Err(ImportError::MissingSection(section));
            }
        }
        let doc: GraphDoc = serde_json::from_value(value)?;
        Ok(self.import(doc))
    }

    /// The graph as a document. Only committed wires are included.
    pub fn export(&self) -> GraphDoc {
        GraphDoc {
            modules: self.graph.modules().iter().map(Module::to_spec).collect(),
            wires: self.graph.committed_wires().cloned().collect(),
        }
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.export())
    }

    // ── Catalog ─────────────────────────────────────────────────────────

    /// Swap the module catalog and resolve every module's terminals again.
    pub fn set_catalog(&mut self, catalog: ModuleCatalog) -> Normalized {
        self.abort_gesture();
        self.catalog = catalog;
        let normalized = self.graph.resolve_terminals(&self.catalog);
        self.commit();
        normalized
    }

    /// Re-run reindexing and validation and fire the update signal.
    pub fn refresh(&mut self) -> Normalized {
        let normalized = self.graph.normalize();
        self.commit();
        normalized
    }

    // ── Modules ─────────────────────────────────────────────────────────

    pub fn push_module(&mut self, spec: ModuleSpec) -> StableId {
        self.insert_module(self.graph.len(), spec)
    }

    pub fn insert_module(&mut self, index: usize, spec: ModuleSpec) -> StableId {
        self.abort_gesture();
        let id = self
            .graph
            .insert_module(index, spec, &self.catalog, &self.config);
        self.commit();
        id
    }

    pub fn remove_modules(&mut self, indices: &[usize]) -> Vec<Module> {
        self.abort_gesture();
        let removed = self.graph.remove_modules(indices);
        if !removed.is_empty() {
            self.commit();
        }
        removed
    }

    pub fn reorder_module(&mut self, from: usize, to: usize) -> bool {
        self.abort_gesture();
        let moved = self.graph.reorder_module(from, to);
        if moved {
            self.commit();
        }
        moved
    }

    /// Drag a module to `(x, y)`, snapped to the grid. Modules that are not
    /// draggable stay put.
    pub fn move_module(&mut self, index: usize, x: f64, y: f64) -> bool {
        if !self.graph.module(index).is_some_and(|m| m.draggable) {
            return false;
        }
        let (x, y) = (self.config.snap(x), self.config.snap(y));
        let moved = self.graph.move_module(index, x, y);
        if moved {
            self.commit();
        }
        moved
    }

    // ── Wires ───────────────────────────────────────────────────────────

    pub fn add_wire(&mut self, wire: Wire) -> bool {
        let added = self.graph.add_wire(wire);
        if added {
            self.commit();
        }
        added
    }

    pub fn remove_wire(&mut self, wire: &Wire) -> bool {
        if wire.has_cursor() {
            return false;
        }
        let removed = self.graph.remove_wire(wire);
        if removed {
            self.commit();
        }
        removed
    }

    pub fn wire_start(&mut self, anchor: Endpoint, polarity: Polarity) -> bool {
        self.gesture.start(
            &mut self.graph,
            anchor,
            polarity,
            self.config.allow_self_wires,
        )
    }

    /// Report the terminal under the pointer; returns the resolved candidate.
    pub fn wire_pull(&mut self, under_pointer: Option<&Endpoint>) -> Option<Endpoint> {
        self.gesture.pull(under_pointer).cloned()
    }

    pub fn wire_stop(&mut self) -> Option<WireOutcome> {
        let outcome = self.gesture.stop(&mut self.graph)?;
        self.commit();
        Some(outcome)
    }

    /// Abandon the gesture without firing the update signal.
    pub fn wire_abort(&mut self) -> bool {
        self.gesture.abort(&mut self.graph)
    }

    // ── Combined modules ────────────────────────────────────────────────

    /// Positions of every combined module.
    pub fn combined_modules(&self) -> Vec<usize> {
        self.graph
            .modules()
            .iter()
            .filter(|m| m.is_combined(&self.config.combined_module_type))
            .map(Module::index)
            .collect()
    }

    /// Lay out the inner modules of the combined module at `index`.
    pub fn layout_combined(
        &self,
        index: usize,
        measurer: &dyn Measurer,
    ) -> Option<CompositeLayout> {
        let subgraph =
            Subgraph::of_combined(&self.graph, index, &self.config.combined_module_type)?;
        Some(layout::layout_composite(
            &subgraph,
            measurer,
            &self.config.layout,
            self.config.autosize_modules,
        ))
    }
}
