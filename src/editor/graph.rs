//! The editor graph: an ordered module sequence plus a wire set.
//!
//! [`Graph`] is the single owner of both collections. Every structural change
//! goes through a private `restructure` step, which snapshots stable identities,
//! applies the change, reindexes positions, rewires endpoints and finally
//! validates the wire set, in that order. After any public method returns:
//!
//! - stable ids are unique,
//! - module `index` values are exactly `0..len`,
//! - every committed wire resolves to an output (source) and an input (target),
//! - at most one wire has a cursor end,
//! - every combined module exposes the current boundary terminals of the
//!   inner modules, after its own declared terminals.

use tracing::{debug, trace};

use super::identity::{IdRegistry, StableId};
use super::reindex::{self, IndexUpdate};
use super::validate;
use crate::catalog::ModuleCatalog;
use crate::config::{DEFAULT_COMBINED_MODULE_TYPE, EditorConfig};
use crate::layout::{self, BoundaryTerminal, Subgraph};
use crate::model::{ModuleSpec, Polarity, TerminalSpec, Wire};

// ────────────────────────────────────────────────────────────────────────────
// Module
// ────────────────────────────────────────────────────────────────────────────

/// A node of the graph with resolved terminal lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    id: StableId,
    index: usize,
    /// Canvas position, stored for the renderer.
    pub x: f64,
    pub y: f64,
    /// Whether wire gestures may start or end on this module.
    pub wireable: bool,
    pub draggable: bool,
    inputs: Vec<TerminalSpec>,
    outputs: Vec<TerminalSpec>,
    /// Leading entries of `inputs`/`outputs` that come from the spec or
    /// catalog. The rest are exposed inner terminals.
    declared_inputs: usize,
    declared_outputs: usize,
    /// The document form, kept for export.
    spec: ModuleSpec,
}

impl Module {
    fn from_spec(
        id: StableId,
        mut spec: ModuleSpec,
        catalog: &ModuleCatalog,
        config: &EditorConfig,
    ) -> Self {
        let inputs = catalog.resolve_terminals(&spec, Polarity::Input);
        let outputs = catalog.resolve_terminals(&spec, Polarity::Output);
        let x = spec.x.take().unwrap_or(config.default_x);
        let y = spec.y.take().unwrap_or(config.default_y);
        spec.module_id = None;
        Self {
            id,
            index: 0,
            x,
            y,
            wireable: spec.wireable.unwrap_or(true),
            draggable: spec.draggable.unwrap_or(true),
            declared_inputs: inputs.len(),
            declared_outputs: outputs.len(),
            inputs,
            outputs,
            spec,
        }
    }

    pub fn id(&self) -> StableId {
        self.id
    }

    /// Current position in the module sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn module_type(&self) -> Option<&str> {
        self.spec.module.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.spec.title.as_deref()
    }

    /// Text shown in the module's title bar: the title, else the type name.
    pub fn label(&self) -> &str {
        self.title().or(self.module_type()).unwrap_or("")
    }

    pub fn inputs(&self) -> &[TerminalSpec] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TerminalSpec] {
        &self.outputs
    }

    pub fn terminals(&self, polarity: Polarity) -> &[TerminalSpec] {
        match polarity {
            Polarity::Input => &self.inputs,
            Polarity::Output => &self.outputs,
        }
    }

    pub fn terminal(&self, polarity: Polarity, id: &str) -> Option<&TerminalSpec> {
        self.terminals(polarity).iter().find(|t| t.id == id)
    }

    pub fn has_terminal(&self, polarity: Polarity, id: &str) -> bool {
        self.terminal(polarity, id).is_some()
    }

    /// Rows the module occupies when its terminals are stacked vertically.
    pub fn terminal_rows(&self) -> usize {
        self.inputs.len().max(self.outputs.len())
    }

    pub fn is_combined(&self, combined_type: &str) -> bool {
        self.module_type() == Some(combined_type)
    }

    /// Terminals listed by the spec or catalog, without exposed ones.
    pub fn declared_terminals(&self, polarity: Polarity) -> &[TerminalSpec] {
        match polarity {
            Polarity::Input => &self.inputs[..self.declared_inputs],
            Polarity::Output => &self.outputs[..self.declared_outputs],
        }
    }

    fn resolve(&mut self, catalog: &ModuleCatalog) {
        self.inputs = catalog.resolve_terminals(&self.spec, Polarity::Input);
        self.outputs = catalog.resolve_terminals(&self.spec, Polarity::Output);
        self.declared_inputs = self.inputs.len();
        self.declared_outputs = self.outputs.len();
    }

    /// Replace the exposed terminals, keeping the declared ones first.
    fn expose(&mut self, inputs: &[TerminalSpec], outputs: &[TerminalSpec]) {
        self.inputs.truncate(self.declared_inputs);
        self.inputs.extend_from_slice(inputs);
        self.outputs.truncate(self.declared_outputs);
        self.outputs.extend_from_slice(outputs);
    }

    /// Document form of this module, without its stable id.
    pub fn to_spec(&self) -> ModuleSpec {
        let mut spec = self.spec.clone();
        spec.x = Some(self.x);
        spec.y = Some(self.y);
        if spec.wireable.is_some() || !self.wireable {
            spec.wireable = Some(self.wireable);
        }
        if spec.draggable.is_some() || !self.draggable {
            spec.draggable = Some(self.draggable);
        }
        spec
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Graph
// ────────────────────────────────────────────────────────────────────────────

/// What one normalization pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub update: IndexUpdate,
    /// Wires dropped because an endpoint's module was removed.
    pub orphaned: usize,
    /// Wires dropped because an endpoint did not resolve.
    pub dangling: usize,
    /// Attached wires dropped because the same pair was already present.
    pub duplicates: usize,
}

impl Normalized {
    pub fn dropped(&self) -> usize {
        self.orphaned + self.dangling + self.duplicates
    }
}

/// Ordered modules and the wires between them.
#[derive(Debug, Clone)]
pub struct Graph {
    modules: Vec<Module>,
    wires: Vec<Wire>,
    registry: IdRegistry,
    /// Module type that marks combined modules.
    combined_type: String,
}

impl Default for Graph {
    fn default() -> Self {
        Self::with_combined_type(DEFAULT_COMBINED_MODULE_TYPE)
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_combined_type(combined_type: impl Into<String>) -> Self {
        Self {
            modules: Vec::new(),
            wires: Vec::new(),
            registry: IdRegistry::default(),
            combined_type: combined_type.into(),
        }
    }

    pub fn combined_type(&self) -> &str {
        &self.combined_type
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, index: usize) -> Option<&Module> {
        self.modules.get(index)
    }

    pub fn module_by_id(&self, id: StableId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Current position of the module with the given id.
    pub fn position_of(&self, id: StableId) -> Option<usize> {
        self.module_by_id(id).map(Module::index)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Wires with both ends on terminals.
    pub fn committed_wires(&self) -> impl Iterator<Item = &Wire> {
        self.wires.iter().filter(|w| w.is_committed())
    }

    /// The in-progress wire of a gesture, if any.
    pub fn provisional_wire(&self) -> Option<&Wire> {
        self.wires.iter().find(|w| w.has_cursor())
    }

    pub fn contains_wire(&self, wire: &Wire) -> bool {
        self.wires.contains(wire)
    }

    pub(crate) fn wires_mut(&mut self) -> &mut Vec<Wire> {
        &mut self.wires
    }

    /// Apply a structural change to the module sequence, then reindex,
    /// rewire, expose combined terminals and validate.
    fn restructure<R, F>(&mut self, change: F) -> (R, Normalized)
    where
        F: FnOnce(&mut Vec<Module>, &mut IdRegistry) -> R,
    {
        let old = reindex::id_map(&self.modules);
        let result = change(&mut self.modules, &mut self.registry);
        reindex::renumber(&mut self.modules);
        let new = reindex::id_map(&self.modules);
        let update = IndexUpdate::diff(&old, &new);
        let orphaned =
            reindex::rewire(&mut self.wires, &update) + self.rewire_exposed(&update);
        self.expose_boundary();
        let dangling = validate::validate_wires(&self.modules, &mut self.wires);
        if orphaned + dangling > 0 {
            debug!(orphaned, dangling, "normalization dropped wires");
        }
        let normalized = Normalized {
            update,
            orphaned,
            dangling,
            duplicates: 0,
        };
        (result, normalized)
    }

    /// Exposed terminal ids on combined modules name inner positions, so they
    /// follow `update` too. Wires on a terminal of a removed inner module are
    /// dropped. Returns the number dropped.
    fn rewire_exposed(&mut self, update: &IndexUpdate) -> usize {
        if update.is_empty() {
            return 0;
        }
        let modules = &self.modules;
        let combined_type = self.combined_type.as_str();
        let before = self.wires.len();
        self.wires.retain_mut(|wire| {
            for end in [&mut wire.source, &mut wire.target] {
                let Some(endpoint) = end.endpoint_mut() else {
                    continue;
                };
                let on_combined = modules
                    .get(endpoint.module)
                    .is_some_and(|m| m.is_combined(combined_type));
                if !on_combined {
                    continue;
                }
                let Some((inner, terminal)) = layout::parse_exposed_id(&endpoint.terminal) else {
                    continue;
                };
                if update.removed.contains(&inner) {
                    trace!(%endpoint, "exposed module removed, dropping wire");
                    return false;
                }
                if let Some(&new_inner) = update.moved.get(&inner) {
                    let renamed = layout::exposed_id(new_inner, terminal);
                    trace!(%endpoint, %renamed, "renaming exposed terminal");
                    endpoint.terminal = renamed;
                }
            }
            true
        });
        before - self.wires.len()
    }

    /// Set the boundary terminals of the inner modules on every combined module.
    fn expose_boundary(&mut self) {
        let combined_type = self.combined_type.as_str();
        if !self.modules.iter().any(|m| m.is_combined(combined_type)) {
            return;
        }
        let inner = Subgraph::inner(&self.modules, &self.wires, combined_type);
        let (inputs, outputs) = layout::boundary_terminals(&inner);
        let inputs: Vec<_> = inputs.iter().map(BoundaryTerminal::to_terminal).collect();
        let outputs: Vec<_> = outputs.iter().map(BoundaryTerminal::to_terminal).collect();
        for module in &mut self.modules {
            if module.is_combined(combined_type) {
                module.expose(&inputs, &outputs);
            }
        }
    }

    /// Re-run validation without a structural change.
    pub fn normalize(&mut self) -> Normalized {
        self.restructure(|_, _| ()).1
    }

    /// Insert a module at `index` (clamped to the end), minting its stable id.
    pub fn insert_module(
        &mut self,
        index: usize,
        spec: ModuleSpec,
        catalog: &ModuleCatalog,
        config: &EditorConfig,
    ) -> StableId {
        let (id, _) = self.restructure(|modules, registry| {
            let id = registry.mint();
            let at = index.min(modules.len());
            modules.insert(at, Module::from_spec(id, spec, catalog, config));
            id
        });
        id
    }

    /// Append a module, minting its stable id.
    pub fn push_module(
        &mut self,
        spec: ModuleSpec,
        catalog: &ModuleCatalog,
        config: &EditorConfig,
    ) -> StableId {
        self.insert_module(self.modules.len(), spec, catalog, config)
    }

    /// Remove the modules at the given positions, returning them in ascending
    /// position order. Out-of-range positions are ignored.
    pub fn remove_modules(&mut self, indices: &[usize]) -> Vec<Module> {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let (mut removed, _) = self.restructure(|modules, _| {
            let mut removed = Vec::new();
            for &idx in sorted.iter().rev() {
                if idx < modules.len() {
                    removed.push(modules.remove(idx));
                }
            }
            removed
        });
        removed.reverse();
        removed
    }

    /// Move the module at `from` to position `to`.
    pub fn reorder_module(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.modules.len() || to >= self.modules.len() {
            return false;
        }
        self.restructure(|modules, _| {
            let module = modules.remove(from);
            modules.insert(to, module);
        });
        true
    }

    /// Replace every module and wire, keeping the id registry.
    ///
    /// Specs carrying a `module_id` keep it when it can still be claimed;
    /// all others get a freshly minted id.
    pub fn replace_modules(
        &mut self,
        specs: Vec<ModuleSpec>,
        catalog: &ModuleCatalog,
        config: &EditorConfig,
    ) -> Normalized {
        self.wires.clear();
        let ((), normalized) = self.restructure(|modules, registry| {
            modules.clear();
            for spec in specs {
                let id = registry.claim_or_mint(spec.module_id);
                modules.push(Module::from_spec(id, spec, catalog, config));
            }
        });
        normalized
    }

    /// Resolve every module's terminals again against `catalog`, then drop
    /// wires whose terminals disappeared. Identities and positions are kept.
    pub fn resolve_terminals(&mut self, catalog: &ModuleCatalog) -> Normalized {
        for module in &mut self.modules {
            module.resolve(catalog);
        }
        self.normalize()
    }

    /// Append wires, skipping pairs that are already present, then validate.
    pub fn attach_wires(&mut self, wires: Vec<Wire>) -> Normalized {
        let mut duplicates = 0;
        for wire in wires {
            if self.contains_wire(&wire) {
                trace!(%wire, "skipping duplicate wire");
                duplicates += 1;
            } else {
                self.wires.push(wire);
            }
        }
        if duplicates > 0 {
            debug!(duplicates, "dropped duplicate wires");
        }
        let mut normalized = self.normalize();
        normalized.duplicates = duplicates;
        normalized
    }

    /// Set a module's canvas position. Not a structural change.
    pub fn move_module(&mut self, index: usize, x: f64, y: f64) -> bool {
        match self.modules.get_mut(index) {
            Some(module) => {
                module.x = x;
                module.y = y;
                true
            }
            None => false,
        }
    }

    /// Add a committed wire if it resolves and is not already present.
    ///
    /// A wire between inner modules can hide terminals exposed on combined
    /// modules; wires on those terminals are dropped.
    pub fn add_wire(&mut self, wire: Wire) -> bool {
        if wire.has_cursor()
            || self.contains_wire(&wire)
            || !validate::wire_resolves(&self.modules, &wire)
        {
            return false;
        }
        self.wires.push(wire);
        self.normalize();
        true
    }

    /// Remove a wire by its `(source, target)` pair.
    pub fn remove_wire(&mut self, wire: &Wire) -> bool {
        match self.wires.iter().position(|w| w == wire) {
            Some(pos) => {
                self.wires.remove(pos);
                self.normalize();
                true
            }
            None => false,
        }
    }
}
