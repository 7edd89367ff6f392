//! Composite layout: arranges the inner modules of a combined module as a
//! left-to-right flow.
//!
//! Entry modules (sources of internal wires that nothing feeds) start a row at
//! `x = 0`. Each walk follows the first outgoing wire along the row; every
//! additional outgoing target opens a branch one row lower at the same `x`.
//! Already placed modules end a walk, so a cycle produces a partial layout
//! rather than an error. Modules the walks never reach are stacked below.
//!
//! Terminals of inner modules that no internal wire uses become the combined
//! module's own terminals, exposed as `"{index}:{terminal_id}"`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustyflow::layout::{layout_composite, CharWidthMeasurer, Subgraph};
//!
//! let sub = Subgraph::new(graph.modules(), graph.wires());
//! let layout = layout_composite(&sub, &CharWidthMeasurer::new(7.0), &config.layout, false);
//! for placement in layout.placements.values() {
//!     println!("{} at ({}, {})", placement.label, placement.x, placement.y);
//! }
//! ```

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::LayoutConfig;
use crate::editor::{Graph, Module, StableId};
use crate::model::{Endpoint, Polarity, TerminalSpec, Wire};

// ────────────────────────────────────────────────────────────────────────────
// Text measurement
// ────────────────────────────────────────────────────────────────────────────

/// Supplies rendered title widths.
pub trait Measurer {
    /// Width of `text` in layout units.
    fn text_width(&self, text: &str) -> f64;
}

impl<F> Measurer for F
where
    F: Fn(&str) -> f64,
{
    fn text_width(&self, text: &str) -> f64 {
        self(text)
    }
}

/// Monospace approximation: the longest line times a fixed glyph width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharWidthMeasurer {
    pub char_width: f64,
}

impl CharWidthMeasurer {
    pub fn new(char_width: f64) -> Self {
        Self { char_width }
    }
}

impl Measurer for CharWidthMeasurer {
    fn text_width(&self, text: &str) -> f64 {
        let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        longest as f64 * self.char_width
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Subgraph
// ────────────────────────────────────────────────────────────────────────────

/// Modules and the committed wires among them, keyed by graph position.
#[derive(Debug, Clone)]
pub struct Subgraph<'a> {
    modules: IndexMap<usize, &'a Module>,
    wires: Vec<&'a Wire>,
}

impl<'a> Subgraph<'a> {
    /// All modules of the slice and every committed wire between them.
    pub fn new(modules: &'a [Module], wires: &'a [Wire]) -> Self {
        Self::from_parts(modules.iter().collect(), wires)
    }

    /// The inner modules of the combined module at `index`: every module that
    /// is not itself combined. `None` if `index` is not a combined module.
    pub fn of_combined(graph: &'a Graph, index: usize, combined_type: &str) -> Option<Self> {
        let combined = graph.module(index)?;
        if !combined.is_combined(combined_type) {
            return None;
        }
        Some(Self::inner(graph.modules(), graph.wires(), combined_type))
    }

    /// Every module that is not combined, with the wires among them.
    pub(crate) fn inner(modules: &'a [Module], wires: &'a [Wire], combined_type: &str) -> Self {
        let inner = modules
            .iter()
            .filter(|m| !m.is_combined(combined_type))
            .collect();
        Self::from_parts(inner, wires)
    }

    /// Only wires whose both terminals exist on member modules are kept.
    fn from_parts(inner: Vec<&'a Module>, wires: &'a [Wire]) -> Self {
        let modules: IndexMap<usize, &Module> = inner.into_iter().map(|m| (m.index(), m)).collect();
        let member_has = |endpoint: &Endpoint, polarity: Polarity| {
            modules
                .get(&endpoint.module)
                .is_some_and(|m| m.has_terminal(polarity, &endpoint.terminal))
        };
        let wires = wires
            .iter()
            .filter(|w| {
                w.endpoints().is_some_and(|(source, target)| {
                    member_has(source, Polarity::Output) && member_has(target, Polarity::Input)
                })
            })
            .collect();
        Self { modules, wires }
    }

    pub fn modules(&self) -> impl Iterator<Item = &'a Module> + '_ {
        self.modules.values().copied()
    }

    pub fn module(&self, position: usize) -> Option<&'a Module> {
        self.modules.get(&position).copied()
    }

    pub fn wires(&self) -> &[&'a Wire] {
        &self.wires
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn edges(&self) -> impl Iterator<Item = (&'a Endpoint, &'a Endpoint)> + '_ {
        self.wires.iter().copied().filter_map(Wire::endpoints)
    }

    /// Distinct modules fed by `position`, in wire order.
    pub fn outgoing(&self, position: usize) -> Vec<usize> {
        let mut targets = Vec::new();
        for (source, target) in self.edges() {
            if source.module == position && !targets.contains(&target.module) {
                targets.push(target.module);
            }
        }
        targets
    }

    /// Distinct modules feeding `position`, in wire order.
    pub fn incoming(&self, position: usize) -> Vec<usize> {
        let mut sources = Vec::new();
        for (source, target) in self.edges() {
            if target.module == position && !sources.contains(&source.module) {
                sources.push(source.module);
            }
        }
        sources
    }

    fn terminal_is_wired(&self, endpoint: &Endpoint, polarity: Polarity) -> bool {
        self.edges().any(|(source, target)| match polarity {
            Polarity::Output => source == endpoint,
            Polarity::Input => target == endpoint,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

/// Where one inner module was placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub module: usize,
    pub id: StableId,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Inner modules wired into this one.
    pub joined_input: Vec<usize>,
    /// Inner modules this one feeds.
    pub joined_output: Vec<usize>,
}

/// An unwired inner terminal exposed on the combined module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundaryTerminal {
    pub endpoint: Endpoint,
    pub label: String,
    pub exposed_id: String,
}

impl BoundaryTerminal {
    fn new(endpoint: Endpoint, label: &str) -> Self {
        let exposed_id = exposed_id(endpoint.module, &endpoint.terminal);
        Self {
            endpoint,
            label: label.to_string(),
            exposed_id,
        }
    }

    /// The terminal as it appears on the combined module.
    pub fn to_terminal(&self) -> TerminalSpec {
        TerminalSpec::new(self.exposed_id.clone(), self.label.clone())
    }
}

/// Id of an inner terminal as exposed on a combined module.
pub fn exposed_id(inner: usize, terminal: &str) -> String {
    format!("{inner}:{terminal}")
}

/// Split an exposed id back into inner position and terminal id.
pub fn parse_exposed_id(id: &str) -> Option<(usize, &str)> {
    let (inner, terminal) = id.split_once(':')?;
    Some((inner.parse().ok()?, terminal))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompositeLayout {
    /// Keyed by graph position, in placement order.
    pub placements: IndexMap<usize, Placement>,
    /// Modules that start a row.
    pub entry_points: Vec<usize>,
    /// Wire targets that feed nothing further.
    pub exit_points: Vec<usize>,
    pub boundary_inputs: Vec<BoundaryTerminal>,
    pub boundary_outputs: Vec<BoundaryTerminal>,
    pub width: f64,
    pub height: f64,
}

impl CompositeLayout {
    pub fn placement(&self, position: usize) -> Option<&Placement> {
        self.placements.get(&position)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Algorithm
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cursor {
    x: f64,
    y: f64,
}

struct LayoutContext<'s, 'a> {
    subgraph: &'s Subgraph<'a>,
    measurer: &'s dyn Measurer,
    config: &'s LayoutConfig,
    autosize: bool,
    placements: IndexMap<usize, Placement>,
}

impl LayoutContext<'_, '_> {
    fn module_width(&self, module: &Module) -> f64 {
        let fixed = self.config.min_width + 2.0 * self.config.padding;
        if self.autosize {
            let text = self.measurer.text_width(module.label()) + 2.0 * self.config.padding;
            text.max(fixed)
        } else {
            fixed
        }
    }

    /// Place one module at the cursor and return its width.
    fn place(&mut self, position: usize, cursor: Cursor) -> f64 {
        let Some(module) = self.subgraph.module(position) else {
            return 0.0;
        };
        let width = self.module_width(module);
        let height = self.config.row_height * module.terminal_rows().max(1) as f64;
        self.placements.insert(
            position,
            Placement {
                module: position,
                id: module.id(),
                label: module.label().to_string(),
                x: cursor.x,
                y: cursor.y,
                width,
                height,
                joined_input: self.subgraph.incoming(position),
                joined_output: self.subgraph.outgoing(position),
            },
        );
        width
    }

    /// Walk forward from `start`, placing modules along the row and opening a
    /// branch for every additional outgoing target. Returns the lowest row
    /// origin reached.
    fn add_module(&mut self, start: usize, mut cursor: Cursor) -> f64 {
        let mut deepest = cursor.y;
        let mut current = start;
        while !self.placements.contains_key(&current) {
            let width = self.place(current, cursor);
            let targets = self.subgraph.outgoing(current);
            let next_x = cursor.x + width + self.config.margin;
            for (i, &branch) in targets.iter().enumerate().skip(1) {
                let at = Cursor {
                    x: next_x,
                    y: cursor.y + i as f64 * self.config.row_height,
                };
                deepest = deepest.max(self.add_module(branch, at));
            }
            let Some(&next) = targets.first() else {
                break;
            };
            cursor.x = next_x;
            current = next;
        }
        deepest
    }

    /// Rows used by the modules placed since `first`, starting at `top`.
    fn rows_consumed(&self, first: usize, top: f64, deepest: f64) -> usize {
        let row = self.config.row_height;
        let placed = || self.placements.values().skip(first);
        let branches = ((deepest - top) / row).round() as usize + 1;
        let extent = placed()
            .map(|p| ((p.y + p.height - top) / row).ceil() as usize)
            .max()
            .unwrap_or(0);
        let fan_in = placed()
            .filter(|p| p.joined_input.len() > 1)
            .map(|p| {
                p.joined_input
                    .iter()
                    .filter(|source| self.placements.contains_key(*source))
                    .count()
            })
            .max()
            .unwrap_or(0);
        branches.max(extent).max(fan_in).max(1)
    }
}

/// Member terminals that no internal wire uses, as `(inputs, outputs)` in
/// position order. These are the combined module's own terminals.
pub fn boundary_terminals(subgraph: &Subgraph<'_>) -> (Vec<BoundaryTerminal>, Vec<BoundaryTerminal>) {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for module in subgraph.modules() {
        for polarity in [Polarity::Input, Polarity::Output] {
            for terminal in module.terminals(polarity) {
                let endpoint = Endpoint::new(module.index(), terminal.id.clone());
                if subgraph.terminal_is_wired(&endpoint, polarity) {
                    continue;
                }
                let exposed = BoundaryTerminal::new(endpoint, terminal.label());
                match polarity {
                    Polarity::Input => inputs.push(exposed),
                    Polarity::Output => outputs.push(exposed),
                }
            }
        }
    }
    (inputs, outputs)
}

/// Lay out `subgraph`. Titles are measured only when `autosize` is set.
pub fn layout_composite(
    subgraph: &Subgraph<'_>,
    measurer: &dyn Measurer,
    config: &LayoutConfig,
    autosize: bool,
) -> CompositeLayout {
    let mut edge_sources: Vec<usize> = Vec::new();
    let mut edge_targets: Vec<usize> = Vec::new();
    for (source, target) in subgraph.edges() {
        if !edge_sources.contains(&source.module) {
            edge_sources.push(source.module);
        }
        if !edge_targets.contains(&target.module) {
            edge_targets.push(target.module);
        }
    }
    let entry_points: Vec<usize> = edge_sources
        .iter()
        .copied()
        .filter(|m| !edge_targets.contains(m))
        .collect();
    let exit_points: Vec<usize> = edge_targets
        .iter()
        .copied()
        .filter(|m| !edge_sources.contains(m))
        .collect();

    let mut ctx = LayoutContext {
        subgraph,
        measurer,
        config,
        autosize,
        placements: IndexMap::new(),
    };

    let mut y = 0.0;
    for &entry in &entry_points {
        if ctx.placements.contains_key(&entry) {
            continue;
        }
        let first = ctx.placements.len();
        let deepest = ctx.add_module(entry, Cursor { x: 0.0, y });
        y += ctx.rows_consumed(first, y, deepest) as f64 * config.row_height;
    }
    for module in subgraph.modules() {
        if !ctx.placements.contains_key(&module.index()) {
            ctx.place(module.index(), Cursor { x: 0.0, y });
            y += config.row_height;
        }
    }

    let (boundary_inputs, boundary_outputs) = boundary_terminals(subgraph);
    let placements = ctx.placements;
    let width = placements
        .values()
        .map(|p| p.x + p.width)
        .fold(0.0, f64::max);
    let height = placements
        .values()
        .map(|p| p.y + p.height)
        .fold(0.0, f64::max);
    tracing::debug!(
        placed = placements.len(),
        entries = entry_points.len(),
        width,
        height,
        "composite layout"
    );

    CompositeLayout {
        placements,
        entry_points,
        exit_points,
        boundary_inputs,
        boundary_outputs,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModuleCatalog;
    use crate::config::EditorConfig;
    use crate::model::ModuleSpec;

    const WIDTH: f64 = 85.0;

    fn graph(specs: &[(&str, &[&str], &[&str])], wires: &[(usize, &str, usize, &str)]) -> Graph {
        let catalog = ModuleCatalog::new();
        let config = EditorConfig::default();
        let mut graph = Graph::new();
        for (title, inputs, outputs) in specs {
            graph.push_module(ModuleSpec::with_terminals(title, inputs, outputs), &catalog, &config);
        }
        for &(s, st, t, tt) in wires {
            assert!(graph.add_wire(Wire::new(Endpoint::new(s, st), Endpoint::new(t, tt))));
        }
        graph
    }

    fn run(graph: &Graph) -> CompositeLayout {
        let sub = Subgraph::new(graph.modules(), graph.wires());
        layout_composite(&sub, &CharWidthMeasurer::new(7.0), &LayoutConfig::default(), false)
    }

    #[test]
    fn chain_flows_left_to_right() {
        let g = graph(
            &[("sink", &["in"], &[]), ("source", &[], &["out"])],
            &[(1, "out", 0, "in")],
        );
        let layout = run(&g);
        let source = layout.placement(1).unwrap();
        let sink = layout.placement(0).unwrap();
        assert_eq!((source.x, source.y), (0.0, 0.0));
        assert_eq!((sink.x, sink.y), (WIDTH + 40.0, 0.0));
        assert_eq!(layout.entry_points, vec![1]);
        assert_eq!(layout.exit_points, vec![0]);
        assert_eq!(layout.placements.keys().copied().collect::<Vec<_>>(), vec![1, 0]);
    }

    #[test]
    fn fan_out_opens_branch_rows() {
        let g = graph(
            &[("a", &["in"], &[]), ("src", &[], &["out"]), ("b", &["in"], &[])],
            &[(1, "out", 0, "in"), (1, "out", 2, "in")],
        );
        let layout = run(&g);
        assert_eq!(layout.placements.len(), 3);
        let a = layout.placement(0).unwrap();
        let b = layout.placement(2).unwrap();
        assert_eq!((a.x, a.y), (WIDTH + 40.0, 0.0));
        assert_eq!((b.x, b.y), (WIDTH + 40.0, 30.0));
        assert_eq!(layout.placement(1).unwrap().joined_output, vec![0, 2]);
    }

    #[test]
    fn second_entry_starts_below_first_pass() {
        let g = graph(
            &[
                ("s1", &[], &["out"]),
                ("t1", &["in"], &[]),
                ("s2", &[], &["out"]),
                ("t2", &["in"], &[]),
            ],
            &[(0, "out", 1, "in"), (2, "out", 3, "in")],
        );
        let layout = run(&g);
        assert_eq!(layout.placement(2).unwrap().y, 30.0);
        assert_eq!(layout.placement(3).unwrap().x, WIDTH + 40.0);
        assert_eq!(layout.height, 60.0);
    }

    #[test]
    fn cycle_yields_partial_layout() {
        let g = graph(
            &[("a", &["in"], &["out"]), ("b", &["in"], &["out"])],
            &[(0, "out", 1, "in"), (1, "out", 0, "in")],
        );
        let layout = run(&g);
        assert!(layout.entry_points.is_empty());
        // Both are stacked as unreached modules.
        assert_eq!(layout.placement(0).unwrap().y, 0.0);
        assert_eq!(layout.placement(1).unwrap().y, 30.0);
    }

    #[test]
    fn unwired_terminals_become_boundary() {
        let g = graph(
            &[("load", &["file"], &["out"]), ("fit", &["in", "model"], &["result"])],
            &[(0, "out", 1, "in")],
        );
        let layout = run(&g);
        let inputs: Vec<_> = layout.boundary_inputs.iter().map(|b| b.exposed_id.as_str()).collect();
        let outputs: Vec<_> = layout.boundary_outputs.iter().map(|b| b.exposed_id.as_str()).collect();
        assert_eq!(inputs, vec!["0:file", "1:model"]);
        assert_eq!(outputs, vec!["1:result"]);
    }

    #[test]
    fn autosize_uses_measured_title() {
        let g = graph(&[("a very long module title", &[], &[])], &[]);
        let sub = Subgraph::new(g.modules(), g.wires());
        let layout = layout_composite(&sub, &|_: &str| 200.0, &LayoutConfig::default(), true);
        assert_eq!(layout.placement(0).unwrap().width, 210.0);
        let narrow = layout_composite(&sub, &|_: &str| 10.0, &LayoutConfig::default(), true);
        assert_eq!(narrow.placement(0).unwrap().width, WIDTH);
    }

    #[test]
    fn combined_module_excludes_itself() {
        let catalog = ModuleCatalog::new();
        let config = EditorConfig::default();
        let mut g = graph(&[("a", &[], &["out"]), ("b", &["in"], &[])], &[(0, "out", 1, "in")]);
        g.push_module(ModuleSpec::of_type(config.combined_module_type.clone()), &catalog, &config);
        assert!(Subgraph::of_combined(&g, 0, &config.combined_module_type).is_none());
        let sub = Subgraph::of_combined(&g, 2, &config.combined_module_type).unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.wires().len(), 1);
    }

    #[test]
    fn exposed_ids_split_at_first_colon() {
        assert_eq!(parse_exposed_id("3:out"), Some((3, "out")));
        assert_eq!(parse_exposed_id("3:a:b"), Some((3, "a:b")));
        assert_eq!(parse_exposed_id("out"), None);
        assert_eq!(parse_exposed_id("x:out"), None);

        let g = graph(&[("load", &[], &["out"])], &[]);
        let (_, outputs) = boundary_terminals(&Subgraph::new(g.modules(), g.wires()));
        assert_eq!(outputs[0].to_terminal(), TerminalSpec::new("0:out", "out"));
    }

    #[test]
    fn char_width_measures_longest_line() {
        let m = CharWidthMeasurer::new(2.0);
        assert_eq!(m.text_width("ab\nabcd"), 8.0);
        assert_eq!(m.text_width(""), 0.0);
    }
}
