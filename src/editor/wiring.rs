//! Interactive wire creation.
//!
//! A gesture runs `start → pull* → stop`:
//!
//! - **start** on a terminal of a wireable module pushes a provisional wire
//!   whose other end is the cursor, and records every opposite-polarity
//!   terminal on a wireable module as a drop candidate.
//! - **pull** re-resolves which candidate (if any) is under the pointer. The
//!   caller does the hit-testing and passes the terminal it found.
//! - **stop** attaches the cursor end to the hovered candidate. If the wire is
//!   still on the cursor, or the same `(source, target)` pair now exists twice,
//!   the provisional wire is discarded.
//!
//! Only one gesture can be in progress; `start` is refused while drawing.

use tracing::debug;

use super::graph::Graph;
use crate::model::{Endpoint, Polarity, Wire, WireEnd};

/// State of the wire-creation gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WireGesture {
    #[default]
    Idle,
    Drawing(Drawing),
}

/// An in-progress gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drawing {
    anchor: Endpoint,
    polarity: Polarity,
    candidates: Vec<Endpoint>,
    hovered: Option<Endpoint>,
}

impl Drawing {
    /// The terminal the drag started from.
    pub fn anchor(&self) -> &Endpoint {
        &self.anchor
    }

    /// Polarity of the anchor terminal.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn candidates(&self) -> &[Endpoint] {
        &self.candidates
    }

    pub fn hovered(&self) -> Option<&Endpoint> {
        self.hovered.as_ref()
    }
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireOutcome {
    /// A new wire was added.
    Committed(Wire),
    /// The wire already existed; the new copy was discarded.
    Duplicate(Wire),
    /// Released away from any candidate terminal.
    Cancelled,
}

impl WireGesture {
    pub fn is_drawing(&self) -> bool {
        matches!(self, WireGesture::Drawing(_))
    }

    pub fn drawing(&self) -> Option<&Drawing> {
        match self {
            WireGesture::Idle => None,
            WireGesture::Drawing(drawing) => Some(drawing),
        }
    }

    /// Terminals currently highlighted as drop targets.
    pub fn candidates(&self) -> &[Endpoint] {
        match self {
            WireGesture::Idle => &[],
            WireGesture::Drawing(drawing) => &drawing.candidates,
        }
    }

    pub fn is_candidate(&self, endpoint: &Endpoint) -> bool {
        self.candidates().contains(endpoint)
    }

    /// Begin a gesture at `anchor`. Returns false (and stays idle) when
    /// already drawing, or when the module is not wireable or lacks the terminal.
    pub fn start(
        &mut self,
        graph: &mut Graph,
        anchor: Endpoint,
        polarity: Polarity,
        allow_self_wires: bool,
    ) -> bool {
        if self.is_drawing() {
            debug!(%anchor, "wire gesture already in progress");
            return false;
        }
        let Some(module) = graph.module(anchor.module) else {
            return false;
        };
        if !module.wireable {
            debug!(%anchor, "module is not wireable");
            return false;
        }
        if !module.has_terminal(polarity, &anchor.terminal) {
            debug!(%anchor, ?polarity, "no such terminal");
            return false;
        }
        if graph.provisional_wire().is_some() {
            return false;
        }
        let candidates = drop_candidates(graph, &anchor, polarity.opposite(), allow_self_wires);
        graph
            .wires_mut()
            .push(Wire::provisional(anchor.clone(), polarity));
        *self = WireGesture::Drawing(Drawing {
            anchor,
            polarity,
            candidates,
            hovered: None,
        });
        true
    }

    /// Report the terminal under the pointer. Anything that is not a drop
    /// candidate counts as nothing. Returns the resolved candidate.
    pub fn pull(&mut self, under_pointer: Option<&Endpoint>) -> Option<&Endpoint> {
        let WireGesture::Drawing(drawing) = self else {
            return None;
        };
        drawing.hovered = under_pointer
            .filter(|ep| drawing.candidates.contains(ep))
            .cloned();
        drawing.hovered.as_ref()
    }

    /// Release the pointer. Returns `None` if no gesture was in progress.
    pub fn stop(&mut self, graph: &mut Graph) -> Option<WireOutcome> {
        let WireGesture::Drawing(drawing) = std::mem::take(self) else {
            return None;
        };
        let wires = graph.wires_mut();
        let Some(pos) = wires.iter().rposition(Wire::has_cursor) else {
            return Some(WireOutcome::Cancelled);
        };
        if let Some(hovered) = drawing.hovered {
            *wires[pos].end_mut(drawing.polarity.opposite()) = WireEnd::Terminal(hovered);
        }
        let outcome = if wires[pos].has_cursor() {
            wires.remove(pos);
            WireOutcome::Cancelled
        } else {
            let wire = wires[pos].clone();
            let copies = wires.iter().filter(|w| **w == wire).count();
            if copies > 1 {
                wires.remove(pos);
                WireOutcome::Duplicate(wire)
            } else {
                WireOutcome::Committed(wire)
            }
        };
        debug!(?outcome, "wire gesture finished");
        graph.normalize();
        Some(outcome)
    }

    /// Drop an in-progress gesture and its provisional wire.
    pub fn abort(&mut self, graph: &mut Graph) -> bool {
        if !self.is_drawing() {
            return false;
        }
        *self = WireGesture::Idle;
        graph.wires_mut().retain(|w| !w.has_cursor());
        true
    }
}

/// Every terminal of the given polarity on a wireable module.
fn drop_candidates(
    graph: &Graph,
    anchor: &Endpoint,
    polarity: Polarity,
    allow_self_wires: bool,
) -> Vec<Endpoint> {
    graph
        .modules()
        .iter()
        .filter(|m| m.wireable)
        .filter(|m| allow_self_wires || m.index() != anchor.module)
        .flat_map(|m| {
            m.terminals(polarity)
                .iter()
                .map(|t| Endpoint::new(m.index(), t.id.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModuleCatalog;
    use crate::config::EditorConfig;
    use crate::model::ModuleSpec;

    fn two_modules() -> Graph {
        let catalog = ModuleCatalog::new();
        let config = EditorConfig::default();
        let mut graph = Graph::new();
        graph.push_module(ModuleSpec::with_terminals("a", &["in"], &["out"]), &catalog, &config);
        graph.push_module(ModuleSpec::with_terminals("b", &["in"], &["out"]), &catalog, &config);
        graph
    }

    #[test]
    fn start_from_output_puts_cursor_on_target() {
        let mut graph = two_modules();
        let mut gesture = WireGesture::default();
        assert!(gesture.start(&mut graph, Endpoint::new(0, "out"), Polarity::Output, true));
        let wire = graph.provisional_wire().unwrap();
        assert_eq!(wire.source, WireEnd::Terminal(Endpoint::new(0, "out")));
        assert!(wire.target.is_cursor());
        assert_eq!(
            gesture.candidates(),
            &[Endpoint::new(0, "in"), Endpoint::new(1, "in")]
        );
    }

    #[test]
    fn self_wires_can_be_excluded() {
        let mut graph = two_modules();
        let mut gesture = WireGesture::default();
        assert!(gesture.start(&mut graph, Endpoint::new(0, "out"), Polarity::Output, false));
        assert_eq!(gesture.candidates(), &[Endpoint::new(1, "in")]);
    }

    #[test]
    fn start_is_refused_while_drawing() {
        let mut graph = two_modules();
        let mut gesture = WireGesture::default();
        assert!(gesture.start(&mut graph, Endpoint::new(0, "out"), Polarity::Output, true));
        assert!(!gesture.start(&mut graph, Endpoint::new(1, "in"), Polarity::Input, true));
        assert_eq!(graph.wires().len(), 1);
    }

    #[test]
    fn start_on_wrong_polarity_is_a_no_op() {
        let mut graph = two_modules();
        let mut gesture = WireGesture::default();
        assert!(!gesture.start(&mut graph, Endpoint::new(0, "out"), Polarity::Input, true));
        assert_eq!(gesture, WireGesture::Idle);
        assert!(graph.wires().is_empty());
    }

    #[test]
    fn pull_ignores_non_candidates() {
        let mut graph = two_modules();
        let mut gesture = WireGesture::default();
        gesture.start(&mut graph, Endpoint::new(0, "out"), Polarity::Output, true);
        assert_eq!(gesture.pull(Some(&Endpoint::new(1, "out"))), None);
        assert_eq!(
            gesture.pull(Some(&Endpoint::new(1, "in"))),
            Some(&Endpoint::new(1, "in"))
        );
        assert_eq!(gesture.pull(None), None);
    }

    #[test]
    fn stop_from_input_fills_source() {
        let mut graph = two_modules();
        let mut gesture = WireGesture::default();
        gesture.start(&mut graph, Endpoint::new(1, "in"), Polarity::Input, true);
        gesture.pull(Some(&Endpoint::new(0, "out")));
        let outcome = gesture.stop(&mut graph);
        let expected = Wire::new(Endpoint::new(0, "out"), Endpoint::new(1, "in"));
        assert_eq!(outcome, Some(WireOutcome::Committed(expected.clone())));
        assert_eq!(graph.wires(), &[expected]);
        assert!(!gesture.is_drawing());
        assert!(gesture.candidates().is_empty());
    }

    #[test]
    fn stop_when_idle_returns_none() {
        let mut graph = two_modules();
        let mut gesture = WireGesture::default();
        assert_eq!(gesture.stop(&mut graph), None);
    }

    #[test]
    fn abort_removes_provisional_wire() {
        let mut graph = two_modules();
        let mut gesture = WireGesture::default();
        gesture.start(&mut graph, Endpoint::new(0, "out"), Polarity::Output, true);
        assert!(gesture.abort(&mut graph));
        assert!(graph.wires().is_empty());
        assert!(!gesture.abort(&mut graph));
    }
}
