//! Wire validation.
//!
//! After reindexing, any committed endpoint that no longer names an existing
//! module and terminal is a leftover of editing, not a user error. Such wires
//! are dropped without any user-visible message.

use tracing::debug;

use super::graph::Module;
use crate::model::{Polarity, Wire, WireEnd};

/// True if `end` is the cursor or names an existing terminal of the given polarity.
pub fn resolves(modules: &[Module], end: &WireEnd, polarity: Polarity) -> bool {
    match end {
        WireEnd::Cursor => true,
        WireEnd::Terminal(endpoint) => modules
            .get(endpoint.module)
            .is_some_and(|m| m.has_terminal(polarity, &endpoint.terminal)),
    }
}

/// A wire resolves when its source is an output and its target an input.
pub fn wire_resolves(modules: &[Module], wire: &Wire) -> bool {
    resolves(modules, &wire.source, Polarity::Output)
        && resolves(modules, &wire.target, Polarity::Input)
}

/// Drop every wire that does not resolve; returns how many were dropped.
pub fn validate_wires(modules: &[Module], wires: &mut Vec<Wire>) -> usize {
    let before = wires.len();
    wires.retain(|wire| {
        let keep = wire_resolves(modules, wire);
        if !keep {
            debug!(%wire, "dropping dangling wire");
        }
        keep
    });
    before - wires.len()
}
