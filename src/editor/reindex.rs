//! Position reindexing.
//!
//! Wires address modules by position, so every structural change to the
//! module sequence has to be followed by a rewiring pass. The graph snapshots
//! `stable id → position` before the change, rebuilds the sequence, snapshots
//! again and diffs the two into an [`IndexUpdate`], which [`rewire`] applies to
//! every wire endpoint.
//!
//! This pass must finish before wires are validated: a deletion shifts the
//! modules behind it, and only the old positions tell which endpoint pointed
//! at the deleted module and which at a module that merely moved.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::trace;

use super::graph::Module;
use super::identity::StableId;
use crate::model::Wire;

/// Snapshot of `stable id → position`.
pub type IdMap = HashMap<StableId, usize>;

/// Build the id map for the current module order.
pub fn id_map(modules: &[Module]) -> IdMap {
    modules
        .iter()
        .enumerate()
        .map(|(position, module)| (module.id(), position))
        .collect()
}

/// Rewrite each module's `index` to its position in the sequence.
pub fn renumber(modules: &mut [Module]) {
    for (position, module) in modules.iter_mut().enumerate() {
        module.set_index(position);
    }
}

/// Position translation produced by one structural change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexUpdate {
    /// Old position → new position, for surviving modules that moved.
    pub moved: BTreeMap<usize, usize>,
    /// Old positions of modules that no longer exist.
    pub removed: BTreeSet<usize>,
}

impl IndexUpdate {
    /// Diff two id maps taken before and after a change.
    pub fn diff(old: &IdMap, new: &IdMap) -> Self {
        let mut update = Self::default();
        for (id, &old_position) in old {
            match new.get(id) {
                Some(&new_position) if new_position != old_position => {
                    update.moved.insert(old_position, new_position);
                }
                Some(_) => {}
                None => {
                    update.removed.insert(old_position);
                }
            }
        }
        update
    }

    pub fn is_empty(&self) -> bool {
        self.moved.is_empty() && self.removed.is_empty()
    }
}

/// Apply an [`IndexUpdate`] to a wire set.
///
/// Endpoints at a moved position are rewritten in place. Wires with an
/// endpoint at a removed position are dropped, since that position may now
/// address a different module. Returns the number of wires dropped.
pub fn rewire(wires: &mut Vec<Wire>, update: &IndexUpdate) -> usize {
    if update.is_empty() {
        return 0;
    }
    let before = wires.len();
    wires.retain_mut(|wire| {
        for end in [&mut wire.source, &mut wire.target] {
            let Some(endpoint) = end.endpoint_mut() else {
                continue;
            };
            if update.removed.contains(&endpoint.module) {
                trace!(%endpoint, "endpoint module removed, dropping wire");
                return false;
            }
            if let Some(&new_position) = update.moved.get(&endpoint.module) {
                trace!(%endpoint, new_position, "rewiring endpoint");
                endpoint.module = new_position;
            }
        }
        true
    });
    before - wires.len()
}
