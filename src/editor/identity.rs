//! Stable module identity.
//!
//! A module's position in the module sequence changes whenever modules are
//! inserted or removed ahead of it. Its [`StableId`] never does: it is minted
//! once by the graph's [`IdRegistry`] and never handed out again.

use serde::Serialize;
use std::fmt;

/// Opaque, never-reused module handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StableId(u64);

impl StableId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Largest id accepted from a document: the largest integer a JSON number
/// holds exactly in every reader.
pub const MAX_CLAIMED_ID: u64 = (1 << 53) - 1;

/// Issues [`StableId`]s for one graph.
///
/// Ids are handed out from a monotonic counter, so an id below the counter
/// may already have been issued and is never accepted again. Claims are
/// capped at [`MAX_CLAIMED_ID`], which keeps the counter far from `u64::MAX`.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    next: u64,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh id.
    pub fn mint(&mut self) -> StableId {
        let id = StableId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }

    /// Accept a caller-provided id if it can never have been issued before.
    pub fn claim(&mut self, raw: u64) -> Option<StableId> {
        if raw < self.next || raw > MAX_CLAIMED_ID {
            return None;
        }
        self.next = raw + 1;
        Some(StableId(raw))
    }

    /// Use `preferred` when it can be claimed, otherwise mint.
    pub fn claim_or_mint(&mut self, preferred: Option<u64>) -> StableId {
        preferred
            .and_then(|raw| self.claim(raw))
            .unwrap_or_else(|| self.mint())
    }
}
