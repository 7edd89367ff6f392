//! Graph editing core.
//!
//! - **Identity**: modules carry a [`StableId`] that survives every edit,
//!   while wires address modules by position.
//! - **Reindexing**: every structural change is followed by a rewiring pass
//!   that translates wire endpoints from old to new positions.
//! - **Validation**: wires whose endpoints no longer resolve are dropped
//!   silently.
//! - **Wire gesture**: an explicit `Idle`/`Drawing` state machine for
//!   drawing a wire between two terminals.
//! - **Editor state**: owns all of the above and fires the update signal.

pub mod graph;
pub mod identity;
pub mod reindex;
pub mod state;
pub mod validate;
pub mod wiring;

pub use graph::{Graph, Module, Normalized};
pub use identity::{IdRegistry, StableId};
pub use reindex::IndexUpdate;
pub use state::{EditorState, GraphChanged};
pub use wiring::{Drawing, WireGesture, WireOutcome};
