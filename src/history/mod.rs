//! Undo/redo: commands, snapshots, the manager and scoped transactions

mod command;
mod manager;
mod node_actions;
mod snapshot;
mod transaction;

pub use command::{Command, CommandFlags, CommandGroup};
pub use manager::UndoRedoManager;
pub use node_actions::{DuplicateNode, RemoveNode, ReparentNode};
pub use snapshot::{Snapshot, SnapshotTarget};
pub use transaction::ScopedTransaction;
