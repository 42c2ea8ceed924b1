//! The command protocol shared by every undoable edit

use super::node_actions::{DuplicateNode, RemoveNode, ReparentNode};
use super::snapshot::Snapshot;
use crate::document::Document;
use crate::error::HistoryError;

/// Attributes every command carries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandFlags {
    /// Whether a later snapshot of the same target may fold into this one
    pub allow_merging: bool,

    /// Whether committing this command invalidates all earlier undo steps
    pub breaks_history: bool,
}

impl Default for CommandFlags {
    fn default() -> Self {
        Self {
            allow_merging: true,
            breaks_history: false,
        }
    }
}

/// A reversible unit of work.
///
/// `exec` performs the reversal this command stands for and returns the
/// command that reverses it again, so undo produces the redo step and the
/// other way round. `exec` consumes the command: whatever state it carried is
/// moved into the scene or into the returned inverse.
pub enum Command {
    Snapshot(Snapshot),
    Group(CommandGroup),
    DuplicateNode(DuplicateNode),
    RemoveNode(RemoveNode),
    ReparentNode(ReparentNode),
}

impl Command {
    /// Short label for log output
    pub fn name(&self) -> &'static str {
        match self {
            Command::Snapshot(_) => "snapshot",
            Command::Group(_) => "group",
            Command::DuplicateNode(_) => "duplicate node",
            Command::RemoveNode(_) => "remove node",
            Command::ReparentNode(_) => "reparent node",
        }
    }

    fn flags(&self) -> &CommandFlags {
        match self {
            Command::Snapshot(snapshot) => &snapshot.flags,
            Command::Group(group) => &group.flags,
            Command::DuplicateNode(command) => &command.flags,
            Command::RemoveNode(command) => &command.flags,
            Command::ReparentNode(command) => &command.flags,
        }
    }

    fn flags_mut(&mut self) -> &mut CommandFlags {
        match self {
            Command::Snapshot(snapshot) => &mut snapshot.flags,
            Command::Group(group) => &mut group.flags,
            Command::DuplicateNode(command) => &mut command.flags,
            Command::RemoveNode(command) => &mut command.flags,
            Command::ReparentNode(command) => &mut command.flags,
        }
    }

    pub fn allow_merging(&self) -> bool {
        self.flags().allow_merging
    }

    pub fn set_allow_merging(&mut self, allow: bool) {
        self.flags_mut().allow_merging = allow;
    }

    pub fn should_break_history(&self) -> bool {
        match self {
            Command::Group(group) => group.should_break_history(),
            _ => self.flags().breaks_history,
        }
    }

    pub fn set_breaks_history(&mut self, breaks: bool) {
        self.flags_mut().breaks_history = breaks;
    }

    /// Perform this command and return its inverse
    pub fn exec(self, doc: &mut Document) -> Result<Command, HistoryError> {
        match self {
            Command::Snapshot(snapshot) => snapshot.exec(doc).map(Command::Snapshot),
            Command::Group(group) => group.exec(doc).map(Command::Group),
            Command::DuplicateNode(command) => command.exec(doc),
            Command::RemoveNode(command) => command.exec(doc),
            Command::ReparentNode(command) => command.exec(doc),
        }
    }

    /// Fold `other` into this command.
    ///
    /// Only snapshots merge, and only with snapshots of the same target. On
    /// success `other` no longer carries any state.
    #[must_use = "returns whether the commands were merged"]
    pub fn merge(&mut self, other: &mut Command) -> bool {
        match (self, other) {
            (Command::Snapshot(snapshot), Command::Snapshot(older)) => snapshot.merge(older),
            _ => false,
        }
    }

    /// Whether committing this command would have an observable effect
    pub fn contains_changes(&self, doc: &Document) -> bool {
        match self {
            Command::Snapshot(snapshot) => snapshot.contains_changes(doc),
            Command::Group(group) => group.contains_changes(doc),
            Command::DuplicateNode(_) | Command::RemoveNode(_) => true,
            Command::ReparentNode(command) => command.contains_changes(),
        }
    }

    /// Recompute derived state once the transaction is final
    pub fn on_commit_transaction(&self, doc: &mut Document) {
        match self {
            Command::Snapshot(snapshot) => snapshot.on_commit_transaction(doc),
            Command::Group(group) => group.on_commit_transaction(doc),
            Command::DuplicateNode(_) | Command::RemoveNode(_) => {
                doc.scene.refresh_all_world_transforms();
            }
            Command::ReparentNode(command) => command.on_commit_transaction(doc),
        }
    }
}

impl From<Snapshot> for Command {
    fn from(snapshot: Snapshot) -> Self {
        Command::Snapshot(snapshot)
    }
}

impl From<CommandGroup> for Command {
    fn from(group: CommandGroup) -> Self {
        Command::Group(group)
    }
}

impl From<DuplicateNode> for Command {
    fn from(command: DuplicateNode) -> Self {
        Command::DuplicateNode(command)
    }
}

impl From<RemoveNode> for Command {
    fn from(command: RemoveNode) -> Self {
        Command::RemoveNode(command)
    }
}

impl From<ReparentNode> for Command {
    fn from(command: ReparentNode) -> Self {
        Command::ReparentNode(command)
    }
}

/// Ordered commands that undo and redo as one step
#[derive(Default)]
pub struct CommandGroup {
    pub(crate) flags: CommandFlags,
    commands: Vec<Command>,
}

impl CommandGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command to the end of the group
    pub fn add_command(&mut self, command: impl Into<Command>) {
        self.commands.push(command.into());
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    fn should_break_history(&self) -> bool {
        self.flags.breaks_history
            || self
                .commands
                .iter()
                .any(Command::should_break_history)
    }

    fn contains_changes(&self, doc: &Document) -> bool {
        self.commands
            .iter()
            .any(|command| command.contains_changes(doc))
    }

    fn on_commit_transaction(&self, doc: &mut Document) {
        for command in &self.commands {
            command.on_commit_transaction(doc);
        }
    }

    /// Run the children in order. The inverses come back reversed, since a
    /// later child's reversal may depend on the earlier ones having run.
    ///
    /// If a child fails, the children that already ran are reverted before
    /// the error is returned, so the group applies completely or not at all.
    fn exec(self, doc: &mut Document) -> Result<CommandGroup, HistoryError> {
        let mut inverses = Vec::with_capacity(self.commands.len());
        for command in self.commands {
            match command.exec(doc) {
                Ok(inverse) => inverses.push(inverse),
                Err(e) => {
                    log::warn!("Rolling back {} grouped commands: {}", inverses.len(), e);
                    for inverse in inverses.into_iter().rev() {
                        if let Err(rollback) = inverse.exec(doc) {
                            log::error!("Failed to roll back grouped command: {}", rollback);
                        }
                    }
                    return Err(e);
                }
            }
        }
        inverses.reverse();

        Ok(CommandGroup {
            flags: CommandFlags::default(),
            commands: inverses,
        })
    }
}
