//! Undo/redo command log
//!
//! Every forward mutation is recorded as an undo group holding the operation
//! paired with its inverse. Undo replays inverses and moves the group onto the
//! redo stack; redo replays the forward operations and moves it back. Any new
//! forward mutation discards the redo stack (linear history).
//!
//! The log does not own the data it mutates. Callers pass the target in as a
//! [`Replay`] implementation, which keeps ownership with the marker store.

use tracing::debug;

use crate::operation::Operation;

/// Something operations can be replayed against
///
/// Replays during undo/redo come from a consistent linear history, so they
/// cannot fail.
pub trait Replay {
    fn replay(&mut self, operation: &Operation);
}

/// What the log is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogState {
    #[default]
    Idle,
    Undoing,
    Redoing,
}

/// An operation together with the operation that reverses it
#[derive(Debug, Clone, PartialEq)]
pub struct InversePair {
    pub forward: Operation,
    pub inverse: Operation,
}

/// One user-visible edit: the unit undo and redo move around
#[derive(Debug, Clone, PartialEq)]
pub struct UndoGroup {
    label: String,
    pairs: Vec<InversePair>,
}

impl UndoGroup {
    fn single(operation: Operation) -> Self {
        let label = operation.label();
        let inverse = operation.inverse();
        Self {
            label,
            pairs: vec![InversePair { forward: operation, inverse }],
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pairs(&self) -> &[InversePair] {
        &self.pairs
    }
}

/// Undo and redo stacks for one editing session
///
/// Owned explicitly by whoever drives the edit session; there is no global
/// instance.
#[derive(Debug, Default)]
pub struct CommandLog {
    /// Groups that can be undone (most recent last)
    undo_stack: Vec<UndoGroup>,
    /// Groups that can be redone (most recent last)
    redo_stack: Vec<UndoGroup>,
    state: LogState,
    /// Oldest groups beyond this depth are dropped, `None` keeps everything
    max_levels: Option<usize>,
}

impl CommandLog {
    /// Create an empty log with unbounded history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty log keeping at most `max_levels` undo groups
    pub fn with_max_levels(max_levels: Option<usize>) -> Self {
        Self {
            max_levels,
            ..Self::default()
        }
    }

    /// Apply `operation` to `target` and record it as a new undo group
    ///
    /// Discards the redo stack.
    ///
    /// # Panics
    /// If called while an undo or redo is in progress.
    pub fn apply<T: Replay + ?Sized>(&mut self, target: &mut T, operation: Operation) {
        assert_eq!(
            self.state,
            LogState::Idle,
            "CommandLog::apply called while {:?}",
            self.state
        );

        target.replay(&operation);

        let group = UndoGroup::single(operation);
        debug!(label = group.label(), discarded_redo = self.redo_stack.len(), "apply");

        self.redo_stack.clear();
        self.undo_stack.push(group);

        if let Some(max) = self.max_levels {
            if self.undo_stack.len() > max {
                let excess = self.undo_stack.len() - max;
                self.undo_stack.drain(..excess);
            }
        }
    }

    /// Undo the most recent group against `target`
    ///
    /// Returns `false` and leaves everything untouched when there is nothing
    /// to undo.
    pub fn undo<T: Replay + ?Sized>(&mut self, target: &mut T) -> bool {
        if !self.can_undo() {
            return false;
        }
        let Some(group) = self.undo_stack.pop() else {
            return false;
        };

        debug!(label = group.label(), "undo");
        self.state = LogState::Undoing;
        for pair in group.pairs.iter().rev() {
            target.replay(&pair.inverse);
        }
        self.state = LogState::Idle;

        self.redo_stack.push(group);
        true
    }

    /// Redo the most recently undone group against `target`
    pub fn redo<T: Replay + ?Sized>(&mut self, target: &mut T) -> bool {
        if !self.can_redo() {
            return false;
        }
        let Some(group) = self.redo_stack.pop() else {
            return false;
        };

        debug!(label = group.label(), "redo");
        self.state = LogState::Redoing;
        for pair in &group.pairs {
            target.replay(&pair.forward);
        }
        self.state = LogState::Idle;

        self.undo_stack.push(group);
        true
    }

    /// Whether an undo is possible right now
    ///
    /// Always `false` while an undo or redo is in flight.
    pub fn can_undo(&self) -> bool {
        self.state == LogState::Idle && !self.undo_stack.is_empty()
    }

    /// Whether a redo is possible right now
    pub fn can_redo(&self) -> bool {
        self.state == LogState::Idle && !self.redo_stack.is_empty()
    }

    pub fn state(&self) -> LogState {
        self.state
    }

    /// Menu title for the next undo
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(UndoGroup::label)
    }

    /// Menu title for the next redo
    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(UndoGroup::label)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Forget all history (after a document reload, for example)
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{Marker, MarkerId, MarkerKind, MarkerStyle, PageRect};
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Recorder {
        live: BTreeMap<MarkerId, Marker>,
        replayed: Vec<String>,
    }

    impl Replay for Recorder {
        fn replay(&mut self, operation: &Operation) {
            self.replayed.push(operation.label());
            if let Some(id) = operation.removed_id() {
                self.live.remove(&id);
            }
            if let Some(marker) = operation.inserted() {
                self.live.insert(marker.id(), marker.clone());
            }
        }
    }

    fn marker(kind: MarkerKind) -> Marker {
        Marker::new(kind, 0, PageRect::new(0.0, 0.0, 10.0, 10.0), MarkerStyle::default())
    }

    #[test]
    fn test_apply_pushes_one_group_per_operation() {
        let mut log = CommandLog::new();
        let mut target = Recorder::default();
        assert!(!log.can_undo());

        log.apply(&mut target, Operation::Add(marker(MarkerKind::Circle)));
        log.apply(&mut target, Operation::Add(marker(MarkerKind::Line)));

        assert_eq!(log.undo_count(), 2);
        assert_eq!(log.undo_label(), Some("Add Line"));
        assert_eq!(target.live.len(), 2);
        assert!(log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn test_undo_then_redo_moves_groups() {
        let mut log = CommandLog::new();
        let mut target = Recorder::default();
        let circle = marker(MarkerKind::Circle);

        log.apply(&mut target, Operation::Add(circle.clone()));
        assert!(log.undo(&mut target));
        assert!(target.live.is_empty());
        assert_eq!(log.undo_count(), 0);
        assert_eq!(log.redo_count(), 1);
        assert_eq!(log.redo_label(), Some("Add Circle"));

        assert!(log.redo(&mut target));
        assert_eq!(target.live.get(&circle.id()), Some(&circle));
        assert_eq!(log.undo_count(), 1);
        assert_eq!(log.redo_count(), 0);
        assert_eq!(target.replayed, vec!["Add Circle", "Delete Circle", "Add Circle"]);
    }

    #[test]
    fn test_undo_and_redo_on_empty_stacks() {
        let mut log = CommandLog::new();
        let mut target = Recorder::default();

        assert!(!log.undo(&mut target));
        assert!(!log.redo(&mut target));
        assert!(target.replayed.is_empty());
        assert_eq!(log.state(), LogState::Idle);
    }

    #[test]
    fn test_apply_discards_redo_stack() {
        let mut log = CommandLog::new();
        let mut target = Recorder::default();

        log.apply(&mut target, Operation::Add(marker(MarkerKind::Circle)));
        log.apply(&mut target, Operation::Add(marker(MarkerKind::Square)));
        log.undo(&mut target);
        log.undo(&mut target);
        assert_eq!(log.redo_count(), 2);

        log.apply(&mut target, Operation::Add(marker(MarkerKind::Arrow)));
        assert!(!log.can_redo());
        assert!(!log.redo(&mut target));
        assert_eq!(target.live.len(), 1);
    }

    #[test]
    fn test_max_levels_trims_oldest() {
        let mut log = CommandLog::with_max_levels(Some(3));
        let mut target = Recorder::default();

        for _ in 0..5 {
            log.apply(&mut target, Operation::Add(marker(MarkerKind::HandDrawn)));
        }
        assert_eq!(log.undo_count(), 3);

        while log.undo(&mut target) {}
        assert_eq!(target.live.len(), 2);
    }

    #[test]
    fn test_queries_false_while_replaying() {
        let mut log = CommandLog::new();
        let mut target = Recorder::default();
        log.apply(&mut target, Operation::Add(marker(MarkerKind::Circle)));
        log.apply(&mut target, Operation::Add(marker(MarkerKind::Circle)));
        log.undo(&mut target);

        // Callers can't observe a replay in flight since `undo`/`redo` hold
        // `&mut self`; force the state to check the guards.
        log.state = LogState::Undoing;
        assert!(!log.can_undo());
        assert!(!log.can_redo());
        assert!(!log.undo(&mut target));

        log.state = LogState::Redoing;
        assert!(!log.can_undo());
        assert!(!log.redo(&mut target));

        log.state = LogState::Idle;
        assert!(log.can_undo());
        assert!(log.can_redo());
    }

    #[test]
    #[should_panic(expected = "CommandLog::apply called while Undoing")]
    fn test_apply_during_undo_panics() {
        let mut log = CommandLog::new();
        let mut target = Recorder::default();
        log.state = LogState::Undoing;
        log.apply(&mut target, Operation::Add(marker(MarkerKind::Circle)));
    }

    #[test]
    fn test_clear() {
        let mut log = CommandLog::new();
        let mut target = Recorder::default();
        log.apply(&mut target, Operation::Add(marker(MarkerKind::Circle)));
        log.apply(&mut target, Operation::Add(marker(MarkerKind::Circle)));
        log.undo(&mut target);

        log.clear();
        assert!(!log.can_undo());
        assert!(!log.can_redo());
        assert_eq!(log.undo_label(), None);
    }
}
