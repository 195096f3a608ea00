//! Linear undo/redo history over serialized document snapshots.
//!
//! History is scoped to one document: two stacks of sanitized markup
//! strings plus the current snapshot. A new commit after an undo collapses
//! the abandoned branch by clearing the redo stack, matching standard
//! text-editor expectations.

use std::mem;

/// Undo/redo stacks around the current snapshot.
///
/// Snapshots are immutable once pushed; the only mutations are the three
/// operations below. Rendering the returned snapshot into live content is
/// the caller's job.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    current: String,
}

impl History {
    pub fn new(initial: String) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            current: initial,
        }
    }

    /// The snapshot the user is currently looking at.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Record a new snapshot.
    ///
    /// A snapshot equal to the current one is a no-op. Otherwise the
    /// current snapshot moves onto the undo stack and the redo stack is
    /// cleared — the sole operation that ever discards redo history.
    /// Returns whether anything was recorded.
    pub fn commit(&mut self, snapshot: String) -> bool {
        if snapshot == self.current {
            return false;
        }
        let previous = mem::replace(&mut self.current, snapshot);
        self.undo_stack.push(previous);
        self.redo_stack.clear();
        true
    }

    /// Step back one snapshot. No-op returning `None` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> Option<&str> {
        let restored = self.undo_stack.pop()?;
        let abandoned = mem::replace(&mut self.current, restored);
        self.redo_stack.push(abandoned);
        Some(&self.current)
    }

    /// Step forward one snapshot. No-op returning `None` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Option<&str> {
        let restored = self.redo_stack.pop()?;
        let abandoned = mem::replace(&mut self.current, restored);
        self.undo_stack.push(abandoned);
        Some(&self.current)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[cfg(test)]
    fn depths(&self) -> (usize, usize) {
        (self.undo_stack.len(), self.redo_stack.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn history_with(commits: &[&str]) -> History {
        let mut h = History::new("".to_string());
        for c in commits {
            h.commit(c.to_string());
        }
        h
    }

    #[test]
    fn test_commit_pushes_previous_current() {
        let mut h = History::new("".to_string());
        assert!(h.commit("<p>a</p>".to_string()));

        assert_eq!(h.current(), "<p>a</p>");
        assert_eq!(h.depths(), (1, 0));
    }

    #[test]
    fn test_commit_equal_snapshot_is_noop() {
        let mut h = history_with(&["<p>a</p>"]);
        assert!(!h.commit("<p>a</p>".to_string()));

        assert_eq!(h.current(), "<p>a</p>");
        assert_eq!(h.depths(), (1, 0));
    }

    #[test]
    fn test_undo_restores_previous_snapshot() {
        let mut h = history_with(&["<p>a</p>", "<p>ab</p>"]);

        assert_eq!(h.undo(), Some("<p>a</p>"));
        assert_eq!(h.current(), "<p>a</p>");
        assert_eq!(h.depths(), (1, 1));
    }

    #[test]
    fn test_undo_on_empty_stack_is_noop() {
        let mut h = History::new("<p>a</p>".to_string());
        assert_eq!(h.undo(), None);
        assert_eq!(h.current(), "<p>a</p>");
    }

    #[test]
    fn test_redo_on_empty_stack_is_noop() {
        let mut h = history_with(&["<p>a</p>"]);
        assert_eq!(h.redo(), None);
        assert_eq!(h.current(), "<p>a</p>");
    }

    #[test]
    fn test_undo_then_redo_round_trips() {
        let mut h = history_with(&["<p>a</p>", "<p>b</p>", "<p>c</p>"]);

        h.undo();
        h.undo();
        h.undo();
        assert_eq!(h.current(), "");

        h.redo();
        h.redo();
        h.redo();
        assert_eq!(h.current(), "<p>c</p>");
        assert_eq!(h.depths(), (3, 0));
    }

    #[test]
    fn test_commit_after_undo_clears_redo_stack() {
        // commit(A), commit(B), undo -> current=A, commit(C):
        // redo is gone and the abandoned branch B is unreachable.
        let mut h = history_with(&["A", "B"]);

        h.undo();
        assert_eq!(h.current(), "A");
        assert!(h.can_redo());

        assert!(h.commit("C".to_string()));
        assert_eq!(h.current(), "C");
        assert!(!h.can_redo());
        assert_eq!(h.depths(), (2, 0)); // ["", "A"]

        assert_eq!(h.undo(), Some("A"));
        assert_eq!(h.undo(), Some(""));
        assert_eq!(h.undo(), None);
    }

    #[test]
    fn test_can_undo_can_redo_track_stacks() {
        let mut h = History::new("".to_string());
        assert!(!h.can_undo());
        assert!(!h.can_redo());

        h.commit("<p>x</p>".to_string());
        assert!(h.can_undo());
        assert!(!h.can_redo());

        h.undo();
        assert!(!h.can_undo());
        assert!(h.can_redo());
    }
}
