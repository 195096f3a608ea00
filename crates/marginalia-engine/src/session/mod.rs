//! The editor session: one live document, its history, its annotations,
//! and the debounced reconciliation between continuous input and discrete
//! saved snapshots.
//!
//! A session is a plain value owned by the host — no shared globals. The
//! host translates raw input events into method calls and drives time by
//! calling [`EditorSession::tick`] with the current instant; everything
//! here is synchronous and single-threaded.

pub mod timers;

use std::ops::Range;
use std::time::{Duration, Instant};

use log::{debug, trace};
use marginalia_config::EditorConfig;

use crate::annotations::{Annotation, AnnotationError, AnnotationId, AnnotationRegistry};
use crate::editing::{Cmd, Document, History, Patch};
use crate::host::Host;
use crate::sanitize::{AllowList, is_empty_markup, normalize_empty, sanitize};
use timers::DebounceTimer;

/// A single empty editable paragraph — the state the buffer takes when the
/// placeholder is cleared on focus.
pub const EMPTY_PARAGRAPH: &str = "<p></p>";

/// Named formatting operations over the current selection.
///
/// These wrap the selection in conventional inline tags. None of them are
/// on the allow-list, so the formatting is lossy by design: it lives in
/// the buffer for the current view but is stripped from every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
}

impl FormatCommand {
    fn tag(self) -> &'static str {
        match self {
            FormatCommand::Bold => "b",
            FormatCommand::Italic => "i",
            FormatCommand::Underline => "u",
        }
    }
}

/// The document editor core.
///
/// Owns the live content buffer exclusively; the history engine and the
/// annotation registry only exchange values with it. Two independent
/// debounce timers reconcile continuous input with discrete snapshots:
/// a short one committing undo steps, a long one firing autosave. Both
/// read the same live content at fire time, and both die with the
/// session, so a dropped editor never fires against disposed content.
pub struct EditorSession<H> {
    doc: Document,
    history: History,
    registry: AnnotationRegistry,
    allow: AllowList,
    placeholder: String,
    history_timer: DebounceTimer,
    autosave_timer: DebounceTimer,
    highlighted: Option<AnnotationId>,
    focused: bool,
    host: H,
}

impl<H: Host> EditorSession<H> {
    /// Create a session over previously saved content (possibly empty).
    ///
    /// The initial content is sanitized on load; an empty document shows
    /// the configured placeholder, which is a view-layer artifact and is
    /// never committed or persisted.
    pub fn new(initial: &str, config: &EditorConfig, host: H) -> Self {
        let allow = AllowList::default();
        let sanitized = sanitize(initial, &allow);
        let history = History::new(sanitized.clone());

        let live = if is_empty_markup(&sanitized) {
            config.placeholder.clone()
        } else {
            sanitized
        };

        Self {
            doc: Document::new(&live),
            history,
            registry: AnnotationRegistry::new(),
            allow,
            placeholder: config.placeholder.clone(),
            history_timer: DebounceTimer::new(Duration::from_millis(config.history_debounce_ms)),
            autosave_timer: DebounceTimer::new(Duration::from_millis(config.autosave_debounce_ms)),
            highlighted: None,
            focused: false,
            host,
        }
    }

    // --- content and selection ---

    /// The live buffer content, placeholder and un-sanitized formatting
    /// included.
    pub fn content(&self) -> String {
        self.doc.text()
    }

    /// The value the host would receive from autosave right now: live
    /// content sanitized, with placeholder and canonical empty forms
    /// collapsed to `""`.
    pub fn persisted_value(&self) -> String {
        let sanitized = self.snapshot_value();
        normalize_empty(&sanitized).to_string()
    }

    pub fn selection(&self) -> Range<usize> {
        self.doc.selection()
    }

    pub fn set_selection(&mut self, selection: Range<usize>) {
        self.doc.set_selection(selection);
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // --- focus / placeholder policy ---

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Focus gained: placeholder content clears to an empty paragraph with
    /// the cursor inside it. Not a content change — no timers are bumped.
    pub fn focus(&mut self) {
        self.focused = true;
        if self.doc.text() == self.placeholder {
            self.replace_all(EMPTY_PARAGRAPH);
            self.doc.set_selection(3..3); // inside the <p>
        }
    }

    /// Focus lost: empty content reverts to the placeholder.
    pub fn blur(&mut self) {
        self.focused = false;
        if is_empty_markup(&self.doc.text()) {
            self.replace_all(&self.placeholder.clone());
        }
    }

    // --- edits ---

    /// Insert text at the selection, replacing whatever is selected.
    pub fn insert_text(&mut self, text: &str, now: Instant) -> Patch {
        let range = self.doc.selection();
        self.apply_edit(
            Cmd::ReplaceRange {
                range,
                text: text.to_string(),
            },
            now,
        )
    }

    pub fn delete_range(&mut self, range: Range<usize>, now: Instant) -> Patch {
        self.apply_edit(Cmd::DeleteRange { range }, now)
    }

    pub fn replace_range(&mut self, range: Range<usize>, text: &str, now: Instant) -> Patch {
        self.apply_edit(
            Cmd::ReplaceRange {
                range,
                text: text.to_string(),
            },
            now,
        )
    }

    /// Insert pasted plain text at the selection.
    ///
    /// All source formatting is discarded: the text is entity-escaped and
    /// newlines become paragraph breaks, keeping the paste inside the
    /// allowed markup subset.
    pub fn paste(&mut self, raw_text: &str, now: Instant) -> Patch {
        let escaped = html_escape::encode_text(raw_text);
        let markup = escaped.replace("\r\n", "</p><p>").replace('\n', "</p><p>");
        let range = self.doc.selection();
        self.apply_edit(Cmd::ReplaceRange { range, text: markup }, now)
    }

    /// Apply a formatting command to the current selection.
    ///
    /// Silently a no-op without a usable selection, matching permissive
    /// rich-text-editor conventions.
    pub fn apply_format_command(&mut self, command: FormatCommand, now: Instant) -> Option<Patch> {
        if !self.doc.selection_is_wrappable() {
            trace!("format {command:?} ignored: no usable selection");
            return None;
        }
        let tag = command.tag();
        let text = self.doc.selected_text();
        let range = self.doc.selection();
        Some(self.apply_edit(
            Cmd::ReplaceRange {
                range,
                text: format!("<{tag}>{text}</{tag}>"),
            },
            now,
        ))
    }

    /// Every raw edit lands here: apply the command, then reset both
    /// debounce windows.
    fn apply_edit(&mut self, cmd: Cmd, now: Instant) -> Patch {
        let patch = self.doc.apply(cmd);
        self.content_changed(now);
        patch
    }

    fn content_changed(&mut self, now: Instant) {
        self.history_timer.bump(now);
        self.autosave_timer.bump(now);
        trace!("content changed, debounce windows reset (v{})", self.doc.version());
    }

    // --- timers ---

    /// Fire any timer whose inactivity window has elapsed.
    ///
    /// The short timer commits a history snapshot when the sanitized
    /// content differs from the current one; the long timer hands the
    /// persisted value to the host. While an annotation is pending both
    /// fires are skipped — the provisional marker must not be committed
    /// or persisted.
    pub fn tick(&mut self, now: Instant) {
        if self.history_timer.poll(now) {
            if self.registry.is_pending() {
                debug!("idle history commit skipped: annotation pending");
            } else {
                let snapshot = self.snapshot_value();
                if self.history.commit(snapshot) {
                    debug!("history commit after idle window");
                }
            }
        }

        if self.autosave_timer.poll(now) {
            if self.registry.is_pending() {
                debug!("autosave skipped: annotation pending");
            } else {
                let value = self.persisted_value();
                debug!("autosave fired ({} bytes)", value.len());
                self.host.on_save(&value);
            }
        }
    }

    // --- annotations ---

    /// Whether the "insert annotation" affordance should be enabled:
    /// no pending annotation and a selection the marker can wrap.
    pub fn can_annotate(&self) -> bool {
        !self.registry.is_pending() && self.doc.selection_is_wrappable()
    }

    /// Start annotating the current selection.
    ///
    /// Inserts a marker around the selected text and records the
    /// annotation as pending. Deliberately does not commit history — the
    /// marker is provisional until confirmed.
    pub fn begin_annotation(&mut self) -> Result<AnnotationId, AnnotationError> {
        if self.registry.is_pending() {
            return Err(AnnotationError::AlreadyPending);
        }
        if !self.doc.selection_is_wrappable() {
            return Err(AnnotationError::InvalidSelection);
        }

        let id = AnnotationId::new();
        let text = self.doc.selected_text();
        let range = self.doc.selection();
        self.doc.apply(Cmd::ReplaceRange {
            range,
            text: format!(r#"<mark data-comment-id="{id}">{text}</mark>"#),
        });
        self.registry.begin(id, text)?;
        debug!("annotation {id} pending");
        Ok(id)
    }

    /// Confirm the pending annotation.
    ///
    /// On success the registry entry is finalized, a history snapshot is
    /// committed immediately (not debounced), and the host's
    /// comment-saved callback fires exactly once. `EmptyComment` leaves
    /// the marker and the form untouched.
    pub fn confirm_annotation(&mut self, comment: &str) -> Result<Annotation, AnnotationError> {
        let saved = self.registry.confirm(comment)?;

        let snapshot = self.snapshot_value();
        self.history.commit(snapshot);

        let text = saved.comment.as_deref().unwrap_or_default();
        self.host.on_save_comment(saved.id, text);
        debug!("annotation {} saved", saved.id);
        Ok(saved)
    }

    /// Cancel the pending annotation, unwrapping its marker back into
    /// plain text. No history commit: the document is logically unchanged
    /// from the last committed snapshot.
    pub fn cancel_annotation(&mut self, id: AnnotationId) -> Result<(), AnnotationError> {
        self.registry.cancel(id)?;
        if let Some(marker) = self.doc.find_marker(&id.to_string()) {
            self.doc.apply(Cmd::ReplaceRange {
                range: marker.range,
                text: marker.text,
            });
        }
        debug!("annotation {id} cancelled");
        Ok(())
    }

    /// Upstream deletion of a comment: unwrap the marker if it is still
    /// present and commit the removal. A stale id is a silent no-op — the
    /// host's state may legitimately run ahead of this document's view.
    pub fn delete_annotation(&mut self, id: AnnotationId) {
        self.registry.remove(id);
        if self.highlighted == Some(id) {
            self.highlighted = None;
        }

        let Some(marker) = self.doc.find_marker(&id.to_string()) else {
            trace!("delete for unknown annotation {id} ignored");
            return;
        };
        self.doc.apply(Cmd::ReplaceRange {
            range: marker.range,
            text: marker.text,
        });

        let snapshot = self.snapshot_value();
        self.history.commit(snapshot);
        debug!("annotation {id} deleted upstream");
    }

    /// Highlight one annotation (clearing any previous highlight) or
    /// clear the highlight entirely. Ids without a matching marker
    /// silently clear.
    pub fn set_highlight(&mut self, id: Option<AnnotationId>) {
        self.highlighted = id.filter(|i| self.doc.find_marker(&i.to_string()).is_some());
    }

    /// Inbound host signal driving [`set_highlight`](Self::set_highlight).
    pub fn highlight_comment(&mut self, id: AnnotationId, highlight: bool) {
        if highlight {
            self.set_highlight(Some(id));
        } else if self.highlighted == Some(id) {
            self.set_highlight(None);
        }
    }

    pub fn highlighted(&self) -> Option<AnnotationId> {
        self.highlighted
    }

    pub fn pending_annotation(&self) -> Option<&Annotation> {
        self.registry.pending()
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.registry.get(id)
    }

    // --- history ---

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one snapshot and render it into the live buffer.
    ///
    /// An open pending annotation is implicitly cancelled first; undoing
    /// with a comment form open is undefined otherwise. Immediate and
    /// independent of the autosave timer.
    pub fn undo(&mut self) -> bool {
        if let Some(id) = self.registry.pending_id() {
            let _ = self.cancel_annotation(id);
        }
        let Some(snapshot) = self.history.undo().map(str::to_string) else {
            return false;
        };
        self.replace_all(&snapshot);
        self.refresh_highlight();
        debug!("undo to v{}", self.doc.version());
        true
    }

    /// Step forward one snapshot. Mirrors [`undo`](Self::undo).
    pub fn redo(&mut self) -> bool {
        if let Some(id) = self.registry.pending_id() {
            let _ = self.cancel_annotation(id);
        }
        let Some(snapshot) = self.history.redo().map(str::to_string) else {
            return false;
        };
        self.replace_all(&snapshot);
        self.refresh_highlight();
        debug!("redo to v{}", self.doc.version());
        true
    }

    // --- internal helpers ---

    /// The sanitized snapshot of the live content, with the placeholder
    /// treated as empty — the placeholder is a view artifact and must
    /// never enter history.
    fn snapshot_value(&self) -> String {
        let live = self.doc.text();
        if live == self.placeholder {
            return String::new();
        }
        sanitize(&live, &self.allow)
    }

    /// Replace the entire buffer. Keeps the version counter monotonic and
    /// does not touch the debounce timers.
    fn replace_all(&mut self, markup: &str) {
        let len = self.doc.len();
        self.doc.apply(Cmd::ReplaceRange {
            range: 0..len,
            text: markup.to_string(),
        });
    }

    /// Drop the highlight if its marker no longer exists (after undo/redo
    /// replaced the content).
    fn refresh_highlight(&mut self) {
        if let Some(id) = self.highlighted
            && self.doc.find_marker(&id.to_string()).is_none()
        {
            self.highlighted = None;
        }
    }
}
