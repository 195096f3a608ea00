use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

/// Matches an annotation marker element in canonical (sanitized) form.
/// Group 1 is the comment id, group 2 the anchored text.
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<mark data-comment-id="([^"]*)">([^<]*)</mark>"#)
        .unwrap_or_else(|e| panic!("marker regex: {e}"))
});

/// Matches any tag token, for selection validation.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[a-zA-Z][^>]*>").unwrap_or_else(|e| panic!("tag regex: {e}"))
});

/// An edit command against the live content buffer.
///
/// Commands are compiled to rope deltas and applied atomically; the
/// selection is transformed through each edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText { at: usize, text: String },
    DeleteRange { range: Range<usize> },
    ReplaceRange { range: Range<usize>, text: String },
}

/// Result of applying a command: what changed and where the cursor went.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Byte ranges (in the new buffer) covered by inserted text.
    pub changed: Vec<Range<usize>>,
    /// Selection after the edit.
    pub new_selection: Range<usize>,
    /// Document version after the edit.
    pub version: u64,
}

/// An annotation marker located in the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpan {
    /// The comment id carried by the marker.
    pub id: String,
    /// Byte range of the whole element, open tag through close tag.
    pub range: Range<usize>,
    /// The plain text the marker wraps.
    pub text: String,
}

/// The live content buffer: markup text in a rope, plus the current
/// selection as byte offsets and a version counter for change detection.
///
/// The buffer holds whatever the user is editing right now, allow-listed
/// or not; sanitization happens when a snapshot is taken, never here.
pub struct Document {
    buffer: Rope,
    selection: Range<usize>,
    version: u64,
}

impl Document {
    pub fn new(text: &str) -> Self {
        let buffer = Rope::from(text);
        let len = buffer.len();
        Self {
            buffer,
            selection: len..len, // cursor at end
            version: 0,
        }
    }

    /// Create a document from host-stored bytes, which must be valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::new(text))
    }

    /// The full buffer content.
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// Set the selection, clamped to the buffer bounds.
    pub fn set_selection(&mut self, selection: Range<usize>) {
        let len = self.buffer.len();
        let start = selection.start.min(len);
        let end = selection.end.min(len).max(start);
        self.selection = start..end;
    }

    /// Apply a command to the document.
    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        let delta = self.compile_command(&cmd);

        // Track changed ranges for the patch
        let mut changed = Vec::new();
        let mut cursor = 0;
        for op in delta.els.iter() {
            match op {
                xi_rope::delta::DeltaElement::Copy(_from, to) => {
                    cursor = *to;
                }
                xi_rope::delta::DeltaElement::Insert(inserted) => {
                    let start = cursor;
                    let end = cursor + inserted.len();
                    changed.push(start..end);
                    cursor = end;
                }
            }
        }

        // Apply delta to buffer
        self.buffer = delta.apply(&self.buffer);

        // Transform selection through command
        let new_selection = self.transform_selection_for_command(&self.selection, &cmd);
        self.selection = new_selection.clone();

        // Increment version
        self.version += 1;

        Patch {
            changed,
            new_selection,
            version: self.version,
        }
    }

    /// Compile a command into a delta
    fn compile_command(&self, cmd: &Cmd) -> Delta<RopeInfo> {
        let mut builder = Builder::new(self.buffer.len());
        match cmd {
            Cmd::InsertText { at, text } => {
                builder.replace(*at..*at, Rope::from(text));
            }
            Cmd::DeleteRange { range } => {
                builder.delete(range.clone());
            }
            Cmd::ReplaceRange { range, text } => {
                builder.replace(range.clone(), Rope::from(text));
            }
        }
        builder.build()
    }

    /// Transform selection based on the command being applied
    fn transform_selection_for_command(
        &self,
        range: &Range<usize>,
        cmd: &Cmd,
    ) -> Range<usize> {
        match cmd {
            Cmd::InsertText { at, text } => {
                let text_len = text.len();
                if *at <= range.start {
                    // Insertion before or at selection start - shift right
                    (range.start + text_len)..(range.end + text_len)
                } else if *at < range.end {
                    // Insertion within selection - grow the end
                    range.start..(range.end + text_len)
                } else {
                    // Insertion after selection - no change
                    range.clone()
                }
            }
            Cmd::DeleteRange { range: del_range } => {
                let del_len = del_range.len();
                if del_range.end <= range.start {
                    // Deletion completely before selection - shift left
                    (range.start - del_len)..(range.end - del_len)
                } else if del_range.start >= range.end {
                    // Deletion completely after selection - no change
                    range.clone()
                } else {
                    // Deletion overlaps selection - collapse to deletion point
                    del_range.start..del_range.start
                }
            }
            Cmd::ReplaceRange { range: rep_range, text } => {
                let new_len = text.len();
                if rep_range.end <= range.start {
                    // Replacement completely before selection - shift by the
                    // size difference
                    let shift = new_len as isize - rep_range.len() as isize;
                    let start = (range.start as isize + shift).max(0) as usize;
                    let end = (range.end as isize + shift).max(0) as usize;
                    start..end
                } else if rep_range.start >= range.end {
                    range.clone()
                } else {
                    // Replacement overlaps selection - collapse after the
                    // inserted text
                    let caret = rep_range.start + new_len;
                    caret..caret
                }
            }
        }
    }

    /// Slice the buffer, clamping the range to the document bounds.
    pub(crate) fn slice_to_cow(&self, range: Range<usize>) -> std::borrow::Cow<'_, str> {
        let doc_len = self.buffer.len();
        let start = range.start.min(doc_len);
        let end = range.end.min(doc_len).max(start);
        self.buffer.slice_to_cow(start..end)
    }

    /// The text currently selected.
    pub fn selected_text(&self) -> String {
        self.slice_to_cow(self.selection.clone()).into_owned()
    }

    /// All annotation markers currently present in the buffer, in document
    /// order.
    pub fn markers(&self) -> Vec<MarkerSpan> {
        let text = self.text();
        MARKER_RE
            .captures_iter(&text)
            .filter_map(|caps| {
                let element = caps.get(0)?;
                Some(MarkerSpan {
                    id: caps.get(1)?.as_str().to_string(),
                    range: element.range(),
                    text: caps.get(2)?.as_str().to_string(),
                })
            })
            .collect()
    }

    /// Locate the marker carrying the given comment id, if any.
    pub fn find_marker(&self, id: &str) -> Option<MarkerSpan> {
        self.markers().into_iter().find(|m| m.id == id)
    }

    /// Whether the current selection can be wrapped in an inline element:
    /// non-empty, inside the buffer, crossing no tag token, and not inside
    /// an existing marker element (markers never nest).
    pub fn selection_is_wrappable(&self) -> bool {
        let sel = &self.selection;
        if sel.is_empty() || sel.end > self.buffer.len() {
            return false;
        }

        let text = self.text();
        for tag in TAG_RE.find_iter(&text) {
            if ranges_overlap(sel, &tag.range()) {
                return false;
            }
        }
        for marker in self.markers() {
            if ranges_overlap(sel, &marker.range) {
                return false;
            }
        }
        true
    }
}

fn ranges_overlap(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_from_bytes_valid_utf8() {
        let text = "<p>hello world</p>";
        let doc = Document::from_bytes(text.as_bytes()).expect("valid UTF-8");

        assert_eq!(doc.text(), text);
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.selection(), text.len()..text.len());
    }

    #[test]
    fn test_document_from_bytes_invalid_utf8() {
        let invalid = vec![0xFF, 0xFE, 0xFD];
        assert!(Document::from_bytes(&invalid).is_err());
    }

    #[test]
    fn test_insert_text_updates_buffer_and_version() {
        let mut doc = Document::new("<p>world</p>");
        let patch = doc.apply(Cmd::InsertText {
            at: 3,
            text: "hello ".to_string(),
        });

        assert_eq!(doc.text(), "<p>hello world</p>");
        assert_eq!(patch.version, 1);
        assert_eq!(patch.changed, vec![3..9]);
    }

    #[test]
    fn test_delete_range() {
        let mut doc = Document::new("<p>hello world</p>");
        doc.apply(Cmd::DeleteRange { range: 8..14 });
        assert_eq!(doc.text(), "<p>hello</p>");
    }

    #[test]
    fn test_replace_range() {
        let mut doc = Document::new("<p>hello world</p>");
        doc.apply(Cmd::ReplaceRange {
            range: 9..14,
            text: "there".to_string(),
        });
        assert_eq!(doc.text(), "<p>hello there</p>");
    }

    #[test]
    fn test_selection_shifts_right_on_insert_before() {
        let mut doc = Document::new("<p>world</p>");
        doc.set_selection(3..8);
        doc.apply(Cmd::InsertText {
            at: 0,
            text: "x".to_string(),
        });
        assert_eq!(doc.selection(), 4..9);
    }

    #[test]
    fn test_selection_unchanged_on_insert_after() {
        let mut doc = Document::new("<p>world</p>");
        doc.set_selection(3..8);
        doc.apply(Cmd::InsertText {
            at: 10,
            text: "x".to_string(),
        });
        assert_eq!(doc.selection(), 3..8);
    }

    #[test]
    fn test_selection_collapses_when_replaced() {
        let mut doc = Document::new("<p>hello</p>");
        doc.set_selection(3..8);
        doc.apply(Cmd::ReplaceRange {
            range: 3..8,
            text: "hi".to_string(),
        });
        // Caret lands after the replacement text.
        assert_eq!(doc.selection(), 5..5);
    }

    #[test]
    fn test_selection_collapses_on_overlapping_delete() {
        let mut doc = Document::new("<p>hello world</p>");
        doc.set_selection(5..12);
        doc.apply(Cmd::DeleteRange { range: 8..14 });
        assert_eq!(doc.selection(), 8..8);
    }

    #[test]
    fn test_set_selection_clamps_to_bounds() {
        let mut doc = Document::new("<p>hi</p>");
        doc.set_selection(4..100);
        assert_eq!(doc.selection(), 4..9);
    }

    #[test]
    fn test_markers_found_in_document_order() {
        let doc = Document::new(
            r#"<p><mark data-comment-id="a">one</mark> and <mark data-comment-id="b">two</mark></p>"#,
        );
        let markers = doc.markers();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].id, "a");
        assert_eq!(markers[0].text, "one");
        assert_eq!(markers[1].id, "b");
        assert_eq!(markers[1].text, "two");
    }

    #[test]
    fn test_find_marker_by_id() {
        let doc = Document::new(r#"<p><mark data-comment-id="xyz">note</mark></p>"#);
        let marker = doc.find_marker("xyz").expect("marker present");
        assert_eq!(marker.text, "note");
        assert_eq!(&doc.text()[marker.range.clone()], r#"<mark data-comment-id="xyz">note</mark>"#);

        assert!(doc.find_marker("missing").is_none());
    }

    #[test]
    fn test_selection_wrappable_on_plain_text() {
        let mut doc = Document::new("<p>hello world</p>");
        doc.set_selection(3..8); // "hello"
        assert!(doc.selection_is_wrappable());
        assert_eq!(doc.selected_text(), "hello");
    }

    #[test]
    fn test_empty_selection_is_not_wrappable() {
        let mut doc = Document::new("<p>hello</p>");
        doc.set_selection(4..4);
        assert!(!doc.selection_is_wrappable());
    }

    #[test]
    fn test_selection_crossing_tag_is_not_wrappable() {
        let mut doc = Document::new("<p>one</p><p>two</p>");
        doc.set_selection(3..13); // "one</p><p>t"
        assert!(!doc.selection_is_wrappable());
    }

    #[test]
    fn test_selection_inside_tag_is_not_wrappable() {
        let mut doc = Document::new("<p>hello</p>");
        doc.set_selection(1..2); // the "p" of the open tag
        assert!(!doc.selection_is_wrappable());
    }

    #[test]
    fn test_selection_inside_marker_is_not_wrappable() {
        let doc_text = r#"<p><mark data-comment-id="a">hello</mark></p>"#;
        let mut doc = Document::new(doc_text);
        let start = doc_text.find("hello").unwrap();
        doc.set_selection(start..start + 5);
        assert!(!doc.selection_is_wrappable());
    }
}
