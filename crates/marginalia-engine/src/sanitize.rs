//! Markup sanitization against the editor's allow-list.
//!
//! The editor only ever round-trips two elements: paragraph containers and
//! annotation marks (the mark carrying exactly one attribute, its comment id).
//! Everything else is dropped, not rejected — sanitization is total, so a
//! paste full of foreign markup degrades to its text content instead of
//! failing the edit.

use html_escape::{decode_html_entities, encode_double_quoted_attribute};

/// The tag/attribute allow-list shared between the editor and its host.
///
/// The defaults are the persistence contract: any markup outside of
/// `<p>` and `<mark data-comment-id="…">` must never survive a save/load
/// round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct AllowList {
    /// Block container for text content.
    pub paragraph_tag: &'static str,
    /// Inline element anchoring an annotation to a text range.
    pub mark_tag: &'static str,
    /// The single attribute permitted on the mark tag.
    pub mark_id_attr: &'static str,
}

impl Default for AllowList {
    fn default() -> Self {
        Self {
            paragraph_tag: "p",
            mark_tag: "mark",
            mark_id_attr: "data-comment-id",
        }
    }
}

impl AllowList {
    fn allows_tag(&self, name: &str) -> bool {
        name == self.paragraph_tag || name == self.mark_tag
    }
}

/// A tag token parsed out of raw markup.
struct RawTag {
    closing: bool,
    self_closing: bool,
    name: String,
    /// Attribute names lowercased, values entity-decoded.
    attrs: Vec<(String, String)>,
}

/// Restrict `input` to the allow-list.
///
/// Lexical pass, not a full HTML parse:
/// - allowed open tags are re-emitted in canonical form with disallowed
///   attributes stripped,
/// - a mark without a comment id is unwrapped (its text is kept),
/// - disallowed tags disappear while their text content stays,
/// - a `<` that does not begin a parsable tag is escaped,
/// - unbalanced allowed tags are closed in document order.
///
/// The output is a fixpoint: sanitizing already-sanitized markup returns it
/// unchanged.
pub fn sanitize(input: &str, allow: &AllowList) -> String {
    let mut out = String::with_capacity(input.len());
    let mut open_tags: Vec<String> = Vec::new();

    let mut rest = input;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];
        match parse_tag(after) {
            Some((tag, consumed)) => {
                emit_tag(&mut out, &mut open_tags, &tag, allow);
                rest = &after[consumed..];
            }
            None => {
                // Not a tag, keep it as literal text.
                out.push_str("&lt;");
                rest = after;
            }
        }
    }
    out.push_str(rest);

    while let Some(name) = open_tags.pop() {
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }

    out
}

/// True for the canonical empty-document forms: the empty string, a lone
/// empty paragraph, or a paragraph containing only a line break.
pub fn is_empty_markup(markup: &str) -> bool {
    matches!(markup.trim(), "" | "<p></p>" | "<p><br></p>")
}

/// Collapse any canonical empty form to the empty string.
///
/// This is the value handed to the host's save callback — an "empty"
/// document always persists as `""` regardless of which empty form the
/// live content happens to be in.
pub fn normalize_empty(markup: &str) -> &str {
    if is_empty_markup(markup) { "" } else { markup }
}

fn emit_tag(out: &mut String, open_tags: &mut Vec<String>, tag: &RawTag, allow: &AllowList) {
    if tag.closing {
        // Close only what is actually open, auto-closing anything nested
        // above it so the output stays balanced.
        if let Some(pos) = open_tags.iter().rposition(|n| *n == tag.name) {
            while open_tags.len() > pos {
                let name = open_tags.pop().unwrap_or_default();
                out.push_str("</");
                out.push_str(&name);
                out.push('>');
            }
        }
        return;
    }

    if !allow.allows_tag(&tag.name) {
        return;
    }

    if tag.name == allow.mark_tag {
        // A mark is only meaningful with its comment id; without one the
        // tag is unwrapped and the text merges into the paragraph.
        let Some(id) = tag
            .attrs
            .iter()
            .find(|(name, value)| name == allow.mark_id_attr && !value.is_empty())
            .map(|(_, value)| value)
        else {
            return;
        };
        out.push('<');
        out.push_str(allow.mark_tag);
        out.push(' ');
        out.push_str(allow.mark_id_attr);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(id));
        out.push_str("\">");
    } else {
        out.push('<');
        out.push_str(&tag.name);
        out.push('>');
    }

    if tag.self_closing {
        out.push_str("</");
        out.push_str(&tag.name);
        out.push('>');
    } else {
        open_tags.push(tag.name.clone());
    }
}

/// Parse one tag token starting immediately after a `<`.
///
/// Returns the tag and the number of bytes consumed (through the closing
/// `>`), or `None` when the input is not a tag at all.
fn parse_tag(input: &str) -> Option<(RawTag, usize)> {
    let bytes = input.as_bytes();
    let mut i = 0;

    let closing = bytes.first() == Some(&b'/');
    if closing {
        i = 1;
    }

    if !bytes.get(i).is_some_and(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    let name = input[name_start..i].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return None, // ran off the end without a '>'
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') => {
                if bytes.get(i + 1) == Some(&b'>') {
                    self_closing = true;
                    i += 2;
                    break;
                }
                i += 1;
            }
            Some(_) => {
                let attr_start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/')
                {
                    i += 1;
                }
                let attr_name = input[attr_start..i].to_ascii_lowercase();

                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let mut value = String::new();
                if bytes.get(i) == Some(&b'=') {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    match bytes.get(i) {
                        Some(&quote @ (b'"' | b'\'')) => {
                            i += 1;
                            let value_start = i;
                            while i < bytes.len() && bytes[i] != quote {
                                i += 1;
                            }
                            if i >= bytes.len() {
                                return None; // unterminated quote
                            }
                            value = decode_html_entities(&input[value_start..i]).into_owned();
                            i += 1;
                        }
                        _ => {
                            let value_start = i;
                            while i < bytes.len()
                                && !bytes[i].is_ascii_whitespace()
                                && bytes[i] != b'>'
                            {
                                i += 1;
                            }
                            value = decode_html_entities(&input[value_start..i]).into_owned();
                        }
                    }
                }
                attrs.push((attr_name, value));
            }
        }
    }

    Some((
        RawTag {
            closing,
            self_closing,
            name,
            attrs,
        },
        i,
    ))
}
