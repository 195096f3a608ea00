//! The seam between the editor core and the application hosting it.
//!
//! The core does not know how content is rendered or persisted upstream;
//! it only emits these events. Inbound host signals (comment deleted or
//! highlighted elsewhere in the UI) arrive as direct method calls on the
//! session.

use crate::annotations::AnnotationId;

/// Callbacks the hosting application supplies to an editor session.
pub trait Host {
    /// Autosave fired: `value` is the sanitized document, normalized to
    /// `""` when the content is any canonical empty form. Persistence and
    /// its failure modes are the host's problem.
    fn on_save(&mut self, value: &str);

    /// An annotation was confirmed. The host stores the comment keyed by
    /// the editor instance and annotation id.
    fn on_save_comment(&mut self, id: AnnotationId, text: &str);
}

/// A host that discards every event. Useful for tests and headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {
    fn on_save(&mut self, _value: &str) {}

    fn on_save_comment(&mut self, _id: AnnotationId, _text: &str) {}
}
