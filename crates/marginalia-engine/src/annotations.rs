//! Comment annotation identity and lifecycle.
//!
//! The registry tracks which comment ids exist and what they anchor to.
//! It never touches document content — the editor session applies the
//! matching buffer edits and keeps the two in step.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque identifier anchoring a comment to its marker in the document.
///
/// Ids are random (UUID v4) and never recycled: once an annotation is
/// cancelled or deleted its id is gone for good.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(Uuid);

impl AnnotationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AnnotationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Why an annotation operation did not go through.
///
/// Every variant is recoverable: the caller treats the operation as a
/// no-op (or keeps the comment form open) and the editor session carries
/// on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotationError {
    #[error("selection is empty or not contained in the editable region")]
    InvalidSelection,
    #[error("another annotation is already awaiting confirmation")]
    AlreadyPending,
    #[error("comment text is empty")]
    EmptyComment,
    #[error("annotation is not the pending one")]
    NotPending,
}

/// One comment anchored in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    /// The text the marker wraps.
    pub anchored_text: String,
    /// `None` while the annotation is pending confirmation.
    pub comment: Option<String>,
}

impl Annotation {
    pub fn is_pending(&self) -> bool {
        self.comment.is_none()
    }
}

/// Tracks saved annotations and the (at most one) pending annotation.
///
/// The workflow is modal by construction: `begin` refuses to start a
/// second annotation while one is awaiting confirm/cancel.
#[derive(Debug, Default)]
pub struct AnnotationRegistry {
    saved: HashMap<AnnotationId, Annotation>,
    pending: Option<Annotation>,
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending annotation.
    pub fn begin(
        &mut self,
        id: AnnotationId,
        anchored_text: String,
    ) -> Result<(), AnnotationError> {
        if self.pending.is_some() {
            return Err(AnnotationError::AlreadyPending);
        }
        self.pending = Some(Annotation {
            id,
            anchored_text,
            comment: None,
        });
        Ok(())
    }

    /// Confirm the pending annotation with its comment text.
    ///
    /// Blank or whitespace-only text fails with `EmptyComment` and leaves
    /// the pending entry in place so the form can be corrected.
    pub fn confirm(&mut self, comment: &str) -> Result<Annotation, AnnotationError> {
        if self.pending.is_none() {
            return Err(AnnotationError::NotPending);
        }
        let text = comment.trim();
        if text.is_empty() {
            return Err(AnnotationError::EmptyComment);
        }
        let mut annotation = self.pending.take().ok_or(AnnotationError::NotPending)?;
        annotation.comment = Some(text.to_string());
        self.saved.insert(annotation.id, annotation.clone());
        Ok(annotation)
    }

    /// Abandon the pending annotation. Fails unless `id` is the pending
    /// one.
    pub fn cancel(&mut self, id: AnnotationId) -> Result<Annotation, AnnotationError> {
        match &self.pending {
            Some(pending) if pending.id == id => {
                self.pending.take().ok_or(AnnotationError::NotPending)
            }
            _ => Err(AnnotationError::NotPending),
        }
    }

    /// Drop a saved annotation (upstream deletion). Unknown ids return
    /// `None` — host state may legitimately run ahead of the document.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        self.saved.remove(&id)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.saved.get(&id)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&Annotation> {
        self.pending.as_ref()
    }

    pub fn pending_id(&self) -> Option<AnnotationId> {
        self.pending.as_ref().map(|a| a.id)
    }

    /// Saved annotations, in arbitrary order.
    pub fn saved(&self) -> impl Iterator<Item = &Annotation> {
        self.saved.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ids_are_unique_and_round_trip_as_strings() {
        let a = AnnotationId::new();
        let b = AnnotationId::new();
        assert_ne!(a, b);

        let parsed: AnnotationId = a.to_string().parse().expect("uuid string");
        assert_eq!(parsed, a);
    }

    #[test]
    fn test_begin_records_pending_annotation() {
        let mut registry = AnnotationRegistry::new();
        let id = AnnotationId::new();

        registry.begin(id, "hello".to_string()).expect("no pending yet");

        let pending = registry.pending().expect("pending exists");
        assert_eq!(pending.id, id);
        assert_eq!(pending.anchored_text, "hello");
        assert!(pending.is_pending());
        assert!(registry.get(id).is_none()); // not saved yet
    }

    #[test]
    fn test_second_begin_fails_already_pending() {
        let mut registry = AnnotationRegistry::new();
        registry.begin(AnnotationId::new(), "one".to_string()).expect("first");

        let err = registry
            .begin(AnnotationId::new(), "two".to_string())
            .expect_err("modal workflow");
        assert_eq!(err, AnnotationError::AlreadyPending);
    }

    #[test]
    fn test_confirm_moves_pending_to_saved() {
        let mut registry = AnnotationRegistry::new();
        let id = AnnotationId::new();
        registry.begin(id, "hello".to_string()).expect("begin");

        let saved = registry.confirm("nice").expect("non-empty comment");
        assert_eq!(saved.id, id);
        assert_eq!(saved.comment.as_deref(), Some("nice"));

        assert!(!registry.is_pending());
        assert_eq!(registry.get(id), Some(&saved));
    }

    #[test]
    fn test_confirm_trims_comment_text() {
        let mut registry = AnnotationRegistry::new();
        registry.begin(AnnotationId::new(), "t".to_string()).expect("begin");

        let saved = registry.confirm("  padded  ").expect("confirm");
        assert_eq!(saved.comment.as_deref(), Some("padded"));
    }

    #[test]
    fn test_confirm_empty_comment_keeps_pending() {
        let mut registry = AnnotationRegistry::new();
        let id = AnnotationId::new();
        registry.begin(id, "t".to_string()).expect("begin");

        assert_eq!(registry.confirm("   "), Err(AnnotationError::EmptyComment));
        assert!(registry.is_pending());
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn test_confirm_without_pending_fails() {
        let mut registry = AnnotationRegistry::new();
        assert_eq!(registry.confirm("text"), Err(AnnotationError::NotPending));
    }

    #[test]
    fn test_cancel_removes_pending() {
        let mut registry = AnnotationRegistry::new();
        let id = AnnotationId::new();
        registry.begin(id, "t".to_string()).expect("begin");

        let cancelled = registry.cancel(id).expect("is pending");
        assert_eq!(cancelled.id, id);
        assert!(!registry.is_pending());
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn test_cancel_wrong_id_fails_not_pending() {
        let mut registry = AnnotationRegistry::new();
        registry.begin(AnnotationId::new(), "t".to_string()).expect("begin");

        assert_eq!(
            registry.cancel(AnnotationId::new()),
            Err(AnnotationError::NotPending)
        );
        assert!(registry.is_pending());
    }

    #[test]
    fn test_remove_unknown_id_is_silent() {
        let mut registry = AnnotationRegistry::new();
        assert!(registry.remove(AnnotationId::new()).is_none());
    }

    #[test]
    fn test_remove_saved_annotation() {
        let mut registry = AnnotationRegistry::new();
        let id = AnnotationId::new();
        registry.begin(id, "t".to_string()).expect("begin");
        registry.confirm("note").expect("confirm");

        let removed = registry.remove(id).expect("was saved");
        assert_eq!(removed.id, id);
        assert!(registry.get(id).is_none());
    }
}
