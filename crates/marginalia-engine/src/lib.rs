pub mod annotations;
pub mod editing;
pub mod host;
pub mod sanitize;
pub mod session;

// Re-export key types for easier usage
pub use annotations::{Annotation, AnnotationError, AnnotationId, AnnotationRegistry};
pub use editing::{Cmd, Document, History, MarkerSpan, Patch};
pub use host::{Host, NullHost};
pub use sanitize::{AllowList, is_empty_markup, normalize_empty, sanitize};
pub use session::{EMPTY_PARAGRAPH, EditorSession, FormatCommand, timers::DebounceTimer};
