use thiserror::Error;

/// Layout invariant violations. The engine repairs these itself; the type
/// exists so diagnostics carry structured detail and so callers can validate
/// offsets up front.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("row {index} starts at {offset}, out of order with {previous}")]
    InconsistentLineStart {
        index: usize,
        offset: usize,
        previous: usize,
    },
    #[error("row {index} has no line start but a later row does")]
    MissingLineStart { index: usize },
    #[error("offset {offset} is outside the text (length {len})")]
    OutOfRangeOffset { offset: usize, len: usize },
}
