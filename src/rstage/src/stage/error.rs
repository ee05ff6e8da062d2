use thiserror::Error;

/// Everything that can go wrong while reading a STAGE.DAT.
///
/// Prologue and AUM faults are fatal to loading. Faults hit while decoding
/// a segment are attached to the segment instead of ending the stream; see
/// [`SegmentFactory`](crate::SegmentFactory).
#[derive(Debug, Error)]
pub enum StageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fixed-layout record was handed the wrong number of bytes, or its
    /// fields violate the documented layout.
    #[error("unpack failed: {0}")]
    Unpack(String),

    /// A read was asked for more bytes than the source had left.
    #[error("only {available} of {wanted} byte(s) were available")]
    Eof { wanted: usize, available: usize },

    /// Chain traversal reached the end-of-list marker.
    #[error("AU {0:#x} is last in chain")]
    AuEndOfList(u16),

    /// Chain traversal landed on a free (unallocated) table slot.
    #[error("AU {0:#x} is not allocated")]
    AuNotAllocated(u16),

    /// An AU id outside the table was referenced.
    #[error("AU {0:#x} does not exist")]
    AuDoesNotExist(u16),

    /// A segment body did not match its schema.
    #[error("bad segment data: {0}")]
    SegmentData(String),

    /// A directory name lookup missed.
    #[error("object {0} not found in directory")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StageError>;

impl StageError {
    pub(crate) fn unpack_size(expected: usize, actual: usize) -> StageError {
        StageError::Unpack(format!("expecting {expected} bytes, got {actual}"))
    }
}
