//! Runtime error implementation.

use crate::consts::Oop;

use std::io;
use thiserror::Error;

/// Snapshot reader failures. `InvalidImage` means the byte stream is not
/// a V2 interchange snapshot at all; `CorruptImage` means the framing was
/// accepted but an entry referenced storage outside the object space.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The stream doesn't satisfy the interchange-format framing.
    #[error("invalid image: {0}")]
    InvalidImage(&'static str),
    /// A well-formed table entry points outside the object space.
    #[error("corrupt image: object table entry {entry} references byte {address:#x} beyond object space of {space_len:#x} bytes")]
    CorruptImage {
        entry: usize,
        address: u32,
        space_len: u32,
    },
    /// I/O and OS related errors.
    #[error("unrecoverable error: {0}")]
    Io(#[from] io::Error),
}

/// Object-memory invariant violations. All of these are fatal to the
/// running image; none are produced by well-behaved bytecode.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Field or byte access beyond an object's payload.
    #[error("access to field {field} of {oop:#06x} is out of bounds")]
    OutOfBounds { oop: Oop, field: usize },
    /// A pointer operation reached an immediate or a freed slot.
    #[error("object pointer {0:#06x} does not denote a live object")]
    NotAnObject(Oop),
    /// The allocator found no free slot even after a collection.
    #[error("object table exhausted")]
    OutOfSlots,
    /// The host refused backing storage for a payload.
    #[error("heap exhausted allocating {words} words")]
    OutOfHeap { words: usize },
    /// A value outside [-16384, 16383] was forced into an immediate.
    #[error("{0} exceeds the immediate integer range")]
    SmallIntegerRange(i32),
}

/// Fatal interpreter errors. Everything recoverable (primitive failure,
/// `doesNotUnderstand:`, `mustBeBoolean`, `cannotReturn:`) is surfaced to
/// the image as a message send instead and never appears here.
#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    /// `doesNotUnderstand:` itself was not understood.
    #[error("recursive doesNotUnderstand: for selector {selector:#06x}")]
    RecursiveDoesNotUnderstand { selector: Oop },
    /// The scheduler has no runnable process left.
    #[error("no runnable process")]
    NoRunnableProcess,
    /// I/O and OS related errors.
    #[error("unrecoverable error: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of a primitive attempt that did not succeed. `Failed` is the
/// Blue Book's recoverable failure: the stack is restored and the
/// method body runs. `Halt` aborts execution.
#[derive(Debug, Error)]
pub enum PrimitiveError {
    #[error("primitive failed")]
    Failed,
    #[error(transparent)]
    Halt(#[from] InterpreterError),
}

impl From<MemoryError> for PrimitiveError {
    fn from(error: MemoryError) -> Self {
        Self::Halt(error.into())
    }
}

impl PrimitiveError {
    /// Flag whether the failure falls through to the method body.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Shorthand used by primitive implementations: fail unless `condition`.
pub fn success(condition: bool) -> Result<(), PrimitiveError> {
    if condition {
        Ok(())
    } else {
        Err(PrimitiveError::Failed)
    }
}
