//! Object-pointer constants and fixed field layouts.
//!
//! The numeric values of the well-known OOPs are dictated by the V2
//! interchange format and must match the snapshot bit for bit.

/// A 16-bit tagged object pointer. Bit 0 set means an immediate
/// SmallInteger in the upper 15 bits; bit 0 clear means an object-table
/// index in the upper 15 bits.
pub type Oop = u16;

/* IMMEDIATE SMALL INTEGERS */

/// Smallest immediate integer value.
pub const SMALL_INT_MIN: i16 = -16384;

/// Largest immediate integer value.
pub const SMALL_INT_MAX: i16 = 16383;

/// The immediate −1, for convenience.
pub const MINUS_ONE: Oop = 0xffff;

/// The immediate 0.
pub const ZERO: Oop = 1;

/// The immediate 1.
pub const ONE: Oop = 3;

/// The immediate 2.
pub const TWO: Oop = 5;

/* RESERVED AND WELL-KNOWN OOPS (fixed by the interchange format) */

/// The undefined object.
pub const NIL: Oop = 0x02;

/// The false object.
pub const FALSE: Oop = 0x04;

/// The true object.
pub const TRUE: Oop = 0x06;

/// Association whose value field is the ProcessorScheduler.
pub const PROCESSOR_ASSOCIATION: Oop = 0x08;

pub const CLASS_SMALL_INTEGER: Oop = 0x0c;
pub const CLASS_STRING: Oop = 0x0e;
pub const CLASS_ARRAY: Oop = 0x10;

/// Association whose value field is the `Smalltalk` system dictionary.
pub const SMALLTALK: Oop = 0x12;

pub const CLASS_FLOAT: Oop = 0x14;
pub const CLASS_METHOD_CONTEXT: Oop = 0x16;
pub const CLASS_BLOCK_CONTEXT: Oop = 0x18;
pub const CLASS_POINT: Oop = 0x1a;
pub const CLASS_LARGE_POSITIVE_INTEGER: Oop = 0x1c;
pub const CLASS_DISPLAY_BITMAP: Oop = 0x1e;
pub const CLASS_MESSAGE: Oop = 0x20;
pub const CLASS_COMPILED_METHOD: Oop = 0x22;
pub const SYMBOL_UNUSED_OOP18: Oop = 0x24;
pub const CLASS_SEMAPHORE: Oop = 0x26;
pub const CLASS_CHARACTER: Oop = 0x28;
pub const SYMBOL_DOES_NOT_UNDERSTAND: Oop = 0x2a;
pub const SYMBOL_CANNOT_RETURN: Oop = 0x2c;
pub const SYMBOL_MONITOR: Oop = 0x2e;

/// Array of (selector, argument count) pairs for bytecodes 176..=207.
pub const SPECIAL_SELECTORS: Oop = 0x30;

/// Array of the 256 Character instances.
pub const CHARACTER_TABLE: Oop = 0x32;

pub const SYMBOL_MUST_BE_BOOLEAN: Oop = 0x34;
pub const CLASS_SYMBOL: Oop = 0x38;
pub const CLASS_METHOD_DICTIONARY: Oop = 0x4c;

/// Last OOP marked unconditionally as a garbage-collection root.
pub const LAST_WELL_KNOWN: Oop = CLASS_METHOD_DICTIONARY;

/* CONTEXT LAYOUTS */

/// MethodContext fixed fields.
pub mod method_context {
    pub const SENDER: usize = 0;
    pub const INSTRUCTION_POINTER: usize = 1;
    pub const STACK_POINTER: usize = 2;
    pub const METHOD: usize = 3;
    pub const RECEIVER: usize = 5;
    /// First temp-and-stack frame slot.
    pub const TEMP_FRAME_START: usize = 6;
}

/// BlockContext fixed fields. Fields 0..=2 alias the MethodContext layout.
pub mod block_context {
    pub const CALLER: usize = 0;
    pub const BLOCK_ARGUMENT_COUNT: usize = 3;
    pub const INITIAL_IP: usize = 4;
    pub const HOME: usize = 5;
}

/// Temp-and-stack frame words for a normal method context.
pub const SMALL_FRAME: usize = 12;

/// Temp-and-stack frame words when the method's large-context flag is set.
pub const LARGE_FRAME: usize = 32;

/* CLASS AND DICTIONARY LAYOUTS */

pub mod class {
    pub const SUPERCLASS: usize = 0;
    pub const MESSAGE_DICT: usize = 1;
    /// SmallInteger whose bits encode pointers/words/indexable and the
    /// fixed field count.
    pub const INSTANCE_SPEC: usize = 2;
}

pub mod method_dict {
    /// The parallel Array of CompiledMethods.
    pub const METHOD_ARRAY: usize = 1;
    /// Selectors occupy the dictionary's own fields from here on.
    pub const SELECTOR_START: usize = 2;
}

/// Association value field (key is field 0).
pub const ASSOCIATION_VALUE: usize = 1;

pub mod message {
    pub const SELECTOR: usize = 0;
    pub const ARGUMENTS: usize = 1;
    pub const SIZE: usize = 2;
}

pub mod point {
    pub const X: usize = 0;
    pub const Y: usize = 1;
    pub const SIZE: usize = 2;
}

/* PROCESS MACHINERY LAYOUTS */

pub mod scheduler {
    /// Array of linked lists indexed by priority.
    pub const PROCESS_LISTS: usize = 0;
    pub const ACTIVE_PROCESS: usize = 1;
}

pub mod process {
    pub const NEXT_LINK: usize = 0;
    pub const SUSPENDED_CONTEXT: usize = 1;
    pub const PRIORITY: usize = 2;
    pub const MY_LIST: usize = 3;
}

pub mod linked_list {
    pub const FIRST_LINK: usize = 0;
    pub const LAST_LINK: usize = 1;
}

/// Semaphore excess-signal count (fields 0..=1 are the LinkedList).
pub const SEMAPHORE_EXCESS_SIGNALS: usize = 2;

/* GRAPHICS LAYOUTS */

pub mod form {
    pub const BITS: usize = 0;
    pub const WIDTH: usize = 1;
    pub const HEIGHT: usize = 2;
}

pub mod bit_blt {
    pub const DEST_FORM: usize = 0;
    pub const SOURCE_FORM: usize = 1;
    pub const HALFTONE_FORM: usize = 2;
    pub const COMBINATION_RULE: usize = 3;
    pub const DEST_X: usize = 4;
    pub const DEST_Y: usize = 5;
    pub const WIDTH: usize = 6;
    pub const HEIGHT: usize = 7;
    pub const SOURCE_X: usize = 8;
    pub const SOURCE_Y: usize = 9;
    pub const CLIP_X: usize = 10;
    pub const CLIP_Y: usize = 11;
    pub const CLIP_WIDTH: usize = 12;
    pub const CLIP_HEIGHT: usize = 13;
}

/// A Character's sole field: its byte value.
pub const CHARACTER_VALUE: usize = 0;
