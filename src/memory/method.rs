//! CompiledMethod accessors.
//!
//! A CompiledMethod is a byte object: a 2-byte header, `literal_count`
//! big-endian literal words, then the bytecode vector. The first header
//! byte packs a 3-bit flag value and a 5-bit temporary count; the second
//! packs the large-context bit and a 6-bit literal count.

use crate::consts::*;
use crate::error::MemoryError;
use crate::memory::ObjectMemory;

const HEADER_BYTES: usize = 2;

/// Values of the 3-bit method flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodFlags {
    /// 0..=4 double as the argument count.
    Arguments(u8),
    /// 5: primitive answering the receiver, no bytecodes.
    PrimitiveReturnSelf,
    /// 6: primitive answering an instance field, no bytecodes.
    PrimitiveReturnField,
    /// 7: a header-extension literal carries primitive and arg count.
    HeaderExtension,
}

impl From<u8> for MethodFlags {
    fn from(bits: u8) -> Self {
        match bits & 0x7 {
            n @ 0..=4 => Self::Arguments(n),
            5 => Self::PrimitiveReturnSelf,
            6 => Self::PrimitiveReturnField,
            _ => Self::HeaderExtension,
        }
    }
}

impl ObjectMemory {
    fn method_bytes(&self, method: Oop) -> Result<&[u8], MemoryError> {
        self.bytes_of(method)
    }

    fn literal_byte_count(bytes: &[u8]) -> usize {
        2 * ((bytes[1] as usize >> 1) & 0x3f)
    }

    /// Temporary count (arguments included) from the first header byte.
    pub fn method_temporary_count(&self, method: Oop) -> Result<u8, MemoryError> {
        Ok(self.method_bytes(method)?[0] & 0x1f)
    }

    pub fn method_flags(&self, method: Oop) -> Result<MethodFlags, MemoryError> {
        Ok(MethodFlags::from(self.method_bytes(method)?[0] >> 5))
    }

    pub fn method_large_context(&self, method: Oop) -> Result<bool, MemoryError> {
        Ok(self.method_bytes(method)?[1] & 0x80 != 0)
    }

    pub fn method_literal_count(&self, method: Oop) -> Result<usize, MemoryError> {
        Ok(Self::literal_byte_count(self.method_bytes(method)?) / 2)
    }

    pub fn method_literal(&self, index: usize, method: Oop) -> Result<Oop, MemoryError> {
        let bytes = self.method_bytes(method)?;
        let off = HEADER_BYTES + 2 * index;
        if off + 2 > HEADER_BYTES + Self::literal_byte_count(bytes) {
            return Err(MemoryError::OutOfBounds { oop: method, field: index });
        }
        Ok((u16::from(bytes[off]) << 8) | u16::from(bytes[off + 1]))
    }

    /// The bytecode vector: offset of the first bytecode within the
    /// method's payload and its length.
    pub fn method_bytecodes(&self, method: Oop) -> Result<(usize, usize), MemoryError> {
        let bytes = self.method_bytes(method)?;
        let start = HEADER_BYTES + Self::literal_byte_count(bytes);
        Ok((start, bytes.len().saturating_sub(start)))
    }

    pub fn method_argument_count(&self, method: Oop) -> Result<u8, MemoryError> {
        match self.method_flags(method)? {
            MethodFlags::Arguments(n) => Ok(n),
            MethodFlags::PrimitiveReturnSelf | MethodFlags::PrimitiveReturnField => Ok(0),
            MethodFlags::HeaderExtension => {
                Ok(((self.method_header_extension(method)? >> 9) & 0x1f) as u8)
            }
        }
    }

    pub fn method_primitive_index(&self, method: Oop) -> Result<u8, MemoryError> {
        match self.method_flags(method)? {
            MethodFlags::HeaderExtension => {
                Ok(((self.method_header_extension(method)? >> 1) & 0xff) as u8)
            }
            _ => Ok(0),
        }
    }

    /// The extension word sits next to the last literal.
    fn method_header_extension(&self, method: Oop) -> Result<u16, MemoryError> {
        let bytes = self.method_bytes(method)?;
        let off = HEADER_BYTES + Self::literal_byte_count(bytes) - 4;
        Ok((u16::from(bytes[off]) << 8) | u16::from(bytes[off + 1]))
    }

    /// Class the method was compiled in: the value of the Association
    /// stored as the last literal. Needed for `super` sends.
    pub fn method_class(&self, method: Oop) -> Result<Oop, MemoryError> {
        let count = self.method_literal_count(method)?;
        let association = self.method_literal(count - 1, method)?;
        self.fetch_pointer(ASSOCIATION_VALUE, association)
    }

    /// Instance field index answered by a flag-6 quick method.
    pub fn method_field_index(&self, method: Oop) -> Result<u8, MemoryError> {
        self.method_temporary_count(method)
    }

    /// Stored (1-based) instruction pointer of the first bytecode.
    pub fn method_initial_instruction_pointer(&self, method: Oop) -> Result<i16, MemoryError> {
        Ok(((self.method_literal_count(method)? + 1) * 2 + 1) as i16)
    }
}
