//! Subscript and stream primitives (60..=67).
//!
//! `at:` indexes the variable part of an object past its fixed fields,
//! with 1-based Smalltalk indices. The stream shortcuts (65..=67) are
//! left to their fallback bodies.

use crate::consts::{CHARACTER_TABLE, CHARACTER_VALUE, CLASS_CHARACTER};
use crate::consts::Oop;
use crate::error::{success, PrimitiveError};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::memory;

/// Representation of an object's indexable part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexedKind {
    Pointers,
    Words,
    Bytes,
}

impl<H> Interpreter<H>
where
    H: Host,
{
    pub(crate) fn dispatch_subscript_primitives(
        &mut self,
        index: u8,
    ) -> Result<(), PrimitiveError> {
        match index {
            60 => self.primitive_at(),
            61 => self.primitive_at_put(),
            62 => self.primitive_size(),
            63 => self.primitive_string_at(),
            64 => self.primitive_string_at_put(),
            // 65..=67 next/nextPut:/atEnd run their method bodies
            _ => Err(PrimitiveError::Failed),
        }
    }

    /// Kind, fixed-field count and indexable length of `receiver`.
    fn indexed_info(&self, receiver: Oop) -> Result<(IndexedKind, usize, usize), PrimitiveError> {
        let class = self.memory.class_of(receiver);
        success(self.is_indexable(class)?)?;
        let fixed = self.fixed_fields_of(class)?;
        if self.is_pointers(class)? {
            let length = self.memory.word_length_of(receiver).saturating_sub(fixed);
            Ok((IndexedKind::Pointers, fixed, length))
        } else if self.is_words(class)? {
            let length = self.memory.word_length_of(receiver).saturating_sub(fixed);
            Ok((IndexedKind::Words, fixed, length))
        } else {
            let length = self.memory.byte_length_of(receiver).saturating_sub(fixed * 2);
            Ok((IndexedKind::Bytes, fixed, length))
        }
    }

    fn primitive_at(&mut self) -> Result<(), PrimitiveError> {
        let index_oop = self.pop_stack()?;
        let receiver = self.pop_stack()?;
        let index = self.positive_16bit_value_of(index_oop)? as usize;
        let (kind, fixed, length) = self.indexed_info(receiver)?;
        success(index >= 1 && index <= length)?;
        let value = match kind {
            IndexedKind::Pointers => self.memory.fetch_pointer(fixed + index - 1, receiver)?,
            IndexedKind::Words => {
                let word = self.memory.fetch_word(fixed + index - 1, receiver)?;
                self.positive_16bit_integer_for(word.into())?
            }
            IndexedKind::Bytes => {
                let byte = self.memory.fetch_byte(fixed * 2 + index - 1, receiver)?;
                memory::from_int(byte.into())?
            }
        };
        self.push(value)?;
        Ok(())
    }

    fn primitive_at_put(&mut self) -> Result<(), PrimitiveError> {
        let value = self.pop_stack()?;
        let index_oop = self.pop_stack()?;
        let receiver = self.pop_stack()?;
        let index = self.positive_16bit_value_of(index_oop)? as usize;
        let (kind, fixed, length) = self.indexed_info(receiver)?;
        success(index >= 1 && index <= length)?;
        match kind {
            IndexedKind::Pointers => {
                self.memory
                    .store_pointer(fixed + index - 1, receiver, value)?;
            }
            IndexedKind::Words => {
                let word = self.positive_16bit_value_of(value)?;
                self.memory
                    .store_word(fixed + index - 1, receiver, word as u16)?;
            }
            IndexedKind::Bytes => {
                success(memory::is_integer(value))?;
                let byte = memory::to_int(value);
                success((0..=255).contains(&byte))?;
                self.memory
                    .store_byte(fixed * 2 + index - 1, receiver, byte as u8)?;
            }
        }
        self.push(value)?;
        Ok(())
    }

    fn primitive_size(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.pop_stack()?;
        let (_, _, length) = self.indexed_info(receiver)?;
        let result = self.positive_16bit_integer_for(length as i32)?;
        self.push(result)?;
        Ok(())
    }

    /// `String>>at:` answers a Character from the character table.
    fn primitive_string_at(&mut self) -> Result<(), PrimitiveError> {
        let index_oop = self.pop_stack()?;
        let receiver = self.pop_stack()?;
        let index = self.positive_16bit_value_of(index_oop)? as usize;
        let length = self.memory.byte_length_of(receiver);
        success(index >= 1 && index <= length)?;
        let byte = self.memory.fetch_byte(index - 1, receiver)?;
        let character = self
            .memory
            .fetch_pointer(byte as usize, CHARACTER_TABLE)?;
        self.push(character)?;
        Ok(())
    }

    fn primitive_string_at_put(&mut self) -> Result<(), PrimitiveError> {
        let value = self.pop_stack()?;
        let index_oop = self.pop_stack()?;
        let receiver = self.pop_stack()?;
        let index = self.positive_16bit_value_of(index_oop)? as usize;
        let length = self.memory.byte_length_of(receiver);
        success(index >= 1 && index <= length)?;
        success(self.memory.class_of(value) == CLASS_CHARACTER)?;
        let byte = self.fetch_integer_of_object(CHARACTER_VALUE, value)?;
        success((0..=255).contains(&byte))?;
        self.memory.store_byte(index - 1, receiver, byte as u8)?;
        self.push(value)?;
        Ok(())
    }
}
