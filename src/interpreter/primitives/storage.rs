//! Storage-management primitives (68..=79).

use crate::consts::*;
use crate::error::{success, PrimitiveError};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::memory;

impl<H> Interpreter<H>
where
    H: Host,
{
    pub(crate) fn dispatch_storage_primitives(
        &mut self,
        index: u8,
    ) -> Result<(), PrimitiveError> {
        match index {
            68 => self.primitive_object_at(),
            69 => self.primitive_object_at_put(),
            70 => self.primitive_new(),
            71 => self.primitive_new_with_arg(),
            72 => self.primitive_become(),
            73 => self.primitive_inst_var_at(),
            74 => self.primitive_inst_var_at_put(),
            75 => self.primitive_as_oop(),
            76 => self.primitive_as_object(),
            77 => self.primitive_some_instance(),
            78 => self.primitive_next_instance(),
            79 => self.primitive_new_method(),
            _ => Err(PrimitiveError::Failed),
        }
    }

    /// `objectAt:` reads a CompiledMethod's header or literal frame.
    fn primitive_object_at(&mut self) -> Result<(), PrimitiveError> {
        let index = self.pop_integer()? as i32;
        let receiver = self.pop_stack()?;
        let count = self.memory.method_literal_count(receiver)? as i32 + 1;
        success(index >= 1 && index <= count)?;
        let word = self.memory.fetch_word(index as usize - 1, receiver)?;
        self.push(word)?;
        Ok(())
    }

    fn primitive_object_at_put(&mut self) -> Result<(), PrimitiveError> {
        let value = self.pop_stack()?;
        let index = self.pop_integer()? as i32;
        let receiver = self.pop_stack()?;
        let count = self.memory.method_literal_count(receiver)? as i32 + 1;
        success(index >= 1 && index <= count)?;
        self.memory.store_word(index as usize - 1, receiver, value)?;
        self.push(value)?;
        Ok(())
    }

    /// `new` for fixed-size classes.
    fn primitive_new(&mut self) -> Result<(), PrimitiveError> {
        let class = self.pop_stack()?;
        let fixed = self.fixed_fields_of(class)?;
        success(!self.is_indexable(class)?)?;
        let instance = if self.is_pointers(class)? {
            self.memory.instantiate_with_pointers(class, fixed)?
        } else {
            self.memory.instantiate_with_words(class, fixed)?
        };
        self.push(instance)?;
        Ok(())
    }

    /// `new:` for indexable classes.
    fn primitive_new_with_arg(&mut self) -> Result<(), PrimitiveError> {
        let size_oop = self.pop_stack()?;
        let class = self.pop_stack()?;
        let size = self.positive_32bit_value_of(size_oop)? as usize;
        success(self.is_indexable(class)?)?;
        let fixed = self.fixed_fields_of(class)?;
        let instance = if self.is_pointers(class)? {
            self.memory.instantiate_with_pointers(class, fixed + size)?
        } else if self.is_words(class)? {
            self.memory.instantiate_with_words(class, fixed + size)?
        } else {
            self.memory.instantiate_with_bytes(class, size)?
        };
        self.push(instance)?;
        Ok(())
    }

    /// `become:` is a slot swap; both sides keep their identities.
    fn primitive_become(&mut self) -> Result<(), PrimitiveError> {
        let argument = self.pop_stack()?;
        let receiver = self.pop_stack()?;
        success(memory::is_pointer(argument) && memory::is_pointer(receiver))?;
        self.memory
            .swap_pointers(receiver, argument)
            .map_err(|_| PrimitiveError::Failed)?;
        self.push(receiver)?;
        Ok(())
    }

    fn primitive_inst_var_at(&mut self) -> Result<(), PrimitiveError> {
        let index = self.pop_integer()? as i32;
        let receiver = self.pop_stack()?;
        success(index >= 1 && index <= self.memory.word_length_of(receiver) as i32)?;
        let value = self.memory.fetch_pointer(index as usize - 1, receiver)?;
        self.push(value)?;
        Ok(())
    }

    fn primitive_inst_var_at_put(&mut self) -> Result<(), PrimitiveError> {
        let value = self.pop_stack()?;
        let index = self.pop_integer()? as i32;
        let receiver = self.pop_stack()?;
        success(index >= 1 && index <= self.memory.word_length_of(receiver) as i32)?;
        self.memory
            .store_pointer(index as usize - 1, receiver, value)?;
        self.push(value)?;
        Ok(())
    }

    /// The identity hash: an object's pointer viewed as an immediate.
    fn primitive_as_oop(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.pop_stack()?;
        success(memory::is_pointer(receiver))?;
        self.push(receiver | 1)?;
        Ok(())
    }

    fn primitive_as_object(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.pop_stack()?;
        success(memory::is_integer(receiver))?;
        let oop = receiver & !1;
        success(self.memory.has_object(oop))?;
        self.push(oop)?;
        Ok(())
    }

    fn primitive_some_instance(&mut self) -> Result<(), PrimitiveError> {
        let class = self.pop_stack()?;
        let instance = self.memory.next_instance_of(class, None);
        match instance {
            Some(oop) => {
                self.push(oop)?;
                Ok(())
            }
            None => Err(PrimitiveError::Failed),
        }
    }

    fn primitive_next_instance(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.pop_stack()?;
        let class = self.memory.class_of(receiver);
        match self.memory.next_instance_of(class, Some(receiver)) {
            Some(oop) => {
                self.push(oop)?;
                Ok(())
            }
            None => Err(PrimitiveError::Failed),
        }
    }

    /// `newMethod:header:` builds an empty CompiledMethod with nil
    /// literals.
    fn primitive_new_method(&mut self) -> Result<(), PrimitiveError> {
        let header = self.pop_stack()?;
        let bytecode_count = self.pop_integer()? as i32;
        let _class = self.pop_stack()?;
        success(memory::is_integer(header) && bytecode_count >= 0)?;
        let literal_count = ((header >> 1) & 0x3f) as usize;
        let size = 2 + literal_count * 2 + bytecode_count as usize;
        let method = self
            .memory
            .instantiate_with_bytes(CLASS_COMPILED_METHOD, size)?;
        self.memory.store_word(0, method, header)?;
        for literal in 0..literal_count {
            self.memory.store_word(1 + literal, method, NIL)?;
        }
        self.push(method)?;
        Ok(())
    }
}
