//! Primitive dispatch and the success discipline.
//!
//! Primitives run with the interpreter's stack pointer snapshotted. A
//! recoverable failure restores the snapshot, so no stack mutation is
//! observable and the method body executes instead; a halting failure
//! aborts interpretation. The bands mirror the Blue Book's layering so
//! platform-specific code stays confined to the I/O band.

use crate::consts::*;
use crate::error::{success, InterpreterError, PrimitiveError};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::memory::{self, MethodFlags, Register};

mod arithmetic;
mod control;
mod float;
mod io;
mod private;
mod storage;
mod subscript;
mod system;

impl<H> Interpreter<H>
where
    H: Host,
{
    /// Try the primitive of `newMethod`. Answers whether the send is
    /// complete (so no context is activated).
    pub(crate) fn primitive_response(&mut self) -> Result<bool, InterpreterError> {
        if self.primitive_index == 0 {
            let new_method = self.memory.register(Register::NewMethod);
            return match self.memory.method_flags(new_method)? {
                // receiver already rests on the stack top
                MethodFlags::PrimitiveReturnSelf => Ok(true),
                MethodFlags::PrimitiveReturnField => {
                    self.quick_instance_load()?;
                    Ok(true)
                }
                _ => Ok(false),
            };
        }
        let index = self.primitive_index;
        self.with_stack_restored(|vm| vm.dispatch_primitives(index))
    }

    /// Run `primitive`; on recoverable failure restore the stack to its
    /// pre-attempt state and answer `false`.
    fn with_stack_restored(
        &mut self,
        primitive: impl FnOnce(&mut Self) -> Result<(), PrimitiveError>,
    ) -> Result<bool, InterpreterError> {
        let saved = self.stack_pointer;
        match primitive(self) {
            Ok(()) => Ok(true),
            Err(PrimitiveError::Failed) => {
                self.stack_pointer = saved;
                Ok(false)
            }
            Err(PrimitiveError::Halt(error)) => Err(error),
        }
    }

    /// Flag-6 quick method: answer an instance field without a context.
    fn quick_instance_load(&mut self) -> Result<(), InterpreterError> {
        let receiver = self.pop_stack()?;
        let new_method = self.memory.register(Register::NewMethod);
        let field = self.memory.method_field_index(new_method)?;
        let value = self.memory.fetch_pointer(field as usize, receiver)?;
        self.push(value)?;
        Ok(())
    }

    /// Shortcut attempt for the special-selector bytecodes; `offset` is
    /// the bytecode's distance from 176.
    pub(crate) fn special_selector_primitive_response(
        &mut self,
        offset: usize,
    ) -> Result<bool, InterpreterError> {
        if offset < 16 {
            self.argument_count = 1;
            self.with_stack_restored(|vm| {
                success(memory::is_integer(vm.stack_value(1)?))?;
                match offset {
                    0 => vm.primitive_add(),
                    1 => vm.primitive_subtract(),
                    2 => vm.primitive_less_than(),
                    3 => vm.primitive_greater_than(),
                    4 => vm.primitive_less_or_equal(),
                    5 => vm.primitive_greater_or_equal(),
                    6 => vm.primitive_equal(),
                    7 => vm.primitive_not_equal(),
                    8 => vm.primitive_multiply(),
                    9 => vm.primitive_divide(),
                    10 => vm.primitive_mod(),
                    11 => vm.primitive_make_point(),
                    12 => vm.primitive_bit_shift(),
                    13 => vm.primitive_div(),
                    14 => vm.primitive_bit_and(),
                    _ => vm.primitive_bit_or(),
                }
            })
        } else {
            let index = offset * 2;
            let count =
                memory::to_int(self.memory.fetch_word(index + 1, SPECIAL_SELECTORS)?);
            if count < 0 {
                return Ok(false);
            }
            self.argument_count = count as usize;
            self.with_stack_restored(|vm| {
                let receiver_class = vm.memory.class_of(vm.stack_value(vm.argument_count)?);
                match offset {
                    // ==
                    22 => vm.primitive_equivalent(),
                    // class
                    23 => vm.primitive_class(),
                    // blockCopy:
                    24 => {
                        success(
                            receiver_class == CLASS_METHOD_CONTEXT
                                || receiver_class == CLASS_BLOCK_CONTEXT,
                        )?;
                        vm.primitive_block_copy()
                    }
                    // value and value:
                    25 | 26 => {
                        success(receiver_class == CLASS_BLOCK_CONTEXT)?;
                        vm.primitive_value()
                    }
                    _ => Err(PrimitiveError::Failed),
                }
            })
        }
    }

    /// Numbered dispatch, grouped by the Blue Book's bands.
    fn dispatch_primitives(&mut self, index: u8) -> Result<(), PrimitiveError> {
        match index {
            1..=59 => self.dispatch_arithmetic_primitives(index),
            60..=67 => self.dispatch_subscript_primitives(index),
            68..=79 => self.dispatch_storage_primitives(index),
            80..=89 => self.dispatch_control_primitives(index),
            90..=109 => self.dispatch_io_primitives(index),
            110..=127 => self.dispatch_system_primitives(index),
            _ => self.dispatch_private_primitives(index),
        }
    }

    fn dispatch_arithmetic_primitives(&mut self, index: u8) -> Result<(), PrimitiveError> {
        match index {
            1..=18 => self.dispatch_integer_primitives(index),
            // 21..=37: the image carries fallback LargeInteger bodies
            40..=59 => self.dispatch_float_primitives(index),
            _ => Err(PrimitiveError::Failed),
        }
    }

    /* STACK HELPERS */

    pub(crate) fn pop_integer(&mut self) -> Result<i16, PrimitiveError> {
        let value = self.pop_stack()?;
        success(memory::is_integer(value))?;
        Ok(memory::to_int(value))
    }

    pub(crate) fn push_integer(&mut self, value: i32) -> Result<(), PrimitiveError> {
        success(memory::is_integer_value(value))?;
        self.push(memory::from_int(value)?)?;
        Ok(())
    }

    pub(crate) fn push_boolean(&mut self, value: bool) -> Result<(), PrimitiveError> {
        self.push(if value { TRUE } else { FALSE })?;
        Ok(())
    }

    /* LARGE POSITIVE INTEGER CONVERSIONS */

    /// Immediate when it fits, otherwise a 2-byte LargePositiveInteger
    /// with the least-significant byte first.
    pub(crate) fn positive_16bit_integer_for(
        &mut self,
        value: i32,
    ) -> Result<Oop, PrimitiveError> {
        success(value >= 0)?;
        if memory::is_integer_value(value) {
            return Ok(memory::from_int(value)?);
        }
        success(value <= 0xffff)?;
        let boxed = self
            .memory
            .instantiate_with_bytes(CLASS_LARGE_POSITIVE_INTEGER, 2)?;
        self.memory.store_byte(0, boxed, value as u8)?;
        self.memory.store_byte(1, boxed, (value >> 8) as u8)?;
        Ok(boxed)
    }

    pub(crate) fn positive_16bit_value_of(&self, oop: Oop) -> Result<i32, PrimitiveError> {
        if memory::is_integer(oop) {
            let value = memory::to_int(oop);
            success(value >= 0)?;
            return Ok(value.into());
        }
        success(self.memory.class_of(oop) == CLASS_LARGE_POSITIVE_INTEGER)?;
        success(self.memory.byte_length_of(oop) == 2)?;
        let lo = self.memory.fetch_byte(0, oop)?;
        let hi = self.memory.fetch_byte(1, oop)?;
        Ok((i32::from(hi) << 8) | i32::from(lo))
    }

    pub(crate) fn positive_32bit_integer_for(
        &mut self,
        value: u32,
    ) -> Result<Oop, PrimitiveError> {
        if memory::is_integer_value(value as i32) && (value as i32) >= 0 {
            return Ok(memory::from_int(value as i32)?);
        }
        let boxed = self
            .memory
            .instantiate_with_bytes(CLASS_LARGE_POSITIVE_INTEGER, 4)?;
        for (index, byte) in value.to_le_bytes().iter().enumerate() {
            self.memory.store_byte(index, boxed, *byte)?;
        }
        Ok(boxed)
    }

    pub(crate) fn positive_32bit_value_of(&self, oop: Oop) -> Result<u32, PrimitiveError> {
        if memory::is_integer(oop) {
            let value = memory::to_int(oop);
            success(value >= 0)?;
            return Ok(value as u32);
        }
        success(self.memory.class_of(oop) == CLASS_LARGE_POSITIVE_INTEGER)?;
        let length = self.memory.byte_length_of(oop);
        success((1..=4).contains(&length))?;
        let mut value = 0u32;
        for index in (0..length).rev() {
            value = (value << 8) | u32::from(self.memory.fetch_byte(index, oop)?);
        }
        Ok(value)
    }

    /* FIELD CONVERSIONS */

    pub(crate) fn fetch_integer_of_object(
        &self,
        field: usize,
        oop: Oop,
    ) -> Result<i16, PrimitiveError> {
        let value = self.memory.fetch_pointer(field, oop)?;
        success(memory::is_integer(value))?;
        Ok(memory::to_int(value))
    }

    /// Decode a byte-object payload as text for the host adapters.
    pub(crate) fn string_of(&self, oop: Oop) -> Result<String, PrimitiveError> {
        success(!self.memory.has_pointer_members(oop) && memory::is_pointer(oop))?;
        Ok(String::from_utf8_lossy(self.memory.bytes_of(oop)?).into_owned())
    }
}
