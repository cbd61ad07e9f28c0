//! Context registers and stack operations.
//!
//! A context's instruction and stack pointers are stored as immediates
//! in 1-based Smalltalk convention; the cached copies here are 0-based.
//! The cached stack pointer is the field index of the stack top within
//! the active context, so pushes and pops are single field stores.

use crate::consts::*;
use crate::error::MemoryError;
use crate::interpreter::Interpreter;
use crate::memory::{self, Register};

impl<H> Interpreter<H> {
    pub(crate) fn instruction_pointer_of_context(
        &self,
        context: Oop,
    ) -> Result<i16, MemoryError> {
        Ok(memory::to_int(
            self.memory
                .fetch_word(method_context::INSTRUCTION_POINTER, context)?,
        ))
    }

    pub(crate) fn store_instruction_pointer_in_context(
        &mut self,
        value: i16,
        context: Oop,
    ) -> Result<(), MemoryError> {
        let value = memory::from_int(value.into())?;
        self.memory
            .store_word(method_context::INSTRUCTION_POINTER, context, value)
    }

    pub(crate) fn stack_pointer_of_context(&self, context: Oop) -> Result<i16, MemoryError> {
        Ok(memory::to_int(
            self.memory
                .fetch_word(method_context::STACK_POINTER, context)?,
        ))
    }

    pub(crate) fn store_stack_pointer_in_context(
        &mut self,
        value: i16,
        context: Oop,
    ) -> Result<(), MemoryError> {
        let value = memory::from_int(value.into())?;
        self.memory
            .store_word(method_context::STACK_POINTER, context, value)
    }

    pub(crate) fn argument_count_of_block(&self, block: Oop) -> Result<i16, MemoryError> {
        Ok(memory::to_int(
            self.memory
                .fetch_word(block_context::BLOCK_ARGUMENT_COUNT, block)?,
        ))
    }

    /// A block context holds an immediate in the method slot.
    pub(crate) fn is_block_context(&self, context: Oop) -> Result<bool, MemoryError> {
        let method_or_arguments = self.memory.fetch_word(method_context::METHOD, context)?;
        Ok(memory::is_integer(method_or_arguments))
    }

    /// Refresh the cached registers from the active context.
    pub(crate) fn fetch_context_registers(&mut self) -> Result<(), MemoryError> {
        let active = self.memory.register(Register::ActiveContext);
        let home = if self.is_block_context(active)? {
            self.memory.fetch_pointer(block_context::HOME, active)?
        } else {
            active
        };
        self.memory.set_register(Register::HomeContext, home);
        let receiver = self.memory.fetch_pointer(method_context::RECEIVER, home)?;
        self.memory.set_register(Register::Receiver, receiver);
        let method = self.memory.fetch_pointer(method_context::METHOD, home)?;
        self.memory.set_register(Register::Method, method);
        self.instruction_pointer = self.instruction_pointer_of_context(active)? - 1;
        self.stack_pointer =
            self.stack_pointer_of_context(active)? + method_context::TEMP_FRAME_START as i16 - 1;
        Ok(())
    }

    /// Save the cached registers back into the active context.
    pub(crate) fn store_context_registers(&mut self) -> Result<(), MemoryError> {
        let active = self.memory.register(Register::ActiveContext);
        self.store_instruction_pointer_in_context(self.instruction_pointer + 1, active)?;
        self.store_stack_pointer_in_context(
            self.stack_pointer - method_context::TEMP_FRAME_START as i16 + 1,
            active,
        )
    }

    pub(crate) fn push(&mut self, value: Oop) -> Result<(), MemoryError> {
        self.stack_pointer += 1;
        let active = self.memory.register(Register::ActiveContext);
        self.memory
            .store_pointer(self.stack_pointer as usize, active, value)
    }

    pub(crate) fn pop_stack(&mut self) -> Result<Oop, MemoryError> {
        let top = self.stack_top()?;
        self.stack_pointer -= 1;
        Ok(top)
    }

    pub(crate) fn stack_top(&self) -> Result<Oop, MemoryError> {
        let active = self.memory.register(Register::ActiveContext);
        self.memory.fetch_pointer(self.stack_pointer as usize, active)
    }

    /// Value `offset` entries below the top.
    pub(crate) fn stack_value(&self, offset: usize) -> Result<Oop, MemoryError> {
        let active = self.memory.register(Register::ActiveContext);
        self.memory
            .fetch_pointer(self.stack_pointer as usize - offset, active)
    }

    pub(crate) fn pop(&mut self, count: usize) {
        self.stack_pointer -= count as i16;
    }

    pub(crate) fn un_pop(&mut self, count: usize) {
        self.stack_pointer += count as i16;
    }

    /// Make `context` active, saving the previous context's registers.
    pub(crate) fn new_active_context(&mut self, context: Oop) -> Result<(), MemoryError> {
        self.store_context_registers()?;
        self.memory.set_register(Register::ActiveContext, context);
        self.fetch_context_registers()
    }

    /// The home context's sender (message returns go here).
    pub(crate) fn sender(&self) -> Result<Oop, MemoryError> {
        self.memory.fetch_pointer(
            method_context::SENDER,
            self.memory.register(Register::HomeContext),
        )
    }

    /// The active block's caller (block returns go here).
    pub(crate) fn caller(&self) -> Result<Oop, MemoryError> {
        self.memory.fetch_pointer(
            block_context::CALLER,
            self.memory.register(Register::ActiveContext),
        )
    }

    pub(crate) fn temporary(&self, offset: usize) -> Result<Oop, MemoryError> {
        self.memory.fetch_pointer(
            offset + method_context::TEMP_FRAME_START,
            self.memory.register(Register::HomeContext),
        )
    }

    pub(crate) fn literal(&self, offset: usize) -> Result<Oop, MemoryError> {
        self.memory
            .method_literal(offset, self.memory.register(Register::Method))
    }

    /// Fetch the next bytecode byte and advance.
    pub(crate) fn fetch_byte(&mut self) -> Result<u8, MemoryError> {
        let method = self.memory.register(Register::Method);
        let byte = self
            .memory
            .fetch_byte(self.instruction_pointer as usize, method)?;
        self.instruction_pointer += 1;
        Ok(byte)
    }

    /// Move `count` fields between objects, nilling the source slots so
    /// the old frame drops its references.
    pub(crate) fn transfer(
        &mut self,
        count: usize,
        first_from: usize,
        from: Oop,
        first_to: usize,
        to: Oop,
    ) -> Result<(), MemoryError> {
        for index in 0..count {
            let value = self.memory.fetch_pointer(first_from + index, from)?;
            self.memory.store_pointer(first_to + index, to, value)?;
            self.memory.store_pointer(first_from + index, from, NIL)?;
        }
        Ok(())
    }
}
