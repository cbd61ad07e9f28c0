//! Control primitives (80..=89): blocks, perform:, semaphores and
//! processes.

use crate::consts::*;
use crate::error::{success, PrimitiveError};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::memory::{self, Register};

impl<H> Interpreter<H>
where
    H: Host,
{
    pub(crate) fn dispatch_control_primitives(
        &mut self,
        index: u8,
    ) -> Result<(), PrimitiveError> {
        match index {
            80 => self.primitive_block_copy(),
            81 => self.primitive_value(),
            82 => self.primitive_value_with_arguments(),
            83 => self.primitive_perform(),
            84 => self.primitive_perform_with_arguments(),
            85 => self.primitive_signal(),
            86 => self.primitive_wait(),
            87 => self.primitive_resume(),
            88 => self.primitive_suspend(),
            // flushCache: nothing is cached beyond the method register
            89 => Ok(()),
            _ => Err(PrimitiveError::Failed),
        }
    }

    /// `blockCopy:` births a BlockContext sized like its home context;
    /// the initial instruction pointer skips the jump that the compiler
    /// places around the block body.
    pub(crate) fn primitive_block_copy(&mut self) -> Result<(), PrimitiveError> {
        let block_argument_count = self.pop_stack()?;
        let context = self.pop_stack()?;
        let home = if self.is_block_context(context)? {
            self.memory.fetch_pointer(block_context::HOME, context)?
        } else {
            context
        };
        let size = self.memory.word_length_of(home);
        let new_block = self
            .memory
            .instantiate_with_pointers(CLASS_BLOCK_CONTEXT, size)?;
        let initial_ip = memory::from_int((self.instruction_pointer + 3).into())?;
        self.memory
            .store_word(block_context::INITIAL_IP, new_block, initial_ip)?;
        self.memory.store_word(
            method_context::INSTRUCTION_POINTER,
            new_block,
            initial_ip,
        )?;
        self.store_stack_pointer_in_context(0, new_block)?;
        self.memory.store_word(
            block_context::BLOCK_ARGUMENT_COUNT,
            new_block,
            block_argument_count,
        )?;
        self.memory
            .store_pointer(block_context::HOME, new_block, home)?;
        self.push(new_block)?;
        Ok(())
    }

    /// `value`, `value:`, ... activate the receiver block with the
    /// arguments moved into its frame.
    pub(crate) fn primitive_value(&mut self) -> Result<(), PrimitiveError> {
        let block = self.stack_value(self.argument_count)?;
        let block_argument_count = self.argument_count_of_block(block)?;
        success(block_argument_count as usize == self.argument_count)?;

        let active = self.memory.register(Register::ActiveContext);
        self.transfer(
            self.argument_count,
            self.stack_pointer as usize - self.argument_count + 1,
            active,
            method_context::TEMP_FRAME_START,
            block,
        )?;
        self.pop(self.argument_count + 1);

        let initial_ip = self.memory.fetch_word(block_context::INITIAL_IP, block)?;
        self.memory
            .store_word(method_context::INSTRUCTION_POINTER, block, initial_ip)?;
        self.store_stack_pointer_in_context(block_argument_count, block)?;
        self.memory
            .store_pointer(block_context::CALLER, block, active)?;
        self.new_active_context(block)?;
        Ok(())
    }

    /// `valueWithArguments:` unpacks an Array argument into the block.
    fn primitive_value_with_arguments(&mut self) -> Result<(), PrimitiveError> {
        let arguments = self.pop_stack()?;
        let block = self.pop_stack()?;
        success(self.memory.class_of(arguments) == CLASS_ARRAY)?;
        let count = self.memory.word_length_of(arguments);
        success(self.argument_count_of_block(block)? as usize == count)?;

        for index in 0..count {
            let value = self.memory.fetch_pointer(index, arguments)?;
            self.memory.store_pointer(
                method_context::TEMP_FRAME_START + index,
                block,
                value,
            )?;
        }

        let active = self.memory.register(Register::ActiveContext);
        let initial_ip = self.memory.fetch_word(block_context::INITIAL_IP, block)?;
        self.memory
            .store_word(method_context::INSTRUCTION_POINTER, block, initial_ip)?;
        self.store_stack_pointer_in_context(count as i16, block)?;
        self.memory
            .store_pointer(block_context::CALLER, block, active)?;
        self.new_active_context(block)?;
        Ok(())
    }

    /// `perform:` rewrites the send as if the argument selector had been
    /// compiled in. The method must be found with a matching argument
    /// count, otherwise the fallback body runs untouched.
    fn primitive_perform(&mut self) -> Result<(), PrimitiveError> {
        let saved_method = self.memory.register(Register::NewMethod);
        let saved_selector = self.memory.register(Register::MessageSelector);
        let saved_primitive = self.primitive_index;
        let result = self.perform_lookup();
        if result.is_err() {
            self.memory.set_register(Register::NewMethod, saved_method);
            self.memory
                .set_register(Register::MessageSelector, saved_selector);
            self.primitive_index = saved_primitive;
        }
        result
    }

    fn perform_lookup(&mut self) -> Result<(), PrimitiveError> {
        let selector = self.stack_value(self.argument_count - 1)?;
        let receiver = self.stack_value(self.argument_count)?;
        self.memory
            .set_register(Register::MessageSelector, selector);
        success(self.find_new_method_in_class(self.memory.class_of(receiver))?)?;
        let method = self.memory.register(Register::NewMethod);
        let wanted = self.memory.method_argument_count(method)? as usize;
        success(wanted == self.argument_count - 1)?;

        // squeeze the selector out from under the arguments
        let active = self.memory.register(Register::ActiveContext);
        let selector_slot = self.stack_pointer as usize - (self.argument_count - 1);
        for slot in selector_slot..self.stack_pointer as usize {
            let value = self.memory.fetch_pointer(slot + 1, active)?;
            self.memory.store_pointer(slot, active, value)?;
        }
        self.pop(1);
        self.argument_count -= 1;
        self.execute_new_method()?;
        Ok(())
    }

    /// `perform:withArguments:` spreads an Array onto the stack first.
    fn primitive_perform_with_arguments(&mut self) -> Result<(), PrimitiveError> {
        let saved_method = self.memory.register(Register::NewMethod);
        let saved_selector = self.memory.register(Register::MessageSelector);
        let saved_primitive = self.primitive_index;
        let result = self.perform_with_arguments_lookup();
        if result.is_err() {
            self.memory.set_register(Register::NewMethod, saved_method);
            self.memory
                .set_register(Register::MessageSelector, saved_selector);
            self.primitive_index = saved_primitive;
        }
        result
    }

    fn perform_with_arguments_lookup(&mut self) -> Result<(), PrimitiveError> {
        let arguments = self.stack_value(0)?;
        let selector = self.stack_value(1)?;
        let receiver = self.stack_value(2)?;
        success(self.memory.class_of(arguments) == CLASS_ARRAY)?;
        let count = self.memory.word_length_of(arguments);

        self.memory
            .set_register(Register::MessageSelector, selector);
        success(self.find_new_method_in_class(self.memory.class_of(receiver))?)?;
        let method = self.memory.register(Register::NewMethod);
        success(self.memory.method_argument_count(method)? as usize == count)?;

        self.pop(2);
        for index in 0..count {
            let value = self.memory.fetch_pointer(index, arguments)?;
            self.push(value)?;
        }
        self.argument_count = count;
        self.execute_new_method()?;
        Ok(())
    }

    /// `signal` wakes a waiter or banks an excess signal; the receiver
    /// stays on the stack as the result.
    fn primitive_signal(&mut self) -> Result<(), PrimitiveError> {
        let semaphore = self.stack_top()?;
        success(self.memory.class_of(semaphore) == CLASS_SEMAPHORE)?;
        self.synchronous_signal(semaphore)?;
        Ok(())
    }

    fn primitive_wait(&mut self) -> Result<(), PrimitiveError> {
        let semaphore = self.stack_top()?;
        success(self.memory.class_of(semaphore) == CLASS_SEMAPHORE)?;
        self.wait_on(semaphore)?;
        Ok(())
    }

    fn primitive_resume(&mut self) -> Result<(), PrimitiveError> {
        let process = self.stack_top()?;
        self.resume(process)?;
        Ok(())
    }

    /// `suspend` answers nil to the suspended process when it resumes.
    fn primitive_suspend(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.stack_top()?;
        let scheduler = self
            .memory
            .fetch_pointer(ASSOCIATION_VALUE, PROCESSOR_ASSOCIATION)?;
        let active = self
            .memory
            .fetch_pointer(scheduler::ACTIVE_PROCESS, scheduler)?;
        success(receiver == active)?;
        self.pop_stack()?;
        self.push(NIL)?;
        self.suspend_active()?;
        Ok(())
    }
}
