//! Message sends, method activation, returns and jumps.

use crate::consts::*;
use crate::error::{InterpreterError, MemoryError};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::memory::Register;

use tracing::debug;

impl<H> Interpreter<H> {
    pub(crate) fn superclass_of(&self, class: Oop) -> Result<Oop, MemoryError> {
        self.memory.fetch_pointer(class::SUPERCLASS, class)
    }

    pub(crate) fn instance_specification_of(&self, class: Oop) -> Result<u16, MemoryError> {
        self.memory.fetch_word(class::INSTANCE_SPEC, class)
    }

    pub(crate) fn is_pointers(&self, class: Oop) -> Result<bool, MemoryError> {
        Ok(self.instance_specification_of(class)? & 0x8000 != 0)
    }

    pub(crate) fn is_words(&self, class: Oop) -> Result<bool, MemoryError> {
        Ok(self.instance_specification_of(class)? & 0x4000 != 0)
    }

    pub(crate) fn is_indexable(&self, class: Oop) -> Result<bool, MemoryError> {
        Ok(self.instance_specification_of(class)? & 0x2000 != 0)
    }

    pub(crate) fn fixed_fields_of(&self, class: Oop) -> Result<usize, MemoryError> {
        Ok(((self.instance_specification_of(class)? >> 1) & 0x7ff) as usize)
    }

    /// Linear probe of a method dictionary: the parallel method Array is
    /// at field 1, selectors occupy the dictionary from field 2 on.
    pub(crate) fn lookup_method_in_dictionary(
        &self,
        dictionary: Oop,
        selector: Oop,
    ) -> Result<Option<Oop>, MemoryError> {
        let methods = self
            .memory
            .fetch_pointer(method_dict::METHOD_ARRAY, dictionary)?;
        for index in method_dict::SELECTOR_START..self.memory.word_length_of(dictionary) {
            if self.memory.fetch_pointer(index, dictionary)? == selector {
                return Ok(Some(
                    self.memory
                        .fetch_pointer(index - method_dict::SELECTOR_START, methods)?,
                ));
            }
        }
        Ok(None)
    }

    /// Walk the superclass chain for the current message selector. On a
    /// hit, installs `newMethod` and caches its primitive index.
    pub(crate) fn find_new_method_in_class(&mut self, class: Oop) -> Result<bool, MemoryError> {
        let selector = self.memory.register(Register::MessageSelector);
        let mut current = class;
        while current != NIL {
            let dictionary = self.memory.fetch_pointer(class::MESSAGE_DICT, current)?;
            if let Some(method) = self.lookup_method_in_dictionary(dictionary, selector)? {
                self.memory.set_register(Register::NewMethod, method);
                self.primitive_index = self.memory.method_primitive_index(method)?;
                return Ok(true);
            }
            current = self.superclass_of(current)?;
        }
        Ok(false)
    }
}

impl<H> Interpreter<H>
where
    H: Host,
{
    pub(crate) fn send_selector(
        &mut self,
        selector: Oop,
        argument_count: usize,
    ) -> Result<(), InterpreterError> {
        self.memory.set_register(Register::MessageSelector, selector);
        self.argument_count = argument_count;
        let receiver = self.stack_value(argument_count)?;
        self.send_selector_to_class(self.memory.class_of(receiver))
    }

    pub(crate) fn send_selector_to_class(&mut self, class: Oop) -> Result<(), InterpreterError> {
        loop {
            if self.find_new_method_in_class(class)? {
                return self.execute_new_method();
            }
            let selector = self.memory.register(Register::MessageSelector);
            if selector == SYMBOL_DOES_NOT_UNDERSTAND {
                return Err(InterpreterError::RecursiveDoesNotUnderstand { selector });
            }
            debug!(selector, class, "message not understood");
            self.create_actual_message()?;
            self.memory
                .set_register(Register::MessageSelector, SYMBOL_DOES_NOT_UNDERSTAND);
        }
    }

    /// Replace the receiver-and-arguments stack suffix by a `Message`
    /// carrying the selector and an Array of the arguments, ready for
    /// the `doesNotUnderstand:` re-send.
    fn create_actual_message(&mut self) -> Result<(), MemoryError> {
        let arguments = self
            .memory
            .instantiate_with_pointers(CLASS_ARRAY, self.argument_count)?;
        self.memory.add_temp(arguments);
        let actual = self
            .memory
            .instantiate_with_pointers(CLASS_MESSAGE, message::SIZE)?;
        self.memory.remove_temp(arguments);

        let selector = self.memory.register(Register::MessageSelector);
        self.memory
            .store_pointer(message::SELECTOR, actual, selector)?;
        self.memory
            .store_pointer(message::ARGUMENTS, actual, arguments)?;
        let active = self.memory.register(Register::ActiveContext);
        self.transfer(
            self.argument_count,
            self.stack_pointer as usize - self.argument_count + 1,
            active,
            0,
            arguments,
        )?;
        self.pop(self.argument_count);
        self.push(actual)?;
        self.argument_count = 1;
        Ok(())
    }

    pub(crate) fn execute_new_method(&mut self) -> Result<(), InterpreterError> {
        if !self.primitive_response()? {
            self.activate_new_method()?;
        }
        Ok(())
    }

    /// Bring a fresh MethodContext to life for `newMethod` and transfer
    /// the receiver and arguments into it.
    pub(crate) fn activate_new_method(&mut self) -> Result<(), MemoryError> {
        let new_method = self.memory.register(Register::NewMethod);
        let frame = if self.memory.method_large_context(new_method)? {
            LARGE_FRAME
        } else {
            SMALL_FRAME
        };
        let context = self.memory.instantiate_with_pointers(
            CLASS_METHOD_CONTEXT,
            method_context::TEMP_FRAME_START + frame,
        )?;

        let active = self.memory.register(Register::ActiveContext);
        self.memory
            .store_pointer(method_context::SENDER, context, active)?;
        self.store_instruction_pointer_in_context(
            self.memory.method_initial_instruction_pointer(new_method)?,
            context,
        )?;
        self.store_stack_pointer_in_context(
            self.memory.method_temporary_count(new_method)?.into(),
            context,
        )?;
        self.memory
            .store_pointer(method_context::METHOD, context, new_method)?;
        self.transfer(
            self.argument_count + 1,
            self.stack_pointer as usize - self.argument_count,
            active,
            method_context::RECEIVER,
            context,
        )?;
        self.pop(self.argument_count + 1);
        self.new_active_context(context)
    }

    /* RETURNS */

    fn nil_context_fields(&mut self) -> Result<(), MemoryError> {
        let active = self.memory.register(Register::ActiveContext);
        self.memory
            .store_pointer(method_context::SENDER, active, NIL)?;
        self.memory
            .store_pointer(method_context::INSTRUCTION_POINTER, active, NIL)
    }

    fn return_to_active_context(&mut self, context: Oop) -> Result<(), MemoryError> {
        self.memory.add_temp(context);
        self.nil_context_fields()?;
        self.memory.remove_temp(context);
        self.memory.set_register(Register::ActiveContext, context);
        self.fetch_context_registers()
    }

    /// Return `result` to `target`. An abandoned target (nil, or with a
    /// nil instruction pointer) surfaces as a `cannotReturn:` send.
    pub(crate) fn return_value(
        &mut self,
        result: Oop,
        target: Oop,
    ) -> Result<(), InterpreterError> {
        if target == NIL {
            return self.send_cannot_return(result);
        }
        let target_ip = self
            .memory
            .fetch_pointer(method_context::INSTRUCTION_POINTER, target)?;
        if target_ip == NIL {
            return self.send_cannot_return(result);
        }
        self.memory.add_temp(result);
        self.return_to_active_context(target)?;
        self.push(result)?;
        self.memory.remove_temp(result);
        Ok(())
    }

    fn send_cannot_return(&mut self, result: Oop) -> Result<(), InterpreterError> {
        let active = self.memory.register(Register::ActiveContext);
        self.push(active)?;
        self.push(result)?;
        self.send_selector(SYMBOL_CANNOT_RETURN, 1)
    }

    /* JUMPS */

    pub(crate) fn jump(&mut self, offset: i16) {
        self.instruction_pointer += offset;
    }

    /// Pop and jump when the popped value equals `condition`; a
    /// non-boolean is pushed back and told `mustBeBoolean`.
    pub(crate) fn jump_if(
        &mut self,
        condition: Oop,
        offset: i16,
    ) -> Result<(), InterpreterError> {
        let boolean = self.pop_stack()?;
        if boolean == condition {
            self.jump(offset);
        } else if boolean != TRUE && boolean != FALSE {
            self.un_pop(1);
            return self.send_selector(SYMBOL_MUST_BE_BOOLEAN, 0);
        }
        Ok(())
    }
}
