//! The fetch-decode-execute dispatch.

use crate::bytecode::{Bytecode, PushedConstant};
use crate::consts::*;
use crate::error::InterpreterError;
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::memory::{self, Register};

use tracing::warn;

impl<H> Interpreter<H>
where
    H: Host,
{
    /// Execute one decoded dispatch byte, fetching any operand bytes.
    pub(crate) fn dispatch(&mut self, byte: u8) -> Result<(), InterpreterError> {
        use Bytecode::*;
        match Bytecode::from(byte) {
            PushReceiverVariable(index) => {
                let receiver = self.memory.register(Register::Receiver);
                let value = self.memory.fetch_pointer(index as usize, receiver)?;
                self.push(value)?;
            }
            PushTemporary(index) => {
                let value = self.temporary(index as usize)?;
                self.push(value)?;
            }
            PushLiteralConstant(index) => {
                let value = self.literal(index as usize)?;
                self.push(value)?;
            }
            PushLiteralVariable(index) => {
                let association = self.literal(index as usize)?;
                let value = self.memory.fetch_pointer(ASSOCIATION_VALUE, association)?;
                self.push(value)?;
            }
            PopIntoReceiverVariable(index) => {
                let value = self.pop_stack()?;
                let receiver = self.memory.register(Register::Receiver);
                self.memory.store_pointer(index as usize, receiver, value)?;
            }
            PopIntoTemporary(index) => {
                let value = self.pop_stack()?;
                let home = self.memory.register(Register::HomeContext);
                self.memory.store_pointer(
                    index as usize + method_context::TEMP_FRAME_START,
                    home,
                    value,
                )?;
            }
            PushReceiver => {
                let receiver = self.memory.register(Register::Receiver);
                self.push(receiver)?;
            }
            PushConstant(constant) => {
                let value = match constant {
                    PushedConstant::True => TRUE,
                    PushedConstant::False => FALSE,
                    PushedConstant::Nil => NIL,
                    PushedConstant::MinusOne => MINUS_ONE,
                    PushedConstant::Zero => ZERO,
                    PushedConstant::One => ONE,
                    PushedConstant::Two => TWO,
                };
                self.push(value)?;
            }
            ReturnReceiver => {
                let receiver = self.memory.register(Register::Receiver);
                let target = self.sender()?;
                self.return_value(receiver, target)?;
            }
            ReturnTrue => {
                let target = self.sender()?;
                self.return_value(TRUE, target)?;
            }
            ReturnFalse => {
                let target = self.sender()?;
                self.return_value(FALSE, target)?;
            }
            ReturnNil => {
                let target = self.sender()?;
                self.return_value(NIL, target)?;
            }
            ReturnStackTop => {
                let result = self.pop_stack()?;
                let target = self.sender()?;
                self.return_value(result, target)?;
            }
            ReturnBlockStackTop => {
                let result = self.pop_stack()?;
                let target = self.caller()?;
                self.return_value(result, target)?;
            }
            ExtendedPush => self.extended_push()?,
            ExtendedStore => self.extended_store()?,
            ExtendedStoreAndPop => {
                self.extended_store()?;
                self.pop_stack()?;
            }
            SingleExtendedSend => {
                let descriptor = self.fetch_byte()?;
                let selector = self.literal((descriptor & 0x1f) as usize)?;
                self.send_selector(selector, ((descriptor >> 5) & 0x7) as usize)?;
            }
            DoubleExtendedSend => {
                let count = self.fetch_byte()?;
                let index = self.fetch_byte()?;
                let selector = self.literal(index as usize)?;
                self.send_selector(selector, count as usize)?;
            }
            SingleExtendedSuper => {
                let descriptor = self.fetch_byte()?;
                self.argument_count = ((descriptor >> 5) & 0x7) as usize;
                let selector = self.literal((descriptor & 0x1f) as usize)?;
                self.send_super(selector)?;
            }
            DoubleExtendedSuper => {
                let count = self.fetch_byte()?;
                let index = self.fetch_byte()?;
                self.argument_count = count as usize;
                let selector = self.literal(index as usize)?;
                self.send_super(selector)?;
            }
            PopStack => {
                self.pop_stack()?;
            }
            DuplicateTop => {
                let top = self.stack_top()?;
                self.push(top)?;
            }
            PushActiveContext => {
                let active = self.memory.register(Register::ActiveContext);
                self.push(active)?;
            }
            ShortJump(offset) => self.jump(offset as i16 + 1),
            ShortJumpIfFalse(offset) => self.jump_if(FALSE, offset as i16 + 1)?,
            LongJump(high) => {
                let low = self.fetch_byte()?;
                self.jump((high as i16 - 4) * 256 + low as i16);
            }
            LongJumpIfTrue(high) => {
                let low = self.fetch_byte()?;
                self.jump_if(TRUE, high as i16 * 256 + low as i16)?;
            }
            LongJumpIfFalse(high) => {
                let low = self.fetch_byte()?;
                self.jump_if(FALSE, high as i16 * 256 + low as i16)?;
            }
            SendArithmetic(offset) => self.send_special_selector(offset as usize)?,
            SendCommon(offset) => self.send_special_selector(offset as usize + 16)?,
            SendLiteral { selector, arguments } => {
                let selector = self.literal(selector as usize)?;
                self.send_selector(selector, arguments as usize)?;
            }
            Unused(byte) => warn!(byte, "executing unused bytecode"),
        }
        Ok(())
    }

    /// `super` sends dispatch from the superclass of the class the
    /// current method was compiled in.
    fn send_super(&mut self, selector: Oop) -> Result<(), InterpreterError> {
        self.memory.set_register(Register::MessageSelector, selector);
        let method = self.memory.register(Register::Method);
        let method_class = self.memory.method_class(method)?;
        let superclass = self.superclass_of(method_class)?;
        self.send_selector_to_class(superclass)
    }

    /// Send a selector from the special-selectors array; the primitive
    /// shortcut is tried first.
    fn send_special_selector(&mut self, offset: usize) -> Result<(), InterpreterError> {
        if self.special_selector_primitive_response(offset)? {
            return Ok(());
        }
        let index = offset * 2;
        let selector = self.memory.fetch_pointer(index, SPECIAL_SELECTORS)?;
        let count =
            memory::to_int(self.memory.fetch_word(index + 1, SPECIAL_SELECTORS)?) as usize;
        self.send_selector(selector, count)
    }

    fn extended_push(&mut self) -> Result<(), InterpreterError> {
        let descriptor = self.fetch_byte()?;
        let index = (descriptor & 0x3f) as usize;
        let value = match (descriptor >> 6) & 0x3 {
            0 => {
                let receiver = self.memory.register(Register::Receiver);
                self.memory.fetch_pointer(index, receiver)?
            }
            1 => self.temporary(index)?,
            2 => self.literal(index)?,
            _ => {
                let association = self.literal(index)?;
                self.memory.fetch_pointer(ASSOCIATION_VALUE, association)?
            }
        };
        self.push(value)?;
        Ok(())
    }

    fn extended_store(&mut self) -> Result<(), InterpreterError> {
        let descriptor = self.fetch_byte()?;
        let index = (descriptor & 0x3f) as usize;
        let top = self.stack_top()?;
        match (descriptor >> 6) & 0x3 {
            0 => {
                let receiver = self.memory.register(Register::Receiver);
                self.memory.store_pointer(index, receiver, top)?;
            }
            1 => {
                let home = self.memory.register(Register::HomeContext);
                self.memory.store_pointer(
                    index + method_context::TEMP_FRAME_START,
                    home,
                    top,
                )?;
            }
            2 => warn!("illegal extended store"),
            _ => {
                let association = self.literal(index)?;
                self.memory
                    .store_pointer(ASSOCIATION_VALUE, association, top)?;
            }
        }
        Ok(())
    }
}
