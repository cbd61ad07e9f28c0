//! System primitives (110..=127).

use crate::error::PrimitiveError;
use crate::host::Host;
use crate::interpreter::Interpreter;

use tracing::info;

impl<H> Interpreter<H>
where
    H: Host,
{
    pub(crate) fn dispatch_system_primitives(
        &mut self,
        index: u8,
    ) -> Result<(), PrimitiveError> {
        match index {
            110 => self.primitive_equivalent(),
            111 => self.primitive_class(),
            112 => self.primitive_core_left(),
            113 => self.primitive_quit(),
            // 114 exitToDebugger has no debugger to exit to
            115 => self.primitive_oops_left(),
            _ => Err(PrimitiveError::Failed),
        }
    }

    /// `==`: pointer identity, immediates included.
    pub(crate) fn primitive_equivalent(&mut self) -> Result<(), PrimitiveError> {
        let argument = self.pop_stack()?;
        let receiver = self.pop_stack()?;
        self.push_boolean(receiver == argument)
    }

    pub(crate) fn primitive_class(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.pop_stack()?;
        let class = self.memory.class_of(receiver);
        self.push(class)?;
        Ok(())
    }

    /// Remaining heap capacity, in words. The slot payloads are the
    /// only heap there is, so free slots stand in for free words.
    fn primitive_core_left(&mut self) -> Result<(), PrimitiveError> {
        self.pop_stack()?;
        let words = (self.memory.slots_left() as u32).saturating_mul(16);
        let result = self.positive_32bit_integer_for(words)?;
        self.push(result)?;
        Ok(())
    }

    fn primitive_quit(&mut self) -> Result<(), PrimitiveError> {
        info!("image requested quit");
        self.running = false;
        Ok(())
    }

    fn primitive_oops_left(&mut self) -> Result<(), PrimitiveError> {
        self.pop_stack()?;
        let left = self.memory.slots_left() as u32;
        let result = self.positive_32bit_integer_for(left)?;
        self.push(result)?;
        Ok(())
    }
}
