//! [`Interpreter`] implementation.
//!
//! A single-threaded cooperative fetch-decode-execute machine over
//! heap-allocated contexts. Six registers live in the object memory's
//! register file (they are collection roots); the instruction and stack
//! pointers of the active context are cached here between sends.

use crate::consts::*;
use crate::error::InterpreterError;
use crate::host::Host;
use crate::memory::{ObjectMemory, Register};

use std::collections::VecDeque;
use std::path::PathBuf;

mod bytecodes;
mod flow;
mod frame;
mod primitives;
mod processes;

/// VM interpreter, generic over its host adapters.
#[derive(Debug)]
pub struct Interpreter<H> {
    memory: ObjectMemory,
    host: H,

    /// Byte index of the next bytecode within the active method's
    /// payload (header and literals included).
    instruction_pointer: i16,
    /// Field index of the stack top within the active context.
    stack_pointer: i16,
    argument_count: usize,
    primitive_index: u8,
    running: bool,

    /// Semaphores signalled from the poll between cycles.
    pending_signals: VecDeque<Oop>,
    /// Input words drained from the host, waiting for the image.
    input_words: VecDeque<u16>,
    input_semaphore: Oop,
    timer_semaphore: Oop,
    wakeup_tick: Option<u32>,
    /// The object adopted as the live display raster, if any.
    display_bitmap: Oop,
    /// Where the running snapshot came from; the snapshot primitive
    /// writes back here.
    image_path: Option<PathBuf>,
}

impl<H> Interpreter<H> {
    pub fn new(memory: ObjectMemory, host: H) -> Self {
        Self {
            memory,
            host,
            instruction_pointer: 0,
            stack_pointer: 0,
            argument_count: 0,
            primitive_index: 0,
            running: false,
            pending_signals: VecDeque::new(),
            input_words: VecDeque::new(),
            input_semaphore: NIL,
            timer_semaphore: NIL,
            wakeup_tick: None,
            display_bitmap: NIL,
            image_path: None,
        }
    }

    /// The object memory, e.g. for inspection after a run.
    pub fn memory(&self) -> &ObjectMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ObjectMemory {
        &mut self.memory
    }

    /// Host adapter handle.
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Remember the snapshot's origin for the snapshot primitive.
    pub fn set_image_path(&mut self, path: PathBuf) {
        self.image_path = Some(path);
    }

    /// Stop interpreting after the current cycle.
    pub fn stop(&mut self) {
        self.running = false;
    }
}

impl<H> Interpreter<H>
where
    H: Host,
{
    /// Install the image's active process as the running context. The
    /// scheduler association's value holds the ProcessorScheduler whose
    /// active process was suspended at snapshot time.
    pub fn initialize(&mut self) -> Result<(), InterpreterError> {
        let scheduler = self
            .memory
            .fetch_pointer(ASSOCIATION_VALUE, PROCESSOR_ASSOCIATION)?;
        let active = self
            .memory
            .fetch_pointer(scheduler::ACTIVE_PROCESS, scheduler)?;
        let context = self
            .memory
            .fetch_pointer(process::SUSPENDED_CONTEXT, active)?;
        if context == NIL {
            return Err(InterpreterError::NoRunnableProcess);
        }
        self.memory.set_register(Register::ActiveContext, context);
        self.fetch_context_registers()?;
        Ok(())
    }

    /// Run until the image quits or the host asks to close.
    pub fn interpret(&mut self) -> Result<(), InterpreterError> {
        self.running = true;
        while self.running && self.host.running() {
            self.cycle()?;
        }
        Ok(())
    }

    /// One fetch-decode-execute step, preceded by the switch poll.
    pub fn cycle(&mut self) -> Result<(), InterpreterError> {
        self.check_process_switch()?;
        let byte = self.fetch_byte()?;
        self.dispatch(byte)
    }
}
