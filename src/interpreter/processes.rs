//! Process scheduling and semaphores.
//!
//! The scheduler state lives entirely in the image: the processor
//! association's value is the ProcessorScheduler, holding an array of
//! priority-indexed linked lists of runnable processes and the active
//! process. The interpreter only moves links between lists and swaps
//! suspended contexts in and out of the active-context register.

use crate::consts::*;
use crate::error::{InterpreterError, MemoryError};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::memory::{self, Register};

use tracing::trace;

impl<H> Interpreter<H> {
    fn scheduler(&self) -> Result<Oop, MemoryError> {
        self.memory
            .fetch_pointer(ASSOCIATION_VALUE, PROCESSOR_ASSOCIATION)
    }

    fn active_process(&self) -> Result<Oop, MemoryError> {
        self.memory
            .fetch_pointer(scheduler::ACTIVE_PROCESS, self.scheduler()?)
    }

    fn is_empty_list(&self, list: Oop) -> Result<bool, MemoryError> {
        Ok(self.memory.fetch_pointer(linked_list::FIRST_LINK, list)? == NIL)
    }

    fn remove_first_link(&mut self, list: Oop) -> Result<Oop, MemoryError> {
        let first = self.memory.fetch_pointer(linked_list::FIRST_LINK, list)?;
        let last = self.memory.fetch_pointer(linked_list::LAST_LINK, list)?;
        if first == last {
            self.memory
                .store_pointer(linked_list::FIRST_LINK, list, NIL)?;
            self.memory.store_pointer(linked_list::LAST_LINK, list, NIL)?;
        } else {
            let next = self.memory.fetch_pointer(process::NEXT_LINK, first)?;
            self.memory
                .store_pointer(linked_list::FIRST_LINK, list, next)?;
        }
        self.memory.store_pointer(process::NEXT_LINK, first, NIL)?;
        Ok(first)
    }

    fn add_last_link(&mut self, link: Oop, list: Oop) -> Result<(), MemoryError> {
        if self.is_empty_list(list)? {
            self.memory
                .store_pointer(linked_list::FIRST_LINK, list, link)?;
        } else {
            let last = self.memory.fetch_pointer(linked_list::LAST_LINK, list)?;
            self.memory.store_pointer(process::NEXT_LINK, last, link)?;
        }
        self.memory.store_pointer(linked_list::LAST_LINK, list, link)?;
        self.memory.store_pointer(process::MY_LIST, link, list)
    }

    fn priority_of(&self, process: Oop) -> Result<i16, MemoryError> {
        Ok(memory::to_int(
            self.memory.fetch_word(process::PRIORITY, process)?,
        ))
    }

    /// Queue the runnable `process` on its priority list.
    fn put_to_sleep(&mut self, process: Oop) -> Result<(), MemoryError> {
        let priority = self.priority_of(process)?;
        let lists = self
            .memory
            .fetch_pointer(scheduler::PROCESS_LISTS, self.scheduler()?)?;
        let list = self.memory.fetch_pointer(priority as usize - 1, lists)?;
        self.add_last_link(process, list)
    }

    /// Highest-priority runnable process, unlinked from its list.
    fn wake_highest_priority(&mut self) -> Result<Oop, InterpreterError> {
        let lists = self
            .memory
            .fetch_pointer(scheduler::PROCESS_LISTS, self.scheduler()?)?;
        let mut priority = self.memory.word_length_of(lists);
        while priority > 0 {
            let list = self.memory.fetch_pointer(priority - 1, lists)?;
            if !self.is_empty_list(list)? {
                return Ok(self.remove_first_link(list)?);
            }
            priority -= 1;
        }
        Err(InterpreterError::NoRunnableProcess)
    }

    /// Swap `process` in as the running process.
    fn transfer_to(&mut self, process: Oop) -> Result<(), MemoryError> {
        trace!(process, "process switch");
        let active = self.active_process()?;
        self.store_context_registers()?;
        let context = self.memory.register(Register::ActiveContext);
        self.memory
            .store_pointer(process::SUSPENDED_CONTEXT, active, context)?;
        let scheduler = self.scheduler()?;
        self.memory
            .store_pointer(scheduler::ACTIVE_PROCESS, scheduler, process)?;
        let resumed = self
            .memory
            .fetch_pointer(process::SUSPENDED_CONTEXT, process)?;
        self.memory.set_register(Register::ActiveContext, resumed);
        self.fetch_context_registers()
    }

    /// Make `process` runnable, preempting the active process when it
    /// has strictly higher priority.
    pub(crate) fn resume(&mut self, process: Oop) -> Result<(), InterpreterError> {
        let active = self.active_process()?;
        let active_priority = self.priority_of(active)?;
        if self.priority_of(process)? > active_priority {
            self.put_to_sleep(active)?;
            self.transfer_to(process)?;
        } else {
            self.put_to_sleep(process)?;
        }
        Ok(())
    }

    /// Park the active process and run the best runnable one.
    pub(crate) fn suspend_active(&mut self) -> Result<(), InterpreterError> {
        let next = self.wake_highest_priority()?;
        self.transfer_to(next)?;
        Ok(())
    }

    /// A signal from within the running image.
    pub(crate) fn synchronous_signal(&mut self, semaphore: Oop) -> Result<(), InterpreterError> {
        if self.is_empty_list(semaphore)? {
            let excess = memory::to_int(
                self.memory
                    .fetch_word(SEMAPHORE_EXCESS_SIGNALS, semaphore)?,
            );
            self.memory.store_word(
                SEMAPHORE_EXCESS_SIGNALS,
                semaphore,
                memory::from_int(excess as i32 + 1)?,
            )?;
        } else {
            let process = self.remove_first_link(semaphore)?;
            self.resume(process)?;
        }
        Ok(())
    }

    /// Block the active process on `semaphore` unless it holds signals.
    pub(crate) fn wait_on(&mut self, semaphore: Oop) -> Result<(), InterpreterError> {
        let excess = memory::to_int(
            self.memory
                .fetch_word(SEMAPHORE_EXCESS_SIGNALS, semaphore)?,
        );
        if excess > 0 {
            self.memory.store_word(
                SEMAPHORE_EXCESS_SIGNALS,
                semaphore,
                memory::from_int(excess as i32 - 1)?,
            )?;
        } else {
            let active = self.active_process()?;
            self.add_last_link(active, semaphore)?;
            self.suspend_active()?;
        }
        Ok(())
    }

    /// A signal from outside the bytecode stream (timer, input); queued
    /// and delivered at the next switch poll.
    pub(crate) fn asynchronous_signal(&mut self, semaphore: Oop) {
        if semaphore != NIL {
            self.pending_signals.push_back(semaphore);
        }
    }

    /// Arm the millisecond alarm serviced by the switch poll.
    pub(crate) fn signal_at_tick(&mut self, semaphore: Oop, tick: u32) {
        self.timer_semaphore = semaphore;
        self.wakeup_tick = Some(tick);
    }

    pub(crate) fn set_input_semaphore(&mut self, semaphore: Oop) {
        self.input_semaphore = semaphore;
    }

    /// Pop one buffered input word for the input-word primitive.
    pub(crate) fn next_input_word(&mut self) -> Option<u16> {
        self.input_words.pop_front()
    }
}

impl<H> Interpreter<H>
where
    H: Host,
{
    /// The poll at the top of every cycle: expire the timer, drain host
    /// events, deliver queued signals.
    pub(crate) fn check_process_switch(&mut self) -> Result<(), InterpreterError> {
        if let Some(tick) = self.wakeup_tick {
            if self.host.ticks_ms() >= tick {
                self.wakeup_tick = None;
                let semaphore = self.timer_semaphore;
                self.asynchronous_signal(semaphore);
            }
        }

        self.host.process_events();
        while let Some(word) = self.host.next_event() {
            self.input_words.push_back(word);
            let semaphore = self.input_semaphore;
            self.asynchronous_signal(semaphore);
        }

        while let Some(semaphore) = self.pending_signals.pop_front() {
            self.synchronous_signal(semaphore)?;
        }
        Ok(())
    }
}
