//! Private primitives (128 and up).
//!
//! This band is implementation-specific by design; it hosts the file
//! and clipboard bridges. Host I/O errors are recoverable failures, so
//! the image sees an ordinary primitive miss and can raise its own
//! error object.

use crate::consts::CLASS_STRING;
use crate::error::{success, PrimitiveError};
use crate::host::{Fd, Host};
use crate::interpreter::Interpreter;
use crate::memory;

impl<H> Interpreter<H>
where
    H: Host,
{
    pub(crate) fn dispatch_private_primitives(
        &mut self,
        index: u8,
    ) -> Result<(), PrimitiveError> {
        match index {
            130 => self.primitive_file_open(false),
            131 => self.primitive_file_open(true),
            132 => self.primitive_file_close(),
            133 => self.primitive_file_size(),
            134 => self.primitive_file_seek(),
            135 => self.primitive_file_read(),
            136 => self.primitive_file_write(),
            137 => self.primitive_file_truncate(),
            138 => self.primitive_file_delete(),
            139 => self.primitive_file_rename(),
            140 => self.primitive_clipboard_copy(),
            141 => self.primitive_clipboard_paste(),
            _ => Err(PrimitiveError::Failed),
        }
    }

    fn pop_fd(&mut self) -> Result<Fd, PrimitiveError> {
        let fd = self.pop_integer()?;
        success(fd >= 0)?;
        Ok(fd as Fd)
    }

    /// File handle receiver left in place as the primitive's result.
    fn receiver_fd(&self) -> Result<Fd, PrimitiveError> {
        let top = self.stack_top()?;
        success(memory::is_integer(top))?;
        let fd = memory::to_int(top);
        success(fd >= 0)?;
        Ok(fd as Fd)
    }

    fn primitive_file_open(&mut self, create: bool) -> Result<(), PrimitiveError> {
        let path_oop = self.pop_stack()?;
        self.pop_stack()?;
        let path = self.string_of(path_oop)?;
        let fd = if create {
            self.host.create(&path)
        } else {
            self.host.open(&path)
        }
        .map_err(|_| PrimitiveError::Failed)?;
        self.push_integer(fd.into())
    }

    fn primitive_file_close(&mut self) -> Result<(), PrimitiveError> {
        let fd = self.receiver_fd()?;
        self.host.close(fd).map_err(|_| PrimitiveError::Failed)?;
        Ok(())
    }

    fn primitive_file_size(&mut self) -> Result<(), PrimitiveError> {
        let fd = self.pop_fd()?;
        let size = self.host.size(fd).map_err(|_| PrimitiveError::Failed)?;
        let result = self.positive_32bit_integer_for(size)?;
        self.push(result)?;
        Ok(())
    }

    fn primitive_file_seek(&mut self) -> Result<(), PrimitiveError> {
        let position_oop = self.pop_stack()?;
        let fd = self.receiver_fd()?;
        let position = self.positive_32bit_value_of(position_oop)?;
        self.host
            .seek(fd, position)
            .map_err(|_| PrimitiveError::Failed)?;
        Ok(())
    }

    /// Read up to `count` bytes into the argument byte object; answers
    /// the transferred count.
    fn primitive_file_read(&mut self) -> Result<(), PrimitiveError> {
        let count_oop = self.pop_stack()?;
        let buffer = self.pop_stack()?;
        let fd = self.pop_fd()?;
        let count = self.positive_32bit_value_of(count_oop)? as usize;
        success(count <= self.memory.byte_length_of(buffer))?;
        let mut bytes = vec![0u8; count];
        let transferred = self
            .host
            .read(fd, &mut bytes)
            .map_err(|_| PrimitiveError::Failed)?;
        for (index, byte) in bytes[..transferred].iter().enumerate() {
            self.memory.store_byte(index, buffer, *byte)?;
        }
        self.push_integer(transferred as i32)
    }

    fn primitive_file_write(&mut self) -> Result<(), PrimitiveError> {
        let count_oop = self.pop_stack()?;
        let buffer = self.pop_stack()?;
        let fd = self.pop_fd()?;
        let count = self.positive_32bit_value_of(count_oop)? as usize;
        success(count <= self.memory.byte_length_of(buffer))?;
        let bytes = self.memory.bytes_of(buffer)?[..count].to_vec();
        let transferred = self
            .host
            .write(fd, &bytes)
            .map_err(|_| PrimitiveError::Failed)?;
        self.push_integer(transferred as i32)
    }

    fn primitive_file_truncate(&mut self) -> Result<(), PrimitiveError> {
        let size_oop = self.pop_stack()?;
        let fd = self.receiver_fd()?;
        let size = self.positive_32bit_value_of(size_oop)?;
        self.host
            .truncate(fd, size)
            .map_err(|_| PrimitiveError::Failed)?;
        Ok(())
    }

    fn primitive_file_delete(&mut self) -> Result<(), PrimitiveError> {
        let path_oop = self.pop_stack()?;
        let path = self.string_of(path_oop)?;
        self.host.delete(&path).map_err(|_| PrimitiveError::Failed)?;
        Ok(())
    }

    fn primitive_file_rename(&mut self) -> Result<(), PrimitiveError> {
        let to_oop = self.pop_stack()?;
        let from_oop = self.pop_stack()?;
        let to = self.string_of(to_oop)?;
        let from = self.string_of(from_oop)?;
        self.host
            .rename(&from, &to)
            .map_err(|_| PrimitiveError::Failed)?;
        Ok(())
    }

    fn primitive_clipboard_copy(&mut self) -> Result<(), PrimitiveError> {
        let text_oop = self.pop_stack()?;
        let bytes = self.memory.bytes_of(text_oop)?.to_vec();
        self.host.copy_to(&bytes);
        Ok(())
    }

    fn primitive_clipboard_paste(&mut self) -> Result<(), PrimitiveError> {
        self.pop_stack()?;
        let bytes = self.host.paste_from();
        let string = self
            .memory
            .instantiate_with_bytes(CLASS_STRING, bytes.len())?;
        for (index, byte) in bytes.iter().enumerate() {
            self.memory.store_byte(index, string, *byte)?;
        }
        self.push(string)?;
        Ok(())
    }
}
