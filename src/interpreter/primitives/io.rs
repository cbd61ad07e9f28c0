//! Input/output primitives (90..=109): cursor, input events, BitBlt,
//! clocks and the snapshot.

use crate::bitblt::{BitBlt, BitBltInput, Bitmap};
use crate::consts::*;
use crate::error::{success, PrimitiveError};
use crate::host::Host;
use crate::image;
use crate::interpreter::Interpreter;

use tracing::debug;

impl<H> Interpreter<H>
where
    H: Host,
{
    pub(crate) fn dispatch_io_primitives(&mut self, index: u8) -> Result<(), PrimitiveError> {
        match index {
            91 => self.primitive_cursor_loc_put(),
            93 => self.primitive_input_semaphore(),
            95 => self.primitive_input_word(),
            96 => self.primitive_copy_bits(),
            97 => self.primitive_snapshot(),
            98 => self.primitive_time_words_into(),
            99 => self.primitive_tick_words_into(),
            100 => self.primitive_signal_at_tick(),
            101 => self.primitive_be_cursor(),
            102 => self.primitive_be_display(),
            // 90 mousePoint, 92 cursorLink, 94 sampleInterval and the
            // scanning/drawing shortcuts run their fallback bodies
            _ => Err(PrimitiveError::Failed),
        }
    }

    /// Read a Form's bitmap out of the heap.
    fn form_bitmap(&self, form: Oop) -> Result<(Oop, Bitmap), PrimitiveError> {
        let bits = self.memory.fetch_pointer(form::BITS, form)?;
        let width = self.fetch_integer_of_object(form::WIDTH, form)?;
        let height = self.fetch_integer_of_object(form::HEIGHT, form)?;
        let words = self.memory.words_of(bits)?;
        let bitmap = Bitmap::new(words, width, height).ok_or(PrimitiveError::Failed)?;
        Ok((bits, bitmap))
    }

    /// `copyBits` runs the raster combinator over the receiver's forms
    /// and reports the touched rectangle when the destination is the
    /// live display.
    fn primitive_copy_bits(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.stack_top()?;

        let dest_form = self.memory.fetch_pointer(bit_blt::DEST_FORM, receiver)?;
        success(dest_form != NIL)?;
        let (dest_bits, dest) = self.form_bitmap(dest_form)?;

        let source_form = self.memory.fetch_pointer(bit_blt::SOURCE_FORM, receiver)?;
        let mut source_is_dest = false;
        let source = if source_form == NIL {
            None
        } else {
            let (source_bits, bitmap) = self.form_bitmap(source_form)?;
            source_is_dest = source_bits == dest_bits;
            Some(bitmap)
        };

        let halftone_form = self.memory.fetch_pointer(bit_blt::HALFTONE_FORM, receiver)?;
        let halftone = if halftone_form == NIL {
            None
        } else {
            Some(self.form_bitmap(halftone_form)?.1)
        };

        let input = BitBltInput {
            combination_rule: self.fetch_integer_of_object(bit_blt::COMBINATION_RULE, receiver)?,
            dest_x: self.fetch_integer_of_object(bit_blt::DEST_X, receiver)?,
            dest_y: self.fetch_integer_of_object(bit_blt::DEST_Y, receiver)?,
            width: self.fetch_integer_of_object(bit_blt::WIDTH, receiver)?,
            height: self.fetch_integer_of_object(bit_blt::HEIGHT, receiver)?,
            source_x: self.fetch_integer_of_object(bit_blt::SOURCE_X, receiver)?,
            source_y: self.fetch_integer_of_object(bit_blt::SOURCE_Y, receiver)?,
            clip_x: self.fetch_integer_of_object(bit_blt::CLIP_X, receiver)?,
            clip_y: self.fetch_integer_of_object(bit_blt::CLIP_Y, receiver)?,
            clip_width: self.fetch_integer_of_object(bit_blt::CLIP_WIDTH, receiver)?,
            clip_height: self.fetch_integer_of_object(bit_blt::CLIP_HEIGHT, receiver)?,
            source_is_dest,
        };

        let (dest, affected) = BitBlt::new(source, dest, halftone, input).copy_bits();
        self.memory.put_words_of(dest_bits, dest.words())?;

        if let Some(rect) = affected {
            if dest_bits == self.display_bitmap {
                self.host.update_rect(
                    rect.x.max(0) as u16,
                    rect.y.max(0) as u16,
                    rect.width as u16,
                    rect.height as u16,
                );
            }
        }
        Ok(())
    }

    /// Adopt the receiver Form as the display surface.
    fn primitive_be_display(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.stack_top()?;
        let (bits, bitmap) = self.form_bitmap(receiver)?;
        self.display_bitmap = bits;
        self.host.set_bitmap(
            bitmap.words(),
            bitmap.width() as u16,
            bitmap.height() as u16,
        );
        Ok(())
    }

    fn primitive_be_cursor(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.stack_top()?;
        let (_, bitmap) = self.form_bitmap(receiver)?;
        self.host.set_cursor_bitmap(
            bitmap.words(),
            bitmap.width() as u16,
            bitmap.height() as u16,
        );
        Ok(())
    }

    fn primitive_cursor_loc_put(&mut self) -> Result<(), PrimitiveError> {
        let location = self.pop_stack()?;
        let x = self.fetch_integer_of_object(point::X, location)?;
        let y = self.fetch_integer_of_object(point::Y, location)?;
        success(x >= 0 && y >= 0)?;
        self.host.set_cursor_pos(x as u16, y as u16);
        Ok(())
    }

    fn primitive_input_semaphore(&mut self) -> Result<(), PrimitiveError> {
        let semaphore = self.pop_stack()?;
        success(self.memory.class_of(semaphore) == CLASS_SEMAPHORE)?;
        self.set_input_semaphore(semaphore);
        Ok(())
    }

    /// Pop the next 16-bit word from the buffered input stream.
    fn primitive_input_word(&mut self) -> Result<(), PrimitiveError> {
        let word = self.next_input_word().ok_or(PrimitiveError::Failed)?;
        self.pop_stack()?;
        let result = self.positive_16bit_integer_for(word.into())?;
        self.push(result)?;
        Ok(())
    }

    /// Write the running object universe back to its snapshot file.
    fn primitive_snapshot(&mut self) -> Result<(), PrimitiveError> {
        let path = self.image_path.clone().ok_or(PrimitiveError::Failed)?;
        self.store_context_registers()?;
        let bytes = image::write(&self.memory);
        debug!(len = bytes.len(), ?path, "writing snapshot");
        std::fs::write(&path, bytes).map_err(|_| PrimitiveError::Failed)?;
        Ok(())
    }

    /// Store the wall-clock seconds since 1901 into the argument byte
    /// array, least-significant byte first.
    fn primitive_time_words_into(&mut self) -> Result<(), PrimitiveError> {
        let seconds = self.host.seconds_since_1901();
        self.store_clock_words(seconds)
    }

    /// Store the millisecond tick counter likewise.
    fn primitive_tick_words_into(&mut self) -> Result<(), PrimitiveError> {
        let ticks = self.host.ticks_ms();
        self.store_clock_words(ticks)
    }

    fn store_clock_words(&mut self, value: u32) -> Result<(), PrimitiveError> {
        let buffer = self.pop_stack()?;
        success(self.memory.byte_length_of(buffer) >= 4)?;
        for (index, byte) in value.to_le_bytes().iter().enumerate() {
            self.memory.store_byte(index, buffer, *byte)?;
        }
        Ok(())
    }

    /// Arm the millisecond alarm: the semaphore argument is signalled
    /// once the tick argument is reached.
    fn primitive_signal_at_tick(&mut self) -> Result<(), PrimitiveError> {
        let tick_oop = self.pop_stack()?;
        let semaphore = self.pop_stack()?;
        let tick = self.positive_32bit_value_of(tick_oop)?;
        if semaphore == NIL {
            self.wakeup_tick = None;
            self.timer_semaphore = NIL;
        } else {
            success(self.memory.class_of(semaphore) == CLASS_SEMAPHORE)?;
            self.signal_at_tick(semaphore, tick);
        }
        Ok(())
    }
}
