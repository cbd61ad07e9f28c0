//! Float primitives (40..=54).
//!
//! Floats are two-word objects holding an IEEE-754 single. Operands
//! must already be Floats (except `asFloat`, whose receiver is an
//! immediate); anything else falls back to the image's coercion code.

use crate::consts::{CLASS_FLOAT, Oop};
use crate::error::{success, PrimitiveError};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::memory;

impl<H> Interpreter<H>
where
    H: Host,
{
    pub(crate) fn dispatch_float_primitives(&mut self, index: u8) -> Result<(), PrimitiveError> {
        match index {
            40 => self.primitive_as_float(),
            41 => self.float_arithmetic(|r, a| r + a),
            42 => self.float_arithmetic(|r, a| r - a),
            43 => self.float_comparison(|r, a| r < a),
            44 => self.float_comparison(|r, a| r > a),
            45 => self.float_comparison(|r, a| r <= a),
            46 => self.float_comparison(|r, a| r >= a),
            47 => self.float_comparison(|r, a| r == a),
            48 => self.float_comparison(|r, a| r != a),
            49 => self.float_arithmetic(|r, a| r * a),
            50 => self.primitive_float_divide(),
            51 => self.primitive_truncated(),
            52 => self.primitive_fractional_part(),
            53 => self.primitive_exponent(),
            54 => self.primitive_times_two_power(),
            _ => Err(PrimitiveError::Failed),
        }
    }

    fn pop_float(&mut self) -> Result<f32, PrimitiveError> {
        let oop = self.pop_stack()?;
        success(self.memory.class_of(oop) == CLASS_FLOAT)?;
        Ok(self.memory.fetch_float(oop)?)
    }

    fn push_float(&mut self, value: f32) -> Result<(), PrimitiveError> {
        let result = self.new_float(value)?;
        self.push(result)?;
        Ok(())
    }

    fn new_float(&mut self, value: f32) -> Result<Oop, PrimitiveError> {
        let oop = self.memory.instantiate_with_words(CLASS_FLOAT, 2)?;
        self.memory.store_float(oop, value)?;
        Ok(oop)
    }

    fn float_arithmetic(
        &mut self,
        op: impl FnOnce(f32, f32) -> f32,
    ) -> Result<(), PrimitiveError> {
        let argument = self.pop_float()?;
        let receiver = self.pop_float()?;
        self.push_float(op(receiver, argument))
    }

    fn float_comparison(
        &mut self,
        op: impl FnOnce(f32, f32) -> bool,
    ) -> Result<(), PrimitiveError> {
        let argument = self.pop_float()?;
        let receiver = self.pop_float()?;
        self.push_boolean(op(receiver, argument))
    }

    fn primitive_as_float(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.pop_integer()?;
        self.push_float(receiver.into())
    }

    fn primitive_float_divide(&mut self) -> Result<(), PrimitiveError> {
        let argument = self.pop_float()?;
        let receiver = self.pop_float()?;
        success(argument != 0.0)?;
        self.push_float(receiver / argument)
    }

    fn primitive_truncated(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.pop_float()?;
        let truncated = receiver.trunc();
        success(memory::is_integer_value(truncated as i32) && truncated.abs() < 32768.0)?;
        self.push_integer(truncated as i32)
    }

    fn primitive_fractional_part(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.pop_float()?;
        self.push_float(receiver.fract())
    }

    /// The binary exponent, as `exponent` answers it.
    fn primitive_exponent(&mut self) -> Result<(), PrimitiveError> {
        let receiver = self.pop_float()?;
        success(receiver.is_finite() && receiver != 0.0)?;
        let exponent = ((receiver.to_bits() >> 23) & 0xff) as i32 - 127;
        self.push_integer(exponent)
    }

    fn primitive_times_two_power(&mut self) -> Result<(), PrimitiveError> {
        let argument = self.pop_integer()?;
        let receiver = self.pop_float()?;
        self.push_float(receiver * (argument as f32).exp2())
    }
}
