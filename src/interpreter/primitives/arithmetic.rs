//! SmallInteger primitives (1..=18).
//!
//! Arguments are popped before they are validated; the caller's stack
//! snapshot undoes the pops when a check fails. Results are computed in
//! 32 bits so an overflowing product or sum fails the range check
//! instead of wrapping.

use crate::consts::{point, CLASS_POINT};
use crate::error::{success, PrimitiveError};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::memory;

/// Floored quotient, rounding toward negative infinity.
fn floor_div(receiver: i32, argument: i32) -> i32 {
    let quotient = receiver / argument;
    if receiver % argument != 0 && (receiver < 0) != (argument < 0) {
        quotient - 1
    } else {
        quotient
    }
}

/// Floored remainder; the sign follows the divisor.
fn floor_mod(receiver: i32, argument: i32) -> i32 {
    receiver - floor_div(receiver, argument) * argument
}

impl<H> Interpreter<H>
where
    H: Host,
{
    pub(crate) fn dispatch_integer_primitives(
        &mut self,
        index: u8,
    ) -> Result<(), PrimitiveError> {
        match index {
            1 => self.primitive_add(),
            2 => self.primitive_subtract(),
            3 => self.primitive_less_than(),
            4 => self.primitive_greater_than(),
            5 => self.primitive_less_or_equal(),
            6 => self.primitive_greater_or_equal(),
            7 => self.primitive_equal(),
            8 => self.primitive_not_equal(),
            9 => self.primitive_multiply(),
            10 => self.primitive_divide(),
            11 => self.primitive_mod(),
            12 => self.primitive_div(),
            13 => self.primitive_quo(),
            14 => self.primitive_bit_and(),
            15 => self.primitive_bit_or(),
            16 => self.primitive_bit_xor(),
            17 => self.primitive_bit_shift(),
            18 => self.primitive_make_point(),
            _ => Err(PrimitiveError::Failed),
        }
    }

    fn binary_integer_arguments(&mut self) -> Result<(i32, i32), PrimitiveError> {
        let argument = self.pop_integer()?;
        let receiver = self.pop_integer()?;
        Ok((receiver.into(), argument.into()))
    }

    fn arithmetic(
        &mut self,
        op: impl FnOnce(i32, i32) -> i32,
    ) -> Result<(), PrimitiveError> {
        let (receiver, argument) = self.binary_integer_arguments()?;
        self.push_integer(op(receiver, argument))
    }

    fn comparison(
        &mut self,
        op: impl FnOnce(i32, i32) -> bool,
    ) -> Result<(), PrimitiveError> {
        let (receiver, argument) = self.binary_integer_arguments()?;
        self.push_boolean(op(receiver, argument))
    }

    pub(crate) fn primitive_add(&mut self) -> Result<(), PrimitiveError> {
        self.arithmetic(|r, a| r + a)
    }

    pub(crate) fn primitive_subtract(&mut self) -> Result<(), PrimitiveError> {
        self.arithmetic(|r, a| r - a)
    }

    pub(crate) fn primitive_multiply(&mut self) -> Result<(), PrimitiveError> {
        self.arithmetic(|r, a| r * a)
    }

    pub(crate) fn primitive_less_than(&mut self) -> Result<(), PrimitiveError> {
        self.comparison(|r, a| r < a)
    }

    pub(crate) fn primitive_greater_than(&mut self) -> Result<(), PrimitiveError> {
        self.comparison(|r, a| r > a)
    }

    pub(crate) fn primitive_less_or_equal(&mut self) -> Result<(), PrimitiveError> {
        self.comparison(|r, a| r <= a)
    }

    pub(crate) fn primitive_greater_or_equal(&mut self) -> Result<(), PrimitiveError> {
        self.comparison(|r, a| r >= a)
    }

    pub(crate) fn primitive_equal(&mut self) -> Result<(), PrimitiveError> {
        self.comparison(|r, a| r == a)
    }

    pub(crate) fn primitive_not_equal(&mut self) -> Result<(), PrimitiveError> {
        self.comparison(|r, a| r != a)
    }

    /// `/` answers only exact quotients.
    pub(crate) fn primitive_divide(&mut self) -> Result<(), PrimitiveError> {
        let (receiver, argument) = self.binary_integer_arguments()?;
        success(argument != 0)?;
        success(receiver % argument == 0)?;
        self.push_integer(receiver / argument)
    }

    /// `\\` with the floored convention: the result takes the divisor's
    /// sign.
    pub(crate) fn primitive_mod(&mut self) -> Result<(), PrimitiveError> {
        let (receiver, argument) = self.binary_integer_arguments()?;
        success(argument != 0)?;
        self.push_integer(floor_mod(receiver, argument))
    }

    /// `//` rounds the quotient toward negative infinity.
    pub(crate) fn primitive_div(&mut self) -> Result<(), PrimitiveError> {
        let (receiver, argument) = self.binary_integer_arguments()?;
        success(argument != 0)?;
        self.push_integer(floor_div(receiver, argument))
    }

    /// `quo:` truncates toward zero.
    pub(crate) fn primitive_quo(&mut self) -> Result<(), PrimitiveError> {
        let (receiver, argument) = self.binary_integer_arguments()?;
        success(argument != 0)?;
        self.push_integer(receiver / argument)
    }

    pub(crate) fn primitive_bit_and(&mut self) -> Result<(), PrimitiveError> {
        self.arithmetic(|r, a| r & a)
    }

    pub(crate) fn primitive_bit_or(&mut self) -> Result<(), PrimitiveError> {
        self.arithmetic(|r, a| r | a)
    }

    pub(crate) fn primitive_bit_xor(&mut self) -> Result<(), PrimitiveError> {
        self.arithmetic(|r, a| r ^ a)
    }

    /// Negative offsets shift right with sign extension, as the image's
    /// hashed collections silently depend on.
    pub(crate) fn primitive_bit_shift(&mut self) -> Result<(), PrimitiveError> {
        let (receiver, argument) = self.binary_integer_arguments()?;
        let result = if argument >= 0 {
            success(argument <= 15)?;
            receiver << argument
        } else {
            success(argument >= -15)?;
            receiver >> (-argument)
        };
        self.push_integer(result)
    }

    /// `@` allocates a Point of the two immediates.
    pub(crate) fn primitive_make_point(&mut self) -> Result<(), PrimitiveError> {
        let argument = self.pop_stack()?;
        let receiver = self.pop_stack()?;
        success(memory::is_integer(argument))?;
        success(memory::is_integer(receiver))?;
        let result = self
            .memory
            .instantiate_with_pointers(CLASS_POINT, point::SIZE)?;
        self.memory.store_pointer(point::X, result, receiver)?;
        self.memory.store_pointer(point::Y, result, argument)?;
        self.push(result)?;
        Ok(())
    }
}
