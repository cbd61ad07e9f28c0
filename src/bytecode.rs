//! Bytecode representation for the interpreter.
//!
//! The instruction set is the Blue Book's: one dispatch byte, with the
//! extended and long-jump forms consuming one or two trailing bytes that
//! the interpreter fetches itself. Decoding the dispatch byte is total;
//! every value in `0..=255` maps to exactly one variant.

use core::fmt;

/// A literal constant pushed by bytecodes 113..=119.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushedConstant {
    True,
    False,
    Nil,
    MinusOne,
    Zero,
    One,
    Two,
}

/// Decoded dispatch byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bytecode {
    /// 0..=15: push receiver variable.
    PushReceiverVariable(u8),
    /// 16..=31: push temporary location.
    PushTemporary(u8),
    /// 32..=63: push literal constant.
    PushLiteralConstant(u8),
    /// 64..=95: push the value field of a literal Association.
    PushLiteralVariable(u8),
    /// 96..=103: pop and store receiver variable.
    PopIntoReceiverVariable(u8),
    /// 104..=111: pop and store temporary location.
    PopIntoTemporary(u8),
    /// 112: push the receiver.
    PushReceiver,
    /// 113..=119: push a well-known constant.
    PushConstant(PushedConstant),
    /// 120..=123: return receiver/true/false/nil from the message.
    ReturnReceiver,
    ReturnTrue,
    ReturnFalse,
    ReturnNil,
    /// 124: return stack top from the message.
    ReturnStackTop,
    /// 125: return stack top from the block.
    ReturnBlockStackTop,
    /// 128: push described by the following byte (2-bit kind, 6-bit index).
    ExtendedPush,
    /// 129: store described by the following byte.
    ExtendedStore,
    /// 130: store-and-pop described by the following byte.
    ExtendedStoreAndPop,
    /// 131: send; following byte packs argument count and selector index.
    SingleExtendedSend,
    /// 132: send; following two bytes are argument count and selector index.
    DoubleExtendedSend,
    /// 133: as 131, to the superclass.
    SingleExtendedSuper,
    /// 134: as 132, to the superclass.
    DoubleExtendedSuper,
    /// 135: pop stack top.
    PopStack,
    /// 136: duplicate stack top.
    DuplicateTop,
    /// 137: push the active context.
    PushActiveContext,
    /// 144..=151: jump forward `n + 1`.
    ShortJump(u8),
    /// 152..=159: pop; jump forward `n + 1` when false.
    ShortJumpIfFalse(u8),
    /// 160..=167: jump `(n - 4) * 256 +` following byte.
    LongJump(u8),
    /// 168..=171: pop; jump `n * 256 +` following byte when true.
    LongJumpIfTrue(u8),
    /// 172..=175: pop; jump `n * 256 +` following byte when false.
    LongJumpIfFalse(u8),
    /// 176..=191: send an arithmetic special selector.
    SendArithmetic(u8),
    /// 192..=207: send a common special selector.
    SendCommon(u8),
    /// 208..=255: send literal selector with 0, 1 or 2 arguments.
    SendLiteral { selector: u8, arguments: u8 },
    /// 126, 127, 138..=143: not assigned by the instruction set.
    Unused(u8),
}

/// Coarse dispatch category, one per byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum Category {
    Stack,
    Jump,
    Send,
    Return,
    Unused,
}

impl From<u8> for Bytecode {
    fn from(byte: u8) -> Self {
        use Bytecode::*;
        match byte {
            0..=15 => PushReceiverVariable(byte & 0xf),
            16..=31 => PushTemporary(byte & 0xf),
            32..=63 => PushLiteralConstant(byte & 0x1f),
            64..=95 => PushLiteralVariable(byte & 0x1f),
            96..=103 => PopIntoReceiverVariable(byte & 0x7),
            104..=111 => PopIntoTemporary(byte & 0x7),
            112 => PushReceiver,
            113 => PushConstant(PushedConstant::True),
            114 => PushConstant(PushedConstant::False),
            115 => PushConstant(PushedConstant::Nil),
            116 => PushConstant(PushedConstant::MinusOne),
            117 => PushConstant(PushedConstant::Zero),
            118 => PushConstant(PushedConstant::One),
            119 => PushConstant(PushedConstant::Two),
            120 => ReturnReceiver,
            121 => ReturnTrue,
            122 => ReturnFalse,
            123 => ReturnNil,
            124 => ReturnStackTop,
            125 => ReturnBlockStackTop,
            128 => ExtendedPush,
            129 => ExtendedStore,
            130 => ExtendedStoreAndPop,
            131 => SingleExtendedSend,
            132 => DoubleExtendedSend,
            133 => SingleExtendedSuper,
            134 => DoubleExtendedSuper,
            135 => PopStack,
            136 => DuplicateTop,
            137 => PushActiveContext,
            144..=151 => ShortJump(byte & 0x7),
            152..=159 => ShortJumpIfFalse(byte & 0x7),
            160..=167 => LongJump(byte & 0x7),
            168..=171 => LongJumpIfTrue(byte & 0x3),
            172..=175 => LongJumpIfFalse(byte & 0x3),
            176..=191 => SendArithmetic(byte - 176),
            192..=207 => SendCommon(byte - 192),
            208..=255 => SendLiteral {
                selector: byte & 0xf,
                arguments: (byte >> 4) - 13,
            },
            _ => Unused(byte),
        }
    }
}

impl Bytecode {
    /// Dispatch category of the byte.
    pub const fn category(&self) -> Category {
        use Bytecode::*;
        match self {
            PushReceiverVariable(_) | PushTemporary(_) | PushLiteralConstant(_)
            | PushLiteralVariable(_) | PopIntoReceiverVariable(_) | PopIntoTemporary(_)
            | PushReceiver | PushConstant(_) | ExtendedPush | ExtendedStore
            | ExtendedStoreAndPop | PopStack | DuplicateTop | PushActiveContext => Category::Stack,
            ReturnReceiver | ReturnTrue | ReturnFalse | ReturnNil | ReturnStackTop
            | ReturnBlockStackTop => Category::Return,
            SingleExtendedSend | DoubleExtendedSend | SingleExtendedSuper | DoubleExtendedSuper
            | SendArithmetic(_) | SendCommon(_) | SendLiteral { .. } => Category::Send,
            ShortJump(_) | ShortJumpIfFalse(_) | LongJump(_) | LongJumpIfTrue(_)
            | LongJumpIfFalse(_) => Category::Jump,
            Unused(_) => Category::Unused,
        }
    }

    /// Total instruction length in bytes, including trailing operand bytes.
    pub const fn len(&self) -> usize {
        use Bytecode::*;
        match self {
            ExtendedPush | ExtendedStore | ExtendedStoreAndPop | SingleExtendedSend
            | SingleExtendedSuper | LongJump(_) | LongJumpIfTrue(_) | LongJumpIfFalse(_) => 2,
            DoubleExtendedSend | DoubleExtendedSuper => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
