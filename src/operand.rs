use crate::memory::{Register, REGISTER_COUNT};

/// First word that names a register rather than a literal.
pub const REGISTER_BASE: u16 = 0x8000;
/// First word that is neither a literal nor a register.
pub const INVALID_BASE: u16 = REGISTER_BASE + REGISTER_COUNT as u16;

/// Meaning of a raw operand word from the instruction stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// `0..=32767`
    Literal(u16),
    /// `32768..=32775`
    Register(Register),
    /// `32776..`
    Invalid(u16),
}

impl Operand {
    pub fn decode(word: u16) -> Self {
        if word < REGISTER_BASE {
            return Operand::Literal(word);
        }
        if word >= INVALID_BASE {
            return Operand::Invalid(word);
        }
        match Register::new((word - REGISTER_BASE) as u8) {
            Some(reg) => Operand::Register(reg),
            None => Operand::Invalid(word),
        }
    }

    /// Inverse of [`Operand::decode`].
    pub fn encode(self) -> u16 {
        match self {
            Operand::Literal(value) => value,
            Operand::Register(reg) => REGISTER_BASE + reg.index() as u16,
            Operand::Invalid(word) => word,
        }
    }
}

impl From<u16> for Operand {
    fn from(word: u16) -> Self {
        Operand::decode(word)
    }
}

impl From<Register> for Operand {
    fn from(reg: Register) -> Self {
        Operand::Register(reg)
    }
}
