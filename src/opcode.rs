use std::fmt;

/// Instruction set, indexed by opcode word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Opcode {
    Halt = 0,
    Set = 1,
    Push = 2,
    Pop = 3,
    Eq = 4,
    Gt = 5,
    Jmp = 6,
    Jt = 7,
    Jf = 8,
    Add = 9,
    Mult = 10,
    Mod = 11,
    And = 12,
    Or = 13,
    Not = 14,
    Rmem = 15,
    Wmem = 16,
    Call = 17,
    Ret = 18,
    Out = 19,
    In = 20,
    Noop = 21,
}

impl Opcode {
    pub const COUNT: usize = 22;

    #[rustfmt::skip]
    const ALL: [Opcode; Self::COUNT] = [
        Opcode::Halt, Opcode::Set,  Opcode::Push, Opcode::Pop,  Opcode::Eq,   Opcode::Gt,
        Opcode::Jmp,  Opcode::Jt,   Opcode::Jf,   Opcode::Add,  Opcode::Mult, Opcode::Mod,
        Opcode::And,  Opcode::Or,   Opcode::Not,  Opcode::Rmem, Opcode::Wmem, Opcode::Call,
        Opcode::Ret,  Opcode::Out,  Opcode::In,   Opcode::Noop,
    ];

    /// `None` for words outside of the instruction set.
    pub fn from_word(word: u16) -> Option<Self> {
        Self::ALL.get(word as usize).copied()
    }

    /// Amount of operand words following the opcode word.
    pub fn operand_count(self) -> u16 {
        match self {
            Opcode::Halt | Opcode::Ret | Opcode::Noop => 0,
            Opcode::Push | Opcode::Pop | Opcode::Jmp | Opcode::Call | Opcode::Out | Opcode::In => 1,
            Opcode::Set | Opcode::Jt | Opcode::Jf | Opcode::Not | Opcode::Rmem | Opcode::Wmem => 2,
            Opcode::Eq
            | Opcode::Gt
            | Opcode::Add
            | Opcode::Mult
            | Opcode::Mod
            | Opcode::And
            | Opcode::Or => 3,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Halt => "HALT",
            Opcode::Set => "SET",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Eq => "EQ",
            Opcode::Gt => "GT",
            Opcode::Jmp => "JMP",
            Opcode::Jt => "JT",
            Opcode::Jf => "JF",
            Opcode::Add => "ADD",
            Opcode::Mult => "MULT",
            Opcode::Mod => "MOD",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Rmem => "RMEM",
            Opcode::Wmem => "WMEM",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Out => "OUT",
            Opcode::In => "IN",
            Opcode::Noop => "NOOP",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}
