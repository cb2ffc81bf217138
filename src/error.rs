use std::{io, path::PathBuf};

use miette::Diagnostic;
use thiserror::Error;

// Runtime errors

/// Reason a run stopped abnormally.
///
/// Every kind is fatal: the engine does not recover from any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum FaultKind {
    #[error("operand word {word} is neither a literal nor a register")]
    #[diagnostic(
        code(vm::invalid_operand),
        help("words 0..=32767 are literals and 32768..=32775 name registers R0..R7")
    )]
    InvalidOperand { word: u16 },

    #[error("operand word {word} cannot be written to")]
    #[diagnostic(
        code(vm::invalid_destination),
        help("destination operands must name a register (32768..=32775)")
    )]
    InvalidDestination { word: u16 },

    #[error("popped from an empty stack")]
    #[diagnostic(code(vm::stack_underflow))]
    StackUnderflow,

    #[error("modulo by a zero divisor")]
    #[diagnostic(code(vm::arithmetic_fault))]
    ArithmeticFault,

    #[error("address {address} is outside of memory")]
    #[diagnostic(
        code(vm::invalid_address),
        help("memory spans addresses 0..=32767")
    )]
    InvalidAddress { address: u16 },

    #[error("image holds {words} words, which does not fit in memory")]
    #[diagnostic(
        code(vm::image_too_large),
        help("memory holds at most 32768 words")
    )]
    ImageTooLarge { words: usize },

    #[error("input ended while waiting for a character")]
    #[diagnostic(
        code(vm::input_exhausted),
        help("the program expected more input; provide it on stdin or with `--input`")
    )]
    InputExhausted,

    #[error("console error: {0}")]
    #[diagnostic(code(vm::io))]
    Io(String),
}

impl From<io::Error> for FaultKind {
    fn from(error: io::Error) -> Self {
        FaultKind::Io(error.to_string())
    }
}

/// A fault together with the address of the instruction that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("execution failed at address {pc} (0x{pc:04x})")]
#[diagnostic(code(vm::fault))]
pub struct Fault {
    pub pc: u16,
    #[source]
    #[diagnostic_source]
    pub kind: FaultKind,
}

// Loader errors

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("failed to read image `{}`", path.display())]
    #[diagnostic(code(load::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("image is {len} bytes long, which is not a whole number of 16-bit words")]
    #[diagnostic(
        code(load::odd_length),
        help("images are sequences of little-endian 16-bit words")
    )]
    OddLength { len: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Image(#[from] FaultKind),
}
