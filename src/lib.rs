// Storage
mod memory;
pub use memory::{AddressSpace, Register, MAX_VALUE, MEMORY_SIZE, REGISTER_COUNT};

// Decoding
mod opcode;
pub use opcode::Opcode;
mod operand;
pub use operand::{Operand, INVALID_BASE, REGISTER_BASE};

// Running
mod runtime;
pub use runtime::{Exit, Flow, RunState};
mod console;
pub use self::console::{BufferConsole, Console, Patch, Terminal};
pub mod hooks;
pub mod loader;

mod error;
pub use error::{Fault, FaultKind, LoadError};

#[macro_use]
pub mod output;

pub mod env;
