use std::fmt;

use crate::error::FaultKind;

/// Amount of addressable 16-bit cells.
pub const MEMORY_SIZE: usize = 0x8000;
/// Amount of general-purpose registers.
pub const REGISTER_COUNT: usize = 8;
/// Largest value a register (or any resolved value) can hold.
pub const MAX_VALUE: u16 = 0x7FFF;

/// Index of one of the eight general-purpose registers.
///
/// Can only be constructed for indices `0..8`, so register access never needs a bounds check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(u8);

impl Register {
    pub fn new(index: u8) -> Option<Self> {
        if (index as usize) < REGISTER_COUNT {
            Some(Register(index))
        } else {
            None
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Register> {
        (0..REGISTER_COUNT as u8).map(Register)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Program memory and register file.
///
/// Performs no interpretation of the stored words; callers pass already-resolved addresses.
pub struct AddressSpace {
    /// 32768 cells, 64KB in size.
    mem: Box<[u16; MEMORY_SIZE]>,
    /// 8x 15-bit registers
    reg: [u16; REGISTER_COUNT],
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace {
    /// Zeroed memory and registers.
    pub fn new() -> Self {
        AddressSpace {
            mem: Box::new([0; MEMORY_SIZE]),
            reg: [0; REGISTER_COUNT],
        }
    }

    /// Fill memory from address 0 with `words`. Cells past the image are left zeroed.
    pub fn load(&mut self, words: &[u16]) -> Result<(), FaultKind> {
        if words.len() > MEMORY_SIZE {
            return Err(FaultKind::ImageTooLarge { words: words.len() });
        }
        self.mem[..words.len()].copy_from_slice(words);
        self.mem[words.len()..].fill(0);
        Ok(())
    }

    /// Shorthand for a fresh address space holding `words`.
    pub fn from_image(words: &[u16]) -> Result<Self, FaultKind> {
        let mut space = Self::new();
        space.load(words)?;
        Ok(space)
    }

    pub fn read_memory(&self, addr: u16) -> Result<u16, FaultKind> {
        self.mem
            .get(addr as usize)
            .copied()
            .ok_or(FaultKind::InvalidAddress { address: addr })
    }

    pub fn write_memory(&mut self, addr: u16, value: u16) -> Result<(), FaultKind> {
        let cell = self
            .mem
            .get_mut(addr as usize)
            .ok_or(FaultKind::InvalidAddress { address: addr })?;
        *cell = value;
        Ok(())
    }

    #[inline]
    pub fn read_register(&self, reg: Register) -> u16 {
        self.reg[reg.0 as usize]
    }

    #[inline]
    pub fn write_register(&mut self, reg: Register, value: u16) {
        self.reg[reg.0 as usize] = value;
    }

    pub fn registers(&self) -> &[u16; REGISTER_COUNT] {
        &self.reg
    }

    pub fn memory(&self) -> &[u16] {
        &self.mem[..]
    }
}
