//! Optional instrumentation layered over a [`Console`].
//!
//! Neither hook changes how instructions execute; they only observe or rewrite the byte streams
//! a program sees, and request register writes between instructions through
//! [`Console::take_patch`].

use std::collections::VecDeque;
use std::io;

use crate::console::{Console, Patch};
use crate::dprintln;
use crate::memory::{Register, MAX_VALUE};

/// Lets the operator set a register directly from the input stream.
///
/// When the sentinel byte is read, the rest of the line is parsed as a decimal integer and
/// queued as a [`Patch`]; the program never sees the sentinel or the number.
///
/// Patches are handed out in the order they were read. Only [`RunState::run_limited`] applies
/// them on its own; hosts calling [`RunState::step`] must call [`RunState::apply_patches`].
///
/// [`RunState::run_limited`]: crate::RunState::run_limited
/// [`RunState::step`]: crate::RunState::step
/// [`RunState::apply_patches`]: crate::RunState::apply_patches
pub struct RegisterPatch<C> {
    inner: C,
    sentinel: u8,
    register: Register,
    pending: VecDeque<Patch>,
}

impl<C: Console> RegisterPatch<C> {
    pub fn new(inner: C, sentinel: u8, register: Register) -> Self {
        Self {
            inner,
            sentinel,
            register,
            pending: VecDeque::new(),
        }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        while let Some(byte) = self.inner.read_byte()? {
            if byte == b'\n' {
                break;
            }
            line.push(byte);
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

impl<C: Console> Console for RegisterPatch<C> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.inner.write_byte(byte)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            let Some(byte) = self.inner.read_byte()? else {
                return Ok(None);
            };
            if byte != self.sentinel {
                return Ok(Some(byte));
            }
            let line = self.read_line()?;
            match line.trim().parse::<u32>() {
                Ok(value) => {
                    self.pending.push_back(Patch {
                        register: self.register,
                        value: (value % (MAX_VALUE as u32 + 1)) as u16,
                    });
                }
                Err(_) => {
                    dprintln!(
                        Always,
                        "Ignoring malformed value `{}` for {}",
                        line.trim(),
                        self.register
                    );
                }
            }
        }
    }

    fn take_patch(&mut self) -> Option<Patch> {
        self.pending
            .pop_front()
            .or_else(|| self.inner.take_patch())
    }
}

/// Reports whenever program output ends with one of the watched strings.
pub struct OutputWatch<C> {
    inner: C,
    patterns: Vec<String>,
    /// Most recent output, at most as long as the longest pattern.
    tail: Vec<u8>,
    matches: Vec<String>,
}

impl<C: Console> OutputWatch<C> {
    pub fn new(inner: C, patterns: impl IntoIterator<Item = String>) -> Self {
        let patterns: Vec<String> = patterns
            .into_iter()
            .filter(|pattern| !pattern.is_empty())
            .collect();
        Self {
            inner,
            patterns,
            tail: Vec::new(),
            matches: Vec::new(),
        }
    }

    /// Watched strings seen so far, in order of appearance.
    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn capacity(&self) -> usize {
        self.patterns.iter().map(String::len).max().unwrap_or(0)
    }
}

impl<C: Console> Console for OutputWatch<C> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.inner.write_byte(byte)?;

        let capacity = self.capacity();
        if capacity == 0 {
            return Ok(());
        }
        self.tail.push(byte);
        if self.tail.len() > capacity {
            let excess = self.tail.len() - capacity;
            self.tail.drain(..excess);
        }
        for pattern in &self.patterns {
            if self.tail.ends_with(pattern.as_bytes()) {
                dprintln!(Sometimes, "\nMatched `{}`", pattern);
                self.matches.push(pattern.clone());
            }
        }
        Ok(())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.inner.read_byte()
    }

    fn take_patch(&mut self) -> Option<Patch> {
        self.inner.take_patch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use crate::operand::REGISTER_BASE;
    use crate::runtime::{Exit, RunState};

    fn r7() -> Register {
        Register::new(7).unwrap()
    }

    #[test]
    fn patch_is_hidden_from_program() {
        let mut console = RegisterPatch::new(BufferConsole::with_input("a$123\nb"), b'$', r7());
        assert_eq!(console.read_byte().unwrap(), Some(b'a'));
        assert_eq!(console.take_patch(), None);
        assert_eq!(console.read_byte().unwrap(), Some(b'b'));
        assert_eq!(
            console.take_patch(),
            Some(Patch {
                register: r7(),
                value: 123
            })
        );
        assert_eq!(console.take_patch(), None);
        assert_eq!(console.read_byte().unwrap(), None);
    }

    #[test]
    fn patch_value_wraps() {
        let mut console = RegisterPatch::new(BufferConsole::with_input("$32769\nx"), b'$', r7());
        assert_eq!(console.read_byte().unwrap(), Some(b'x'));
        assert_eq!(console.take_patch().map(|patch| patch.value), Some(1));
    }

    #[test]
    fn malformed_patch_is_ignored() {
        let mut console = RegisterPatch::new(BufferConsole::with_input("$abc\nx"), b'$', r7());
        assert_eq!(console.read_byte().unwrap(), Some(b'x'));
        assert_eq!(console.take_patch(), None);
    }

    #[test]
    fn consecutive_patches_are_all_kept() {
        let mut console =
            RegisterPatch::new(BufferConsole::with_input("$1\n$2\nx"), b'$', r7());
        assert_eq!(console.read_byte().unwrap(), Some(b'x'));
        assert_eq!(console.take_patch().map(|patch| patch.value), Some(1));
        assert_eq!(console.take_patch().map(|patch| patch.value), Some(2));
        assert_eq!(console.take_patch(), None);
    }

    #[test]
    fn step_leaves_patches_to_the_host() {
        // IN R0; HALT
        let program = [20, REGISTER_BASE, 0];
        let console = RegisterPatch::new(BufferConsole::with_input("$4\n$9\nq"), b'$', r7());
        let mut state = RunState::from_raw(&program, console).unwrap();
        state.step().unwrap();
        assert_eq!(state.reg(r7()), 0);
        state.apply_patches();
        assert_eq!(state.reg(r7()), 9);
        assert_eq!(state.console_mut().take_patch(), None);
    }

    #[test]
    fn patch_applies_between_instructions() {
        // IN R0; ADD R1 R7 '0'; OUT R1; HALT
        let program = [20, REGISTER_BASE, 9, REGISTER_BASE + 1, REGISTER_BASE + 7, b'0' as u16, 19, REGISTER_BASE + 1, 0];
        let console = RegisterPatch::new(BufferConsole::with_input("$5\nq"), b'$', r7());
        let mut state = RunState::from_raw(&program, console).unwrap();
        assert_eq!(state.run(), Ok(Exit::Halted));
        assert_eq!(state.reg(Register::new(0).unwrap()), b'q' as u16);
        assert_eq!(state.reg(r7()), 5);
        assert_eq!(state.into_console().into_inner().output(), b"5");
    }

    #[test]
    fn watch_sees_split_writes() {
        let mut console = OutputWatch::new(
            BufferConsole::new(),
            ["code".to_string(), "de!".to_string(), String::new()],
        );
        for byte in b"a code! and code" {
            console.write_byte(*byte).unwrap();
        }
        assert_eq!(console.matches(), &["code", "de!", "code"]);
        assert_eq!(console.into_inner().output(), b"a code! and code");
    }

    #[test]
    fn watch_without_patterns_forwards() {
        let mut console = OutputWatch::new(BufferConsole::with_input("i"), Vec::new());
        console.write_byte(b'o').unwrap();
        assert_eq!(console.read_byte().unwrap(), Some(b'i'));
        assert!(console.matches().is_empty());
        assert_eq!(console.into_inner().output(), b"o");
    }
}
