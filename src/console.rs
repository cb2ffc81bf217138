use std::collections::VecDeque;
use std::io::{self, IsTerminal, Read};

use ::console::Term;

use crate::memory::Register;
use crate::output::Output;

/// Byte-level channel between a running program and its operator.
///
/// The runtime calls [`Console::write_byte`] for every `OUT` and [`Console::read_byte`] for
/// every `IN`, and never buffers or reorders either.
pub trait Console {
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Block until one byte is available. `None` indicates EOF.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Register write requested out-of-band by instrumentation, if any.
    ///
    /// Polled by [`RunState::run_limited`](crate::RunState::run_limited) between instructions,
    /// until it returns `None`.
    fn take_patch(&mut self) -> Option<Patch> {
        None
    }
}

impl<C: Console + ?Sized> Console for Box<C> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }
    fn take_patch(&mut self) -> Option<Patch> {
        (**self).take_patch()
    }
}

/// Direct register write, applied between two instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Patch {
    pub register: Register,
    pub value: u16,
}

/// Ctrl-D, as delivered by a terminal in raw mode.
const END_OF_TRANSMISSION: char = '\u{4}';

/// Process stdout and stdin.
///
/// When both are terminals, input is read a line at a time with echo and backspace (the newline
/// is delivered as byte 10, so an empty line is a single byte 10). Ctrl-D or a closed terminal
/// ends input; text typed on the same line before Ctrl-D is still delivered, without a newline.
/// Otherwise stdin is read a byte at a time until EOF.
pub struct Terminal {
    /// Scripted input, consumed before stdin.
    pending: VecDeque<u8>,
    interactive: bool,
    /// Input has ended; stdin is not read again
    closed: bool,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            // Line editing draws on stdout, and gives up if stdout is redirected
            interactive: io::stdin().is_terminal() && Term::stdout().is_term(),
            closed: false,
        }
    }

    /// Queue bytes to be read before anything from stdin.
    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.pending.extend(input.as_ref());
    }

    fn read_line(&mut self) -> io::Result<()> {
        let line = match Term::stdout().read_line() {
            Ok(line) => line,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                self.closed = true;
                return Ok(());
            }
            Err(error) => return Err(error),
        };
        // User has pressed enter
        Output::set_line_start(true);
        self.queue_line(&line);
        Ok(())
    }

    /// Queue one line typed at the terminal.
    fn queue_line(&mut self, line: &str) {
        match line.split_once(END_OF_TRANSMISSION) {
            Some((before, _)) => {
                self.pending.extend(before.as_bytes());
                self.closed = true;
            }
            None => {
                self.pending.extend(line.as_bytes());
                self.pending.push_back(b'\n');
            }
        }
    }
}

impl Console for Terminal {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        Output::Normal.print_byte(byte)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pending.pop_front() {
            return Ok(Some(byte));
        }
        if self.closed {
            return Ok(None);
        }
        if self.interactive {
            self.read_line()?;
            return Ok(self.pending.pop_front());
        }
        let mut buf = [0; 1];
        let bytes_read = io::stdin().read(&mut buf)?;
        if bytes_read == 0 {
            self.closed = true;
            return Ok(None);
        }
        Ok(Some(buf[0]))
    }
}

/// In-memory console with scripted input and captured output.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        let mut console = Self::new();
        console.push_input(input);
        console
    }

    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Bytes not yet read by the program.
    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }
}

impl Console for BufferConsole {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_console_reads_in_order() {
        let mut console = BufferConsole::with_input("ab");
        console.push_input([b'c']);
        assert_eq!(console.read_byte().unwrap(), Some(b'a'));
        assert_eq!(console.remaining_input(), 2);
        assert_eq!(console.read_byte().unwrap(), Some(b'b'));
        assert_eq!(console.read_byte().unwrap(), Some(b'c'));
        assert_eq!(console.read_byte().unwrap(), None);
    }

    #[test]
    fn buffer_console_captures_output() {
        let mut console = BufferConsole::new();
        for byte in b"hi\n" {
            console.write_byte(*byte).unwrap();
        }
        assert_eq!(console.output(), b"hi\n");
        assert_eq!(console.output_lossy(), "hi\n");
        assert_eq!(console.take_patch(), None);
    }

    #[test]
    fn boxed_console_forwards() {
        let mut console: Box<dyn Console> = Box::new(BufferConsole::with_input("x"));
        assert_eq!(console.read_byte().unwrap(), Some(b'x'));
        assert_eq!(console.read_byte().unwrap(), None);
    }

    #[test]
    fn terminal_prefers_scripted_input() {
        let mut terminal = Terminal::new();
        terminal.push_input("go\n");
        assert_eq!(terminal.read_byte().unwrap(), Some(b'g'));
        assert_eq!(terminal.read_byte().unwrap(), Some(b'o'));
        assert_eq!(terminal.read_byte().unwrap(), Some(b'\n'));
    }

    #[test]
    fn terminal_lines_end_with_newline() {
        let mut terminal = Terminal::new();
        terminal.queue_line("ab");
        terminal.queue_line("");
        for expected in [b'a', b'b', b'\n', b'\n'] {
            assert_eq!(terminal.read_byte().unwrap(), Some(expected));
        }
    }

    #[test]
    fn terminal_ctrl_d_ends_input() {
        let mut terminal = Terminal::new();
        terminal.queue_line("\u{4}");
        assert_eq!(terminal.read_byte().unwrap(), None);
        assert_eq!(terminal.read_byte().unwrap(), None);

        let mut terminal = Terminal::new();
        terminal.queue_line("hi\u{4}ignored");
        assert_eq!(terminal.read_byte().unwrap(), Some(b'h'));
        assert_eq!(terminal.read_byte().unwrap(), Some(b'i'));
        assert_eq!(terminal.read_byte().unwrap(), None);
    }
}
