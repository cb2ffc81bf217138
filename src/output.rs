use std::cell::RefCell;
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::console::Console;
use crate::memory::Register;
use crate::runtime::RunState;

#[macro_export]
macro_rules! dprintln {
    ( $cond:expr ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        $crate::output::Output::Diagnostic($cond).print_str("\n");
    }};
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        $crate::output::Output::Diagnostic($cond).print_str(&s);
    }};
    // Trigger type error if missing condition
    ( $fmt:literal $($tt:tt)* ) => {{
        $crate::output::Output::Diagnostic($fmt);
    }};
}

/// Where text is sent.
///
/// Program output goes to stdout untouched; everything the host says goes to stderr, so stdout
/// can be piped or compared byte-for-byte.
#[derive(Clone, Copy, Debug)]
pub enum Output {
    Normal,
    Diagnostic(Condition),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    /// Printed even with `--minimal` (without color).
    Always,
    /// Suppressed with `--minimal`.
    Sometimes,
}

#[allow(unused)]
#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl Output {
    thread_local! {
        static IS_LINE_START: RefCell<bool> = const { RefCell::new(true) };
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_line_start(new_value: bool) -> bool {
        Self::IS_LINE_START.with(|value| value.replace(new_value))
    }
    /// Private. Use [`Output::start_new_line`].
    fn is_line_start() -> bool {
        Self::IS_LINE_START.with(|value| *value.borrow())
    }
    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    fn set_line_start_from_str(string: &str) {
        let last = Decolored::new(string).last();
        if let Some(ch) = last {
            Output::set_line_start(ch == '\n');
        }
    }

    /// Write a single raw byte, flushing immediately so output keeps program order.
    pub fn print_byte(&self, byte: u8) -> io::Result<()> {
        match self {
            Self::Normal => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(&[byte])?;
                stdout.flush()?;
            }
            Self::Diagnostic(_) => {
                let mut stderr = io::stderr().lock();
                stderr.write_all(&[byte])?;
                stderr.flush()?;
            }
        }
        Output::set_line_start(byte == b'\n');
        Ok(())
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Normal => {
                print!("{}", string);
                Self::set_line_start_from_str(string);
            }

            Self::Diagnostic(condition) => match (Self::is_minimal(), *condition) {
                (false, _) => {
                    eprint!("{}", ColoredString::from(string).blue());
                    Self::set_line_start_from_str(string);
                }
                // Always remove color if `--minimal`
                (true, Condition::Always) => {
                    eprint_colorless(string);
                    Self::set_line_start_from_str(string);
                }
                (true, Condition::Sometimes) => (),
            },
        }
    }

    /// Break the current line if program output left it unfinished.
    ///
    /// Only matters when stdout and stderr share a terminal.
    pub fn start_new_line(&self) {
        if Self::is_line_start() {
            return;
        }
        if io::stdout().is_terminal() && io::stderr().is_terminal() {
            eprintln!();
        }
        Self::set_line_start(true);
    }

    pub fn print_registers<C: Console>(&self, state: &RunState<C>) {
        if Self::is_minimal() {
            for reg in Register::all() {
                self.print_str(&format!("{} {}\n", reg, state.reg(reg)));
            }
            self.print_str(&format!("PC {}\n", state.pc()));
            self.print_str(&format!("SP {}\n", state.stack().len()));
            return;
        }

        self.print_str("\x1b[2m┌────────────────────────────────────┐\x1b[0m\n");
        self.print_str(
            "\x1b[2m│        \x1b[3mhex     int    char\x1b[0m\x1b[2m         │\x1b[0m\n",
        );
        for reg in Register::all() {
            self.print_str("\x1b[2m│\x1b[0m");
            self.print_str(&format!(" \x1b[1m{}\x1b[0m  ", reg));
            self.print_integer(state.reg(reg));
            self.print_str("       \x1b[2m│\x1b[0m\n");
        }
        self.print_str("\x1b[2m│\x1b[0m");
        self.print_str(&format!(" \x1b[1mPC\x1b[0m  0x{:04x}", state.pc()));
        self.print_str("       ");
        self.print_str(&format!(" \x1b[1mSP\x1b[0m  {:<10}", state.stack().len()));
        self.print_str(" \x1b[2m│\x1b[0m\n");
        self.print_str("\x1b[2m└────────────────────────────────────┘\x1b[0m\n");
    }

    pub fn print_integer(&self, value: u16) {
        if Self::is_minimal() {
            self.print_str(&format!("{}", value));
            return;
        }
        self.print_str(&format!("0x{:04x}  ", value));
        self.print_str(&format!("{:6}", value));
        self.print_char_display(value);
    }

    fn print_char_display(&self, value: u16) {
        debug_assert!(
            !Self::is_minimal(),
            "`print_char_display` should not be called if `--minimal`"
        );
        self.print_str("   ");
        // Print 3 characters
        match value {
            // ASCII control characters which are arbitrarily considered significant
            0x00 => self.print_str("NUL"),
            0x08 => self.print_str("BS "),
            0x09 => self.print_str("HT "),
            0x0a => self.print_str("LF "),
            0x0b => self.print_str("VT "),
            0x0c => self.print_str("FF "),
            0x0d => self.print_str("CR "),
            0x1b => self.print_str("ESC"),
            0x7f => self.print_str("DEL"),

            // Space
            0x20 => self.print_str("[_]"),

            // Printable ASCII characters
            0x21..=0x7e => self.print_str(&format!("{:<3}", value as u8 as char)),

            // Any ASCII character not already matched (unimportant control characters)
            0x00..=0x7f => self.print_str("\x1b[2m───\x1b[0m"),
            // Any non-ASCII character
            0x0080.. => self.print_str("\x1b[2m┄┄┄\x1b[0m"),
        }
    }
}

/// Print a host status line, eg. `     Running image.bin`.
pub fn message(color: MsgColor, left: &str, right: impl fmt::Display) {
    Output::Diagnostic(Condition::Always).start_new_line();
    if Output::is_minimal() {
        eprintln!("{left:>12} {right}");
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    eprintln!("{left:>12} {right}");
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn eprint_colorless(string: &str) {
    for ch in Decolored::new(string) {
        eprint!("{}", ch);
    }
}
