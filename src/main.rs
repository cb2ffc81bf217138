use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::Colorize;
use miette::{bail, Result};

use synvm::hooks::{OutputWatch, RegisterPatch};
use synvm::output::{message, MsgColor, Output};
use synvm::{loader, AddressSpace, Console, Exit, Register, RunState, Terminal};

/// Synvm loads 15-bit word program images and runs them on a small virtual machine.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide an image file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a binary image and connect it to the terminal
    Run {
        /// Image file to run
        name: PathBuf,
        #[command(flatten)]
        opts: RunOptions,
    },
    /// Check that an image file loads, without running it
    Check {
        /// Image file to check
        name: PathBuf,
    },
}

#[derive(ClapArgs, Default)]
struct RunOptions {
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
    /// Print every instruction before it executes
    #[arg(short, long)]
    trace: bool,
    /// Stop after this many instructions
    #[arg(short, long, value_name = "COUNT")]
    step_limit: Option<u64>,
    /// Feed this text to the program before reading stdin
    #[arg(short, long, value_name = "TEXT")]
    input: Option<String>,
    /// Print registers when the program stops
    #[arg(short, long)]
    dump: bool,
    /// Input character which introduces a register value instead of program input
    #[arg(long, value_name = "CHAR")]
    patch_sentinel: Option<char>,
    /// Register set by `--patch-sentinel`
    #[arg(long, value_name = "INDEX", default_value_t = 7,
          value_parser = clap::value_parser!(u8).range(0..8))]
    patch_register: u8,
    /// Report whenever program output contains this text (repeatable)
    #[arg(short, long, value_name = "TEXT")]
    watch: Vec<String>,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    synvm::env::init();

    if let Some(command) = args.command {
        match command {
            Command::Run { name, opts } => run(&name, opts),
            Command::Check { name } => {
                file_message(MsgColor::Green, "Checking", &name);
                let words = loader::read_image(&name)?;
                AddressSpace::from_image(&words)?;
                message(
                    MsgColor::Green,
                    "Success",
                    format!("{} words, no errors found!", words.len()),
                );
                Ok(())
            }
        }
    } else if let Some(path) = args.path {
        run(&path, RunOptions::default())
    } else {
        println!("\n~ synvm v{VERSION} ~");
        println!("{}", LOGO.truecolor(255, 183, 197).bold());
        println!("{SHORT_INFO}");
        std::process::exit(0);
    }
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    message(color, left, format!("target {}", right.display()));
}

fn run(name: &Path, opts: RunOptions) -> Result<()> {
    Output::set_minimal(opts.minimal);

    file_message(MsgColor::Green, "Loading", name);
    let space = loader::load_file(name)?;

    let mut terminal = Terminal::new();
    if let Some(input) = &opts.input {
        terminal.push_input(input);
    }
    let mut console: Box<dyn Console> = Box::new(terminal);
    if let Some(sentinel) = opts.patch_sentinel {
        if !sentinel.is_ascii() {
            bail!("Patch sentinel must be an ASCII character, found `{sentinel}`");
        }
        let Some(register) = Register::new(opts.patch_register) else {
            bail!("No register with index {}", opts.patch_register);
        };
        console = Box::new(RegisterPatch::new(console, sentinel as u8, register));
    }
    if !opts.watch.is_empty() {
        console = Box::new(OutputWatch::new(console, opts.watch));
    }

    let mut program = RunState::new(space, console);
    program.set_trace(opts.trace || synvm::env::is_trace_enabled());
    let limit = opts.step_limit.or_else(synvm::env::step_limit);

    message(MsgColor::Green, "Running", "loaded image");
    let result = program.run_limited(limit);
    Output::Normal.start_new_line();

    if opts.dump {
        Output::Diagnostic(synvm::output::Condition::Always).print_registers(&program);
    }
    match result? {
        Exit::Halted => message(MsgColor::Cyan, "Halted", ""),
        Exit::Returned => message(MsgColor::Cyan, "Returned", "with an empty stack"),
        Exit::StepLimit => message(
            MsgColor::Cyan,
            "Stopped",
            format!("after {} instructions", program.steps()),
        ),
    }

    file_message(MsgColor::Green, "Completed", name);
    Ok(())
}

const LOGO: &str = r#"

  ___ _   _ _ ____   ___ __ ___
 / __| | | | '_ \ \ / / '_ ` _ \
 \__ \ |_| | | | \ V /| | | | | |
 |___/\__, |_| |_|\_/ |_| |_| |_|
      |___/                      "#;

const SHORT_INFO: &str = r"
Welcome to synvm, a loader and interpreter for 15-bit word program images.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
