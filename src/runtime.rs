use crate::console::Console;
use crate::dprintln;
use crate::error::{Fault, FaultKind};
use crate::memory::{AddressSpace, Register, MAX_VALUE, MEMORY_SIZE};
use crate::opcode::Opcode;
use crate::operand::Operand;

/// Arithmetic is performed modulo this value.
const MODULUS: u32 = 0x8000;

/// How a run ended without a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// `HALT` was executed.
    Halted,
    /// `RET` was executed with nothing left to return to.
    Returned,
    /// The caller's step budget ran out before the program stopped.
    StepLimit,
}

/// Outcome of a single instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(Exit),
}

type Step = Result<Flow, FaultKind>;

/// Represents complete program state during runtime.
pub struct RunState<C> {
    /// Memory and registers
    space: AddressSpace,
    /// Program counter
    pc: u16,
    /// Shared by `PUSH`/`POP` and `CALL`/`RET`
    stack: Vec<u16>,
    console: C,
    /// Instructions executed so far
    steps: u64,
    /// Set once the program halts or faults; nothing executes after that
    finished: Option<Result<Exit, Fault>>,
    trace: bool,
}

impl<C: Console> RunState<C> {
    /// Start at address 0 with an empty stack.
    pub fn new(space: AddressSpace, console: C) -> Self {
        RunState {
            space,
            pc: 0,
            stack: Vec::new(),
            console,
            steps: 0,
            finished: None,
            trace: false,
        }
    }

    pub fn from_raw(raw: &[u16], console: C) -> Result<Self, FaultKind> {
        Ok(Self::new(AddressSpace::from_image(raw)?, console))
    }

    /// Print every instruction before it executes.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    #[rustfmt::skip]
    const OP_TABLE: [fn(&mut RunState<C>) -> Step; Opcode::COUNT] = [
        Self::halt, // 0
        Self::set,  // 1
        Self::push, // 2
        Self::pop,  // 3
        Self::eq,   // 4
        Self::gt,   // 5
        Self::jmp,  // 6
        Self::jt,   // 7
        Self::jf,   // 8
        Self::add,  // 9
        Self::mult, // 10
        Self::modulo, // 11
        Self::and,  // 12
        Self::or,   // 13
        Self::not,  // 14
        Self::rmem, // 15
        Self::wmem, // 16
        Self::call, // 17
        Self::ret,  // 18
        Self::out,  // 19
        Self::inp,  // 20
        Self::noop, // 21
    ];

    /// Run until the program halts or faults.
    ///
    /// Once the program has stopped, every further call returns the same outcome.
    pub fn run(&mut self) -> Result<Exit, Fault> {
        self.run_limited(None)
    }

    /// Run until the program halts, faults, or `limit` instructions have executed.
    ///
    /// Register patches requested by the console are applied here, after each instruction.
    /// Hosts driving [`RunState::step`] directly must call [`RunState::apply_patches`] themselves.
    pub fn run_limited(&mut self, limit: Option<u64>) -> Result<Exit, Fault> {
        let mut executed = 0u64;
        loop {
            if let Some(outcome) = &self.finished {
                return outcome.clone();
            }
            if limit.is_some_and(|limit| executed >= limit) {
                return Ok(Exit::StepLimit);
            }
            if self.trace {
                self.print_trace();
            }
            let flow = self.step()?;
            executed += 1;
            self.apply_patches();
            if let Flow::Exit(exit) = flow {
                return Ok(exit);
            }
        }
    }

    /// Execute exactly one instruction.
    ///
    /// After a halt or fault, nothing is executed and the final outcome is returned again.
    pub fn step(&mut self) -> Result<Flow, Fault> {
        match &self.finished {
            Some(Ok(exit)) => return Ok(Flow::Exit(*exit)),
            Some(Err(fault)) => return Err(fault.clone()),
            None => (),
        }
        let pc = self.pc;
        match self.dispatch() {
            Ok(flow) => {
                self.steps += 1;
                if let Flow::Exit(exit) = flow {
                    self.finished = Some(Ok(exit));
                }
                Ok(flow)
            }
            Err(kind) => {
                let fault = Fault { pc, kind };
                self.finished = Some(Err(fault.clone()));
                Err(fault)
            }
        }
    }

    /// Whether the program has halted or faulted.
    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    fn dispatch(&mut self) -> Step {
        let word = self.space.read_memory(self.pc)?;
        match Opcode::from_word(word) {
            Some(opcode) => Self::OP_TABLE[opcode as usize](self),
            // Unknown opcodes are skipped
            None => self.advance(0),
        }
    }

    /// Apply every register patch the console has queued.
    pub fn apply_patches(&mut self) {
        while let Some(patch) = self.console.take_patch() {
            let value = patch.value & MAX_VALUE;
            self.space.write_register(patch.register, value);
            dprintln!(Sometimes, "Set {} to {}", patch.register, value);
        }
    }

    fn print_trace(&self) {
        let Ok(word) = self.space.read_memory(self.pc) else {
            return;
        };
        let Some(opcode) = Opcode::from_word(word) else {
            dprintln!(Always, "{:5}  ???? {}", self.pc, word);
            return;
        };
        let mut line = format!("{:5}  {:<4}", self.pc, opcode);
        for i in 1..=opcode.operand_count() {
            let Ok(word) = self.space.read_memory(self.pc.wrapping_add(i)) else {
                break;
            };
            match Operand::decode(word) {
                Operand::Literal(value) => line.push_str(&format!(" {value}")),
                Operand::Register(reg) => {
                    line.push_str(&format!(" {}={}", reg, self.space.read_register(reg)))
                }
                Operand::Invalid(word) => line.push_str(&format!(" !{word}")),
            }
        }
        dprintln!(Always, "{}", line);
    }

    // Operand resolution

    /// Dereference a raw operand word into the value it denotes.
    pub fn resolve_value(&self, word: u16) -> Result<u16, FaultKind> {
        match Operand::decode(word) {
            Operand::Literal(value) => Ok(value),
            Operand::Register(reg) => Ok(self.space.read_register(reg)),
            Operand::Invalid(word) => Err(FaultKind::InvalidOperand { word }),
        }
    }

    /// Register named by a raw operand word. Literals can never be written to.
    pub fn destination_register(word: u16) -> Result<Register, FaultKind> {
        match Operand::decode(word) {
            Operand::Register(reg) => Ok(reg),
            Operand::Literal(_) | Operand::Invalid(_) => {
                Err(FaultKind::InvalidDestination { word })
            }
        }
    }

    /// Raw operand word `n` (1-based) of the current instruction.
    #[inline]
    fn arg(&self, n: u16) -> Result<u16, FaultKind> {
        self.space.read_memory(self.pc + n)
    }

    #[inline]
    fn value(&self, n: u16) -> Result<u16, FaultKind> {
        self.resolve_value(self.arg(n)?)
    }

    #[inline]
    fn dest(&self, n: u16) -> Result<Register, FaultKind> {
        Self::destination_register(self.arg(n)?)
    }

    /// Address of the instruction after one with `operands` operand words.
    fn next_addr(&self, operands: u16) -> Result<u16, FaultKind> {
        let next = self.pc + 1 + operands;
        if next as usize >= MEMORY_SIZE {
            return Err(FaultKind::InvalidAddress { address: next });
        }
        Ok(next)
    }

    fn advance(&mut self, operands: u16) -> Step {
        let next = self.next_addr(operands)?;
        self.jump(next)
    }

    fn jump(&mut self, target: u16) -> Step {
        self.pc = target;
        Ok(Flow::Continue)
    }

    /// `a = f(b, c)`
    fn binary(&mut self, f: impl FnOnce(u32, u32) -> Result<u32, FaultKind>) -> Step {
        let next = self.next_addr(3)?;
        let reg = self.dest(1)?;
        let b = self.value(2)? as u32;
        let c = self.value(3)? as u32;
        let res = f(b, c)? % MODULUS;
        self.space.write_register(reg, res as u16);
        self.jump(next)
    }

    /// `a = f(b)`
    fn unary(&mut self, f: impl FnOnce(&Self, u16) -> Result<u16, FaultKind>) -> Step {
        let next = self.next_addr(2)?;
        let reg = self.dest(1)?;
        let val = f(self, self.value(2)?)?;
        debug_assert!(val <= MAX_VALUE, "register value out of range");
        self.space.write_register(reg, val);
        self.jump(next)
    }

    // Instructions
    //
    // Every operand is fetched and the next address computed before any effect, so a faulting
    // instruction leaves no trace.

    fn halt(&mut self) -> Step {
        Ok(Flow::Exit(Exit::Halted))
    }

    fn set(&mut self) -> Step {
        self.unary(|_, val| Ok(val))
    }

    fn push(&mut self) -> Step {
        let next = self.next_addr(1)?;
        let val = self.value(1)?;
        self.stack.push(val);
        self.jump(next)
    }

    fn pop(&mut self) -> Step {
        let next = self.next_addr(1)?;
        let reg = self.dest(1)?;
        let val = self.stack.pop().ok_or(FaultKind::StackUnderflow)?;
        self.space.write_register(reg, val);
        self.jump(next)
    }

    fn eq(&mut self) -> Step {
        self.binary(|b, c| Ok((b == c) as u32))
    }

    fn gt(&mut self) -> Step {
        self.binary(|b, c| Ok((b > c) as u32))
    }

    fn jmp(&mut self) -> Step {
        let target = self.value(1)?;
        self.jump(target)
    }

    fn jt(&mut self) -> Step {
        let cond = self.value(1)?;
        let target = self.value(2)?;
        if cond != 0 {
            self.jump(target)
        } else {
            self.advance(2)
        }
    }

    fn jf(&mut self) -> Step {
        let cond = self.value(1)?;
        let target = self.value(2)?;
        if cond == 0 {
            self.jump(target)
        } else {
            self.advance(2)
        }
    }

    fn add(&mut self) -> Step {
        self.binary(|b, c| Ok(b + c))
    }

    fn mult(&mut self) -> Step {
        self.binary(|b, c| Ok(b * c))
    }

    fn modulo(&mut self) -> Step {
        self.binary(|b, c| b.checked_rem(c).ok_or(FaultKind::ArithmeticFault))
    }

    fn and(&mut self) -> Step {
        self.binary(|b, c| Ok(b & c))
    }

    fn or(&mut self) -> Step {
        self.binary(|b, c| Ok(b | c))
    }

    fn not(&mut self) -> Step {
        self.unary(|_, val| Ok(!val & MAX_VALUE))
    }

    fn rmem(&mut self) -> Step {
        // Image words may use the 16th bit; registers never do
        self.unary(|state, addr| Ok(state.space.read_memory(addr)? & MAX_VALUE))
    }

    fn wmem(&mut self) -> Step {
        let next = self.next_addr(2)?;
        let addr = self.value(1)?;
        let val = self.value(2)?;
        self.space.write_memory(addr, val)?;
        self.jump(next)
    }

    fn call(&mut self) -> Step {
        let return_addr = self.next_addr(1)?;
        let target = self.value(1)?;
        self.stack.push(return_addr);
        self.jump(target)
    }

    fn ret(&mut self) -> Step {
        match self.stack.pop() {
            Some(addr) => self.jump(addr),
            None => Ok(Flow::Exit(Exit::Returned)),
        }
    }

    fn out(&mut self) -> Step {
        let next = self.next_addr(1)?;
        let val = self.value(1)?;
        self.console.write_byte((val & 0xFF) as u8)?;
        self.jump(next)
    }

    fn inp(&mut self) -> Step {
        let next = self.next_addr(1)?;
        let reg = self.dest(1)?;
        let byte = self
            .console
            .read_byte()?
            .ok_or(FaultKind::InputExhausted)?;
        self.space.write_register(reg, byte as u16);
        self.jump(next)
    }

    fn noop(&mut self) -> Step {
        self.advance(0)
    }
}

// Inspection
impl<C> RunState<C> {
    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn reg(&self, reg: Register) -> u16 {
        self.space.read_register(reg)
    }

    pub fn set_reg(&mut self, reg: Register, value: u16) {
        self.space.write_register(reg, value & MAX_VALUE);
    }

    /// `None` if `addr` is outside of memory.
    pub fn mem(&self, addr: u16) -> Option<u16> {
        self.space.read_memory(addr).ok()
    }

    /// Bottom of the stack first.
    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    /// Instructions executed since the start.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn address_space(&self) -> &AddressSpace {
        &self.space
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }
}
