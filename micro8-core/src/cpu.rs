use std::fmt;
use std::io::Write;

use thiserror::Error;

use crate::alu::{self, AluError, AluOp, Flags};
use crate::isa::{DecodeError, Instruction, Opcode};
use crate::memory::Memory;
use crate::registers::{Register, RegisterFile};

/// SP value at the start of every run; the stack grows down from here.
pub const INITIAL_SP: u8 = 0xF4;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CpuError {
    #[error("illegal instruction 0x{opcode:02X} at address 0x{addr:02X}")]
    IllegalInstruction { addr: u16, opcode: u8 },
    #[error("register operand {index} out of range at address 0x{addr:02X}, must be [0, 8)")]
    RegisterOutOfRange { addr: u16, index: u8 },
    #[error("program counter 0x{pc:04X} ran outside addressable memory")]
    ProgramCounterOutOfRange { pc: u16 },
    #[error("division by zero at address 0x{addr:02X}")]
    DivisionByZero { addr: u16 },
    #[error("stack overflow at address 0x{addr:02X}: push below address 0x00")]
    StackOverflow { addr: u16 },
    #[error("stack underflow at address 0x{addr:02X}: pop past the top of memory")]
    StackUnderflow { addr: u16 },
    #[error("output failed: {0}")]
    Output(String),
}

pub type Result<T> = std::result::Result<T, CpuError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
    Failed(CpuError),
}

/// The fetch-decode-execute engine. Owns its register file and memory for
/// the duration of a run; instances are independent, so several can run in
/// the same process.
pub struct Cpu<W: Write> {
    registers: RegisterFile,
    memory: Memory,
    pc: u16,
    /// Most recently fetched opcode byte, kept for diagnostics.
    ir: u8,
    flags: Flags,
    state: State,
    output: W,
}

impl<W: Write> fmt::Debug for Cpu<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("pc", &self.pc)
            .field("ir", &self.ir)
            .field("flags", &self.flags)
            .field("state", &self.state)
            .finish()
    }
}

impl<W: Write> Cpu<W> {
    pub fn new(memory: Memory, output: W) -> Self {
        let mut registers = RegisterFile::new();
        registers.set_sp(INITIAL_SP);
        Cpu {
            registers,
            memory,
            pc: 0,
            ir: 0,
            flags: Flags::default(),
            state: State::Running,
            output,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn ir(&self) -> u8 {
        self.ir
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn register(&self, register: Register) -> u8 {
        self.registers.read(register)
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Runs cycles until the program halts or a fatal fault occurs. Only
    /// `Running` takes another cycle; a fault is recorded in the state and
    /// returned.
    pub fn run(&mut self) -> Result<()> {
        while self.state == State::Running {
            if let Err(err) = self.step() {
                self.state = State::Failed(err.clone());
                return Err(err);
            }
        }
        Ok(())
    }

    /// One fetch-decode-execute cycle.
    pub fn step(&mut self) -> Result<()> {
        let pc = self.pc;
        let instruction = self.fetch()?;
        tracing::trace!(
            "0x{:02X}: {} {:?} | flags {:?}",
            pc,
            instruction.opcode(),
            instruction,
            self.flags
        );
        self.execute(instruction)
    }

    fn fetch(&mut self) -> Result<Instruction> {
        let opcode_byte = self.fetch_byte(self.pc)?;
        self.ir = opcode_byte;
        let opcode = Opcode::try_from(opcode_byte).map_err(|_| CpuError::IllegalInstruction {
            addr: self.pc,
            opcode: opcode_byte,
        })?;
        let mut operands = [0u8; 2];
        for (offset, operand) in operands
            .iter_mut()
            .take(opcode.operand_count())
            .enumerate()
        {
            *operand = self.fetch_byte(self.pc + 1 + offset as u16)?;
        }
        Instruction::from_parts(opcode, operands).map_err(|err| match err {
            DecodeError::RegisterOutOfRange(index) => CpuError::RegisterOutOfRange {
                addr: self.pc,
                index,
            },
            DecodeError::IllegalOpcode(byte) => CpuError::IllegalInstruction {
                addr: self.pc,
                opcode: byte,
            },
        })
    }

    // Only the program counter can leave the address space; data accesses
    // are u8-addressed.
    fn fetch_byte(&self, addr: u16) -> Result<u8> {
        match u8::try_from(addr) {
            Ok(addr) => Ok(self.memory.read(addr)),
            Err(_) => Err(CpuError::ProgramCounterOutOfRange { pc: addr }),
        }
    }

    // Handlers own the PC update: a fixed delta for straight-line
    // instructions, an assignment for branches.
    fn execute(&mut self, instruction: Instruction) -> Result<()> {
        let len = instruction.len_bytes();
        match instruction {
            Instruction::Ldi { reg, value } => {
                self.registers.write(reg, value);
                self.pc += len;
            }
            Instruction::Prn { reg } => {
                let value = self.registers.read(reg);
                writeln!(self.output, "{value}")
                    .map_err(|err| CpuError::Output(err.to_string()))?;
                self.pc += len;
            }
            Instruction::Pra { reg } => {
                let value = self.registers.read(reg);
                write!(self.output, "{}", value as char)
                    .map_err(|err| CpuError::Output(err.to_string()))?;
                self.pc += len;
            }
            Instruction::Add { dst, src } => self.arithmetic(AluOp::Add, dst, src)?,
            Instruction::Sub { dst, src } => self.arithmetic(AluOp::Sub, dst, src)?,
            Instruction::Mul { dst, src } => self.arithmetic(AluOp::Mul, dst, src)?,
            Instruction::Div { dst, src } => self.arithmetic(AluOp::Div, dst, src)?,
            Instruction::Cmp { lhs, rhs } => {
                self.flags = alu::compare(self.registers.read(lhs), self.registers.read(rhs));
                self.pc += len;
            }
            Instruction::Push { reg } => {
                let value = self.registers.read(reg);
                self.push(value)?;
                self.pc += len;
            }
            Instruction::Pop { reg } => {
                let value = self.pop()?;
                self.registers.write(reg, value);
                self.pc += len;
            }
            Instruction::Call { reg } => {
                // The return address is the instruction after CALL.
                let return_addr = self.pc + 2;
                let return_addr = u8::try_from(return_addr)
                    .map_err(|_| CpuError::ProgramCounterOutOfRange { pc: return_addr })?;
                self.push(return_addr)?;
                self.pc = u16::from(self.registers.read(reg));
            }
            Instruction::Ret => {
                self.pc = u16::from(self.pop()?);
            }
            Instruction::Jmp { reg } => {
                self.pc = u16::from(self.registers.read(reg));
            }
            Instruction::Jeq { reg } => {
                if self.flags.equal {
                    self.pc = u16::from(self.registers.read(reg));
                } else {
                    self.pc += len;
                }
            }
            Instruction::Jne { reg } => {
                if !self.flags.equal {
                    self.pc = u16::from(self.registers.read(reg));
                } else {
                    self.pc += len;
                }
            }
            Instruction::Hlt => {
                self.state = State::Halted;
            }
        }
        Ok(())
    }

    fn arithmetic(&mut self, op: AluOp, dst: Register, src: Register) -> Result<()> {
        let a = self.registers.read(dst);
        let b = self.registers.read(src);
        let result = alu::arithmetic(op, a, b).map_err(|err| match err {
            AluError::DivisionByZero => CpuError::DivisionByZero { addr: self.pc },
        })?;
        self.registers.write(dst, result);
        self.pc += 3;
        Ok(())
    }

    // The stack lives in main memory and grows down through SP (register 7).
    // Guards are on the u8 address range, not the conventional 0xF4 base,
    // since programs may repoint SP.
    fn push(&mut self, value: u8) -> Result<()> {
        let sp = self.registers.sp();
        if sp == 0 {
            return Err(CpuError::StackOverflow { addr: self.pc });
        }
        let sp = sp - 1;
        self.registers.set_sp(sp);
        self.memory.write(sp, value);
        Ok(())
    }

    fn pop(&mut self) -> Result<u8> {
        let sp = self.registers.sp();
        if sp == u8::MAX {
            return Err(CpuError::StackUnderflow { addr: self.pc });
        }
        let value = self.memory.read(sp);
        self.registers.set_sp(sp + 1);
        Ok(value)
    }
}
