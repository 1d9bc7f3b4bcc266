use std::io::{self, Write};

use crate::cpu::{Cpu, CpuError, State};
use crate::memory::{Memory, MemoryError};

/// A complete micro8 system: 256 bytes of memory with a program image at
/// address 0, and the CPU that executes it.
#[derive(Debug)]
pub struct Machine<W: Write> {
    cpu: Cpu<W>,
}

impl Machine<io::Stdout> {
    /// A machine whose program output goes to stdout.
    pub fn new(program: &[u8]) -> Result<Self, MemoryError> {
        Self::with_output(program, io::stdout())
    }
}

impl<W: Write> Machine<W> {
    pub fn with_output(program: &[u8], output: W) -> Result<Self, MemoryError> {
        let mut memory = Memory::new();
        memory.load(program)?;
        Ok(Machine {
            cpu: Cpu::new(memory, output),
        })
    }

    /// Blocks the caller until the program halts or faults.
    pub fn run(&mut self) -> Result<(), CpuError> {
        tracing::info!("starting micro8 machine");
        let result = self.cpu.run();
        match self.cpu.state() {
            State::Halted => tracing::info!("machine halted normally"),
            State::Failed(err) => tracing::warn!("machine failed: {err}"),
            State::Running => {}
        }
        result
    }

    pub fn cpu(&self) -> &Cpu<W> {
        &self.cpu
    }

    pub fn output(&self) -> &W {
        self.cpu.output()
    }
}
