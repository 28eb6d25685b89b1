use std::convert::TryFrom;

use crate::error::{Result, VmError};
use crate::memory::{Byte, Memory, Word};
use log::*;

mod instruction;

pub use instruction::{Instruction, Opcode, RawInstruction, RegisterName};

/// Register index of the program counter
pub const PC: Byte = 0;
/// Register index of the first general purpose register
pub const R1: Byte = 1;
/// Register index of the second general purpose register
pub const R2: Byte = 2;

pub const REGISTER_COUNT: usize = 3;

/// Address of the first instruction. Everything below is the data region.
pub const ENTRYPOINT: Byte = 8;

/// Emulates the processor: a program counter and two general purpose
/// registers, sharing one register file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Processor {
    /// Register file, indexed by [`PC`], [`R1`] and [`R2`]
    pub registers: [Byte; REGISTER_COUNT],
    /// Termination flag. Set once `HALT` was executed
    pub halted: bool,
}

impl Default for Processor {
    /// Initializes a new processor at [`ENTRYPOINT`]
    fn default() -> Self {
        Self::new(ENTRYPOINT)
    }
}

impl Processor {
    /// Initializes a new processor
    /// @param entrypoint The address of the first instruction
    pub fn new(entrypoint: Byte) -> Self {
        let mut registers = [0; REGISTER_COUNT];
        registers[PC as usize] = entrypoint;
        Self {
            registers,
            halted: false,
        }
    }

    /// Program counter
    pub fn pc(&self) -> Byte {
        self.registers[PC as usize]
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Reads a register, index 0 being the program counter
    pub fn register(&self, index: Byte) -> Result<Byte> {
        self.registers
            .get(index as usize)
            .copied()
            .ok_or(VmError::InvalidRegister { index })
    }

    /// Writes a register, index 0 being the program counter
    pub fn set_register(&mut self, index: Byte, value: Byte) -> Result<()> {
        let register = self
            .registers
            .get_mut(index as usize)
            .ok_or(VmError::InvalidRegister { index })?;
        *register = value;
        Ok(())
    }

    /// Reads the instruction at the program counter. Operand bytes are only
    /// read for opcodes known to carry them, an unknown opcode is passed on
    /// untouched for [`Instruction::decode`] to reject.
    pub fn fetch<const S: usize>(&self, memory: &Memory<S>) -> Result<RawInstruction> {
        let pc = self.pc() as Word;
        let mut raw = RawInstruction {
            opcode: fetch_byte(memory, pc)?,
            ..RawInstruction::default()
        };

        if let Ok(opcode) = Opcode::try_from(raw.opcode) {
            let operands = raw.operands.iter_mut().take(opcode.operand_count());
            for (address, operand) in (pc + 1..).zip(operands) {
                *operand = fetch_byte(memory, address)?;
            }
        }

        trace!(
            "0x{:02X}: {:02X} {:02X} {:02X}",
            pc,
            raw.opcode,
            raw.operands[0],
            raw.operands[1]
        );

        Ok(raw)
    }

    /// Executes a single instruction. The program counter is left alone.
    ///
    /// Returns the number of bytes the instruction occupies, which is what
    /// the program counter has to advance by.
    pub fn execute_instruction<const S: usize>(
        &mut self,
        instruction: Instruction,
        memory: &mut Memory<S>,
    ) -> Result<Byte> {
        match instruction {
            Instruction::Load { register, address } => {
                let value = memory.read_byte(address as Word)?;
                self.set_register(register, value)?;

                debug!("{}: {}", instruction, value);
            }
            Instruction::Store { register, address } => {
                let value = self.register(register)?;
                memory.write_byte(address as Word, value)?;

                debug!("{}: {}", instruction, value);
            }
            Instruction::Add { dest, src } => {
                let a = self.register(dest)?;
                let b = self.register(src)?;
                let result = a.wrapping_add(b);
                self.set_register(dest, result)?;

                debug!("{} ({} + {}): {}", instruction, a, b, result);
            }
            Instruction::Sub { dest, src } => {
                let a = self.register(dest)?;
                let b = self.register(src)?;
                let result = a.wrapping_sub(b);
                self.set_register(dest, result)?;

                debug!("{} ({} - {}): {}", instruction, a, b, result);
            }
            Instruction::Halt => {
                debug!("{}", instruction);
            }
        }

        Ok(instruction.length())
    }

    /// Runs one fetch, decode, execute cycle and returns the executed instruction
    pub fn step<const S: usize>(&mut self, memory: &mut Memory<S>) -> Result<Instruction> {
        if self.halted {
            return Err(VmError::Halted);
        }

        let raw = self.fetch(memory)?;
        let instruction = Instruction::decode(raw)?;
        let length = self.execute_instruction(instruction, memory)?;

        if instruction == Instruction::Halt {
            self.halted = true;
        } else {
            self.advance(length, S)?;
        }

        Ok(instruction)
    }

    /// Run program until it halts. Returns the number of executed instructions.
    pub fn run_until_halt<const S: usize>(&mut self, memory: &mut Memory<S>) -> Result<usize> {
        let mut cycles = 0;
        while !self.halted {
            self.step(memory)?;
            cycles += 1;
        }

        info!(
            "Program terminated after {} instructions. r1: {} r2: {}",
            cycles, self.registers[R1 as usize], self.registers[R2 as usize]
        );

        Ok(cycles)
    }

    /// Moves the program counter past an instruction of `length` bytes.
    /// Fails if the next instruction can't be fetched from a memory of
    /// `memory_size` cells.
    fn advance(&mut self, length: Byte, memory_size: usize) -> Result<()> {
        let next = self.pc() as usize + length as usize;
        if next >= memory_size {
            return Err(VmError::FetchOutOfBounds { address: next });
        }
        let next =
            Byte::try_from(next).map_err(|_| VmError::ProgramCounterOverflow { address: next })?;
        self.registers[PC as usize] = next;
        Ok(())
    }
}

fn fetch_byte<const S: usize>(memory: &Memory<S>, address: Word) -> Result<Byte> {
    memory
        .read_byte(address)
        .map_err(|_| VmError::FetchOutOfBounds {
            address: address as usize,
        })
}
