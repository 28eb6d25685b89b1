use thiserror::Error;

use crate::memory::Byte;

/// Fatal conditions raised while loading or running a program.
///
/// None of these are recoverable: the machine either runs a program to
/// `HALT` or stops at the first error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum VmError {
    /// The program counter (or an operand byte of the current instruction)
    /// points outside of main memory
    #[error("tried to fetch address 0x{address:X} outside of main memory")]
    FetchOutOfBounds { address: usize },
    /// The program counter is 8 bits wide and can't hold the address of the
    /// next instruction, even though memory extends that far
    #[error("program counter can't hold address 0x{address:X}")]
    ProgramCounterOverflow { address: usize },
    /// A data access (load, store or image write) outside of main memory
    #[error("memory has no address 0x{address:X}")]
    MemoryOutOfBounds { address: usize },
    /// The opcode byte is not part of the instruction set
    #[error("failed to decode unknown instruction 0x{opcode:02X}")]
    UnknownOpcode { opcode: Byte },
    /// A register operand names a register the machine does not have
    #[error("no register with index {index}")]
    InvalidRegister { index: Byte },
    /// A cycle was requested after the machine executed `HALT`
    #[error("the machine is halted")]
    Halted,
}

pub type Result<T, E = VmError> = std::result::Result<T, E>;
