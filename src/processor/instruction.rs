use std::convert::TryFrom;
use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{Result, VmError};
use crate::memory::Byte;

use super::PC;

macro_rules! opcodes {
    ( $( $( #[doc = $doc:expr] )+ $name:ident ( $mnemonic:literal ) = $repr:literal => $len:literal , )+ ) => {
        /// Defines the opcodes understood by the processor.
        /// Every instruction is a single opcode byte, optionally followed by
        /// exactly two operand bytes.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Opcode {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Opcode {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            /// The assembler mnemonic
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => $mnemonic , )+
                }
            }

            /// Number of bytes the instruction occupies in memory, opcode included
            pub fn length(&self) -> Byte {
                match self {
                    $( Self::$name => $len , )+
                }
            }
        }

        impl ::std::fmt::Display for Opcode {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }
    }
}

opcodes! {
    /// Load a value from memory into a register
    /// @param register The register to load into
    /// @param address The address to read
    Load("LOAD") = 0x01 => 3,
    /// Store the value of a register in memory
    /// @param register The register to read
    /// @param address The address to write
    Store("STORE") = 0x02 => 3,
    /// Add the second register to the first, wrapping on overflow
    /// @param dest Register receiving the sum
    /// @param src Register added to `dest`
    Add("ADD") = 0x03 => 3,
    /// Subtract the second register from the first, wrapping on underflow
    /// @param dest Register receiving the difference
    /// @param src Register subtracted from `dest`
    Sub("SUB") = 0x04 => 3,
    /// Stop the execution of the program
    Halt("HALT") = 0xFF => 1,
}

impl Opcode {
    /// Number of operand bytes following the opcode
    pub fn operand_count(&self) -> usize {
        self.length() as usize - 1
    }
}

/// The bytes of one instruction as they were read from memory, before any
/// interpretation of the opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawInstruction {
    pub opcode: Byte,
    pub operands: [Byte; 2],
}

/// A decoded instruction. Register fields are raw indices into the register
/// file, where index 0 is the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Load { register: Byte, address: Byte },
    Store { register: Byte, address: Byte },
    Add { dest: Byte, src: Byte },
    Sub { dest: Byte, src: Byte },
    Halt,
}

impl Instruction {
    /// Turns raw bytes into a typed instruction.
    ///
    /// # Errors
    ///
    /// [`VmError::UnknownOpcode`] if the opcode is not part of the instruction set.
    pub fn decode(raw: RawInstruction) -> Result<Self> {
        let opcode = Opcode::try_from(raw.opcode).map_err(|_| VmError::UnknownOpcode {
            opcode: raw.opcode,
        })?;
        let [a, b] = raw.operands;

        Ok(match opcode {
            Opcode::Load => Instruction::Load {
                register: a,
                address: b,
            },
            Opcode::Store => Instruction::Store {
                register: a,
                address: b,
            },
            Opcode::Add => Instruction::Add { dest: a, src: b },
            Opcode::Sub => Instruction::Sub { dest: a, src: b },
            Opcode::Halt => Instruction::Halt,
        })
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Load { .. } => Opcode::Load,
            Instruction::Store { .. } => Opcode::Store,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Sub { .. } => Opcode::Sub,
            Instruction::Halt => Opcode::Halt,
        }
    }

    /// Number of bytes the instruction occupies in memory
    pub fn length(&self) -> Byte {
        self.opcode().length()
    }

    /// The instruction in its memory representation
    pub fn encode(&self) -> Vec<Byte> {
        let opcode: Byte = self.opcode().into();
        match *self {
            Instruction::Load { register, address } | Instruction::Store { register, address } => {
                vec![opcode, register, address]
            }
            Instruction::Add { dest, src } | Instruction::Sub { dest, src } => {
                vec![opcode, dest, src]
            }
            Instruction::Halt => vec![opcode],
        }
    }
}

/// Displays a register index the way the assembler accepts it
pub struct RegisterName(pub Byte);

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            PC => f.write_str("pc"),
            index => write!(f, "r{}", index),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opcode = self.opcode();
        match *self {
            Instruction::Load { register, address } | Instruction::Store { register, address } => {
                write!(f, "{} {} 0x{:02X}", opcode, RegisterName(register), address)
            }
            Instruction::Add { dest, src } | Instruction::Sub { dest, src } => {
                write!(f, "{} {} {}", opcode, RegisterName(dest), RegisterName(src))
            }
            Instruction::Halt => write!(f, "{}", opcode),
        }
    }
}
