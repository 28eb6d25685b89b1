//! Assembles a textual program into a memory image.
//!
//! ```text
//! # add the values at 0x01 and 0x02, result goes to 0x00
//! 0x00:
//!     !0
//!     !3
//!     !5
//! 0x08:
//!     LOAD r1 0x01
//!     LOAD r2 0x02
//!     ADD r1 r2
//!     STORE r1 0x00
//!     HALT
//! ```

use std::borrow::Cow;
use std::error;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::{fmt, str::Lines};

use color_eyre::eyre::{self, eyre, WrapErr};

use crate::processor::{Instruction, Opcode, PC};

use super::{Byte, Memory, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidAddress { address: usize },
    InvalidLiteral,
    InvalidNumber { radix: u32 },
    InvalidInstruction,
    InvalidOperand,
    OperandCount { expected: usize, found: usize },
    InvalidAddressLabel,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::InvalidAddress { address } => {
                write!(f, "memory has no address `0x{:x}`", address)
            }
            ParseErrorKind::InvalidLiteral => f.write_str("invalid literal"),
            ParseErrorKind::InvalidNumber { radix } => {
                write!(f, "failed to parse number with radix `{}`", radix)
            }
            ParseErrorKind::InvalidInstruction => f.write_str("failed to resolve instruction"),
            ParseErrorKind::InvalidOperand => f.write_str("invalid operand"),
            ParseErrorKind::OperandCount { expected, found } => {
                write!(f, "expected {} operand(s), found {}", expected, found)
            }
            ParseErrorKind::InvalidAddressLabel => f.write_str("invalid address label"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    context: Option<Cow<'static, str>>,
    line_nr: usize,
}

impl ParseError {
    fn new<C, S>(kind: ParseErrorKind, context: C, line_nr: usize) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            line_nr,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn line_nr(&self) -> usize {
        self.line_nr
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(
                f,
                "error [ln: {}]: {} - {}",
                self.line_nr, self.kind, context
            )
        } else {
            write!(f, "error [ln: {}]: {}", self.line_nr, self.kind)
        }
    }
}

impl error::Error for ParseError {}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Parses a number with an optional `0b`, `0o` or `0x` prefix. Evaluates to
/// the radix that was tried on failure.
macro_rules! parse_number {
    ( $ty:ty: $s:expr ) => {{
        let token: &str = $s;

        let (radix, offset) = match token.as_bytes() {
            [b'0', b'b', ..] => (2, 2),
            [b'0', b'o', ..] => (8, 2),
            [b'0', b'x', ..] => (16, 2),
            _ => (10, 0),
        };

        <$ty>::from_str_radix(&token[offset..], radix).map_err(|_| radix)
    }};
}

#[derive(Debug, Clone)]
pub struct Parser<'a, const S: usize> {
    lines: Lines<'a>,
    line_nr: usize,
    /// Where the next byte is written
    position: usize,
    memory: Memory<S>,
}

impl<'a, const S: usize> Parser<'a, S> {
    /// Creates a new parser for `data` which will try to populate `memory`.
    pub fn new(data: &'a str, memory: Memory<S>) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            position: 0,
            memory,
        }
    }

    /// Consumes `self` and tries to parse all lines into memory.
    ///
    /// # Errors
    ///
    /// All errors which may occur are collected and returned at the end.
    pub fn parse(mut self) -> Result<Memory<S>, Vec<ParseError>> {
        let mut errors = Vec::new();

        while let Some(res) = self.parse_next_line() {
            if let Err(err) = res {
                log::error!("{}", err);
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(self.memory)
        } else {
            Err(errors)
        }
    }

    /// Tries to parse the next line of the source. Each instruction
    /// should be located on it's own line.
    fn parse_next_line(&mut self) -> Option<Result<()>> {
        let line = self.lines.next()?.trim();
        self.line_nr += 1;

        let result = if line.is_empty() || line.starts_with('#') {
            // Comment or empty line; skip
            Ok(())
        } else if line.starts_with('!') {
            self.parse_literal(line)
        } else if line.ends_with(':') {
            self.parse_address_label(line)
        } else {
            self.parse_instruction(line)
        };

        Some(result)
    }

    /// Tries to parse line as a byte literal. The `line` should be the whole
    /// line whithout any modifications.
    ///
    /// # Examples
    ///
    /// - `! 0x22`
    /// - `!7`
    fn parse_literal(&mut self, line: &str) -> Result<()> {
        let line = line.strip_prefix('!').unwrap_or(line).trim();

        log::debug!("[{}] Found byte literal", self.line_nr);

        if line.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::InvalidLiteral,
                "a literal needs to have a number set",
                self.line_nr,
            ));
        }

        let byte = parse_number!(Byte: line).map_err(|radix| {
            ParseError::new(
                ParseErrorKind::InvalidLiteral,
                format!("failed to parse literal as byte with radix `{}`", radix),
                self.line_nr,
            )
        })?;

        self.write_bytes(&[byte])
    }

    /// Tries to parse line as an address label. The `line` should be the whole line
    /// whithout any modifications.
    ///
    /// # Examples
    ///
    /// - `0x08:`
    /// - `0o10:`
    fn parse_address_label(&mut self, line: &str) -> Result<()> {
        let line = line.strip_suffix(':').unwrap_or(line).trim();

        log::debug!("[{}] Found address label", self.line_nr);

        if line.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::InvalidAddressLabel,
                "an address label needs to have an address set",
                self.line_nr,
            ));
        }

        let address = parse_number!(usize: line).map_err(|radix| {
            ParseError::new(
                ParseErrorKind::InvalidNumber { radix },
                "failed to parse the address",
                self.line_nr,
            )
        })?;

        if address >= S {
            return Err(ParseError::new(
                ParseErrorKind::InvalidAddress { address },
                "address label is outside of memory",
                self.line_nr,
            ));
        }

        log::debug!("[{}] Address label `0x{:x}`", self.line_nr, address);

        self.position = address;

        Ok(())
    }

    /// Tries to parse line as a instruction. The `line` should be the whole line
    /// whithout any modifications. Operands may be separated by whitespace or
    /// commas.
    ///
    /// # Examples
    ///
    /// - `LOAD r1 0x22`
    /// - `add r1, r2`
    /// - `HALT`
    fn parse_instruction(&mut self, line: &str) -> Result<()> {
        let mut tokens = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty());
        let mnemonic = tokens.next().unwrap_or_default();
        let operands: Vec<&str> = tokens.collect();

        let opcode = *Opcode::ALL
            .iter()
            .find(|opcode| mnemonic.eq_ignore_ascii_case(opcode.name()))
            .ok_or_else(|| {
                ParseError::new(
                    ParseErrorKind::InvalidInstruction,
                    format!("no instruction named `{}`", mnemonic),
                    self.line_nr,
                )
            })?;

        if operands.len() != opcode.operand_count() {
            return Err(ParseError::new(
                ParseErrorKind::OperandCount {
                    expected: opcode.operand_count(),
                    found: operands.len(),
                },
                format!("in `{}`", opcode),
                self.line_nr,
            ));
        }

        let instruction = match opcode {
            Opcode::Load => Instruction::Load {
                register: self.parse_register(operands[0])?,
                address: self.parse_operand(operands[1])?,
            },
            Opcode::Store => Instruction::Store {
                register: self.parse_register(operands[0])?,
                address: self.parse_operand(operands[1])?,
            },
            Opcode::Add => Instruction::Add {
                dest: self.parse_register(operands[0])?,
                src: self.parse_register(operands[1])?,
            },
            Opcode::Sub => Instruction::Sub {
                dest: self.parse_register(operands[0])?,
                src: self.parse_register(operands[1])?,
            },
            Opcode::Halt => Instruction::Halt,
        };

        log::debug!("[{}] Found instruction {}", self.line_nr, instruction);

        self.write_bytes(&instruction.encode())
    }

    /// Parses a register operand: `pc`, `r<n>` or a plain register index
    fn parse_register(&self, token: &str) -> Result<Byte> {
        if token.eq_ignore_ascii_case("pc") {
            return Ok(PC);
        }

        let index = token
            .strip_prefix('r')
            .or_else(|| token.strip_prefix('R'))
            .unwrap_or(token);

        parse_number!(Byte: index).map_err(|_| {
            ParseError::new(
                ParseErrorKind::InvalidOperand,
                format!("`{}` is not a register", token),
                self.line_nr,
            )
        })
    }

    /// Parses a numeric operand
    fn parse_operand(&self, token: &str) -> Result<Byte> {
        parse_number!(Byte: token).map_err(|radix| {
            ParseError::new(
                ParseErrorKind::InvalidNumber { radix },
                format!("`{}` is not a byte", token),
                self.line_nr,
            )
        })
    }

    /// Writes `bytes` into memory at [self.position](`Parser::position`)
    /// and moves the position past them.
    ///
    /// # Errors
    ///
    /// This will return an error if any of the bytes would end up outside of
    /// memory. Nothing is written in that case.
    fn write_bytes(&mut self, bytes: &[Byte]) -> Result<()> {
        // labels are checked against the memory size, so the position always fits
        self.memory
            .write_array(self.position as Word, bytes)
            .map_err(|err| {
                ParseError::new(
                    ParseErrorKind::InvalidAddress { address: S },
                    err.to_string(),
                    self.line_nr,
                )
            })?;
        self.position += bytes.len();

        Ok(())
    }
}

impl<const S: usize> FromStr for Memory<S> {
    type Err = Vec<ParseError>;

    /// Assembles `data` into otherwise zeroed memory
    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Parser::new(data, Memory::default()).parse()
    }
}

impl<const S: usize> Memory<S> {
    /// Reads and assembles a program source file
    pub fn from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;

        data.parse().map_err(|errors: Vec<ParseError>| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            eyre!(
                "Failed to assemble {}:\n{}",
                path.display(),
                messages.join("\n")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::{StdMem, SAMPLE_IMAGE};
    use crate::processor::{R1, R2};

    use super::*;
    use color_eyre::Result;

    fn parse_errors(data: &str) -> Vec<ParseErrorKind> {
        match StdMem::from_str(data) {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(ParseError::kind).collect(),
        }
    }

    #[test]
    fn parse_sample() -> Result<()> {
        let data = r#"
            # add the values at 0x01 and 0x02
            0x00:
                !0
                !3
                !5
            0x08:
                LOAD r1 0x01
                LOAD r2 0x02
                ADD r1 r2
                STORE r1 0x00
                HALT
        "#;

        let mem = StdMem::from_str(data).unwrap();

        assert_eq!(mem, StdMem::from_image(&SAMPLE_IMAGE)?);

        Ok(())
    }

    #[test]
    fn parse_sample_file() -> Result<()> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("programs/add.asm");
        let mem = StdMem::from_file(path)?;

        assert_eq!(mem, StdMem::from_image(&SAMPLE_IMAGE)?);

        Ok(())
    }

    #[test]
    fn parse_missing_file() -> Result<()> {
        assert!(StdMem::from_file("programs/does-not-exist.asm").is_err());

        Ok(())
    }

    #[test]
    fn parse_operand_spellings() -> Result<()> {
        const ENTRYPOINT: Word = 0o10;
        let data = r#"
            0o10:
                load R1, 0b101
                Store pc 0x0A
                sub 2 1
                add r1 r2
                halt
        "#;

        let mem = StdMem::from_str(data).unwrap();

        let expected = [
            Opcode::Load.into(),
            R1,
            5,
            Opcode::Store.into(),
            PC,
            10,
            Opcode::Sub.into(),
            R2,
            R1,
            Opcode::Add.into(),
            R1,
            R2,
            Opcode::Halt.into(),
        ];
        for (offset, byte) in expected.iter().enumerate() {
            assert_eq!(mem.read_byte(ENTRYPOINT + offset as Word)?, *byte);
        }

        Ok(())
    }

    #[test]
    fn parse_decimal_label_and_literals() -> Result<()> {
        let data = r#"
            250:
                ! 0xAB
                !255
                !0o17
        "#;

        let mem = StdMem::from_str(data).unwrap();

        assert_eq!(mem.read_byte(250)?, 0xAB);
        assert_eq!(mem.read_byte(251)?, 255);
        assert_eq!(mem.read_byte(252)?, 0o17);

        Ok(())
    }

    #[test]
    fn parse_defaults_to_address_zero() -> Result<()> {
        let mem = StdMem::from_str("HALT").unwrap();

        assert_eq!(mem.read_byte(0)?, Opcode::Halt.into());

        Ok(())
    }

    #[test]
    fn parse_collects_all_errors() -> Result<()> {
        let data = r#"
            0x08:
                JUMP 0x10
                LOAD r1
                ADD r1 0xZZ
                !256
                !
                :
                0x100:
        "#;

        assert_eq!(
            parse_errors(data),
            vec![
                ParseErrorKind::InvalidInstruction,
                ParseErrorKind::OperandCount {
                    expected: 2,
                    found: 1
                },
                ParseErrorKind::InvalidOperand,
                ParseErrorKind::InvalidLiteral,
                ParseErrorKind::InvalidLiteral,
                ParseErrorKind::InvalidAddressLabel,
                ParseErrorKind::InvalidAddress { address: 0x100 },
            ]
        );

        Ok(())
    }

    #[test]
    fn parse_error_line_numbers() -> Result<()> {
        let errors = StdMem::from_str("HALT\n\nLOAD r1 0x100\n").unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_nr(), 3);
        assert_eq!(errors[0].kind(), ParseErrorKind::InvalidNumber { radix: 16 });

        Ok(())
    }

    #[test]
    fn parse_writing_past_end_of_memory() -> Result<()> {
        let data = r#"
            0xFE:
                ADD r1 r2
        "#;

        assert_eq!(
            parse_errors(data),
            vec![ParseErrorKind::InvalidAddress { address: 0x100 }]
        );

        Ok(())
    }

    #[test]
    fn parse_halt_takes_no_operands() -> Result<()> {
        assert_eq!(
            parse_errors("HALT r1"),
            vec![ParseErrorKind::OperandCount {
                expected: 0,
                found: 1
            }]
        );

        Ok(())
    }
}
