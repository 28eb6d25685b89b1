//! Printing of the final machine state once a program halted

use std::io::{self, Write};

use crate::memory::Memory;

/// Bytes per row of [`write_hex_dump`]
const ROW_WIDTH: usize = 16;

/// Writes the data region, one cell per line
pub fn write_data_region<W: Write, const S: usize>(out: &mut W, memory: &Memory<S>) -> io::Result<()> {
    writeln!(out, "data segment:")?;
    for (address, value) in memory.data_region().iter().enumerate() {
        writeln!(out, "mem[{}]: {}", address, value)?;
    }
    Ok(())
}

/// Writes the whole memory as a hex table
pub fn write_hex_dump<W: Write, const S: usize>(out: &mut W, memory: &Memory<S>) -> io::Result<()> {
    for (row, bytes) in memory.data.chunks(ROW_WIDTH).enumerate() {
        write!(out, "{:04X}:", row * ROW_WIDTH)?;
        for byte in bytes {
            write!(out, " {:02X}", byte)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
