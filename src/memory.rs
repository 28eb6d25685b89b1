use crate::error::{Result, VmError};

pub mod parse;

pub type Byte = u8; // 1 byte
pub type Word = u16; // 2 bytes, wide enough to address one past the end of memory

/// Number of cells in main memory
pub const MEMORY_SIZE: usize = 256;

/// The first bytes of memory hold program data, instructions follow
pub const DATA_REGION_SIZE: usize = 8;

/// Default memory
pub type StdMem = Memory<MEMORY_SIZE>;

/// Adds the values at addresses 1 and 2 and stores the sum at address 0
#[rustfmt::skip]
pub const SAMPLE_IMAGE: [Byte; 21] = [
    // data
    0x00, 0x03, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00,
    // instructions
    0x01, 0x01, 0x01, // LOAD r1 0x01
    0x01, 0x02, 0x02, // LOAD r2 0x02
    0x03, 0x01, 0x02, // ADD r1 r2
    0x02, 0x01, 0x00, // STORE r1 0x00
    0xFF,             // HALT
];

/// Emulates main memory for use with the processor. Both the program and its
/// data live here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory<const S: usize> {
    /// The actual data of the memory
    pub data: [Byte; S],
}

impl<const S: usize> Default for Memory<S> {
    /// Initializes the memory
    fn default() -> Self {
        Memory { data: [0; S] }
    }
}

impl<const S: usize> Memory<S> {
    /// Creates memory preloaded with `image`, starting at address 0. The rest
    /// of memory is zeroed.
    pub fn from_image(image: &[Byte]) -> Result<Self> {
        let mut memory = Self::default();
        memory.write_array(0, image)?;
        Ok(memory)
    }

    /// Reads a byte from the memory
    pub fn read_byte(&self, position: Word) -> Result<Byte> {
        self.data
            .get(position as usize)
            .copied()
            .ok_or(VmError::MemoryOutOfBounds {
                address: position as usize,
            })
    }

    /// Writes a byte to the memory
    pub fn write_byte(&mut self, position: Word, value: Byte) -> Result<()> {
        let cell = self
            .data
            .get_mut(position as usize)
            .ok_or(VmError::MemoryOutOfBounds {
                address: position as usize,
            })?;
        *cell = value;
        Ok(())
    }

    /// Writes an array of bytes to the memory
    pub fn write_array(&mut self, position: Word, data: &[Byte]) -> Result<()> {
        let start = position as usize;
        let end = start + data.len();
        if end > S {
            // report the first cell that does not exist
            return Err(VmError::MemoryOutOfBounds {
                address: start.max(S),
            });
        }
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    /// The conventional data region at the start of memory
    pub fn data_region(&self) -> &[Byte] {
        &self.data[..DATA_REGION_SIZE.min(S)]
    }
}

/// Writes a block of instructions directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $byte:expr ),+ ) => {
        $mem.write_array($pos, &[
            $(
                $byte as $crate::memory::Byte,
            )+
        ])
    };
}
