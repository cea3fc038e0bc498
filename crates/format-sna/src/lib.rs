//! SNA snapshot parser (48K).
//!
//! The SNA format is a raw dump: a 27-byte register header followed by
//! the full 48 KiB of RAM as it sat at $4000-$FFFF. There is no field
//! for the program counter — at save time the PC was pushed onto the
//! stack, so the loader has to pop it back off after restoring memory
//! (see the machine crate's loader for the RETN trick).
//!
//! This crate also hosts [`Registers`], the register image every
//! snapshot header decodes into, and the [`rle`] codec shared with the
//! .Z80 format.

pub mod rle;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 27;

/// RAM image size: the 48 KiB at $4000-$FFFF.
pub const RAM_SIZE: usize = 0xC000;

/// Exact size of a 48K SNA file.
pub const FILE_SIZE: usize = HEADER_SIZE + RAM_SIZE;

/// Z80 register image decoded from a snapshot header.
///
/// `pc` is absent: the SNA format stores it on the stack, and the .Z80
/// format carries it separately (its location depends on the version).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub af_alt: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    /// Interrupt vector register.
    pub i: u8,
    /// Refresh register.
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    /// Interrupt mode (0-2).
    pub im: u8,
}

/// A parsed SNA snapshot.
#[derive(Debug)]
pub struct SnaSnapshot {
    pub registers: Registers,
    /// Border colour (0-7).
    pub border: u8,
    /// RAM image, offset 0 = address $4000.
    pub memory: Box<[u8; RAM_SIZE]>,
}

impl SnaSnapshot {
    /// Parse an SNA file.
    ///
    /// # Errors
    ///
    /// Returns an error unless `data` is exactly 49,179 bytes.
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        if data.len() != FILE_SIZE {
            return Err(format!(
                "SNA file must be exactly {FILE_SIZE} bytes, got {}",
                data.len()
            ));
        }

        let registers = Registers {
            i: data[0x00],
            hl_alt: word(data, 0x01),
            de_alt: word(data, 0x03),
            bc_alt: word(data, 0x05),
            af_alt: word(data, 0x07),
            hl: word(data, 0x09),
            de: word(data, 0x0B),
            bc: word(data, 0x0D),
            iy: word(data, 0x0F),
            ix: word(data, 0x11),
            // IFF1 is recovered by the loader's RETN step, which copies
            // IFF2 into it; the header only stores IFF2.
            iff1: false,
            iff2: data[0x13] & 0x04 != 0,
            r: data[0x14],
            af: word(data, 0x15),
            sp: word(data, 0x17),
            im: data[0x19],
        };

        let mut memory = Box::new([0u8; RAM_SIZE]);
        memory.copy_from_slice(&data[HEADER_SIZE..]);

        Ok(Self {
            registers,
            border: data[0x1A] & 0x07,
            memory,
        })
    }
}

/// Little-endian word read.
#[must_use]
pub fn word(data: &[u8], offset: usize) -> u16 {
    u16::from(data[offset]) | (u16::from(data[offset + 1]) << 8)
}
