//! .Z80 snapshot parser (48K-class machines).
//!
//! The format is versioned. The original layout is a 30-byte header
//! followed by one 48 KiB memory image, optionally run-length compressed.
//! Later revisions zero the header's PC field and append an extended
//! header — its own length field distinguishes the sub-versions — and
//! store memory as self-describing 16 KiB pages instead.
//!
//! Only 48K-class hardware modes are accepted; anything else fails the
//! parse rather than producing a machine we cannot model.

use format_sna::{Registers, rle, word};

/// Size of the version-1 header, present in every file.
pub const BASE_HEADER_SIZE: usize = 30;

/// A memory page is one 16 KiB block.
pub const PAGE_SIZE: usize = 0x4000;

/// Block length sentinel: the page is stored raw at full size.
const UNCOMPRESSED: u16 = 0xFFFF;

/// Size of the end marker (`00 ED ED 00`) that terminates a compressed
/// version-1 image.
const END_MARKER_SIZE: usize = 4;

/// Memory layout variants across format versions.
#[derive(Debug)]
pub enum MemoryImage {
    /// One 48 KiB image at $4000 (30-byte-header layout).
    Flat(Box<[u8; 3 * PAGE_SIZE]>),
    /// Self-describing 16 KiB pages (extended-header layout).
    Paged(Vec<Page>),
}

/// One 16 KiB page with its resolved destination address.
#[derive(Debug)]
pub struct Page {
    pub address: u16,
    pub data: Box<[u8; PAGE_SIZE]>,
}

/// A parsed .Z80 snapshot.
#[derive(Debug)]
pub struct Z80Snapshot {
    pub registers: Registers,
    pub pc: u16,
    /// Border colour (0-7).
    pub border: u8,
    pub memory: MemoryImage,
}

impl Z80Snapshot {
    /// Parse a .Z80 file, detecting the version from the header.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is truncated, the hardware mode is
    /// not a 48K-class machine, or a page targets the ROM or an
    /// unrecognised destination.
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        if data.len() < BASE_HEADER_SIZE {
            return Err(format!(
                "Z80 file too short: need at least {BASE_HEADER_SIZE} bytes, got {}",
                data.len()
            ));
        }

        let misc = effective_misc(data[12]);
        let registers = parse_base_header(data, misc);
        let border = (misc >> 1) & 0x07;

        // A zero PC field signals an extended header.
        let pc = word(data, 6);
        if pc != 0 {
            let memory = parse_flat_memory(data, misc)?;
            return Ok(Self {
                registers,
                pc,
                border,
                memory: MemoryImage::Flat(memory),
            });
        }

        if data.len() < BASE_HEADER_SIZE + 2 {
            return Err("Z80 file too short for the extended header length".to_string());
        }
        let extension_length = usize::from(word(data, 30));
        let header_end = BASE_HEADER_SIZE + 2 + extension_length;
        if data.len() < header_end {
            return Err(format!(
                "Z80 extended header truncated: need {header_end} bytes, got {}",
                data.len()
            ));
        }

        let pc = word(data, 32);
        let hardware = data[34];
        if !hardware_supported(extension_length, hardware) {
            return Err(format!(
                "unsupported hardware mode {hardware} — only 48K-class machines can be loaded"
            ));
        }

        let pages = parse_pages(&data[header_end..])?;
        Ok(Self {
            registers,
            pc,
            border,
            memory: MemoryImage::Paged(pages),
        })
    }
}

/// The misc byte at offset 12; the sentinel `0xFF` reads as 1.
fn effective_misc(raw: u8) -> u8 {
    if raw == 0xFF { 1 } else { raw }
}

/// Is this hardware mode a 48K-class machine?
///
/// An extension length of 23 marks the earlier extended revision, which
/// numbers its modes differently from the later one.
fn hardware_supported(extension_length: usize, hardware: u8) -> bool {
    if extension_length == 23 {
        matches!(hardware, 0 | 1)
    } else {
        matches!(hardware, 0 | 1 | 3)
    }
}

fn parse_base_header(data: &[u8], misc: u8) -> Registers {
    Registers {
        af: (u16::from(data[0]) << 8) | u16::from(data[1]),
        bc: word(data, 2),
        hl: word(data, 4),
        // PC at 6-7 is version detection; the caller resolves it.
        sp: word(data, 8),
        i: data[10],
        // R's top bit lives in the misc byte.
        r: (data[11] & 0x7F) | ((misc & 0x01) << 7),
        de: word(data, 13),
        bc_alt: word(data, 15),
        de_alt: word(data, 17),
        hl_alt: word(data, 19),
        af_alt: (u16::from(data[21]) << 8) | u16::from(data[22]),
        iy: word(data, 23),
        ix: word(data, 25),
        iff1: data[27] != 0,
        iff2: data[28] != 0,
        im: data[29] & 0x03,
    }
}

/// Version-1 memory: one 48 KiB image directly after the header.
fn parse_flat_memory(data: &[u8], misc: u8) -> Result<Box<[u8; 3 * PAGE_SIZE]>, String> {
    let mut memory = Box::new([0u8; 3 * PAGE_SIZE]);
    let compressed = misc & 0x20 != 0;

    if compressed {
        // The compressed stream ends with a 4-byte end marker that is
        // not part of the image.
        if data.len() < BASE_HEADER_SIZE + END_MARKER_SIZE {
            return Err("Z80 compressed image truncated".to_string());
        }
        let source = &data[BASE_HEADER_SIZE..data.len() - END_MARKER_SIZE];
        rle::decode(source, memory.as_mut_slice(), 0);
    } else {
        let source = &data[BASE_HEADER_SIZE..];
        let length = source.len().min(memory.len());
        memory[..length].copy_from_slice(&source[..length]);
    }

    Ok(memory)
}

/// Walk the 3-byte-prefixed page blocks until the end of the file.
fn parse_pages(mut data: &[u8]) -> Result<Vec<Page>, String> {
    let mut pages = Vec::new();

    while !data.is_empty() {
        if data.len() < 3 {
            return Err("Z80 page header truncated".to_string());
        }
        let length = word(data, 0);
        let number = data[2];
        let address = page_address(number)?;

        let mut page = Box::new([0u8; PAGE_SIZE]);
        let consumed = if length == UNCOMPRESSED {
            let Some(block) = data.get(3..3 + PAGE_SIZE) else {
                return Err(format!("uncompressed page {number} truncated"));
            };
            page.copy_from_slice(block);
            3 + PAGE_SIZE
        } else {
            let length = usize::from(length);
            let Some(block) = data.get(3..3 + length) else {
                return Err(format!("compressed page {number} truncated"));
            };
            rle::decode(block, page.as_mut_slice(), 0);
            3 + length
        };

        pages.push(Page {
            address,
            data: page,
        });
        data = &data[consumed..];
    }

    Ok(pages)
}

/// Map a page number to its fixed 16 KiB destination.
fn page_address(number: u8) -> Result<u16, String> {
    match number {
        4 => Ok(0x8000),
        5 => Ok(0xC000),
        8 => Ok(0x4000),
        0 => Err("page 0 is the system ROM — refusing to overwrite it".to_string()),
        n => Err(format!("unrecognised page number {n}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A version-1 header with distinctive register values.
    fn make_v1_header(pc: u16, misc: u8) -> Vec<u8> {
        let mut data = vec![0u8; BASE_HEADER_SIZE];
        data[0] = 0xAA; // A
        data[1] = 0x55; // F
        data[2] = 0x34; // C
        data[3] = 0x12; // B
        data[4] = 0x78; // L
        data[5] = 0x56; // H
        data[6] = pc as u8;
        data[7] = (pc >> 8) as u8;
        data[8] = 0x00; // SP low
        data[9] = 0x80; // SP high
        data[10] = 0x3F; // I
        data[11] = 0x42; // R bits 0-6
        data[12] = misc;
        data[27] = 1; // IFF1
        data[28] = 1; // IFF2
        data[29] = 1; // IM 1
        data
    }

    #[test]
    fn v1_uncompressed_parses_registers_and_memory() {
        let mut data = make_v1_header(0x0100, 0x04); // border 2, uncompressed
        let mut image = vec![0u8; 3 * PAGE_SIZE];
        image[0] = 0x40; // $4000
        image[PAGE_SIZE] = 0x80; // $8000
        image[2 * PAGE_SIZE] = 0xC0; // $C000
        data.extend_from_slice(&image);

        let snapshot = Z80Snapshot::parse(&data).expect("parse should succeed");
        assert_eq!(snapshot.pc, 0x0100);
        assert_eq!(snapshot.border, 2);
        assert_eq!(snapshot.registers.af, 0xAA55);
        assert_eq!(snapshot.registers.bc, 0x1234);
        assert_eq!(snapshot.registers.hl, 0x5678);
        assert_eq!(snapshot.registers.sp, 0x8000);
        assert_eq!(snapshot.registers.i, 0x3F);
        assert_eq!(snapshot.registers.r, 0x42);
        assert_eq!(snapshot.registers.im, 1);
        assert!(snapshot.registers.iff1);

        let MemoryImage::Flat(memory) = snapshot.memory else {
            panic!("v1 should produce a flat image");
        };
        assert_eq!(memory[0], 0x40);
        assert_eq!(memory[PAGE_SIZE], 0x80);
        assert_eq!(memory[2 * PAGE_SIZE], 0xC0);
    }

    #[test]
    fn v1_compressed_expands_and_drops_end_marker() {
        // Misc: bit 5 = compressed, border 3.
        let mut data = make_v1_header(0x0100, 0x26);
        data.extend_from_slice(&[0xED, 0xED, 10, 0xAA, 0x55, 0x66]);
        data.extend_from_slice(&[0x00, 0xED, 0xED, 0x00]); // end marker

        let snapshot = Z80Snapshot::parse(&data).expect("parse should succeed");
        assert_eq!(snapshot.border, 3);

        let MemoryImage::Flat(memory) = snapshot.memory else {
            panic!("v1 should produce a flat image");
        };
        for offset in 0..10 {
            assert_eq!(memory[offset], 0xAA, "offset {offset}");
        }
        assert_eq!(memory[10], 0x55);
        assert_eq!(memory[11], 0x66);
        assert_eq!(memory[12], 0x00, "end marker must not decode into the image");
    }

    #[test]
    fn misc_sentinel_ff_reads_as_one() {
        let mut data = make_v1_header(0x0100, 0xFF);
        data.extend_from_slice(&vec![0u8; 3 * PAGE_SIZE]);

        let snapshot = Z80Snapshot::parse(&data).expect("parse should succeed");
        // Effective misc 1: border 0, R bit 7 set, not compressed.
        assert_eq!(snapshot.border, 0);
        assert_eq!(snapshot.registers.r, 0x42 | 0x80);
        assert!(matches!(snapshot.memory, MemoryImage::Flat(_)));
    }

    /// An extended-header file with the given hardware mode and page blocks.
    fn make_extended(extension_length: u16, hardware: u8, blocks: &[u8]) -> Vec<u8> {
        let mut data = make_v1_header(0x0000, 0x04); // PC = 0 → extended
        data.push(extension_length as u8);
        data.push((extension_length >> 8) as u8);

        let mut extension = vec![0u8; usize::from(extension_length)];
        extension[0] = 0xCD; // PC low
        extension[1] = 0xAB; // PC high
        extension[2] = hardware;
        data.extend_from_slice(&extension);
        data.extend_from_slice(blocks);
        data
    }

    fn compressed_block(page: u8, payload: &[u8]) -> Vec<u8> {
        let mut block = vec![payload.len() as u8, (payload.len() >> 8) as u8, page];
        block.extend_from_slice(payload);
        block
    }

    #[test]
    fn extended_header_carries_pc() {
        let block = compressed_block(8, &[0x11]);
        let data = make_extended(23, 0, &block);

        let snapshot = Z80Snapshot::parse(&data).expect("parse should succeed");
        assert_eq!(snapshot.pc, 0xABCD);
    }

    #[test]
    fn pages_map_to_fixed_blocks() {
        let mut blocks = compressed_block(8, &[0x48]);
        blocks.extend_from_slice(&compressed_block(4, &[0x84]));
        blocks.extend_from_slice(&compressed_block(5, &[0xC5]));
        let data = make_extended(23, 0, &blocks);

        let snapshot = Z80Snapshot::parse(&data).expect("parse should succeed");
        let MemoryImage::Paged(pages) = snapshot.memory else {
            panic!("extended header should produce pages");
        };
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].address, 0x4000);
        assert_eq!(pages[0].data[0], 0x48);
        assert_eq!(pages[1].address, 0x8000);
        assert_eq!(pages[1].data[0], 0x84);
        assert_eq!(pages[2].address, 0xC000);
        assert_eq!(pages[2].data[0], 0xC5);
    }

    #[test]
    fn uncompressed_page_is_taken_raw() {
        let mut payload = vec![0u8; PAGE_SIZE];
        payload[0] = 0xED; // would be a marker in a compressed stream
        payload[1] = 0xED;
        payload[2] = 0x02;
        payload[3] = 0x99;
        payload[PAGE_SIZE - 1] = 0x77;

        let mut blocks = vec![0xFF, 0xFF, 8]; // length sentinel, page 8
        blocks.extend_from_slice(&payload);
        let data = make_extended(23, 0, &blocks);

        let snapshot = Z80Snapshot::parse(&data).expect("parse should succeed");
        let MemoryImage::Paged(pages) = snapshot.memory else {
            panic!("extended header should produce pages");
        };
        assert_eq!(&pages[0].data[..4], &[0xED, 0xED, 0x02, 0x99]);
        assert_eq!(pages[0].data[PAGE_SIZE - 1], 0x77);
    }

    #[test]
    fn page_zero_is_a_rom_overwrite_error() {
        let block = compressed_block(0, &[0x00]);
        let data = make_extended(23, 0, &block);

        let result = Z80Snapshot::parse(&data);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("ROM"));
    }

    #[test]
    fn unknown_page_numbers_are_fatal() {
        for page in [1, 2, 3, 6, 7, 9, 10, 11] {
            let block = compressed_block(page, &[0x00]);
            let data = make_extended(23, 0, &block);
            let result = Z80Snapshot::parse(&data);
            assert!(result.is_err(), "page {page} should be rejected");
        }
    }

    #[test]
    fn non_48k_hardware_is_rejected() {
        // Mode 3 means a 128K machine in the 23-byte revision.
        let block = compressed_block(8, &[0x00]);
        let data = make_extended(23, 3, &block);
        let result = Z80Snapshot::parse(&data);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("unsupported hardware"));

        // The later revision moves 48K+MGT to mode 3, so it is accepted...
        let block = compressed_block(8, &[0x00]);
        let data = make_extended(54, 3, &block);
        assert!(Z80Snapshot::parse(&data).is_ok());

        // ...and its 128K modes are not.
        let block = compressed_block(8, &[0x00]);
        let data = make_extended(54, 4, &block);
        assert!(Z80Snapshot::parse(&data).is_err());
    }

    #[test]
    fn truncated_page_block_is_an_error() {
        let mut blocks = vec![0x10, 0x00, 8]; // claims 16 bytes
        blocks.extend_from_slice(&[0x01, 0x02]); // provides 2
        let data = make_extended(23, 0, &blocks);

        let result = Z80Snapshot::parse(&data);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("truncated"));
    }

    #[test]
    fn too_short_file_is_an_error() {
        let result = Z80Snapshot::parse(&[0u8; 10]);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("too short"));
    }
}
