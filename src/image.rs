//! V2 interchange-format snapshots.
//!
//! According to "Smalltalk-80: Virtual Image Version 2", Xerox PARC 1983,
//! and the Blue Book. Everything on disk is big-endian. The layout is a
//! 512-byte header, the object space, zero padding to the page after the
//! space, the object table, and a 10-byte trailer with five fixed bytes.

use crate::error::ImageError;
use crate::memory::ObjectMemory;

use bitflags::bitflags;
use tracing::debug;

/// File page size; the header fills exactly one page.
const PAGE: usize = 512;

/// Fixed trailer bytes at offsets 3, 6, 7, 8 and 9.
const TRAILER: [(usize, u8); 5] = [(3, 0x20), (6, 0x01), (7, 0x43), (8, 0xf3), (9, 0x3b)];

bitflags! {
    /// High bits of an object-table entry's flag byte; the low nibble is
    /// the 64k-word segment number.
    struct EntryFlags: u8 {
        const ODD = 0x80;
        const POINTERS = 0x40;
        const FREE = 0x20;
    }
}

fn read_u32(bytes: &[u8], off: usize) -> u32 {
    (u32::from(bytes[off]) << 24)
        | (u32::from(bytes[off + 1]) << 16)
        | (u32::from(bytes[off + 2]) << 8)
        | u32::from(bytes[off + 3])
}

fn read_u16(bytes: &[u8], off: usize) -> u16 {
    (u16::from(bytes[off]) << 8) | u16::from(bytes[off + 1])
}

/// Parse a snapshot into a populated object memory.
pub fn load(bytes: &[u8]) -> Result<ObjectMemory, ImageError> {
    if bytes.len() < PAGE + 10 {
        return Err(ImageError::InvalidImage("shorter than header and trailer"));
    }

    let space_len = read_u32(bytes, 0) as usize * 2;
    let table_len = read_u32(bytes, 4) as usize * 2;
    if read_u16(bytes, 8) != 0 {
        return Err(ImageError::InvalidImage("format tag is not zero"));
    }

    let trailer = &bytes[bytes.len() - 10..];
    if TRAILER.iter().any(|&(off, value)| trailer[off] != value) {
        return Err(ImageError::InvalidImage("bad trailer"));
    }

    debug!(space_len, table_len, "reading snapshot");

    let space = bytes
        .get(PAGE..PAGE + space_len)
        .ok_or(ImageError::InvalidImage("object space truncated"))?;

    // The table begins on the page after the last (possibly partial)
    // page of the object space.
    let table_offset = PAGE + (space_len / PAGE + 1) * PAGE;
    let table = bytes
        .get(table_offset..table_offset + table_len)
        .ok_or(ImageError::InvalidImage("object table truncated"))?;

    let mut memory = ObjectMemory::new();
    let mut loaded = 0usize;

    for (entry, chunk) in table.chunks_exact(4).enumerate() {
        let flags = EntryFlags::from_bits_truncate(chunk[1]);
        if flags.contains(EntryFlags::FREE) {
            continue;
        }
        let segment = u32::from(chunk[1] & 0xf);
        let location = u32::from(read_u16(chunk, 2));
        // each segment holds 64k words, so the byte address gets 17 bits
        let address = ((segment << 17) | (location << 1)) as usize;

        let corrupt = |address: usize| ImageError::CorruptImage {
            entry,
            address: address as u32,
            space_len: space_len as u32,
        };

        if address + 4 > space.len() {
            return Err(corrupt(address));
        }
        let word_size = read_u16(space, address) as usize;
        if word_size < 2 {
            return Err(corrupt(address));
        }
        let payload_bytes = (word_size - 2) * 2;
        let class = read_u16(space, address + 2);
        let payload = space
            .get(address + 4..address + 4 + payload_bytes)
            .ok_or_else(|| corrupt(address))?;

        memory.install_object(
            entry,
            class,
            payload,
            flags.contains(EntryFlags::ODD),
            flags.contains(EntryFlags::POINTERS),
        );
        loaded += 1;
    }

    debug!(loaded, "snapshot loaded");

    Ok(memory)
}

/// Serialize the live objects back into the interchange format. The
/// inverse of [`load`] up to the packing order of the object space.
pub fn write(memory: &ObjectMemory) -> Vec<u8> {
    let live = memory.live_oops();
    let entries = live
        .last()
        .map(|&oop| (oop >> 1) as usize + 1)
        .unwrap_or(0);

    let mut space: Vec<u8> = Vec::new();
    let mut table = vec![0u8; entries * 4];

    // free entries stay flagged free; live ones record their address
    for chunk in table.chunks_exact_mut(4) {
        chunk[1] = EntryFlags::FREE.bits();
    }

    for oop in live {
        let (class, odd, pointers) = memory
            .slot_info(oop)
            .expect("live oop has a slot");
        let words = memory.words_of(oop).expect("live oop has a payload");

        let address = space.len();
        let word_size = words.len() + 2;
        space.extend_from_slice(&(word_size as u16).to_be_bytes());
        space.extend_from_slice(&class.to_be_bytes());
        for word in &words {
            space.extend_from_slice(&word.to_be_bytes());
        }

        let mut flags = EntryFlags::empty();
        if odd {
            flags |= EntryFlags::ODD;
        }
        if pointers {
            flags |= EntryFlags::POINTERS;
        }
        let segment = (address >> 17) as u8;
        let location = ((address >> 1) & 0xffff) as u16;

        let entry = (oop >> 1) as usize * 4;
        table[entry] = 0;
        table[entry + 1] = flags.bits() | segment;
        table[entry + 2..entry + 4].copy_from_slice(&location.to_be_bytes());
    }

    let mut out = Vec::with_capacity(PAGE + space.len() + table.len() + PAGE + 10);
    out.extend_from_slice(&((space.len() / 2) as u32).to_be_bytes());
    out.extend_from_slice(&((table.len() / 2) as u32).to_be_bytes());
    out.resize(PAGE, 0);

    out.extend_from_slice(&space);
    let table_offset = PAGE + (space.len() / PAGE + 1) * PAGE;
    out.resize(table_offset, 0);
    out.extend_from_slice(&table);

    let mut trailer = [0u8; 10];
    for (off, value) in TRAILER {
        trailer[off] = value;
    }
    out.extend_from_slice(&trailer);
    out
}

/// Load, preserving the OOP of every on-disk object; convenience for the
/// snapshot primitive's path bookkeeping lives with the interpreter.
pub fn load_file(path: &std::path::Path) -> Result<ObjectMemory, ImageError> {
    let bytes = std::fs::read(path)?;
    load(&bytes)
}
