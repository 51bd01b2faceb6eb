//! Translates a 64-bit little-endian ELF image into an initial VM state
//! (spec §6, "ELF load"). This is a contract, not an algorithm the spec
//! dictates further, so the implementation is free to pick any loader
//! that satisfies it.

use elf::ElfBytes;
use elf::abi::PT_LOAD;
use elf::endian::LittleEndian;
use thiserror::Error;

use fpvm_memory::{Memory, PagedMemory};
use fpvm_state::Scalars;

const PAGE_SIZE: u64 = 4096;

#[derive(Debug, Error)]
pub enum ElfLoadError {
    #[error("not an ELF file (bad magic)")]
    NotElf,
    #[error("only 64-bit ELF images are supported")]
    Not64Bit,
    #[error("only little-endian ELF images are supported")]
    NotLittleEndian,
    #[error("malformed ELF: {0}")]
    Malformed(String),
}

impl From<elf::ParseError> for ElfLoadError {
    fn from(e: elf::ParseError) -> Self {
        ElfLoadError::Malformed(e.to_string())
    }
}

const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;

fn check_header(bytes: &[u8]) -> Result<(), ElfLoadError> {
    if bytes.len() < 16 || &bytes[0..4] != b"\x7fELF" {
        return Err(ElfLoadError::NotElf);
    }
    if bytes[EI_CLASS] != ELFCLASS64 {
        return Err(ElfLoadError::Not64Bit);
    }
    if bytes[EI_DATA] != ELFDATA2LSB {
        return Err(ElfLoadError::NotLittleEndian);
    }
    Ok(())
}

fn round_up_page(value: u64) -> u64 {
    value.div_ceil(PAGE_SIZE) * PAGE_SIZE
}

/// Loads `bytes` as a 64-bit little-endian ELF, writing every `PT_LOAD`
/// segment into a fresh [`PagedMemory`] and deriving the initial scalar
/// register file. Bytes past `p_filesz` within a segment's `p_memsz` are
/// left as zero, matching `PagedMemory`'s default-zero semantics.
pub fn load(bytes: &[u8]) -> Result<(Scalars, PagedMemory), ElfLoadError> {
    check_header(bytes)?;
    let file = ElfBytes::<LittleEndian>::minimal_parse(bytes)?;

    let mut memory = PagedMemory::new();
    let mut heap_watermark = 0u64;

    let segments = file
        .segments()
        .ok_or_else(|| ElfLoadError::Malformed("no program headers".into()))?;
    for segment in segments.iter().filter(|s| s.p_type == PT_LOAD) {
        let data = file.segment_data(&segment)?;
        for (i, byte) in data.iter().enumerate() {
            memory.write_u8(segment.p_vaddr.wrapping_add(i as u64), *byte);
        }
        let segment_end = segment.p_vaddr.wrapping_add(segment.p_memsz);
        heap_watermark = heap_watermark.max(segment_end);
    }
    memory.reset_touched();

    let mut scalars = Scalars::new();
    scalars.pc = file.ehdr.e_entry;
    scalars.heap = round_up_page(heap_watermark);
    scalars.exited = false;

    Ok((scalars, memory))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_elf_bytes() {
        assert!(matches!(load(b"not an elf"), Err(ElfLoadError::NotElf)));
    }

    #[test]
    fn rejects_32_bit_class() {
        let mut bytes = vec![0u8; 16];
        bytes[0..4].copy_from_slice(b"\x7fELF");
        bytes[EI_CLASS] = 1; // ELFCLASS32
        bytes[EI_DATA] = ELFDATA2LSB;
        assert!(matches!(load(&bytes), Err(ElfLoadError::Not64Bit)));
    }

    #[test]
    fn rejects_big_endian() {
        let mut bytes = vec![0u8; 16];
        bytes[0..4].copy_from_slice(b"\x7fELF");
        bytes[EI_CLASS] = ELFCLASS64;
        bytes[EI_DATA] = 2; // ELFDATA2MSB
        assert!(matches!(load(&bytes), Err(ElfLoadError::NotLittleEndian)));
    }
}
