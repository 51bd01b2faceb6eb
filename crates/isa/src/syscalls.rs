//! Minimal syscall shim (spec §4.E "Syscalls"): just enough POSIX surface
//! for bare RISC-V test binaries to exit, grow the heap, and exchange
//! pre-image data with the driver.

use fpvm_memory::Memory;
use fpvm_preimage::{PreimageOracleError, PreimageSource, read_window};
use fpvm_state::Scalars;

use crate::error::IsaError;

const SYS_EXIT: u64 = 94;
const SYS_EXIT_GROUP: u64 = 93;
const SYS_READ: u64 = 63;
const SYS_WRITE: u64 = 64;
const SYS_FCNTL: u64 = 25;
const SYS_CLOSE: u64 = 57;
const SYS_OPENAT: u64 = 56;
const SYS_CLOCK_GETTIME: u64 = 113;
const SYS_SCHED_YIELD: u64 = 124;
const SYS_GETUID: u64 = 174;
const SYS_GETPID: u64 = 172;
const SYS_BRK: u64 = 214;
const SYS_MMAP: u64 = 222;
const SYS_PPOLL: u64 = 73;

pub const PREIMAGE_READ_FD: u64 = 5;
pub const PREIMAGE_HINT_FD: u64 = 3;
pub const HINT_WRITE_FD: u64 = 4;
pub const PREIMAGE_KEY_FD: u64 = 6;

const ENOSYS: i64 = -38;
const EBADF: i64 = -9;
const EINVAL: i64 = -22;

/// Page size used by `brk`/`mmap`'s rounding, matching the ELF loader's.
const PAGE_SIZE: u64 = 4096;

fn round_up_page(value: u64) -> u64 {
    value.div_ceil(PAGE_SIZE) * PAGE_SIZE
}

/// Dispatches the `ECALL` raised with `scalars.registers` holding the
/// syscall ABI (`a7`=number is not modeled here; callers pass the number
/// directly, matching how `exec` reads it out of `x17`).
pub fn dispatch<M: Memory>(
    scalars: &mut Scalars,
    mem: &mut M,
    oracle: &dyn PreimageSource,
    number: u64,
) -> Result<(), IsaError> {
    let a0 = scalars.get_register(10);
    let a1 = scalars.get_register(11);
    let a2 = scalars.get_register(12);

    tracing::debug!(number, a0, a1, a2, "dispatching syscall");
    let result = match number {
        SYS_EXIT | SYS_EXIT_GROUP => {
            scalars.exited = true;
            scalars.exit_code = (a0 & 0xFF) as u8;
            a0 as i64
        }
        SYS_BRK => {
            let result = scalars.heap;
            if a0 != 0 {
                scalars.heap = a0;
            }
            result as i64
        }
        SYS_MMAP => {
            let fd = scalars.get_register(14) as i64; // a4: mmap's fd argument
            if fd != -1 {
                EINVAL
            } else {
                let prev = scalars.heap;
                scalars.heap = scalars.heap.wrapping_add(round_up_page(a1));
                prev as i64
            }
        }
        SYS_READ => read_preimage(scalars, mem, oracle, a0, a1, a2)?,
        SYS_WRITE => write_fd(scalars, mem, a0, a1, a2),
        SYS_CLOCK_GETTIME
        | SYS_GETUID
        | SYS_GETPID
        | SYS_SCHED_YIELD
        | SYS_PPOLL
        | SYS_FCNTL
        | SYS_OPENAT
        | SYS_CLOSE => 0,
        _ => ENOSYS,
    };

    scalars.set_register(10, result as u64);
    Ok(())
}

fn read_preimage<M: Memory>(
    scalars: &mut Scalars,
    mem: &mut M,
    oracle: &dyn PreimageSource,
    fd: u64,
    buf: u64,
    count: u64,
) -> Result<i64, IsaError> {
    if fd != PREIMAGE_READ_FD {
        return Ok(0);
    }
    match read_window(oracle, &scalars.preimage_key, scalars.preimage_offset) {
        Ok((window, consumed)) => {
            let to_copy = consumed.min(count).min(32);
            for i in 0..to_copy {
                mem.write_u8(buf.wrapping_add(i), window[i as usize]);
            }
            scalars.preimage_offset = scalars.preimage_offset.wrapping_add(to_copy);
            Ok(to_copy as i64)
        }
        Err(PreimageOracleError::PartOffsetOOB { .. }) => Ok(0),
        Err(e @ (PreimageOracleError::UnknownKeyType(_) | PreimageOracleError::PreimageMissing(_))) => {
            Err(e.into())
        }
    }
}

fn write_fd<M: Memory>(scalars: &mut Scalars, mem: &mut M, fd: u64, buf: u64, count: u64) -> i64 {
    if fd == PREIMAGE_HINT_FD || fd == HINT_WRITE_FD {
        return count as i64;
    }
    if fd == PREIMAGE_KEY_FD {
        // A prior key finished accumulating (write_len saturated at 32).
        // Starting a new write here begins a fresh key rather than refusing
        // every subsequent write forever.
        if scalars.preimage_key_write_len >= 32 {
            scalars.preimage_key_write_len = 0;
        }
        let mut offset = scalars.preimage_key_write_len as u64;
        let mut written = 0u64;
        while written < count && offset < 32 {
            let byte = mem.read_u8(buf.wrapping_add(written));
            // Shift the key left and append, so a partial accumulation of
            // fewer than 32 bytes still ends with the most recent bytes in
            // the low positions once it commits.
            for i in 0..31 {
                scalars.preimage_key[i as usize] = scalars.preimage_key[i as usize + 1];
            }
            scalars.preimage_key[31] = byte;
            offset += 1;
            written += 1;
        }
        scalars.preimage_key_write_len = offset.min(32) as u8;
        if scalars.preimage_key_write_len == 32 {
            scalars.preimage_offset = 0;
        }
        return written as i64;
    }
    EBADF
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpvm_memory::PagedMemory;
    use fpvm_preimage::PreimageOracle;

    #[test]
    fn exit_sets_terminal_state() {
        let mut scalars = Scalars::new();
        let mut mem = PagedMemory::new();
        let oracle = PreimageOracle::new();
        scalars.set_register(10, 7);
        dispatch(&mut scalars, &mut mem, &oracle, SYS_EXIT).unwrap();
        assert!(scalars.exited);
        assert_eq!(scalars.exit_code, 7);
    }

    #[test]
    fn brk_query_then_grow() {
        let mut scalars = Scalars::new();
        scalars.heap = 0x2000;
        let mut mem = PagedMemory::new();
        let oracle = PreimageOracle::new();
        scalars.set_register(10, 0);
        dispatch(&mut scalars, &mut mem, &oracle, SYS_BRK).unwrap();
        assert_eq!(scalars.get_register(10), 0x2000);
        scalars.set_register(10, 0x3000);
        dispatch(&mut scalars, &mut mem, &oracle, SYS_BRK).unwrap();
        assert_eq!(scalars.heap, 0x3000);
    }

    #[test]
    fn unknown_syscall_returns_enosys() {
        let mut scalars = Scalars::new();
        let mut mem = PagedMemory::new();
        let oracle = PreimageOracle::new();
        dispatch(&mut scalars, &mut mem, &oracle, 999).unwrap();
        assert_eq!(scalars.get_register(10) as i64, ENOSYS);
    }

    #[test]
    fn key_fd_accepts_a_second_key_after_the_first_commits() {
        let mut scalars = Scalars::new();
        let mut mem = PagedMemory::new();
        for i in 0..32u64 {
            mem.write_u8(0x4000 + i, 0xAA);
            mem.write_u8(0x5000 + i, 0xBB);
        }

        let first = write_fd(&mut scalars, &mut mem, PREIMAGE_KEY_FD, 0x4000, 32);
        assert_eq!(first, 32);
        assert_eq!(scalars.preimage_key_write_len, 32);
        let first_key = scalars.preimage_key;

        // Without a reset, write_len stuck at 32 would make every further
        // write to fd 6 return 0 forever.
        let second = write_fd(&mut scalars, &mut mem, PREIMAGE_KEY_FD, 0x5000, 32);
        assert_eq!(second, 32);
        assert_eq!(scalars.preimage_key_write_len, 32);
        assert_ne!(scalars.preimage_key, first_key);
    }
}
