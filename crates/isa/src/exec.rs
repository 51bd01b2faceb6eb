//! Instruction execution (spec §4.E steps 3-5): RV64I + M + zifencei +
//! zicsr-stub semantics shared verbatim between the fast and slow
//! evaluators, since both are generic over [`Memory`].

use fpvm_memory::Memory;
use fpvm_preimage::PreimageSource;
use fpvm_state::Scalars;

use crate::decode::Decoded;
use crate::error::IsaError;
use crate::syscalls;

const OP_LOAD: u32 = 0x03;
const OP_FENCE: u32 = 0x0F;
const OP_IMM: u32 = 0x13;
const OP_AUIPC: u32 = 0x17;
const OP_IMM_32: u32 = 0x1B;
const OP_STORE: u32 = 0x23;
const OP_REG: u32 = 0x33;
const OP_LUI: u32 = 0x37;
const OP_REG_32: u32 = 0x3B;
const OP_BRANCH: u32 = 0x63;
const OP_JALR: u32 = 0x67;
const OP_JAL: u32 = 0x6F;
const OP_SYSTEM: u32 = 0x73;

fn sext32(v: u32) -> u64 {
    v as i32 as i64 as u64
}

fn signed_div_rem(a: i64, b: i64) -> (i64, i64) {
    if b == 0 {
        (-1, a)
    } else if a == i64::MIN && b == -1 {
        (i64::MIN, 0)
    } else {
        (a.wrapping_div(b), a.wrapping_rem(b))
    }
}

fn unsigned_div_rem(a: u64, b: u64) -> (u64, u64) {
    if b == 0 {
        (u64::MAX, a)
    } else {
        (a / b, a % b)
    }
}

fn signed_div_rem32(a: i32, b: i32) -> (i32, i32) {
    if b == 0 {
        (-1, a)
    } else if a == i32::MIN && b == -1 {
        (i32::MIN, 0)
    } else {
        (a.wrapping_div(b), a.wrapping_rem(b))
    }
}

fn unsigned_div_rem32(a: u32, b: u32) -> (u32, u32) {
    if b == 0 {
        (u32::MAX, a)
    } else {
        (a / b, a % b)
    }
}

/// Executes the single instruction at `scalars.pc`, mutating `scalars` and
/// `mem` in place. A no-op once `scalars.exited` is set (spec §3 invariant).
pub fn step<M: Memory>(
    scalars: &mut Scalars,
    mem: &mut M,
    oracle: &dyn PreimageSource,
) -> Result<(), IsaError> {
    if scalars.exited {
        return Ok(());
    }

    let pc = scalars.pc;
    let raw = mem.read_u32(pc);
    let d = Decoded::decode(raw);
    let mut next_pc = pc.wrapping_add(4);

    match d.opcode {
        OP_LUI => scalars.set_register(d.rd, d.imm_u() as u64),
        OP_AUIPC => scalars.set_register(d.rd, pc.wrapping_add(d.imm_u() as u64)),
        OP_JAL => {
            scalars.set_register(d.rd, next_pc);
            next_pc = pc.wrapping_add(d.imm_j() as u64);
        }
        OP_JALR => {
            let target = (scalars.get_register(d.rs1).wrapping_add(d.imm_i() as u64)) & !1u64;
            scalars.set_register(d.rd, next_pc);
            next_pc = target;
        }
        OP_BRANCH => {
            let rs1 = scalars.get_register(d.rs1);
            let rs2 = scalars.get_register(d.rs2);
            let taken = match d.funct3 {
                0b000 => rs1 == rs2,
                0b001 => rs1 != rs2,
                0b100 => (rs1 as i64) < (rs2 as i64),
                0b101 => (rs1 as i64) >= (rs2 as i64),
                0b110 => rs1 < rs2,
                0b111 => rs1 >= rs2,
                _ => return Err(IsaError::Unsupported(raw)),
            };
            if taken {
                next_pc = pc.wrapping_add(d.imm_b() as u64);
            }
        }
        OP_LOAD => exec_load(scalars, mem, &d, raw)?,
        OP_STORE => exec_store(scalars, mem, &d, raw)?,
        OP_IMM => exec_imm(scalars, &d, raw)?,
        OP_IMM_32 => exec_imm32(scalars, &d, raw)?,
        OP_REG => exec_reg(scalars, &d, raw)?,
        OP_REG_32 => exec_reg32(scalars, &d, raw)?,
        OP_FENCE => {}
        OP_SYSTEM => exec_system(scalars, mem, oracle, &d, raw)?,
        _ => return Err(IsaError::Unsupported(raw)),
    }

    if scalars.exited {
        // EBREAK/exit syscalls settle pc where they stood; further steps
        // are no-ops per the terminal invariant.
    } else {
        scalars.pc = next_pc;
    }
    scalars.step = scalars.step.wrapping_add(1);
    Ok(())
}

fn exec_load<M: Memory>(scalars: &mut Scalars, mem: &mut M, d: &Decoded, raw: u32) -> Result<(), IsaError> {
    let addr = scalars.get_register(d.rs1).wrapping_add(d.imm_i() as u64);
    let value = match d.funct3 {
        0b000 => mem.read_u8(addr) as i8 as i64 as u64,
        0b001 => mem.read_u16(addr) as i16 as i64 as u64,
        0b010 => mem.read_u32(addr) as i32 as i64 as u64,
        0b011 => mem.read_u64(addr),
        0b100 => mem.read_u8(addr) as u64,
        0b101 => mem.read_u16(addr) as u64,
        0b110 => mem.read_u32(addr) as u64,
        _ => return Err(IsaError::Unsupported(raw)),
    };
    scalars.set_register(d.rd, value);
    Ok(())
}

fn exec_store<M: Memory>(scalars: &mut Scalars, mem: &mut M, d: &Decoded, raw: u32) -> Result<(), IsaError> {
    let addr = scalars.get_register(d.rs1).wrapping_add(d.imm_s() as u64);
    let value = scalars.get_register(d.rs2);
    match d.funct3 {
        0b000 => mem.write_u8(addr, value as u8),
        0b001 => mem.write_u16(addr, value as u16),
        0b010 => mem.write_u32(addr, value as u32),
        0b011 => mem.write_u64(addr, value),
        _ => return Err(IsaError::Unsupported(raw)),
    }
    Ok(())
}

fn exec_imm(scalars: &mut Scalars, d: &Decoded, raw: u32) -> Result<(), IsaError> {
    let rs1 = scalars.get_register(d.rs1);
    let imm = d.imm_i();
    let result = match d.funct3 {
        0b000 => rs1.wrapping_add(imm as u64),
        0b010 => ((rs1 as i64) < imm) as u64,
        0b011 => (rs1 < (imm as u64)) as u64,
        0b100 => rs1 ^ (imm as u64),
        0b110 => rs1 | (imm as u64),
        0b111 => rs1 & (imm as u64),
        0b001 => rs1 << d.shamt64(),
        0b101 => {
            if raw & (1 << 30) != 0 {
                ((rs1 as i64) >> d.shamt64()) as u64
            } else {
                rs1 >> d.shamt64()
            }
        }
        _ => return Err(IsaError::Unsupported(raw)),
    };
    scalars.set_register(d.rd, result);
    Ok(())
}

fn exec_imm32(scalars: &mut Scalars, d: &Decoded, raw: u32) -> Result<(), IsaError> {
    let rs1 = scalars.get_register(d.rs1) as u32;
    let imm = d.imm_i() as i32;
    let result = match d.funct3 {
        0b000 => sext32(rs1.wrapping_add(imm as u32)),
        0b001 => sext32(rs1 << d.shamt32()),
        0b101 => {
            if raw & (1 << 30) != 0 {
                sext32(((rs1 as i32) >> d.shamt32()) as u32)
            } else {
                sext32(rs1 >> d.shamt32())
            }
        }
        _ => return Err(IsaError::Unsupported(raw)),
    };
    scalars.set_register(d.rd, result);
    Ok(())
}

fn exec_reg(scalars: &mut Scalars, d: &Decoded, raw: u32) -> Result<(), IsaError> {
    let rs1 = scalars.get_register(d.rs1);
    let rs2 = scalars.get_register(d.rs2);
    let shamt = (rs2 & 0x3f) as u32;
    let result = match (d.funct7, d.funct3) {
        (0x00, 0b000) => rs1.wrapping_add(rs2),
        (0x20, 0b000) => rs1.wrapping_sub(rs2),
        (0x00, 0b001) => rs1 << shamt,
        (0x00, 0b010) => ((rs1 as i64) < (rs2 as i64)) as u64,
        (0x00, 0b011) => (rs1 < rs2) as u64,
        (0x00, 0b100) => rs1 ^ rs2,
        (0x00, 0b101) => rs1 >> shamt,
        (0x20, 0b101) => ((rs1 as i64) >> shamt) as u64,
        (0x00, 0b110) => rs1 | rs2,
        (0x00, 0b111) => rs1 & rs2,
        (0x01, 0b000) => rs1.wrapping_mul(rs2),
        (0x01, 0b001) => (((rs1 as i64 as i128) * (rs2 as i64 as i128)) >> 64) as u64,
        (0x01, 0b010) => (((rs1 as i64 as i128) * (rs2 as u128 as i128)) >> 64) as u64,
        (0x01, 0b011) => (((rs1 as u128) * (rs2 as u128)) >> 64) as u64,
        (0x01, 0b100) => signed_div_rem(rs1 as i64, rs2 as i64).0 as u64,
        (0x01, 0b101) => unsigned_div_rem(rs1, rs2).0,
        (0x01, 0b110) => signed_div_rem(rs1 as i64, rs2 as i64).1 as u64,
        (0x01, 0b111) => unsigned_div_rem(rs1, rs2).1,
        _ => return Err(IsaError::Unsupported(raw)),
    };
    scalars.set_register(d.rd, result);
    Ok(())
}

fn exec_reg32(scalars: &mut Scalars, d: &Decoded, raw: u32) -> Result<(), IsaError> {
    let rs1 = scalars.get_register(d.rs1) as u32;
    let rs2 = scalars.get_register(d.rs2) as u32;
    let shamt = rs2 & 0x1f;
    let result = match (d.funct7, d.funct3) {
        (0x00, 0b000) => sext32(rs1.wrapping_add(rs2)),
        (0x20, 0b000) => sext32(rs1.wrapping_sub(rs2)),
        (0x00, 0b001) => sext32(rs1 << shamt),
        (0x00, 0b101) => sext32(rs1 >> shamt),
        (0x20, 0b101) => sext32(((rs1 as i32) >> shamt) as u32),
        (0x01, 0b000) => sext32(rs1.wrapping_mul(rs2)),
        (0x01, 0b100) => sext32(signed_div_rem32(rs1 as i32, rs2 as i32).0 as u32),
        (0x01, 0b101) => sext32(unsigned_div_rem32(rs1, rs2).0),
        (0x01, 0b110) => sext32(signed_div_rem32(rs1 as i32, rs2 as i32).1 as u32),
        (0x01, 0b111) => sext32(unsigned_div_rem32(rs1, rs2).1),
        _ => return Err(IsaError::Unsupported(raw)),
    };
    scalars.set_register(d.rd, result);
    Ok(())
}

fn exec_system<M: Memory>(
    scalars: &mut Scalars,
    mem: &mut M,
    oracle: &dyn PreimageSource,
    d: &Decoded,
    raw: u32,
) -> Result<(), IsaError> {
    match d.funct3 {
        0b000 => match d.imm_i() {
            0 => {
                let number = scalars.get_register(17);
                syscalls::dispatch(scalars, mem, oracle, number)?;
            }
            1 => {
                scalars.exited = true;
                scalars.exit_code = 2;
            }
            _ => return Err(IsaError::Unsupported(raw)),
        },
        // CSRRW/S/C and their immediate forms: stubbed at zero, per the
        // minimal privilege model this core needs.
        0b001..=0b011 | 0b101..=0b111 => {
            scalars.set_register(d.rd, 0);
        }
        _ => return Err(IsaError::Unsupported(raw)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpvm_memory::PagedMemory;
    use fpvm_preimage::PreimageOracle;

    fn run_one(mem: &mut PagedMemory, scalars: &mut Scalars) {
        let oracle = PreimageOracle::new();
        step(scalars, mem, &oracle).unwrap();
    }

    #[test]
    fn addi_sets_register_and_advances_pc() {
        let mut mem = PagedMemory::new();
        mem.write_u32(0x1000, 0x1230_0093); // ADDI x1, x0, 0x123
        let mut scalars = Scalars::new();
        scalars.pc = 0x1000;
        run_one(&mut mem, &mut scalars);
        assert_eq!(scalars.get_register(1), 0x123);
        assert_eq!(scalars.pc, 0x1004);
        assert_eq!(scalars.step, 1);
    }

    #[test]
    fn store_then_load_round_trips() {
        let mut mem = PagedMemory::new();
        // SD x1, 0(x2); LD x3, 0(x2)
        mem.write_u32(0x1000, 0x0011_3023); // SD x1, 0(x2)
        mem.write_u32(0x1004, 0x0001_3183); // LD x3, 0(x2)
        let mut scalars = Scalars::new();
        scalars.pc = 0x1000;
        scalars.set_register(1, 0xDEAD_BEEF_CAFE_BABE);
        scalars.set_register(2, 0x2000);
        run_one(&mut mem, &mut scalars);
        run_one(&mut mem, &mut scalars);
        assert_eq!(scalars.get_register(3), 0xDEAD_BEEF_CAFE_BABE);
    }

    #[test]
    fn div_by_zero_returns_all_ones_quotient() {
        let (q, r) = unsigned_div_rem(7, 0);
        assert_eq!(q, u64::MAX);
        assert_eq!(r, 7);
        let (qs, rs) = signed_div_rem(-7, 0);
        assert_eq!(qs, -1);
        assert_eq!(rs, -7);
    }

    #[test]
    fn signed_div_overflow_returns_dividend() {
        let (q, r) = signed_div_rem(i64::MIN, -1);
        assert_eq!(q, i64::MIN);
        assert_eq!(r, 0);
    }

    #[test]
    fn ecall_exit_sets_exited_and_is_idempotent() {
        let mut mem = PagedMemory::new();
        mem.write_u32(0x1000, 0x0000_0073); // ECALL
        let mut scalars = Scalars::new();
        scalars.pc = 0x1000;
        scalars.set_register(17, 93); // exit_group
        scalars.set_register(10, 5);
        run_one(&mut mem, &mut scalars);
        assert!(scalars.exited);
        assert_eq!(scalars.exit_code, 5);
        let root_pc = scalars.pc;
        let root_step = scalars.step;
        run_one(&mut mem, &mut scalars);
        assert_eq!(scalars.pc, root_pc);
        assert_eq!(scalars.step, root_step);
    }
}
