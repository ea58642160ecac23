//! Top-level decode: one opcode word in, one instruction's worth of
//! architectural state change out.
//!
//! The tree below is three levels deep: the
//! top `fn` field (bits 12-14) separates the dual-operand instructions from
//! everything else, a second `fn2` field (bits 8-11) picks apart the
//! single-operand/shift/JSR groups when `fn == 0`, and a final range check on
//! the low byte separates the system group, JMP and the RTS/CLcc/SEcc/SWAB
//! cluster from ordinary branches.

use crate::bits::{bit, bits};
use crate::cpu::Cpu;
use crate::error::Trap;
use crate::memory::Memory;

const VEC_RESERVED: u16 = 0o010;

/// Decodes and executes one instruction.
///
/// Returns `true` if the machine should keep running, `false` if it hit a
/// condition with no further instruction to execute (HALT, WAIT, RESET, or a
/// bus failure the trap sequence itself couldn't service). A trap is not an
/// error a caller must propagate — it's a normal outcome `step` resolves
/// internally (pushing PS/PC and loading the vector) before returning `true`,
/// the same way a real CPU never "fails" by taking a trap.
pub fn step(cpu: &mut Cpu, bus: &mut impl Memory, op: i16) -> bool {
    #[cfg(feature = "trace")]
    let pc_before = cpu.pc();

    match dispatch(cpu, bus, op) {
        Ok(()) => {
            #[cfg(feature = "trace")]
            log::trace!("retired {:#08o} at {:#06x}", op as u16, pc_before);
            true
        }
        Err(Trap::Vector(vec)) => {
            #[cfg(feature = "trace")]
            let (saved_pc, saved_ps) = (cpu.pc(), cpu.ps);
            let ok = cpu.enter_trap(bus, vec).is_ok();
            #[cfg(feature = "trace")]
            log::debug!(
                "trap to vector {:#06o}, saved pc={:#06x} ps={:#06x}",
                vec,
                saved_pc,
                saved_ps
            );
            ok
        }
        Err(Trap::HostFailure) => {
            #[cfg(feature = "trace")]
            log::trace!("host failure on {:#08o} at {:#06x}", op as u16, pc_before);
            false
        }
    }
}

fn dispatch(cpu: &mut Cpu, bus: &mut impl Memory, op: i16) -> Result<(), Trap> {
    let f = bits(op, 12, 3);
    match f {
        0 => dispatch_zero(cpu, bus, op),
        7 => Err(Trap::Vector(VEC_RESERVED)),
        6 => {
            // ADD/SUB: bit 15 picks the operation, not operand width — both
            // are word-only.
            cpu.dop(bus, op, false, f)
        }
        _ => {
            let byte = bit(op, 15) != 0;
            cpu.dop(bus, op, byte, f)
        }
    }
}

fn dispatch_zero(cpu: &mut Cpu, bus: &mut impl Memory, op: i16) -> Result<(), Trap> {
    let fn2 = bits(op, 8, 4);
    match fn2 {
        8 | 9 => dispatch_jsr_srv(cpu, bus, op),
        10 | 11 => {
            let byte = bit(op, 15) != 0;
            let sub = bits(op, 6, 3);
            cpu.sop(bus, op, byte, sub)
        }
        12 => {
            let byte = bit(op, 15) != 0;
            let sub = bits(op, 6, 2);
            cpu.shift(bus, op, byte, sub)
        }
        13..=15 => Err(Trap::Vector(VEC_RESERVED)),
        _ => {
            let uop = op as u16;
            if uop < 256 {
                dispatch_minor(cpu, bus, op)
            } else {
                let b_flag = bit(op, 15) != 0;
                cpu.bcc(op, b_flag);
                Ok(())
            }
        }
    }
}

fn dispatch_jsr_srv(cpu: &mut Cpu, bus: &mut impl Memory, op: i16) -> Result<(), Trap> {
    if bit(op, 15) == 0 {
        let reg = bits(op, 6, 3) as usize;
        cpu.jsr(bus, reg, op)
    } else {
        cpu.srv(op)
    }
}

fn dispatch_minor(cpu: &mut Cpu, bus: &mut impl Memory, op: i16) -> Result<(), Trap> {
    let uop = op as u16;
    if uop < 0o100 {
        match uop & 0o77 {
            0o02 => cpu.rti(bus),
            0o06 => cpu.rti(bus), // RTT: identical state transition to RTI here
            other => cpu.sys(other as i16),
        }
    } else if uop < 0o200 {
        cpu.jmp(bus, op)
    } else {
        match bits(op, 4, 4) {
            8 => {
                let reg = (uop & 7) as usize;
                cpu.rts(bus, reg)
            }
            9 => Err(Trap::Vector(VEC_RESERVED)), // SPL: no host privilege model
            10 => {
                cpu.clsecc(op, false);
                Ok(())
            }
            11 => {
                cpu.clsecc(op, true);
                Ok(())
            }
            _ => cpu.swab(bus, op),
        }
    }
}
