//! Instruction semantics, grouped the way the decode tree in `step.rs`
//! branches: flow control, single-operand, shift, dual-operand and flag ops.
//!
//! Every function here takes `&mut Cpu` and `&mut impl Memory` and returns
//! `Result<(), Trap>`. A `Trap::Vector(v)` returned from one of these is not
//! an error from this module's point of view — it is `step`'s cue to run the
//! trap sequence — so these functions never catch it themselves, only `?`
//! it upward.

use crate::alu;
use crate::cond;
use crate::error::Trap;
use crate::flags::{C, N, V, Z};
use crate::memory::Memory;

const VEC_RESERVED: u16 = 0o010;
const VEC_BPT: u16 = 0o014;
const VEC_IOT: u16 = 0o020;
const VEC_EMT: u16 = 0o030;
const VEC_TRAP: u16 = 0o034;

impl crate::cpu::Cpu {
    /// Runs the trap sequence for vector `vec`: push PS, push PC, then load
    /// PC and PS from the two words at `vec`/`vec+2`.
    pub fn enter_trap(&mut self, bus: &mut impl Memory, vec: u16) -> Result<(), Trap> {
        let old_ps = self.ps as i16;
        let old_pc = self.pc() as i16;
        self.push(bus, old_ps)?;
        self.push(bus, old_pc)?;
        let new_pc = bus.read_word(vec)?;
        let new_ps = bus.read_word(vec.wrapping_add(2))?;
        self.wbg(7, new_pc as i16);
        self.ps = new_ps;
        Ok(())
    }

    /// RTI/RTT: pop PC then PS, the mirror image of `enter_trap`'s pushes.
    pub fn rti(&mut self, bus: &mut impl Memory) -> Result<(), Trap> {
        let pc = self.pop(bus)?;
        let ps = self.pop(bus)?;
        self.wbg(7, pc);
        self.ps = ps as u16;
        Ok(())
    }

    /// The system group (opcodes 000000-000077) minus RTI/RTT, which the
    /// caller intercepts before reaching here since they need the full `&mut
    /// Memory` stack-pop dance rather than a plain state transition: HALT,
    /// WAIT, BPT, IOT, RESET and the reserved rest of the group.
    pub fn sys(&mut self, op: i16) -> Result<(), Trap> {
        match (op as u16) & 0o77 {
            0o00 => Err(Trap::HostFailure), // HALT: nothing left for the host to do
            0o01 => Err(Trap::HostFailure), // WAIT: no pending interrupt source to wait for
            0o03 => Err(Trap::Vector(VEC_BPT)),
            0o04 => Err(Trap::Vector(VEC_IOT)),
            0o05 => Err(Trap::HostFailure), // RESET: nothing left for the host to do
            _ => Err(Trap::Vector(VEC_RESERVED)),
        }
    }

    /// JMP dst — loads PC with the operand's effective address. Register
    /// mode (the operand would be a register, not an address) is not a
    /// legal destination; real hardware traps it as illegal and reserved.
    pub fn jmp(&mut self, bus: &mut impl Memory, dst_spec: i16) -> Result<(), Trap> {
        let addr = self.fetch_operand_addr(bus, dst_spec)?;
        self.wbg(7, addr as i16);
        Ok(())
    }

    /// RTS reg: PC comes from `reg`, then `reg` is reloaded from the stack.
    pub fn rts(&mut self, bus: &mut impl Memory, reg: usize) -> Result<(), Trap> {
        let new_pc = self.r[reg];
        let popped = self.pop(bus)?;
        self.wbg(7, new_pc);
        self.wbg(reg, popped);
        Ok(())
    }

    /// JSR reg,dst — pushes `reg`, sets `reg` to the old PC (the return
    /// address), then jumps to dst's effective address.
    pub fn jsr(&mut self, bus: &mut impl Memory, reg: usize, dst_spec: i16) -> Result<(), Trap> {
        let dest = self.fetch_operand_addr(bus, dst_spec)?;
        let link = self.r[reg];
        self.push(bus, link)?;
        self.wbg(reg, self.pc() as i16);
        self.wbg(7, dest as i16);
        Ok(())
    }

    /// EMT/TRAP: software traps distinguished by opcode bit 8.
    pub fn srv(&mut self, op: i16) -> Result<(), Trap> {
        if crate::bits::bit(op, 8) == 0 {
            Err(Trap::Vector(VEC_EMT))
        } else {
            Err(Trap::Vector(VEC_TRAP))
        }
    }

    /// Bcc: advances PC by the sign-extended byte offset (doubled) when the
    /// branch's condition, evaluated against the current PSW, holds.
    pub fn bcc(&mut self, op: i16, b_flag: bool) {
        if cond::branch_taken(self.ps, op, b_flag) {
            let offset = (op as i8) as i16 as u16;
            let pc = self.pc();
            self.wbg(7, pc.wrapping_add(offset.wrapping_mul(2)) as i16);
        }
    }

    /// Resolves a destination specifier to its effective address without
    /// reading through it — used by JMP/JSR, which only ever want the
    /// address, never the value stored there. Register-mode destinations are
    /// illegal here; real hardware traps this as reserved.
    fn fetch_operand_addr(&mut self, bus: &mut impl Memory, dst_spec: i16) -> Result<u16, Trap> {
        let spec = (dst_spec as u16) & 0o77;
        if spec & 0o70 == 0 {
            return Err(Trap::Vector(VEC_RESERVED));
        }
        self.effective_address(bus, spec, false)
    }

    /// Single-operand group: CLR/COM/INC/DEC/NEG/ADC/SBC/TST, selected by
    /// `sub` (bits 6-8 of the opcode).
    pub fn sop(&mut self, bus: &mut impl Memory, op: i16, byte: bool, sub: u16) -> Result<(), Trap> {
        let (operand, x) = self.fetch_operand(bus, op, byte, 1)?;
        let c = if self.is_flag_set(C) { 1 } else { 0 };
        let (z, new_ps, write_back) = match sub {
            0 => {
                // CLR
                let new_ps = (self.ps & !(N | Z | V | C)) | Z;
                (0, new_ps, true)
            }
            1 => {
                // COM: ones'-complement, C always set, V always clear.
                let (z, ps) = alu::add(self.ps, 0, x, 0, true, byte, true);
                (z, ps, true)
            }
            2 => {
                // INC
                let (z, ps) = alu::add(self.ps, x, 1, 0, false, byte, false);
                (z, ps, true)
            }
            3 => {
                // DEC
                let (z, ps) = alu::add(self.ps, x, 1, 1, true, byte, false);
                (z, ps, true)
            }
            4 => {
                // NEG
                let (z, ps) = alu::add(self.ps, 0, x, 1, true, byte, true);
                (z, ps, true)
            }
            5 => {
                // ADC: x + C
                let (z, ps) = alu::add(self.ps, x, 0, c, false, byte, true);
                (z, ps, true)
            }
            6 => {
                // SBC: x - C
                let (z, ps) = alu::add(self.ps, x, c as i16, 1, true, byte, true);
                (z, ps, true)
            }
            _ => {
                // TST: flags only, no write-back.
                let (z, ps) = alu::add(self.ps, x, 0, 0, false, byte, true);
                (z, ps, false)
            }
        };
        self.ps = new_ps;
        if write_back {
            self.commit_operand(bus, &operand, byte, z)?;
        }
        Ok(())
    }

    /// Shift group: ROR/ROL/ASR/ASL, selected by `sub` (bits 6-7).
    pub fn shift(&mut self, bus: &mut impl Memory, op: i16, byte: bool, sub: u16) -> Result<(), Trap> {
        let (operand, x) = self.fetch_operand(bus, op, byte, 1)?;
        let c = if self.is_flag_set(C) { 1 } else { 0 };
        let sign = if byte {
            (x as u8 as i8) < 0
        } else {
            x < 0
        };
        let (z, new_ps) = match sub {
            0 => alu::shr(self.ps, x, c, byte),                       // ROR
            1 => alu::shl(self.ps, x, c, byte),                       // ROL
            2 => alu::shr(self.ps, x, if sign { 1 } else { 0 }, byte), // ASR
            _ => alu::shl(self.ps, x, 0, byte),                       // ASL
        };
        self.ps = new_ps;
        self.commit_operand(bus, &operand, byte, z)?;
        Ok(())
    }

    /// SWAB dst.
    pub fn swab(&mut self, bus: &mut impl Memory, dst_spec: i16) -> Result<(), Trap> {
        let (operand, x) = self.fetch_operand(bus, dst_spec, false, 1)?;
        let (z, new_ps) = alu::swap(self.ps, x);
        self.ps = new_ps;
        self.commit_operand(bus, &operand, false, z)?;
        Ok(())
    }

    /// Dual-operand group: MOV/CMP/BIT/BIC/BIS/ADD/SUB, selected by `sub`
    /// (the top-level `fn` field, 1..6).
    pub fn dop(&mut self, bus: &mut impl Memory, op: i16, byte: bool, sub: u16) -> Result<(), Trap> {
        let (_src_operand, src) = self.fetch_operand(bus, op, byte, 0)?;
        let (dst_operand, dst) = self.fetch_operand(bus, op, byte, 1)?;

        let (z, new_ps, write_back) = match sub {
            1 => {
                // MOV
                let n = if src < 0 { N } else { 0 };
                let z_flag = if src == 0 { Z } else { 0 };
                let new_ps = (self.ps & !(N | Z | V)) | n | z_flag;
                (src, new_ps, true)
            }
            2 => {
                // CMP: dst - src, flags only, no write-back. Operand order
                // matches real hardware: CMP src,dst computes src - dst.
                let (z, ps) = alu::add(self.ps, src, dst, 1, true, byte, true);
                (z, ps, false)
            }
            3 => {
                // BIT: src & dst, flags only.
                let (z, ps) = alu::and(self.ps, src, dst, byte);
                (z, ps, false)
            }
            4 => {
                // BIC: dst & !src
                let (z, ps) = alu::and(self.ps, dst, !src, byte);
                (z, ps, true)
            }
            5 => {
                // BIS: dst | src
                let (z, ps) = alu::or(self.ps, dst, src, byte);
                (z, ps, true)
            }
            _ => {
                // ADD/SUB, distinguished by bit 15.
                if crate::bits::bit(op, 15) == 0 {
                    let (z, ps) = alu::add(self.ps, dst, src, 0, false, false, true);
                    (z, ps, true)
                } else {
                    let (z, ps) = alu::add(self.ps, dst, src, 1, true, false, true);
                    (z, ps, true)
                }
            }
        };
        self.ps = new_ps;
        if write_back {
            self.commit_operand(bus, &dst_operand, byte, z)?;
        }
        Ok(())
    }

    /// CLcc/SEcc: sets or clears the PSW bits named in the opcode's low 4
    /// bits, leaving the rest of the PSW untouched.
    pub fn clsecc(&mut self, op: i16, set: bool) {
        let mask = (op as u16) & 0xF;
        if set {
            self.ps |= mask;
        } else {
            self.ps &= !mask;
        }
    }
}
