//! Architectural state, register/stack helpers, and the six-mode addressing
//! evaluator.

use crate::error::Trap;
use crate::memory::{Memory, Size};

/// The eight general registers plus the processor status word. This is the
/// entire piece of state `step` is allowed to touch; everything else
/// (the addressing-mode evaluator's working address, whether the operand
/// turned out to live in a register) is computed fresh by each call and
/// handed back as an [`Operand`] rather than kept on `Cpu` — see the note in
/// the crate root about why the transient buffer isn't persisted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cpu {
    pub r: [i16; 8],
    pub ps: u16,
}

impl Cpu {
    pub fn new() -> Self {
        Cpu::default()
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.r[7] as u16
    }

    #[inline]
    fn set_pc(&mut self, addr: u16) {
        self.r[7] = addr as i16;
    }

    #[inline]
    pub fn sp(&self) -> u16 {
        self.r[6] as u16
    }

    #[inline]
    fn set_sp(&mut self, addr: u16) {
        self.r[6] = addr as i16;
    }

    pub fn is_flag_set(&self, flag: u16) -> bool {
        self.ps & flag != 0
    }

    pub fn set_flag(&mut self, flag: u16) {
        self.ps |= flag;
    }

    pub fn clear_flag(&mut self, flag: u16) {
        self.ps &= !flag;
    }

    pub fn assert_flag(&mut self, flag: u16, on: bool) {
        if on {
            self.set_flag(flag);
        } else {
            self.clear_flag(flag);
        }
    }

    /// Writes register `n` unconditionally. Always succeeds — there is no
    /// addressing mode or memory access involved.
    pub fn wbg(&mut self, n: usize, x: i16) {
        self.r[n] = x;
    }

    /// Fetches the word at PC and advances PC by 2. Used for immediate
    /// operands and indexed displacements.
    pub fn next(&mut self, bus: &mut impl Memory) -> Result<i16, Trap> {
        let addr = self.pc();
        let word = bus.read_word(addr)?;
        self.set_pc(addr.wrapping_add(2));
        Ok(word as i16)
    }

    pub fn push(&mut self, bus: &mut impl Memory, x: i16) -> Result<(), Trap> {
        let addr = self.sp().wrapping_sub(2);
        bus.write(addr, x as u16, Size::Word)?;
        self.set_sp(addr);
        Ok(())
    }

    pub fn pop(&mut self, bus: &mut impl Memory) -> Result<i16, Trap> {
        let addr = self.sp();
        let word = bus.read_word(addr)?;
        self.set_sp(addr.wrapping_add(2));
        Ok(word as i16)
    }
}

/// Where an already-resolved operand lives, so `commit` can write it back
/// without re-decoding the addressing spec.
#[derive(Debug, Clone, Copy)]
pub struct Operand {
    pub is_reg: bool,
    pub reg: usize,
    pub addr: u16,
}

fn operand_size(reg: usize, byte: bool) -> u16 {
    if byte && reg != 6 && reg != 7 {
        1
    } else {
        2
    }
}

impl Cpu {
    /// Resolves modes 1..7 of the 6-bit `ccc reg` specifier into `self.a`-like
    /// local state, applying auto-inc/dec side effects in program order.
    /// Mode 0 (register direct) is handled by the caller before this is
    /// reached; calling this with mode 0 would be a decoder bug.
    pub(crate) fn effective_address(
        &mut self,
        bus: &mut impl Memory,
        spec: u16,
        byte: bool,
    ) -> Result<u16, Trap> {
        let reg = (spec & 0o7) as usize;
        let r = self.r[reg] as u16;
        let size = operand_size(reg, byte);
        let indirect = spec & 0o10 != 0;

        let mut addr = match spec & 0o60 {
            0o20 => {
                // (R)+ / @(R)+
                let a = r;
                self.r[reg] = r.wrapping_add(size) as i16;
                a
            }
            0o40 => {
                // -(R) / @-(R): the pre-decrement is committed to the
                // register before the (possibly trapping) read below.
                let a = r.wrapping_sub(size);
                self.r[reg] = a as i16;
                a
            }
            0o60 => {
                // X(R) / @X(R)
                let disp = self.next(bus)? as u16;
                r.wrapping_add(disp)
            }
            _ => {
                // (R): single dereference of the register itself.
                r
            }
        };

        if indirect {
            addr = bus.read_word(addr)?;
        }
        Ok(addr)
    }

    /// Fetches one operand for an ALU-shaped instruction. `slot` selects
    /// where the 6-bit specifier lives in `op`: slot 0 (source) is `op >> 6`,
    /// slot 1 (destination) is `op` itself, both masked to 6 bits.
    pub fn fetch_operand(
        &mut self,
        bus: &mut impl Memory,
        op: i16,
        byte: bool,
        slot: u8,
    ) -> Result<(Operand, i16), Trap> {
        let spec = if slot == 0 {
            ((op as u16) >> 6) & 0o77
        } else {
            (op as u16) & 0o77
        };
        let reg = (spec & 7) as usize;

        if spec & 0o70 == 0 {
            let value = self.r[reg];
            return Ok((
                Operand {
                    is_reg: true,
                    reg,
                    addr: 0,
                },
                value,
            ));
        }

        let addr = self.effective_address(bus, spec, byte)?;
        let word = bus.read_word(addr)?;
        let value = if byte { (word as i8) as i16 } else { word as i16 };
        Ok((
            Operand {
                is_reg: false,
                reg,
                addr,
            },
            value,
        ))
    }

    /// Writes an ALU result back through an [`Operand`] resolved by
    /// `fetch_operand` for the same specifier.
    ///
    /// A byte-flavoured instruction writing to a register only disturbs that
    /// register's low byte — `value` arrives sign-extended from bit 7 for
    /// flag purposes, but that extension must not leak into the register's
    /// high byte. Memory destinations have no such concern: the byte write
    /// already targets exactly one byte address.
    pub fn commit_operand(
        &mut self,
        bus: &mut impl Memory,
        operand: &Operand,
        byte: bool,
        value: i16,
    ) -> Result<(), Trap> {
        if operand.is_reg {
            if byte {
                let old = self.r[operand.reg] as u16;
                let low = (value as u16) & 0xFF;
                self.r[operand.reg] = ((old & 0xFF00) | low) as i16;
            } else {
                self.r[operand.reg] = value;
            }
            Ok(())
        } else {
            let size = if byte { Size::Byte } else { Size::Word };
            bus.write(operand.addr, value as u16, size)?;
            Ok(())
        }
    }
}
