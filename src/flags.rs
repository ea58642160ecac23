//! Processor status word bit layout.
//!
//! Only the low four bits of `Cpu::ps` are architecturally defined. Everything
//! above bit 3 is opaque to this core: traps and RTI move it around as a raw
//! word without ever testing or clearing it, so it is kept as a plain `u16`
//! rather than a `bitflags` type (which would force every unused bit through
//! a fixed, named set).

pub const N: u16 = 0b1000;
pub const Z: u16 = 0b0100;
pub const V: u16 = 0b0010;
pub const C: u16 = 0b0001;
