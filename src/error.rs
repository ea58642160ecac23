use thiserror::Error;

/// The error a [`Memory`](crate::memory::Memory) implementation returns when it cannot
/// service an access (unmapped address, parity fault, whatever the host wants
/// that particular read or write to mean). The core never inspects the
/// reason, only that the access failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bus access failed")]
pub struct BusError;

/// The two ways a single [`crate::step`] call can end without completing the
/// instruction normally.
///
/// `Vector` is not a failure from the CPU's point of view: it is the
/// instruction asking the core to run the trap sequence (push PS, push PC,
/// reload PC/PS from the vector) before returning. `HostFailure` means a bus
/// access the trap sequence itself depends on — or a hard stop such as HALT
/// — could not be serviced, and the step as a whole is reported as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Trap {
    #[error("trap to vector {0:#06o}")]
    Vector(u16),
    #[error("host memory access failed")]
    HostFailure,
}

impl From<BusError> for Trap {
    fn from(_: BusError) -> Self {
        Trap::HostFailure
    }
}

/// Top-level error type for callers that embed this crate behind their own
/// `anyhow`/`thiserror` error chains. `step` itself never returns this; it is
/// exposed so a surrounding driver has something to `#[from]` into its own
/// error enum.
#[derive(Debug, Error)]
pub enum PdpError {
    #[error(transparent)]
    Trap(#[from] Trap),
}
