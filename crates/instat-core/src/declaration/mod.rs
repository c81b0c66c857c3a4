//! Declaration assembly from extracted page records.

mod assembler;
mod clock;

pub use assembler::{Assembly, DeclarationAssembler};
pub use clock::{Clock, FixedClock, SystemClock};
