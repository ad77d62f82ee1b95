//! Architecture-level memory primitives.
mod addrs;

pub use addrs::{Alignment, PhysAddr};
