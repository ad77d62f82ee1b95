//! Static VM memory partitioning.
//!
//! The crate turns the statically generated VM memory configuration into a partition table,
//! proves that the reservations are mutually exclusive and fit the platform, and exposes the
//! result through a write-once registry:
//!
//! ```text
//! PartitionConfig -> PartitionTable::build -> validate -> PartitionRegistry::seal
//! ```
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::doc_markdown)]

pub mod arch;
pub mod config;
pub mod mem;
pub mod platform;
pub mod registry;
pub mod table;
pub mod validate;

#[macro_export]
macro_rules! static_assert {
    ($condition:expr $(, $($arg:tt)+)?) => {
        const _: () = assert!($condition $(, $($arg)+)?);
    };
}
