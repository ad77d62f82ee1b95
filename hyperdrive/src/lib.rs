//! Hyperdrive gathers the synchronization primitives used during early boot.
//!
//! They are `no_std` and allocation-free so that they can back process-wide statics
//! before any allocator exists.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]

pub mod once;
