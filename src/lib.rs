//! Static VM memory partitioning for a partitioning hypervisor.
//!
//! The hypervisor reserves host memory for its pre-launched VMs and its Service VM at build time.
//! This crate checks that reservation once at boot and publishes it to the memory manager and
//! the VM loader:
//!
//! ```rust
//! use vmpart::{platform::StaticPlatform, scenario, mem::RegionKind};
//!
//! let platform = StaticPlatform::new(0x2_0000_0000);
//! let table = vmpart::init(&scenario::PARTITIONED, &platform).unwrap();
//!
//! let vm1 = table.region_for(1, RegionKind::Primary).unwrap();
//! assert_eq!(vm1.base().as_u64(), scenario::VM1_CONFIG_MEM_START_HPA);
//! assert_eq!(vmpart::partitions().owner_of(vm1.base()), Ok(1));
//! ```
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc)]

mod boot;
pub mod scenario;

pub use boot::{MAX_VM_NUM, PartitionError, Partitions, REGION_CAPACITY, init, init_in, partitions};
pub use vmpart_core::{arch, config, mem, platform, registry, table, validate};
