//! The generic board's partitioned scenario.
//!
//! Two pre-launched VMs with 512 MiB each, no Service VM. The scenario leaves room for
//! post-launched VMs, which get their memory from an external launcher.
use vmpart_core::{
    config::{PartitionConfig, VmMemoryConfig},
    static_assert,
};

pub const PRE_VM_NUM: usize = 2;
/// Either 0 or 1. A Service VM excludes post-launched VMs.
pub const SERVICE_VM_NUM: usize = 0;
pub const MAX_POST_VM_NUM: usize = 14;
pub const CONFIG_MAX_VM_NUM: usize = 16;

pub const VM0_CONFIG_MEM_START_HPA: u64 = 0x1_0000_0000;
pub const VM0_CONFIG_MEM_SIZE: u64 = 0x2000_0000;
pub const VM0_CONFIG_MEM_START_HPA2: u64 = 0x0;
pub const VM0_CONFIG_MEM_SIZE_HPA2: u64 = 0x0;

pub const VM1_CONFIG_MEM_START_HPA: u64 = 0x1_2000_0000;
pub const VM1_CONFIG_MEM_SIZE: u64 = 0x2000_0000;
pub const VM1_CONFIG_MEM_START_HPA2: u64 = 0x0;
pub const VM1_CONFIG_MEM_SIZE_HPA2: u64 = 0x0;

static_assert!(
    matches!(SERVICE_VM_NUM, 0 | 1),
    "SERVICE_VM_NUM can only be 0 or 1"
);
static_assert!(
    SERVICE_VM_NUM == 0 || MAX_POST_VM_NUM == 0,
    "A Service VM excludes post-launched VMs"
);
static_assert!(PRE_VM_NUM + SERVICE_VM_NUM + MAX_POST_VM_NUM <= CONFIG_MAX_VM_NUM);
static_assert!(CONFIG_MAX_VM_NUM <= crate::MAX_VM_NUM);

pub const VM_MEMORY: [VmMemoryConfig; PRE_VM_NUM + SERVICE_VM_NUM] = [
    VmMemoryConfig::new(VM0_CONFIG_MEM_START_HPA, VM0_CONFIG_MEM_SIZE)
        .with_secondary(VM0_CONFIG_MEM_START_HPA2, VM0_CONFIG_MEM_SIZE_HPA2),
    VmMemoryConfig::new(VM1_CONFIG_MEM_START_HPA, VM1_CONFIG_MEM_SIZE)
        .with_secondary(VM1_CONFIG_MEM_START_HPA2, VM1_CONFIG_MEM_SIZE_HPA2),
];

pub const PARTITIONED: PartitionConfig<'static> = PartitionConfig {
    pre_vm_num: PRE_VM_NUM,
    service_vm_num: SERVICE_VM_NUM,
    max_post_vm_num: MAX_POST_VM_NUM,
    max_vm_num: CONFIG_MAX_VM_NUM,
    vm_memory: &VM_MEMORY,
};
