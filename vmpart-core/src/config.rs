//! Static partitioning configuration.
//!
//! These records mirror the constants emitted by the configuration generator
//! (`PRE_VM_NUM`, `SERVICE_VM_NUM`, `MAX_POST_VM_NUM`, `CONFIG_MAX_VM_NUM` and the
//! per-VM `VMx_CONFIG_MEM_*` pairs). They are consumed as-is and can be built in `const` context.
use crate::mem::VmSlot;

/// Host memory reserved for one VM slot.
///
/// A zero-valued `(start, size)` pair means "unused".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VmMemoryConfig {
    /// `VMx_CONFIG_MEM_START_HPA`
    pub start_hpa: u64,
    /// `VMx_CONFIG_MEM_SIZE`
    pub size: u64,
    /// `VMx_CONFIG_MEM_START_HPA2`
    pub start_hpa2: u64,
    /// `VMx_CONFIG_MEM_SIZE_HPA2`
    pub size_hpa2: u64,
}

impl VmMemoryConfig {
    pub const UNUSED: Self = Self {
        start_hpa: 0,
        size: 0,
        start_hpa2: 0,
        size_hpa2: 0,
    };

    #[must_use]
    #[inline]
    pub const fn new(start_hpa: u64, size: u64) -> Self {
        Self {
            start_hpa,
            size,
            start_hpa2: 0,
            size_hpa2: 0,
        }
    }

    #[must_use]
    #[inline]
    pub const fn with_secondary(self, start_hpa2: u64, size_hpa2: u64) -> Self {
        Self {
            start_hpa2,
            size_hpa2,
            ..self
        }
    }

    #[must_use]
    #[inline]
    pub const fn has_secondary(&self) -> bool {
        self.start_hpa2 != 0 || self.size_hpa2 != 0
    }
}

/// How a VM slot is brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmLoadOrder {
    /// Started directly by the hypervisor at boot.
    PreLaunched,
    /// The privileged VM mediating devices for the others.
    Service,
    /// Started later by an external launcher.
    PostLaunched,
    /// No VM may occupy the slot.
    Unused,
}

impl VmLoadOrder {
    #[must_use]
    #[inline]
    /// Returns true if the slot needs a static memory reservation.
    pub const fn is_static(self) -> bool {
        matches!(self, Self::PreLaunched | Self::Service)
    }
}

/// VM counts of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmCounts {
    pub pre_vm_num: usize,
    /// Either 0 or 1.
    pub service_vm_num: usize,
    pub max_post_vm_num: usize,
    pub max_vm_num: usize,
}

impl VmCounts {
    #[must_use]
    #[inline]
    /// Number of VMs that need a static memory reservation.
    pub const fn static_vm_num(&self) -> usize {
        self.pre_vm_num + self.service_vm_num
    }

    #[must_use]
    #[inline]
    pub const fn configured_vm_num(&self) -> usize {
        self.pre_vm_num + self.service_vm_num + self.max_post_vm_num
    }

    #[must_use]
    /// Slots are laid out as pre-launched VMs, then the Service VM, then post-launched VMs.
    pub const fn load_order(&self, slot: VmSlot) -> VmLoadOrder {
        if slot < self.pre_vm_num {
            VmLoadOrder::PreLaunched
        } else if slot < self.static_vm_num() {
            VmLoadOrder::Service
        } else if slot < self.configured_vm_num() && slot < self.max_vm_num {
            VmLoadOrder::PostLaunched
        } else {
            VmLoadOrder::Unused
        }
    }
}

/// The static VM memory partitioning of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionConfig<'a> {
    /// `PRE_VM_NUM`
    pub pre_vm_num: usize,
    /// `SERVICE_VM_NUM`
    pub service_vm_num: usize,
    /// `MAX_POST_VM_NUM`
    pub max_post_vm_num: usize,
    /// `CONFIG_MAX_VM_NUM`
    pub max_vm_num: usize,
    /// Memory of the first VM slots, indexed by slot.
    pub vm_memory: &'a [VmMemoryConfig],
}

impl PartitionConfig<'_> {
    #[must_use]
    #[inline]
    pub const fn counts(&self) -> VmCounts {
        VmCounts {
            pre_vm_num: self.pre_vm_num,
            service_vm_num: self.service_vm_num,
            max_post_vm_num: self.max_post_vm_num,
            max_vm_num: self.max_vm_num,
        }
    }
}

#[must_use]
#[inline]
/// Number of region entries needed to hold every range of `max_vm_num` VMs.
pub const fn region_capacity(max_vm_num: usize) -> usize {
    2 * max_vm_num
}
