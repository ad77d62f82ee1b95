//! Boot-time partitioning.
//!
//! Builds the partition table from the static configuration, validates it against the platform
//! and seals the process-wide registry. Any failure must stop the boot: the hypervisor cannot run
//! VMs on an inconsistent memory map.
use log::{debug, error, info};
use thiserror::Error;
use vmpart_core::{
    config::{PartitionConfig, region_capacity},
    platform::PlatformMemory,
    registry::{PartitionRegistry, RegistryError},
    table::{ConfigurationError, PartitionTable},
    validate::{ValidatedTable, ValidationError, validate},
};

/// `CONFIG_MAX_VM_NUM` of the hypervisor build.
pub const MAX_VM_NUM: usize = 16;
/// Number of regions the process-wide table can hold.
pub const REGION_CAPACITY: usize = region_capacity(MAX_VM_NUM);

pub type Partitions = PartitionRegistry<REGION_CAPACITY>;

static PARTITIONS: Partitions = PartitionRegistry::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PartitionError {
    #[error("Invalid partition configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Invalid partition table: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[must_use]
#[inline]
/// The process-wide partition registry.
pub fn partitions() -> &'static Partitions {
    &PARTITIONS
}

/// Partitions host memory and seals the process-wide registry.
///
/// This function should be called once, before any VM is created.
pub fn init<P: PlatformMemory + ?Sized>(
    config: &PartitionConfig,
    platform: &P,
) -> Result<&'static ValidatedTable<REGION_CAPACITY>, PartitionError> {
    init_in(&PARTITIONS, config, platform)
}

/// Same as [`init`], against a caller-provided registry.
pub fn init_in<'r, const N: usize, P: PlatformMemory + ?Sized>(
    registry: &'r PartitionRegistry<N>,
    config: &PartitionConfig,
    platform: &P,
) -> Result<&'r ValidatedTable<N>, PartitionError> {
    let result = partition(registry, config, platform);
    if let Err(err) = &result {
        error!("VM memory partitioning failed: {err}");
    }
    result
}

fn partition<'r, const N: usize, P: PlatformMemory + ?Sized>(
    registry: &'r PartitionRegistry<N>,
    config: &PartitionConfig,
    platform: &P,
) -> Result<&'r ValidatedTable<N>, PartitionError> {
    // A sealed registry rejects any table, valid or not
    if registry.is_sealed() {
        return Err(RegistryError::AlreadySealed.into());
    }

    let table = PartitionTable::<N>::build(config)?;
    let validated = validate(table, platform)?;
    let sealed = registry.seal(validated)?;

    for region in sealed.regions_by_base() {
        debug!("{region} ({:?})", sealed.load_order(region.owner()));
    }

    let counts = sealed.counts();
    info!(
        "Sealed {} VM memory regions: {} pre-launched, {} service, {} post-launched VMs",
        sealed.regions_by_base().len(),
        counts.pre_vm_num,
        counts.service_vm_num,
        counts.max_post_vm_num
    );

    Ok(sealed)
}
