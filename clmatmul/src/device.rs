//! Device enumeration, ranking and selection

use crate::{
    config::Config,
    error::{BackendError, ErrorStatus},
    opencl::{
        DeviceId, OpenCL, PlatformId, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_CPU,
        CL_DEVICE_TYPE_GPU,
    },
};

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceClass {
    GPU,
    CPU,
    Accelerator,
    Other,
}

impl DeviceClass {
    /// Classifies `CL_DEVICE_TYPE` bitfield, which may also carry the default bit.
    #[must_use]
    pub const fn from_type_bits(bits: u64) -> DeviceClass {
        if bits & CL_DEVICE_TYPE_GPU != 0 {
            DeviceClass::GPU
        } else if bits & CL_DEVICE_TYPE_CPU != 0 {
            DeviceClass::CPU
        } else if bits & CL_DEVICE_TYPE_ACCELERATOR != 0 {
            DeviceClass::Accelerator
        } else {
            DeviceClass::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    pub class: DeviceClass,
    /// Host shares memory with the device
    pub host_unified_memory: bool,
    /// Preference order, 0 is the best device
    pub rank: usize,
}

impl DeviceDescriptor {
    /// Discrete GPUs, integrated GPUs, CPUs, everything else
    #[must_use]
    pub const fn tier(&self) -> u8 {
        match (self.class, self.host_unified_memory) {
            (DeviceClass::GPU, false) => 0,
            (DeviceClass::GPU, true) => 1,
            (DeviceClass::CPU, _) => 2,
            (DeviceClass::Accelerator | DeviceClass::Other, _) => 3,
        }
    }
}

/// Source of platforms and devices, implemented by the `OpenCL` runtime.
pub trait Platforms {
    fn platform_ids(&self) -> Result<Vec<PlatformId>, BackendError>;
    fn platform_name(&self, platform: PlatformId) -> Result<String, BackendError>;
    fn device_ids(&self, platform: PlatformId) -> Result<Vec<DeviceId>, BackendError>;
    fn device_class(&self, device: DeviceId) -> Result<DeviceClass, BackendError>;
    fn host_unified_memory(&self, device: DeviceId) -> Result<bool, BackendError>;
}

impl Platforms for OpenCL {
    fn platform_ids(&self) -> Result<Vec<PlatformId>, BackendError> {
        OpenCL::platform_ids(self)
    }

    fn platform_name(&self, platform: PlatformId) -> Result<String, BackendError> {
        OpenCL::platform_name(self, platform)
    }

    fn device_ids(&self, platform: PlatformId) -> Result<Vec<DeviceId>, BackendError> {
        OpenCL::device_ids(self, platform)
    }

    fn device_class(&self, device: DeviceId) -> Result<DeviceClass, BackendError> {
        Ok(DeviceClass::from_type_bits(self.device_type(device)?))
    }

    fn host_unified_memory(&self, device: DeviceId) -> Result<bool, BackendError> {
        OpenCL::host_unified_memory(self, device)
    }
}

/// Finds devices on all platforms in platform-then-device order.
/// Platform that fails to report its devices is skipped with a warning,
/// failure to query any found device fails the whole enumeration.
/// All returned descriptors have rank 0 until [`rank_devices`] is called.
pub fn enumerate_devices(
    platforms: &impl Platforms,
    config: &Config,
) -> Result<Vec<DeviceDescriptor>, BackendError> {
    let platform_ids = platforms.platform_ids()?;
    if platform_ids.is_empty() {
        return Err(BackendError {
            status: ErrorStatus::DeviceEnumeration,
            context: "Number of platforms: 0".into(),
        });
    }
    let mut devices = Vec::new();
    for (platform_id, platform) in platform_ids
        .iter()
        .copied()
        .enumerate()
        .filter(|(id, _)| config.uses_platform(*id))
    {
        let device_ids = match platforms.device_ids(platform) {
            Ok(device_ids) => device_ids,
            Err(e) => {
                eprintln!("Warning: skipping platform {platform_id}, {e}");
                continue;
            }
        };
        if config.debug_dev() {
            let name = platforms.platform_name(platform).unwrap_or_default();
            println!(
                "Using OpenCL platform, platform id {platform_id}, name {name}, {} devices",
                device_ids.len()
            );
        }
        for id in device_ids {
            devices.push(DeviceDescriptor {
                id,
                class: platforms.device_class(id)?,
                host_unified_memory: platforms.host_unified_memory(id)?,
                rank: 0,
            });
        }
    }
    if devices.is_empty() {
        return Err(BackendError {
            status: ErrorStatus::DeviceEnumeration,
            context: "Number of devices: 0".into(),
        });
    }
    Ok(devices)
}

/// Assigns dense ranks by tier, devices within a tier keep discovery order.
pub fn rank_devices(devices: &mut [DeviceDescriptor]) {
    let mut order: Vec<usize> = (0..devices.len()).collect();
    // sort_by_key is stable
    order.sort_by_key(|&i| devices[i].tier());
    for (rank, i) in order.into_iter().enumerate() {
        devices[i].rank = rank;
    }
}

/// Device with rank equal to `ordinal`, ordinals out of range select the best device.
#[must_use]
pub fn select_device(devices: &[DeviceDescriptor], ordinal: i64) -> Option<DeviceId> {
    let rank = usize::try_from(ordinal).ok().filter(|&rank| rank < devices.len()).unwrap_or(0);
    devices.iter().find(|dev| dev.rank == rank).map(|dev| dev.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn descriptor(index: usize, class: DeviceClass, host_unified_memory: bool) -> DeviceDescriptor {
        DeviceDescriptor { id: DeviceId::from_index(index), class, host_unified_memory, rank: 0 }
    }

    #[test]
    fn device_classes() {
        assert_eq!(DeviceClass::from_type_bits(CL_DEVICE_TYPE_GPU), DeviceClass::GPU);
        // default bit set together with gpu bit
        assert_eq!(DeviceClass::from_type_bits(CL_DEVICE_TYPE_GPU | 1), DeviceClass::GPU);
        assert_eq!(DeviceClass::from_type_bits(CL_DEVICE_TYPE_CPU), DeviceClass::CPU);
        assert_eq!(
            DeviceClass::from_type_bits(CL_DEVICE_TYPE_ACCELERATOR),
            DeviceClass::Accelerator
        );
        assert_eq!(DeviceClass::from_type_bits(1 << 4), DeviceClass::Other);
    }

    #[test]
    fn ranking_by_tier() {
        let mut devices = vec![
            descriptor(0, DeviceClass::CPU, true),
            descriptor(1, DeviceClass::Accelerator, false),
            descriptor(2, DeviceClass::GPU, true),
            descriptor(3, DeviceClass::GPU, false),
            descriptor(4, DeviceClass::GPU, false),
            descriptor(5, DeviceClass::CPU, true),
        ];
        rank_devices(&mut devices);
        let ranks: Vec<usize> = devices.iter().map(|d| d.rank).collect();
        assert_eq!(ranks, [3, 5, 2, 0, 1, 4]);
    }

    #[test]
    fn ranking_is_total_order() {
        let classes = [DeviceClass::GPU, DeviceClass::CPU, DeviceClass::Accelerator, DeviceClass::Other];
        let mut devices: Vec<DeviceDescriptor> = (0..16)
            .map(|i| descriptor(i, classes[(i * 7) % 4], i % 3 == 0))
            .collect();
        rank_devices(&mut devices);
        let mut ranks: Vec<usize> = devices.iter().map(|d| d.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (0..16).collect::<Vec<usize>>());
        for a in &devices {
            for b in &devices {
                if a.tier() < b.tier() {
                    assert!(a.rank < b.rank);
                }
                if a.tier() == b.tier() && a.id < b.id {
                    assert!(a.rank < b.rank);
                }
            }
        }
    }

    #[test]
    fn selection_clamps() {
        let mut devices = vec![
            descriptor(0, DeviceClass::CPU, true),
            descriptor(1, DeviceClass::GPU, false),
        ];
        rank_devices(&mut devices);
        let best = select_device(&devices, 0);
        assert_eq!(best, Some(DeviceId::from_index(1)));
        assert_eq!(select_device(&devices, 1), Some(DeviceId::from_index(0)));
        for ordinal in [-1, 2, 100, i64::MIN, i64::MAX] {
            assert_eq!(select_device(&devices, ordinal), best);
        }
        assert_eq!(select_device(&[], 0), None);
    }

    struct MockPlatforms {
        // device class and unified memory flag per device, None means the platform fails
        platforms: Vec<Option<Vec<(DeviceClass, bool)>>>,
        failing_device: Option<usize>,
    }

    impl MockPlatforms {
        fn devices(&self) -> BTreeMap<DeviceId, (DeviceClass, bool)> {
            self.platforms
                .iter()
                .flatten()
                .flatten()
                .copied()
                .enumerate()
                .map(|(i, dev)| (DeviceId::from_index(i), dev))
                .collect()
        }
    }

    impl Platforms for MockPlatforms {
        fn platform_ids(&self) -> Result<Vec<PlatformId>, BackendError> {
            Ok((0..self.platforms.len()).map(PlatformId::from_index).collect())
        }

        fn platform_name(&self, _: PlatformId) -> Result<String, BackendError> {
            Ok("mock".into())
        }

        fn device_ids(&self, platform: PlatformId) -> Result<Vec<DeviceId>, BackendError> {
            let mut first = 0;
            for (i, devices) in self.platforms.iter().enumerate() {
                let count = devices.as_ref().map_or(0, Vec::len);
                if PlatformId::from_index(i) == platform {
                    return match devices {
                        Some(_) => Ok((first..first + count).map(DeviceId::from_index).collect()),
                        None => Err(BackendError {
                            status: ErrorStatus::DeviceEnumeration,
                            context: "Error code -32 (CL_INVALID_PLATFORM).".into(),
                        }),
                    };
                }
                first += count;
            }
            unreachable!()
        }

        fn device_class(&self, device: DeviceId) -> Result<DeviceClass, BackendError> {
            if self.failing_device.map(DeviceId::from_index) == Some(device) {
                return Err(BackendError {
                    status: ErrorStatus::DeviceQuery,
                    context: "Error code -33 (CL_INVALID_DEVICE).".into(),
                });
            }
            Ok(self.devices()[&device].0)
        }

        fn host_unified_memory(&self, device: DeviceId) -> Result<bool, BackendError> {
            Ok(self.devices()[&device].1)
        }
    }

    #[test]
    fn failing_platform_contributes_no_devices() {
        let mock = MockPlatforms {
            platforms: vec![
                Some(vec![(DeviceClass::CPU, true)]),
                None,
                Some(vec![(DeviceClass::GPU, true), (DeviceClass::GPU, false)]),
            ],
            failing_device: None,
        };
        let mut devices = enumerate_devices(&mock, &Config::default()).unwrap();
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].class, DeviceClass::CPU);
        assert!(!devices[2].host_unified_memory);
        rank_devices(&mut devices);
        assert_eq!(select_device(&devices, 7), Some(devices[2].id));
    }

    #[test]
    fn failing_device_query_fails_enumeration() {
        let mock = MockPlatforms {
            platforms: vec![Some(vec![(DeviceClass::CPU, true), (DeviceClass::GPU, false)])],
            failing_device: Some(1),
        };
        let err = enumerate_devices(&mock, &Config::default()).unwrap_err();
        assert_eq!(err.status, ErrorStatus::DeviceQuery);
    }

    #[test]
    fn no_devices() {
        let mock = MockPlatforms { platforms: vec![Some(Vec::new()), None], failing_device: None };
        let err = enumerate_devices(&mock, &Config::default()).unwrap_err();
        assert_eq!(&*err.context, "Number of devices: 0");
        let mock = MockPlatforms { platforms: Vec::new(), failing_device: None };
        assert!(enumerate_devices(&mock, &Config::default()).is_err());
    }

    #[test]
    fn configured_out_platform() {
        let mock = MockPlatforms {
            platforms: vec![Some(vec![(DeviceClass::CPU, true)]), Some(vec![(DeviceClass::GPU, false)])],
            failing_device: None,
        };
        let config = Config { platform_ids: Some(vec![0]), ..Config::default() };
        let devices = enumerate_devices(&mock, &config).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].class, DeviceClass::CPU);
    }
}
