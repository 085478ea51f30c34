use crate::{
    error::BackendError,
    opencl::{DeviceId, OpenCL},
    Implementation,
};

/// What the run needs to know about the selected device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub name: String,
    /// Side of square workgroup
    pub side: usize,
}

/// Largest square workgroup side supported by the device.
/// Naive implementation leaves local size to the runtime, so its side is 1.
/// Vector tiled side is a multiple of vector width, otherwise the launch
/// grid would not cover the last columns of a tile.
#[must_use]
pub fn workgroup_side(max_work_group_size: usize, implementation: Implementation) -> usize {
    match implementation {
        Implementation::Naive => 1,
        Implementation::LocalTiled => max_work_group_size.isqrt().max(1),
        Implementation::VectorTiled => {
            let width = Implementation::VECTOR_WIDTH;
            let side = max_work_group_size.isqrt().min(Implementation::MAX_VECTOR_SIDE);
            (side / width * width).max(width)
        }
    }
}

/// Queries device name and workgroup limits.
/// Max workgroup size is not queried for naive implementation.
pub fn probe(
    cl: &OpenCL,
    device: DeviceId,
    implementation: Implementation,
) -> Result<Capabilities, BackendError> {
    let name = cl.device_name(device)?;
    println!("Device: {name}");
    let side = if implementation.is_tiled() {
        workgroup_side(cl.max_work_group_size(device)?, implementation)
    } else {
        1
    };
    Ok(Capabilities { name, side })
}
