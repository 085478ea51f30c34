//! # clmatmul
//!
//! Dense f32 matrix multiplication dispatched to an `OpenCL` device.
//!
//! Devices on all platforms are ranked, discrete GPUs first, then integrated GPUs,
//! CPUs and everything else. One of three kernels is compiled for the chosen device:
//! naive, local memory tiled or vector tiled. Tiled kernels get matrices padded
//! to multiples of the largest square workgroup the device supports.
//!
//! `OpenCL` runtime is loaded at run time, no `OpenCL` SDK is needed to build.
//!
//! Debugging is controlled by `CLMM_DEBUG` environment variable, a bitmask:
//! 1 - devices, 2 - dimensions and launch geometry, 4 - build options and build log.

mod build_options;
mod config;
mod device;
mod dispatch;
mod error;
mod geometry;
mod implementation;
mod matrix;
mod opencl;
mod probe;
mod profiler;
mod runtime;

pub use build_options::BuildOptions;
pub use config::{Config, DEFAULT_KERNEL_NAME};
pub use device::{
    enumerate_devices, rank_devices, select_device, DeviceClass, DeviceDescriptor, Platforms,
};
pub use dispatch::{plan, Completed, Session};
pub use error::{BackendError, ErrorStatus, MatmulError};
pub use geometry::{align, AlignedDims, Dims, LaunchGeometry};
pub use implementation::Implementation;
pub use matrix::{format_result, parse_operands, read_operands, write_result, Operands};
pub use opencl::{DeviceId, Event, OpenCL, PlatformId};
pub use probe::{probe, workgroup_side, Capabilities};
pub use profiler::Timings;
pub use runtime::{run, Args};
