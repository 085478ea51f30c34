//! `OpenCL` runtime
//!
//! The runtime is loaded with libloading, so there is no link time dependency on `OpenCL`.
//! Every object created through it is owned by a guard which releases it on drop,
//! guards borrow [`OpenCL`], so the library outlives everything created from it.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use crate::{
    config::Config,
    error::{BackendError, ErrorStatus},
};
use libloading::Library;
use std::{
    ffi::{c_char, c_void, CStr, CString},
    ptr,
};

/// Opaque platform handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlatformId(*mut c_void);

/// Opaque device handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(*mut c_void);

impl PlatformId {
    /// Handle not backed by any runtime, for tests and mock platforms
    #[must_use]
    pub fn from_index(index: usize) -> PlatformId {
        PlatformId(ptr::without_provenance_mut(index + 1))
    }
}

impl DeviceId {
    /// Handle not backed by any runtime, for tests and mock platforms
    #[must_use]
    pub fn from_index(index: usize) -> DeviceId {
        DeviceId(ptr::without_provenance_mut(index + 1))
    }
}

pub struct OpenCL {
    clGetPlatformIDs: unsafe extern "C" fn(cl_uint, *mut *mut c_void, *mut cl_uint) -> cl_int,
    clGetPlatformInfo:
        unsafe extern "C" fn(*mut c_void, cl_uint, usize, *mut c_void, *mut usize) -> cl_int,
    clGetDeviceIDs: unsafe extern "C" fn(
        *mut c_void,
        cl_bitfield,
        cl_uint,
        *mut *mut c_void,
        *mut cl_uint,
    ) -> cl_int,
    clGetDeviceInfo:
        unsafe extern "C" fn(*mut c_void, cl_uint, usize, *mut c_void, *mut usize) -> cl_int,
    clCreateContext: unsafe extern "C" fn(
        *const isize,
        cl_uint,
        *const *mut c_void,
        Option<unsafe extern "C" fn(*const c_char, *const c_void, usize, *mut c_void)>,
        *mut c_void,
        *mut cl_int,
    ) -> *mut c_void,
    clCreateCommandQueue:
        unsafe extern "C" fn(*mut c_void, *mut c_void, cl_bitfield, *mut cl_int) -> *mut c_void,
    clCreateProgramWithSource: unsafe extern "C" fn(
        *mut c_void,
        cl_uint,
        *const *const c_char,
        *const usize,
        *mut cl_int,
    ) -> *mut c_void,
    clBuildProgram: unsafe extern "C" fn(
        *mut c_void,
        cl_uint,
        *const *mut c_void,
        *const c_char,
        Option<unsafe extern "C" fn(*mut c_void, *mut c_void)>,
        *mut c_void,
    ) -> cl_int,
    clGetProgramBuildInfo: unsafe extern "C" fn(
        *mut c_void,
        *mut c_void,
        cl_uint,
        usize,
        *mut c_void,
        *mut usize,
    ) -> cl_int,
    clCreateKernel: unsafe extern "C" fn(*mut c_void, *const c_char, *mut cl_int) -> *mut c_void,
    clSetKernelArg: unsafe extern "C" fn(*mut c_void, cl_uint, usize, *const c_void) -> cl_int,
    clCreateBuffer:
        unsafe extern "C" fn(*mut c_void, cl_bitfield, usize, *mut c_void, *mut cl_int) -> *mut c_void,
    clEnqueueWriteBuffer: unsafe extern "C" fn(
        *mut c_void,
        *mut c_void,
        cl_uint,
        usize,
        usize,
        *const c_void,
        cl_uint,
        *const *mut c_void,
        *mut *mut c_void,
    ) -> cl_int,
    clEnqueueReadBuffer: unsafe extern "C" fn(
        *mut c_void,
        *mut c_void,
        cl_uint,
        usize,
        usize,
        *mut c_void,
        cl_uint,
        *const *mut c_void,
        *mut *mut c_void,
    ) -> cl_int,
    clEnqueueNDRangeKernel: unsafe extern "C" fn(
        *mut c_void,
        *mut c_void,
        cl_uint,
        *const usize,
        *const usize,
        *const usize,
        cl_uint,
        *const *mut c_void,
        *mut *mut c_void,
    ) -> cl_int,
    clGetEventProfilingInfo:
        unsafe extern "C" fn(*mut c_void, cl_uint, usize, *mut c_void, *mut usize) -> cl_int,
    clFlush: unsafe extern "C" fn(*mut c_void) -> cl_int,
    clFinish: unsafe extern "C" fn(*mut c_void) -> cl_int,
    clReleaseEvent: unsafe extern "C" fn(*mut c_void) -> cl_int,
    clReleaseMemObject: unsafe extern "C" fn(*mut c_void) -> cl_int,
    clReleaseKernel: unsafe extern "C" fn(*mut c_void) -> cl_int,
    clReleaseProgram: unsafe extern "C" fn(*mut c_void) -> cl_int,
    clReleaseCommandQueue: unsafe extern "C" fn(*mut c_void) -> cl_int,
    clReleaseContext: unsafe extern "C" fn(*mut c_void) -> cl_int,
    // Function pointers above are valid only while the library is loaded
    #[allow(unused)]
    library: Library,
}

impl std::fmt::Debug for OpenCL {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenCL").field("library", &self.library).finish_non_exhaustive()
    }
}

const OPENCL_PATHS: [&str; 12] = [
    "/lib/libOpenCL.so",
    "/lib64/libOpenCL.so",
    "/lib/x86_64-linux-gnu/libOpenCL.so",
    "/lib64/x86_64-linux-gnu/libOpenCL.so",
    "/usr/lib/libOpenCL.so",
    "/usr/lib64/libOpenCL.so",
    "/usr/lib/x86_64-linux-gnu/libOpenCL.so",
    "/usr/lib64/x86_64-linux-gnu/libOpenCL.so",
    "/usr/lib/x86_64-linux-gnu/libOpenCL.so.1",
    "libOpenCL.so.1",
    "/System/Library/Frameworks/OpenCL.framework/OpenCL",
    "OpenCL.dll",
];

fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T, BackendError> {
    unsafe { library.get::<T>(name) }.map(|symbol| *symbol).map_err(|e| BackendError {
        status: ErrorStatus::DyLibNotFound,
        context: format!(
            "Symbol {} not found in OpenCL runtime, {e}",
            String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name))
        )
        .into(),
    })
}

impl OpenCL {
    /// Loads `OpenCL` runtime, paths from config are tried first.
    pub fn load(config: &Config) -> Result<OpenCL, BackendError> {
        let configured = config.opencl_paths.iter().flatten().map(String::as_str);
        let Some((path, library)) = configured
            .chain(OPENCL_PATHS)
            .find_map(|path| unsafe { Library::new(path) }.ok().map(|lib| (path, lib)))
        else {
            return Err(BackendError {
                status: ErrorStatus::DyLibNotFound,
                context: "OpenCL runtime not found.".into(),
            });
        };
        if config.debug_dev() {
            println!("Loaded OpenCL runtime from {path}");
        }
        Ok(OpenCL {
            clGetPlatformIDs: symbol(&library, b"clGetPlatformIDs\0")?,
            clGetPlatformInfo: symbol(&library, b"clGetPlatformInfo\0")?,
            clGetDeviceIDs: symbol(&library, b"clGetDeviceIDs\0")?,
            clGetDeviceInfo: symbol(&library, b"clGetDeviceInfo\0")?,
            clCreateContext: symbol(&library, b"clCreateContext\0")?,
            clCreateCommandQueue: symbol(&library, b"clCreateCommandQueue\0")?,
            clCreateProgramWithSource: symbol(&library, b"clCreateProgramWithSource\0")?,
            clBuildProgram: symbol(&library, b"clBuildProgram\0")?,
            clGetProgramBuildInfo: symbol(&library, b"clGetProgramBuildInfo\0")?,
            clCreateKernel: symbol(&library, b"clCreateKernel\0")?,
            clSetKernelArg: symbol(&library, b"clSetKernelArg\0")?,
            clCreateBuffer: symbol(&library, b"clCreateBuffer\0")?,
            clEnqueueWriteBuffer: symbol(&library, b"clEnqueueWriteBuffer\0")?,
            clEnqueueReadBuffer: symbol(&library, b"clEnqueueReadBuffer\0")?,
            clEnqueueNDRangeKernel: symbol(&library, b"clEnqueueNDRangeKernel\0")?,
            clGetEventProfilingInfo: symbol(&library, b"clGetEventProfilingInfo\0")?,
            clFlush: symbol(&library, b"clFlush\0")?,
            clFinish: symbol(&library, b"clFinish\0")?,
            clReleaseEvent: symbol(&library, b"clReleaseEvent\0")?,
            clReleaseMemObject: symbol(&library, b"clReleaseMemObject\0")?,
            clReleaseKernel: symbol(&library, b"clReleaseKernel\0")?,
            clReleaseProgram: symbol(&library, b"clReleaseProgram\0")?,
            clReleaseCommandQueue: symbol(&library, b"clReleaseCommandQueue\0")?,
            clReleaseContext: symbol(&library, b"clReleaseContext\0")?,
            library,
        })
    }

    pub fn platform_ids(&self) -> Result<Vec<PlatformId>, BackendError> {
        // Get the number of platforms
        let mut count: cl_uint = 0;
        check(
            unsafe { (self.clGetPlatformIDs)(0, ptr::null_mut(), &mut count) },
            ErrorStatus::DeviceEnumeration,
            "clGetPlatformIDs",
        )?;
        if count == 0 {
            return Ok(Vec::new());
        }
        // Get the platform ids.
        let mut ids: Vec<*mut c_void> = vec![ptr::null_mut(); count as usize];
        check(
            unsafe { (self.clGetPlatformIDs)(count, ids.as_mut_ptr(), ptr::null_mut()) },
            ErrorStatus::DeviceEnumeration,
            "clGetPlatformIDs",
        )?;
        Ok(ids.into_iter().map(PlatformId).collect())
    }

    pub fn platform_name(&self, platform: PlatformId) -> Result<String, BackendError> {
        let mut size: usize = 0;
        check(
            unsafe {
                (self.clGetPlatformInfo)(platform.0, CL_PLATFORM_NAME, 0, ptr::null_mut(), &mut size)
            },
            ErrorStatus::DeviceEnumeration,
            "clGetPlatformInfo",
        )?;
        let mut data: Vec<u8> = vec![0; size];
        check(
            unsafe {
                (self.clGetPlatformInfo)(
                    platform.0,
                    CL_PLATFORM_NAME,
                    size,
                    data.as_mut_ptr().cast(),
                    ptr::null_mut(),
                )
            },
            ErrorStatus::DeviceEnumeration,
            "clGetPlatformInfo",
        )?;
        Ok(c_string(&data))
    }

    /// Device ids of all device types on the platform.
    /// Platform without devices returns empty vec.
    pub fn device_ids(&self, platform: PlatformId) -> Result<Vec<DeviceId>, BackendError> {
        // Get the number of devices of device_type
        let mut count: cl_uint = 0;
        let status = unsafe {
            (self.clGetDeviceIDs)(platform.0, CL_DEVICE_TYPE_ALL, 0, ptr::null_mut(), &mut count)
        };
        if !has_devices(status, count)? {
            return Ok(Vec::new());
        }
        // Get the device ids.
        let mut ids: Vec<*mut c_void> = vec![ptr::null_mut(); count as usize];
        check(
            unsafe {
                (self.clGetDeviceIDs)(
                    platform.0,
                    CL_DEVICE_TYPE_ALL,
                    count,
                    ids.as_mut_ptr(),
                    ptr::null_mut(),
                )
            },
            ErrorStatus::DeviceEnumeration,
            "clGetDeviceIDs",
        )?;
        Ok(ids.into_iter().map(DeviceId).collect())
    }

    fn get_device_data(&self, device: DeviceId, param_name: cl_uint) -> Result<Vec<u8>, BackendError> {
        let mut size: usize = 0;
        check(
            unsafe { (self.clGetDeviceInfo)(device.0, param_name, 0, ptr::null_mut(), &mut size) },
            ErrorStatus::DeviceQuery,
            "clGetDeviceInfo",
        )?;
        if size == 0 {
            return Ok(Vec::new());
        }
        let mut data: Vec<u8> = vec![0; size];
        check(
            unsafe {
                (self.clGetDeviceInfo)(
                    device.0,
                    param_name,
                    size,
                    data.as_mut_ptr().cast(),
                    ptr::null_mut(),
                )
            },
            ErrorStatus::DeviceQuery,
            "clGetDeviceInfo",
        )?;
        Ok(data)
    }

    fn get_device_scalar<const N: usize>(
        &self,
        device: DeviceId,
        param_name: cl_uint,
    ) -> Result<[u8; N], BackendError> {
        let data = self.get_device_data(device, param_name)?;
        data.try_into().map_err(|data: Vec<u8>| BackendError {
            status: ErrorStatus::DeviceQuery,
            context: format!(
                "Device info {param_name:#x} returned {} bytes, expected {N}.",
                data.len()
            )
            .into(),
        })
    }

    pub fn device_name(&self, device: DeviceId) -> Result<String, BackendError> {
        Ok(c_string(&self.get_device_data(device, CL_DEVICE_NAME)?))
    }

    /// `CL_DEVICE_TYPE` bitfield
    pub fn device_type(&self, device: DeviceId) -> Result<u64, BackendError> {
        Ok(cl_bitfield::from_ne_bytes(self.get_device_scalar(device, CL_DEVICE_TYPE)?))
    }

    pub fn host_unified_memory(&self, device: DeviceId) -> Result<bool, BackendError> {
        let unified = cl_bool::from_ne_bytes(
            self.get_device_scalar(device, CL_DEVICE_HOST_UNIFIED_MEMORY)?,
        );
        Ok(unified != 0)
    }

    pub fn max_work_group_size(&self, device: DeviceId) -> Result<usize, BackendError> {
        Ok(usize::from_ne_bytes(self.get_device_scalar(device, CL_DEVICE_MAX_WORK_GROUP_SIZE)?))
    }

    /// Creates context with single device
    pub fn create_context(&self, device: DeviceId) -> Result<Context<'_>, BackendError> {
        let mut status: cl_int = 0;
        let devices = [device.0];
        let context = unsafe {
            (self.clCreateContext)(
                ptr::null(),
                1,
                devices.as_ptr(),
                None,
                ptr::null_mut(),
                &mut status,
            )
        };
        check(status, ErrorStatus::Initialization, "clCreateContext")?;
        Ok(Context { cl: self, ptr: context })
    }
}

#[derive(Debug)]
pub struct Context<'a> {
    cl: &'a OpenCL,
    ptr: *mut c_void,
}

impl<'a> Context<'a> {
    /// In order queue with profiling enabled
    pub fn create_queue(&self, device: DeviceId) -> Result<Queue<'a>, BackendError> {
        let mut status: cl_int = 0;
        let queue = unsafe {
            (self.cl.clCreateCommandQueue)(self.ptr, device.0, CL_QUEUE_PROFILING_ENABLE, &mut status)
        };
        check(status, ErrorStatus::Initialization, "clCreateCommandQueue")?;
        Ok(Queue { cl: self.cl, ptr: queue })
    }

    pub fn create_program(&self, source: &[u8]) -> Result<Program<'a>, BackendError> {
        let mut status: cl_int = 0;
        let sources: [*const c_char; 1] = [source.as_ptr().cast()];
        let lengths = [source.len()];
        let program = unsafe {
            (self.cl.clCreateProgramWithSource)(
                self.ptr,
                1,
                sources.as_ptr(),
                lengths.as_ptr(),
                &mut status,
            )
        };
        check(status, ErrorStatus::Initialization, "clCreateProgramWithSource")?;
        Ok(Program { cl: self.cl, ptr: program })
    }

    pub fn create_buffer(&self, flags: MemFlags, bytes: usize) -> Result<Buffer<'a>, BackendError> {
        let mut status: cl_int = 0;
        let buffer = unsafe {
            (self.cl.clCreateBuffer)(self.ptr, flags as cl_bitfield, bytes, ptr::null_mut(), &mut status)
        };
        check(status, ErrorStatus::MemoryAllocation, "clCreateBuffer")?;
        Ok(Buffer { cl: self.cl, ptr: buffer, bytes })
    }
}

impl Drop for Context<'_> {
    fn drop(&mut self) {
        let _ = unsafe { (self.cl.clReleaseContext)(self.ptr) };
    }
}

#[derive(Debug)]
pub struct Queue<'a> {
    cl: &'a OpenCL,
    ptr: *mut c_void,
}

impl<'a> Queue<'a> {
    /// Blocking copy of `data` into the beginning of `buffer`
    pub fn write(&self, buffer: &Buffer<'a>, data: &[f32]) -> Result<Event<'a>, BackendError> {
        unsafe { self.enqueue_write(buffer, data, CL_BLOCKING) }
    }

    /// Non blocking copy of `data` into the beginning of `buffer`
    ///
    /// # Safety
    ///
    /// `data` must stay alive and unmodified until the copy completes,
    /// e.g. until a later blocking command on this queue returns.
    pub unsafe fn write_async(&self, buffer: &Buffer<'a>, data: &[f32]) -> Result<Event<'a>, BackendError> {
        unsafe { self.enqueue_write(buffer, data, CL_NON_BLOCKING) }
    }

    unsafe fn enqueue_write(
        &self,
        buffer: &Buffer<'a>,
        data: &[f32],
        blocking: cl_uint,
    ) -> Result<Event<'a>, BackendError> {
        let bytes = std::mem::size_of_val(data);
        debug_assert!(bytes <= buffer.bytes, "Writing past the end of device buffer");
        let mut event: *mut c_void = ptr::null_mut();
        check(
            unsafe {
                (self.cl.clEnqueueWriteBuffer)(
                    self.ptr,
                    buffer.ptr,
                    blocking,
                    0,
                    bytes,
                    data.as_ptr().cast(),
                    0,
                    ptr::null(),
                    &mut event,
                )
            },
            ErrorStatus::MemoryCopyH2D,
            "clEnqueueWriteBuffer",
        )?;
        Ok(Event { cl: self.cl, ptr: event })
    }

    /// Blocking copy of the beginning of `buffer` into `data`
    pub fn read(&self, buffer: &Buffer<'a>, data: &mut [f32]) -> Result<Event<'a>, BackendError> {
        let bytes = std::mem::size_of_val(data);
        debug_assert!(bytes <= buffer.bytes, "Reading past the end of device buffer");
        let mut event: *mut c_void = ptr::null_mut();
        check(
            unsafe {
                (self.cl.clEnqueueReadBuffer)(
                    self.ptr,
                    buffer.ptr,
                    CL_BLOCKING,
                    0,
                    bytes,
                    data.as_mut_ptr().cast(),
                    0,
                    ptr::null(),
                    &mut event,
                )
            },
            ErrorStatus::MemoryCopyD2H,
            "clEnqueueReadBuffer",
        )?;
        Ok(Event { cl: self.cl, ptr: event })
    }

    /// Launches 2D range, without local work size the runtime picks one.
    pub fn launch(
        &self,
        kernel: &Kernel<'a>,
        global_work_size: [usize; 2],
        local_work_size: Option<[usize; 2]>,
    ) -> Result<Event<'a>, BackendError> {
        let mut event: *mut c_void = ptr::null_mut();
        let local_ptr = local_work_size.as_ref().map_or(ptr::null(), |lws| lws.as_ptr());
        check(
            unsafe {
                (self.cl.clEnqueueNDRangeKernel)(
                    self.ptr,
                    kernel.ptr,
                    2,
                    ptr::null(),
                    global_work_size.as_ptr(),
                    local_ptr,
                    0,
                    ptr::null(),
                    &mut event,
                )
            },
            ErrorStatus::KernelLaunch,
            "clEnqueueNDRangeKernel",
        )?;
        Ok(Event { cl: self.cl, ptr: event })
    }
}

impl Queue<'_> {
    /// Blocks until all commands on the queue complete
    pub fn finish(&self) -> Result<(), BackendError> {
        check(unsafe { (self.cl.clFinish)(self.ptr) }, ErrorStatus::KernelLaunch, "clFinish")
    }
}

impl Drop for Queue<'_> {
    fn drop(&mut self) {
        let _ = unsafe { (self.cl.clFlush)(self.ptr) };
        let _ = unsafe { (self.cl.clFinish)(self.ptr) };
        let _ = unsafe { (self.cl.clReleaseCommandQueue)(self.ptr) };
    }
}

#[derive(Debug)]
pub struct Program<'a> {
    cl: &'a OpenCL,
    ptr: *mut c_void,
}

impl<'a> Program<'a> {
    /// Builds program for device. On failure the build log is printed to stderr.
    pub fn build(&self, device: DeviceId, options: &CStr) -> Result<(), BackendError> {
        let devices = [device.0];
        let status = unsafe {
            (self.cl.clBuildProgram)(
                self.ptr,
                1,
                devices.as_ptr(),
                options.as_ptr(),
                None,
                ptr::null_mut(),
            )
        };
        if let Err(e) = check(status, ErrorStatus::KernelCompilation, "clBuildProgram") {
            let build_log = self.build_log(device)?;
            eprintln!("Build log: {build_log}");
            return Err(e);
        }
        Ok(())
    }

    pub fn build_log(&self, device: DeviceId) -> Result<String, BackendError> {
        let mut size: usize = 0;
        check(
            unsafe {
                (self.cl.clGetProgramBuildInfo)(
                    self.ptr,
                    device.0,
                    CL_PROGRAM_BUILD_LOG,
                    0,
                    ptr::null_mut(),
                    &mut size,
                )
            },
            ErrorStatus::KernelCompilation,
            "clGetProgramBuildInfo",
        )?;
        let mut data: Vec<u8> = vec![0; size];
        check(
            unsafe {
                (self.cl.clGetProgramBuildInfo)(
                    self.ptr,
                    device.0,
                    CL_PROGRAM_BUILD_LOG,
                    size,
                    data.as_mut_ptr().cast(),
                    ptr::null_mut(),
                )
            },
            ErrorStatus::KernelCompilation,
            "clGetProgramBuildInfo",
        )?;
        Ok(c_string(&data))
    }

    pub fn create_kernel(&self, name: &str) -> Result<Kernel<'a>, BackendError> {
        let name = CString::new(name).map_err(|e| BackendError {
            status: ErrorStatus::KernelCompilation,
            context: format!("Invalid kernel name, {e}").into(),
        })?;
        let mut status: cl_int = 0;
        let kernel = unsafe { (self.cl.clCreateKernel)(self.ptr, name.as_ptr(), &mut status) };
        check(status, ErrorStatus::KernelCompilation, "clCreateKernel")?;
        Ok(Kernel { cl: self.cl, ptr: kernel })
    }
}

impl Drop for Program<'_> {
    fn drop(&mut self) {
        let _ = unsafe { (self.cl.clReleaseProgram)(self.ptr) };
    }
}

#[derive(Debug)]
pub struct Kernel<'a> {
    cl: &'a OpenCL,
    ptr: *mut c_void,
}

impl<'a> Kernel<'a> {
    pub fn set_buffer_arg(&self, index: u32, buffer: &Buffer<'a>) -> Result<(), BackendError> {
        let ptr: *const *mut c_void = &buffer.ptr;
        check(
            unsafe {
                (self.cl.clSetKernelArg)(
                    self.ptr,
                    index,
                    std::mem::size_of::<*mut c_void>(),
                    ptr.cast(),
                )
            },
            ErrorStatus::IncorrectKernelArg,
            "clSetKernelArg",
        )
    }

    pub fn set_uint_arg(&self, index: u32, value: cl_uint) -> Result<(), BackendError> {
        let ptr: *const cl_uint = &value;
        check(
            unsafe {
                (self.cl.clSetKernelArg)(self.ptr, index, std::mem::size_of::<cl_uint>(), ptr.cast())
            },
            ErrorStatus::IncorrectKernelArg,
            "clSetKernelArg",
        )
    }
}

impl Drop for Kernel<'_> {
    fn drop(&mut self) {
        let _ = unsafe { (self.cl.clReleaseKernel)(self.ptr) };
    }
}

#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemFlags {
    ReadOnly = 1 << 2,
    WriteOnly = 1 << 1,
}

#[derive(Debug)]
pub struct Buffer<'a> {
    cl: &'a OpenCL,
    ptr: *mut c_void,
    bytes: usize,
}

impl Drop for Buffer<'_> {
    fn drop(&mut self) {
        let _ = unsafe { (self.cl.clReleaseMemObject)(self.ptr) };
    }
}

#[derive(Debug)]
pub struct Event<'a> {
    cl: &'a OpenCL,
    ptr: *mut c_void,
}

impl Event<'_> {
    /// Device clock time in nanoseconds when the command started executing
    pub fn started(&self) -> Result<u64, BackendError> {
        self.profiling_info(CL_PROFILING_COMMAND_START)
    }

    /// Device clock time in nanoseconds when the command finished executing
    pub fn ended(&self) -> Result<u64, BackendError> {
        self.profiling_info(CL_PROFILING_COMMAND_END)
    }

    fn profiling_info(&self, param_name: cl_uint) -> Result<u64, BackendError> {
        let mut time: cl_ulong = 0;
        let ptr: *mut cl_ulong = &mut time;
        check(
            unsafe {
                (self.cl.clGetEventProfilingInfo)(
                    self.ptr,
                    param_name,
                    std::mem::size_of::<cl_ulong>(),
                    ptr.cast(),
                    ptr::null_mut(),
                )
            },
            ErrorStatus::Profiling,
            "clGetEventProfilingInfo",
        )?;
        Ok(time)
    }
}

impl Drop for Event<'_> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            let _ = unsafe { (self.cl.clReleaseEvent)(self.ptr) };
        }
    }
}

/// Converts `OpenCL` status code into error with the name of the failed call.
pub(crate) fn check(code: cl_int, status: ErrorStatus, call: &str) -> Result<(), BackendError> {
    let cl_status = OpenCLStatus::from(code);
    if cl_status == OpenCLStatus::CL_SUCCESS {
        Ok(())
    } else {
        Err(BackendError {
            status,
            context: format!(
                "Error code {code} ({cl_status:?}). The method that caused this is '{call}'."
            )
            .into(),
        })
    }
}

/// Interprets device count query, `CL_DEVICE_NOT_FOUND` is not an error,
/// any other failure is, even though count stays zero.
fn has_devices(status: cl_int, count: cl_uint) -> Result<bool, BackendError> {
    if OpenCLStatus::from(status) == OpenCLStatus::CL_DEVICE_NOT_FOUND {
        return Ok(false);
    }
    check(status, ErrorStatus::DeviceEnumeration, "clGetDeviceIDs")?;
    Ok(count > 0)
}

/// Strings returned by `OpenCL` are nul terminated
fn c_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

type cl_int = i32;
type cl_uint = u32;
type cl_bool = u32;
type cl_ulong = u64;
type cl_bitfield = u64;

const CL_PLATFORM_NAME: cl_uint = 0x0902; // 2306
const CL_DEVICE_TYPE: cl_uint = 0x1000; // 4096
const CL_DEVICE_MAX_WORK_GROUP_SIZE: cl_uint = 0x1004; // 4100
const CL_DEVICE_NAME: cl_uint = 0x102B; // 4139
const CL_DEVICE_HOST_UNIFIED_MEMORY: cl_uint = 0x1035; // 4149
const CL_PROGRAM_BUILD_LOG: cl_uint = 0x1183; // 4483
const CL_PROFILING_COMMAND_START: cl_uint = 0x1282; // 4738
const CL_PROFILING_COMMAND_END: cl_uint = 0x1283; // 4739
const CL_DEVICE_TYPE_ALL: cl_bitfield = 0xFFFF_FFFF;
pub const CL_DEVICE_TYPE_CPU: cl_bitfield = 1 << 1;
pub const CL_DEVICE_TYPE_GPU: cl_bitfield = 1 << 2;
pub const CL_DEVICE_TYPE_ACCELERATOR: cl_bitfield = 1 << 3;
const CL_QUEUE_PROFILING_ENABLE: cl_bitfield = 1 << 1;
const CL_NON_BLOCKING: cl_uint = 0;
const CL_BLOCKING: cl_uint = 1;

#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, PartialEq, Debug, Eq)]
enum OpenCLStatus {
    CL_DEVICE_NOT_FOUND = -1,
    CL_SUCCESS = 0,
    CL_DEVICE_NOT_AVAILABLE = -2,
    CL_COMPILER_NOT_AVAILABLE = -3,
    CL_MEM_OBJECT_ALLOCATION_FAILURE = -4,
    CL_OUT_OF_RESOURCES = -5,
    CL_OUT_OF_HOST_MEMORY = -6,
    CL_PROFILING_INFO_NOT_AVAILABLE = -7,
    CL_BUILD_PROGRAM_FAILURE = -11,
    CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST = -14,
    CL_INVALID_VALUE = -30,
    CL_INVALID_DEVICE_TYPE = -31,
    CL_INVALID_PLATFORM = -32,
    CL_INVALID_DEVICE = -33,
    CL_INVALID_CONTEXT = -34,
    CL_INVALID_QUEUE_PROPERTIES = -35,
    CL_INVALID_COMMAND_QUEUE = -36,
    CL_INVALID_HOST_PTR = -37,
    CL_INVALID_MEM_OBJECT = -38,
    CL_INVALID_BINARY = -42,
    CL_INVALID_BUILD_OPTIONS = -43,
    CL_INVALID_PROGRAM = -44,
    CL_INVALID_PROGRAM_EXECUTABLE = -45,
    CL_INVALID_KERNEL_NAME = -46,
    CL_INVALID_KERNEL_DEFINITION = -47,
    CL_INVALID_KERNEL = -48,
    CL_INVALID_ARG_INDEX = -49,
    CL_INVALID_ARG_VALUE = -50,
    CL_INVALID_ARG_SIZE = -51,
    CL_INVALID_KERNEL_ARGS = -52,
    CL_INVALID_WORK_DIMENSION = -53,
    CL_INVALID_WORK_GROUP_SIZE = -54,
    CL_INVALID_WORK_ITEM_SIZE = -55,
    CL_INVALID_GLOBAL_OFFSET = -56,
    CL_INVALID_EVENT_WAIT_LIST = -57,
    CL_INVALID_EVENT = -58,
    CL_INVALID_OPERATION = -59,
    CL_INVALID_BUFFER_SIZE = -61,
    CL_INVALID_GLOBAL_WORK_SIZE = -63,
    CL_INVALID_PROPERTY = -64,
    CL_PLATFORM_NOT_FOUND_KHR = -1001,
    UNKNOWN,
}

impl From<cl_int> for OpenCLStatus {
    fn from(status: cl_int) -> Self {
        match status {
            0 => Self::CL_SUCCESS,
            -1 => Self::CL_DEVICE_NOT_FOUND,
            -2 => Self::CL_DEVICE_NOT_AVAILABLE,
            -3 => Self::CL_COMPILER_NOT_AVAILABLE,
            -4 => Self::CL_MEM_OBJECT_ALLOCATION_FAILURE,
            -5 => Self::CL_OUT_OF_RESOURCES,
            -6 => Self::CL_OUT_OF_HOST_MEMORY,
            -7 => Self::CL_PROFILING_INFO_NOT_AVAILABLE,
            -11 => Self::CL_BUILD_PROGRAM_FAILURE,
            -14 => Self::CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST,
            -30 => Self::CL_INVALID_VALUE,
            -31 => Self::CL_INVALID_DEVICE_TYPE,
            -32 => Self::CL_INVALID_PLATFORM,
            -33 => Self::CL_INVALID_DEVICE,
            -34 => Self::CL_INVALID_CONTEXT,
            -35 => Self::CL_INVALID_QUEUE_PROPERTIES,
            -36 => Self::CL_INVALID_COMMAND_QUEUE,
            -37 => Self::CL_INVALID_HOST_PTR,
            -38 => Self::CL_INVALID_MEM_OBJECT,
            -42 => Self::CL_INVALID_BINARY,
            -43 => Self::CL_INVALID_BUILD_OPTIONS,
            -44 => Self::CL_INVALID_PROGRAM,
            -45 => Self::CL_INVALID_PROGRAM_EXECUTABLE,
            -46 => Self::CL_INVALID_KERNEL_NAME,
            -47 => Self::CL_INVALID_KERNEL_DEFINITION,
            -48 => Self::CL_INVALID_KERNEL,
            -49 => Self::CL_INVALID_ARG_INDEX,
            -50 => Self::CL_INVALID_ARG_VALUE,
            -51 => Self::CL_INVALID_ARG_SIZE,
            -52 => Self::CL_INVALID_KERNEL_ARGS,
            -53 => Self::CL_INVALID_WORK_DIMENSION,
            -54 => Self::CL_INVALID_WORK_GROUP_SIZE,
            -55 => Self::CL_INVALID_WORK_ITEM_SIZE,
            -56 => Self::CL_INVALID_GLOBAL_OFFSET,
            -57 => Self::CL_INVALID_EVENT_WAIT_LIST,
            -58 => Self::CL_INVALID_EVENT,
            -59 => Self::CL_INVALID_OPERATION,
            -61 => Self::CL_INVALID_BUFFER_SIZE,
            -63 => Self::CL_INVALID_GLOBAL_WORK_SIZE,
            -64 => Self::CL_INVALID_PROPERTY,
            -1001 => Self::CL_PLATFORM_NOT_FOUND_KHR,
            _ => Self::UNKNOWN,
        }
    }
}
