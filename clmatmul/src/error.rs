use std::fmt::Display;

/// Enumeration representing the various errors that can occur during a multiplication run.
#[derive(Debug)]
pub enum MatmulError {
    /// Wrong command line arguments
    UsageError(Box<str>),
    /// Error from file operations
    IOError(std::io::Error),
    /// Error parsing matrix file
    ParseError(Box<str>),
    /// Host memory allocation error
    AllocationError(Box<str>),
    /// Error returned by the OpenCL runtime
    BackendError(BackendError),
}

impl MatmulError {
    /// Parse error
    #[track_caller]
    pub fn parse_error(e: Box<str>) -> Self {
        let location = std::panic::Location::caller();
        use std::fmt::Write;
        let mut e: String = e.into();
        let _ = write!(e, ", {}:{}:{}", location.file(), location.line(), location.column());
        Self::ParseError(e.into())
    }

    /// Usage error
    pub fn usage_error(e: impl Into<Box<str>>) -> Self {
        Self::UsageError(e.into())
    }

    /// Attaches path to io error, so that the user knows which file failed
    pub(crate) fn io_error(path: &std::path::Path, e: std::io::Error) -> Self {
        Self::IOError(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    }
}

impl std::fmt::Display for MatmulError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatmulError::UsageError(e) => f.write_fmt(format_args!("Usage {e}")),
            MatmulError::IOError(e) => f.write_fmt(format_args!("IO {e}")),
            MatmulError::ParseError(e) => f.write_fmt(format_args!("Invalid matrix file {e}")),
            MatmulError::AllocationError(e) => f.write_fmt(format_args!("Allocation error {e}")),
            MatmulError::BackendError(e) => f.write_fmt(format_args!("Backend {e}")),
        }
    }
}

impl std::error::Error for MatmulError {}

impl From<std::io::Error> for MatmulError {
    #[track_caller]
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

#[derive(Debug)]
pub struct BackendError {
    pub status: ErrorStatus,
    pub context: Box<str>,
}

impl From<BackendError> for MatmulError {
    fn from(value: BackendError) -> Self {
        MatmulError::BackendError(value)
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:?}: {}", self.status, self.context))
    }
}

impl std::error::Error for BackendError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    /// Dynamic library was not found on the disk
    DyLibNotFound,
    /// Context, queue or program creation failure
    Initialization,
    /// Failed to enumerate devices
    DeviceEnumeration,
    /// Failed to query device for information
    DeviceQuery,
    /// Failed to render compiler options
    BuildOptions,
    /// Failed to compile kernel
    KernelCompilation,
    /// Failed to allocate device memory
    MemoryAllocation,
    /// Failed to copy memory to device
    MemoryCopyH2D,
    /// Failed to copy memory to host
    MemoryCopyD2H,
    /// Kernel argument was not correct
    IncorrectKernelArg,
    /// Failed to launch kernel
    KernelLaunch,
    /// Failed to read event timestamps
    Profiling,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_has_location() {
        let e = MatmulError::parse_error("missing element".into());
        let MatmulError::ParseError(msg) = &e else { panic!("{e:?}") };
        assert!(msg.starts_with("missing element, "));
        assert!(msg.contains("error.rs"));
    }

    #[test]
    fn backend_error_display() {
        let e: MatmulError = BackendError {
            status: ErrorStatus::KernelLaunch,
            context: "Error code -54 (CL_INVALID_WORK_GROUP_SIZE). The method that caused this is 'clEnqueueNDRangeKernel'.".into(),
        }
        .into();
        let msg = e.to_string();
        assert!(msg.starts_with("Backend KernelLaunch: Error code -54"));
        assert!(msg.contains("clEnqueueNDRangeKernel"));
    }
}
