use crate::{
    error::{BackendError, ErrorStatus},
    Implementation,
};
use std::{ffi::CString, fmt::Write};

/// Scalar element type of matrices, as named in `OpenCL` C
pub const SCALAR_TYPE: &str = "float";

/// Preprocessor definitions passed to the kernel compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Workgroup side length
    pub side: usize,
    pub vector_width: usize,
}

impl BuildOptions {
    #[must_use]
    pub const fn new(implementation: Implementation, side: usize) -> BuildOptions {
        BuildOptions { side, vector_width: implementation.vector_width() }
    }

    /// `float` for scalar kernels, `floatN` for vector kernels
    #[must_use]
    pub fn element_type(&self) -> String {
        if self.vector_width == 1 {
            SCALAR_TYPE.into()
        } else {
            format!("{SCALAR_TYPE}{}", self.vector_width)
        }
    }

    fn predicted_len(&self) -> usize {
        "-D LSIZE=U -D vecWidth= -D floatType=".len()
            + digits(self.side)
            + digits(self.vector_width)
            + self.element_type().len()
    }

    /// Renders options for `clBuildProgram`
    pub fn render(&self) -> Result<CString, BackendError> {
        let mut options = String::with_capacity(self.predicted_len());
        write!(
            options,
            "-D LSIZE={}U -D vecWidth={} -D floatType={}",
            self.side,
            self.vector_width,
            self.element_type()
        )
        .map_err(|e| BackendError {
            status: ErrorStatus::BuildOptions,
            context: format!("Failed to form build definitions string, {e}").into(),
        })?;
        if options.len() != self.predicted_len() {
            return Err(BackendError {
                status: ErrorStatus::BuildOptions,
                context: format!(
                    "Failed to form build definitions string, rendered {} bytes, expected {}",
                    options.len(),
                    self.predicted_len()
                )
                .into(),
            });
        }
        CString::new(options).map_err(|e| BackendError {
            status: ErrorStatus::BuildOptions,
            context: format!("Failed to form build definitions string, {e}").into(),
        })
    }
}

const fn digits(mut x: usize) -> usize {
    let mut n = 1;
    while x >= 10 {
        x /= 10;
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naive() {
        let options = BuildOptions::new(Implementation::Naive, 1).render().unwrap();
        assert_eq!(options.to_str().unwrap(), "-D LSIZE=1U -D vecWidth=1 -D floatType=float");
    }

    #[test]
    fn local_tiled() {
        let options = BuildOptions::new(Implementation::LocalTiled, 16).render().unwrap();
        assert_eq!(options.to_str().unwrap(), "-D LSIZE=16U -D vecWidth=1 -D floatType=float");
    }

    #[test]
    fn vector_tiled() {
        let options = BuildOptions::new(Implementation::VectorTiled, 32);
        assert_eq!(options.element_type(), "float4");
        assert_eq!(
            options.render().unwrap().to_str().unwrap(),
            "-D LSIZE=32U -D vecWidth=4 -D floatType=float4"
        );
    }

    #[test]
    fn digit_count() {
        assert_eq!(digits(0), 1);
        assert_eq!(digits(9), 1);
        assert_eq!(digits(10), 2);
        assert_eq!(digits(1024), 4);
        assert_eq!(digits(usize::MAX), usize::MAX.to_string().len());
    }
}
