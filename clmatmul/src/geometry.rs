//! Problem dimensions, their alignment to workgroup size and launch geometry

use crate::Implementation;

/// Dimensions of `C[rows, cols] = A[rows, inner] * B[inner, cols]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dims {
    /// Rows of A and of the result
    pub rows: usize,
    /// Columns of A, rows of B
    pub inner: usize,
    /// Columns of B and of the result
    pub cols: usize,
}

impl Dims {
    /// Number of elements of A
    #[must_use]
    pub const fn a_len(&self) -> usize {
        self.rows * self.inner
    }

    /// Number of elements of B
    #[must_use]
    pub const fn b_len(&self) -> usize {
        self.inner * self.cols
    }

    /// Number of elements of the result
    #[must_use]
    pub const fn result_len(&self) -> usize {
        self.rows * self.cols
    }

    /// Pads dimensions to multiples of `side` for tiled implementations,
    /// naive implementation uses exact dimensions.
    #[must_use]
    pub const fn align(&self, implementation: Implementation, side: usize) -> AlignedDims {
        if implementation.is_tiled() {
            AlignedDims {
                rows: align(self.rows, side),
                inner: align(self.inner, side),
                cols: align(self.cols, side),
                side,
            }
        } else {
            AlignedDims { rows: self.rows, inner: self.inner, cols: self.cols, side: 1 }
        }
    }
}

/// Rounds `dim` up to the nearest multiple of `side`
#[must_use]
pub const fn align(dim: usize, side: usize) -> usize {
    dim.div_ceil(side) * side
}

/// Dimensions padded to multiples of workgroup side.
/// They size device buffers and launch grid, never the transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedDims {
    pub rows: usize,
    pub inner: usize,
    pub cols: usize,
    /// Workgroup side the dimensions are aligned to
    pub side: usize,
}

impl AlignedDims {
    #[must_use]
    pub const fn a_len(&self) -> usize {
        self.rows * self.inner
    }

    #[must_use]
    pub const fn b_len(&self) -> usize {
        self.inner * self.cols
    }

    #[must_use]
    pub const fn result_len(&self) -> usize {
        self.rows * self.cols
    }

    /// Number of tiles along the inner dimension, exact by construction
    #[must_use]
    pub const fn inner_tiles(&self) -> usize {
        self.inner / self.side
    }
}

/// Global and local work size of the 2D launch, axis 0 runs along columns of the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGeometry {
    pub global: [usize; 2],
    /// None lets the runtime choose local work size
    pub local: Option<[usize; 2]>,
}

impl LaunchGeometry {
    #[must_use]
    pub const fn new(implementation: Implementation, dims: &Dims, aligned: &AlignedDims) -> LaunchGeometry {
        let width = implementation.vector_width();
        if implementation.is_tiled() {
            LaunchGeometry {
                global: [aligned.cols / width, aligned.rows],
                local: Some([aligned.side / width, aligned.side]),
            }
        } else {
            LaunchGeometry { global: [dims.cols, dims.rows], local: None }
        }
    }
}

impl std::fmt::Display for LaunchGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GLOBAL_WORK_SIZE[{}, {}]", self.global[0], self.global[1])?;
        if let Some([x, y]) = self.local {
            write!(f, " LOCAL_WORK_SIZE[{x}, {y}]")?;
        }
        Ok(())
    }
}
