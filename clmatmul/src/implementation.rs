use crate::MatmulError;

/// Multiplication strategy, selects kernel source, launch geometry and kernel arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Implementation {
    /// One work item per result element, no explicit local size
    Naive,
    /// Square tiles cached in local memory
    LocalTiled,
    /// Local memory tiles with vector loads along the columns of the result
    VectorTiled,
}

impl Implementation {
    /// Elements processed per work item
    pub const VECTOR_WIDTH: usize = 4;

    /// Tile side limit for vectorized kernels
    pub const MAX_VECTOR_SIDE: usize = 32;

    #[must_use]
    pub const fn vector_width(self) -> usize {
        match self {
            Self::Naive | Self::LocalTiled => 1,
            Self::VectorTiled => Self::VECTOR_WIDTH,
        }
    }

    #[must_use]
    pub const fn is_tiled(self) -> bool {
        !matches!(self, Self::Naive)
    }

    /// File name of kernel source for this implementation
    #[must_use]
    pub const fn kernel_file(self) -> &'static str {
        match self {
            Self::Naive => "kernel.cl",
            Self::LocalTiled => "kernelLocalMem.cl",
            Self::VectorTiled => "kernelVector.cl",
        }
    }
}

impl TryFrom<i64> for Implementation {
    type Error = MatmulError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::Naive,
            2 => Self::LocalTiled,
            3 => Self::VectorTiled,
            _ => {
                return Err(MatmulError::usage_error(format!(
                    "Incorrect implementation type {value}, expected 1, 2 or 3"
                )))
            }
        })
    }
}

impl std::fmt::Display for Implementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Naive => "naive",
            Self::LocalTiled => "local memory tiled",
            Self::VectorTiled => "vector tiled",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes() {
        assert_eq!(Implementation::try_from(1).unwrap(), Implementation::Naive);
        assert_eq!(Implementation::try_from(3).unwrap().vector_width(), 4);
        assert_eq!(Implementation::LocalTiled.vector_width(), 1);
        assert!(!Implementation::Naive.is_tiled());
        assert_eq!(Implementation::LocalTiled.kernel_file(), "kernelLocalMem.cl");
    }

    #[test]
    fn out_of_range() {
        for x in [0, 4, -1] {
            assert!(matches!(Implementation::try_from(x), Err(MatmulError::UsageError(_))));
        }
    }
}
