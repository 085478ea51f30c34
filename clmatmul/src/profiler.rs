//! Timing of a completed multiplication from device clock timestamps

use crate::{
    dispatch::Completed, error::BackendError, geometry::LaunchGeometry, Implementation,
};

/// Durations in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    /// Kernel execution
    pub kernel_ms: f64,
    /// From start of the first upload to end of the download, kernel included
    pub transfer_ms: f64,
}

impl Timings {
    /// Converts nanosecond timestamps, clock going backwards counts as zero.
    #[must_use]
    pub fn from_nanos(kernel: (u64, u64), transfer: (u64, u64)) -> Timings {
        Timings { kernel_ms: millis(kernel.0, kernel.1), transfer_ms: millis(transfer.0, transfer.1) }
    }

    /// Reads profiling timestamps of the dispatch events
    pub fn read(completed: &Completed<'_>) -> Result<Timings, BackendError> {
        Ok(Timings::from_nanos(
            (completed.kernel.started()?, completed.kernel.ended()?),
            (completed.upload.started()?, completed.download.ended()?),
        ))
    }

    /// Timings line followed by launch geometry of tiled implementations.
    /// Local size is printed as workgroup side, then work items along columns.
    #[must_use]
    pub fn report(&self, implementation: Implementation, geometry: &LaunchGeometry) -> String {
        let mut report =
            format!("Time: {}\t{}", general(self.kernel_ms), general(self.transfer_ms));
        if let Some([x, y]) = geometry.local {
            report.push_str(&format!("\nLOCAL_WORK_SIZE[{y}, {x}]"));
        }
        if implementation == Implementation::VectorTiled {
            report.push_str(&format!("\nWI_WORK {}", implementation.vector_width()));
        }
        report
    }
}

/// Six significant digits without trailing zeros, exponent form outside of `[1e-4, 1e6)`
fn general(x: f64) -> String {
    let scientific = format!("{x:.5e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };
    if (-4..6).contains(&exponent) {
        let decimals = usize::try_from(5 - exponent).unwrap_or(0);
        trim_zeros(&format!("{x:.decimals$}")).into()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa), exponent.abs())
    }
}

fn trim_zeros(x: &str) -> &str {
    if x.contains('.') {
        x.trim_end_matches('0').trim_end_matches('.')
    } else {
        x
    }
}

#[allow(clippy::cast_precision_loss)]
fn millis(start: u64, end: u64) -> f64 {
    end.saturating_sub(start) as f64 / 1_000_000.0
}
