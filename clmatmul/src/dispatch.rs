//! Dispatch of a single multiplication to the device

use crate::{
    build_options::BuildOptions,
    config::Config,
    error::{BackendError, ErrorStatus},
    geometry::{AlignedDims, Dims, LaunchGeometry},
    matrix::Operands,
    opencl::{Buffer, Context, DeviceId, Event, Kernel, MemFlags, OpenCL, Program, Queue},
    Implementation, MatmulError,
};

/// Compiled kernel together with everything it was created from.
/// Fields are dropped in declaration order, kernel first, context last,
/// queue is flushed and finished before release.
#[derive(Debug)]
pub struct Session<'a> {
    kernel: Kernel<'a>,
    #[allow(unused)]
    program: Program<'a>,
    queue: Queue<'a>,
    context: Context<'a>,
}

/// Result of a multiplication and the events needed to time it
#[derive(Debug)]
pub struct Completed<'a> {
    /// `rows * cols` elements, row-major
    pub result: Vec<f32>,
    /// Upload of the first matrix
    pub upload: Event<'a>,
    pub kernel: Event<'a>,
    /// Download of the result
    pub download: Event<'a>,
}

impl<'a> Session<'a> {
    /// Creates context, profiling queue and kernel built from `source` for `device`
    pub fn new(
        cl: &'a OpenCL,
        device: DeviceId,
        source: &[u8],
        options: &BuildOptions,
        config: &Config,
    ) -> Result<Session<'a>, BackendError> {
        let context = cl.create_context(device)?;
        let queue = context.create_queue(device)?;
        let program = context.create_program(source)?;
        let options = options.render()?;
        if config.debug_asm() {
            println!("Build options: {}", options.to_string_lossy());
        }
        program.build(device, &options)?;
        if config.debug_asm() {
            println!("Build log: {}", program.build_log(device)?);
        }
        let kernel = program.create_kernel(config.kernel_name())?;
        Ok(Session { kernel, program, queue, context })
    }

    /// Runs multiplication of `operands`.
    /// Device buffers are sized by `aligned`, transfers by logical dimensions.
    pub fn dispatch(
        &self,
        implementation: Implementation,
        operands: &Operands,
        aligned: &AlignedDims,
        geometry: &LaunchGeometry,
    ) -> Result<Completed<'a>, MatmulError> {
        let Operands { a, .. } = operands;
        let context = &self.context;
        let float = std::mem::size_of::<f32>();
        let a_buffer = context.create_buffer(MemFlags::ReadOnly, aligned.a_len() * float)?;
        let b_buffer = context.create_buffer(MemFlags::ReadOnly, aligned.b_len() * float)?;
        let c_buffer = context.create_buffer(MemFlags::WriteOnly, aligned.result_len() * float)?;

        // SAFETY: `a` is borrowed for the whole call. On success the blocking read
        // returns only after every earlier command on the in-order queue completes,
        // on failure the queue is finished before returning.
        let upload = unsafe { self.queue.write_async(&a_buffer, a)? };
        let uploaded = Uploaded { a: &a_buffer, b: &b_buffer, c: &c_buffer };
        match self.compute(implementation, operands, aligned, geometry, &uploaded) {
            Ok((result, kernel, download)) => Ok(Completed { result, upload, kernel, download }),
            Err(e) => {
                let _ = self.queue.finish();
                Err(e)
            }
        }
    }

    fn compute(
        &self,
        implementation: Implementation,
        operands: &Operands,
        aligned: &AlignedDims,
        geometry: &LaunchGeometry,
        buffers: &Uploaded<'_, 'a>,
    ) -> Result<(Vec<f32>, Event<'a>, Event<'a>), MatmulError> {
        let Operands { dims, b, .. } = operands;
        let _ = self.queue.write(buffers.b, b)?;

        self.kernel.set_buffer_arg(0, buffers.a)?;
        self.kernel.set_buffer_arg(1, buffers.b)?;
        self.kernel.set_buffer_arg(2, buffers.c)?;
        self.kernel.set_uint_arg(3, uint_arg(dims.inner, "inner dimension")?)?;
        self.kernel.set_uint_arg(4, uint_arg(dims.cols, "number of columns")?)?;
        if implementation.is_tiled() {
            self.kernel.set_uint_arg(5, uint_arg(dims.rows, "number of rows")?)?;
            self.kernel.set_uint_arg(6, uint_arg(aligned.inner_tiles(), "number of tiles")?)?;
        }

        let kernel = self.queue.launch(&self.kernel, geometry.global, geometry.local)?;

        let mut result = crate::matrix::alloc(dims.result_len())?;
        result.resize(dims.result_len(), 0.0);
        let download = self.queue.read(buffers.c, &mut result)?;
        Ok((result, kernel, download))
    }
}

/// Device buffers of one dispatch, first matrix may still be uploading
struct Uploaded<'b, 'a> {
    a: &'b Buffer<'a>,
    b: &'b Buffer<'a>,
    c: &'b Buffer<'a>,
}

fn uint_arg(value: usize, what: &str) -> Result<u32, BackendError> {
    u32::try_from(value).map_err(|e| BackendError {
        status: ErrorStatus::IncorrectKernelArg,
        context: format!("Kernel argument {what} {value} does not fit into uint, {e}").into(),
    })
}

/// Pads dimensions and computes launch geometry for `implementation`
#[must_use]
pub fn plan(implementation: Implementation, dims: &Dims, side: usize) -> (AlignedDims, LaunchGeometry) {
    let aligned = dims.align(implementation, side);
    let geometry = LaunchGeometry::new(implementation, dims, &aligned);
    (aligned, geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_args_fit_uint() {
        assert_eq!(uint_arg(17, "inner dimension").unwrap(), 17);
        let e = uint_arg(1 << 40, "inner dimension").unwrap_err();
        assert_eq!(e.status, ErrorStatus::IncorrectKernelArg);
        assert!(e.context.contains("inner dimension 1099511627776"));
    }

    #[test]
    fn plan_tiled() {
        let dims = Dims { rows: 3, inner: 5, cols: 7 };
        let (aligned, geometry) = plan(Implementation::VectorTiled, &dims, 8);
        assert_eq!((aligned.rows, aligned.inner, aligned.cols), (8, 8, 8));
        assert_eq!(aligned.inner_tiles(), 1);
        assert_eq!(geometry.global, [2, 8]);
        assert_eq!(geometry.local, Some([2, 8]));
    }
}
