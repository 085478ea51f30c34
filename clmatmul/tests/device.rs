//! Tests on a real `OpenCL` device, skipped when there is no runtime or no device.

use clmatmul::{
    enumerate_devices, plan, probe, rank_devices, run, select_device, Args, BuildOptions, Config,
    DeviceId, ErrorStatus, Implementation, MatmulError, OpenCL, Operands, Session, Timings,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn config() -> Config {
    Config {
        kernel_dir: Some(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/kernels").into()),
        ..Config::default()
    }
}

fn best_device(cl: &OpenCL, config: &Config) -> Option<DeviceId> {
    let mut devices = enumerate_devices(cl, config).ok()?;
    rank_devices(&mut devices);
    select_device(&devices, 0)
}

#[test]
fn two_by_two() -> Result<(), MatmulError> {
    let config = config();
    let Ok(cl) = OpenCL::load(&config) else { return Ok(()) };
    if best_device(&cl, &config).is_none() {
        return Ok(());
    }
    drop(cl);
    let dir = std::env::temp_dir();
    let input = dir.join(format!("clmatmul-{}-2x2-input.txt", std::process::id()));
    let output = dir.join(format!("clmatmul-{}-2x2-output.txt", std::process::id()));
    std::fs::write(&input, "2 2 2\n1 2\n3 4\n5 6\n7 8\n")?;
    let args = Args {
        device: 7,
        input: input.clone(),
        output: output.clone(),
        implementation: Implementation::Naive,
    };
    run(&args, &config)?;
    assert_eq!(
        std::fs::read_to_string(&output)?,
        "2 2\n19.000000 22.000000 \n43.000000 50.000000 \n"
    );
    std::fs::remove_file(&input)?;
    std::fs::remove_file(&output)?;
    Ok(())
}

/// Host reference, `b` is stored transposed
fn reference(operands: &Operands) -> Vec<f32> {
    let Operands { dims, a, b } = operands;
    let mut c: Vec<f32> = Vec::with_capacity(dims.result_len());
    for row in 0..dims.rows {
        for col in 0..dims.cols {
            let dot = (0..dims.inner).map(|k| a[row * dims.inner + k] * b[col * dims.inner + k]);
            c.push(dot.sum());
        }
    }
    c
}

/// Small integers, so that every partial sum is exact regardless of summation order
fn random_operands(rng: &mut SmallRng, max_dim: usize) -> Operands {
    let dims = clmatmul::Dims {
        rows: rng.gen_range(1..max_dim),
        inner: rng.gen_range(1..max_dim),
        cols: rng.gen_range(1..max_dim),
    };
    let a = (0..dims.a_len()).map(|_| rng.gen_range(-4..4) as f32).collect();
    let b = (0..dims.b_len()).map(|_| rng.gen_range(-4..4) as f32).collect();
    Operands { dims, a, b }
}

fn check_implementation(implementation: Implementation, max_side: usize) -> Result<(), MatmulError> {
    let config = config();
    let Ok(cl) = OpenCL::load(&config) else { return Ok(()) };
    let Some(device) = best_device(&cl, &config) else { return Ok(()) };
    let capabilities = probe(&cl, device, implementation)?;
    // keeps local memory of both tiles small on every device
    let side = capabilities.side.min(max_side);

    let mut rng = SmallRng::seed_from_u64(69420);
    let source = std::fs::read(config.kernel_path(implementation.kernel_file()))?;
    let options = BuildOptions::new(implementation, side);
    let session = Session::new(&cl, device, &source, &options, &config)?;
    for _ in 0..5 {
        let operands = random_operands(&mut rng, 50);
        let (aligned, geometry) = plan(implementation, &operands.dims, side);
        let completed = session.dispatch(implementation, &operands, &aligned, &geometry)?;
        assert_eq!(completed.result, reference(&operands), "{:?} {aligned:?}", operands.dims);
        let timings = Timings::read(&completed)?;
        assert!(timings.kernel_ms >= 0.0);
    }
    Ok(())
}

#[test]
fn random_naive() -> Result<(), MatmulError> {
    check_implementation(Implementation::Naive, 1)
}

#[test]
fn random_local_tiled() -> Result<(), MatmulError> {
    check_implementation(Implementation::LocalTiled, 15)
}

#[test]
fn random_vector_tiled() -> Result<(), MatmulError> {
    check_implementation(Implementation::VectorTiled, 16)
}

#[test]
fn failed_dispatch_keeps_session_usable() -> Result<(), MatmulError> {
    let config = config();
    let Ok(cl) = OpenCL::load(&config) else { return Ok(()) };
    let Some(device) = best_device(&cl, &config) else { return Ok(()) };
    let source = std::fs::read(config.kernel_path(Implementation::Naive.kernel_file()))?;
    let options = BuildOptions::new(Implementation::Naive, 1);
    let session = Session::new(&cl, device, &source, &options, &config)?;

    let mut rng = SmallRng::seed_from_u64(7);
    let operands = random_operands(&mut rng, 20);
    // naive kernel has only five arguments, setting the sixth fails after the upload
    let (aligned, geometry) = plan(Implementation::LocalTiled, &operands.dims, 4);
    let result = session.dispatch(Implementation::LocalTiled, &operands, &aligned, &geometry);
    let Err(MatmulError::BackendError(e)) = result else { panic!("{result:?}") };
    assert_eq!(e.status, ErrorStatus::IncorrectKernelArg);
    drop(operands);

    let operands = random_operands(&mut rng, 20);
    let (aligned, geometry) = plan(Implementation::Naive, &operands.dims, 1);
    let completed = session.dispatch(Implementation::Naive, &operands, &aligned, &geometry)?;
    assert_eq!(completed.result, reference(&operands));
    Ok(())
}
