//! Command line arguments and the multiplication pipeline

use crate::{
    build_options::BuildOptions,
    config::Config,
    device::{enumerate_devices, rank_devices, select_device},
    dispatch::{plan, Session},
    error::{BackendError, ErrorStatus},
    matrix::{read_operands, write_result},
    opencl::OpenCL,
    probe::probe,
    profiler::Timings,
    Implementation, MatmulError,
};
use std::path::PathBuf;

const USAGE: &str = "clmatmul <device> <input file> <output file> <implementation 1|2|3>";

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Rank of the device, out of range values select the best device
    pub device: i64,
    pub input: PathBuf,
    pub output: PathBuf,
    pub implementation: Implementation,
}

impl Args {
    /// Parses arguments following the program name
    pub fn parse<I>(args: I) -> Result<Args, MatmulError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let [device, input, output, implementation] = args.as_slice() else {
            return Err(MatmulError::usage_error(format!(
                "Wrong number of arguments {}, expected {USAGE}",
                args.len()
            )));
        };
        let device = device.parse::<i64>().map_err(|e| {
            MatmulError::usage_error(format!("Device {device:?} is not an integer, {e}"))
        })?;
        let implementation = implementation.parse::<i64>().map_err(|e| {
            MatmulError::usage_error(format!(
                "Implementation {implementation:?} is not an integer, {e}"
            ))
        })?;
        Ok(Args {
            device,
            input: input.into(),
            output: output.into(),
            implementation: Implementation::try_from(implementation)?,
        })
    }
}

/// Multiplies matrices from `args.input` on the selected device and writes the result to
/// `args.output`. Nothing is written unless the whole run succeeds.
pub fn run(args: &Args, config: &Config) -> Result<(), MatmulError> {
    let implementation = args.implementation;
    let operands = read_operands(&args.input)?;

    let cl = OpenCL::load(config)?;
    let mut devices = enumerate_devices(&cl, config)?;
    rank_devices(&mut devices);
    if config.debug_dev() {
        for dev in &devices {
            println!(
                "Device {:?} {:?}, host unified memory {}, tier {}, rank {}",
                dev.id,
                dev.class,
                dev.host_unified_memory,
                dev.tier(),
                dev.rank
            );
        }
    }
    let device = select_device(&devices, args.device).ok_or_else(|| BackendError {
        status: ErrorStatus::DeviceEnumeration,
        context: "Number of devices: 0".into(),
    })?;

    let capabilities = probe(&cl, device, implementation)?;
    let (aligned, geometry) = plan(implementation, &operands.dims, capabilities.side);
    if config.debug_perf() {
        println!("Using {implementation} implementation, {:?}", operands.dims);
        println!("Aligned to {aligned:?}");
        println!("{geometry}");
    }

    let kernel_path = config.kernel_path(implementation.kernel_file());
    if config.debug_asm() {
        println!("Kernel source {}", kernel_path.display());
    }
    let source =
        std::fs::read(&kernel_path).map_err(|e| MatmulError::io_error(&kernel_path, e))?;

    let options = BuildOptions::new(implementation, capabilities.side);
    let session = Session::new(&cl, device, &source, &options, config)?;
    let completed = session.dispatch(implementation, &operands, &aligned, &geometry)?;
    let timings = Timings::read(&completed)?;
    println!("{}", timings.report(implementation, &geometry));

    write_result(&args.output, &operands.dims, &completed.result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args() {
        let args = Args::parse(["-1", "in.txt", "out.txt", "3"]).unwrap();
        assert_eq!(args.device, -1);
        assert_eq!(args.input, PathBuf::from("in.txt"));
        assert_eq!(args.implementation, Implementation::VectorTiled);
    }

    #[test]
    fn usage_errors() {
        let cases: [&[&str]; 7] = [
            &["0", "in.txt", "out.txt"],
            &["0", "in.txt", "out.txt", "1", "extra"],
            &["gpu", "in.txt", "out.txt", "1"],
            &["0", "in.txt", "out.txt", "two"],
            &["0", "in.txt", "out.txt", "0"],
            &["0", "in.txt", "out.txt", "4"],
            &[],
        ];
        for args in cases {
            let result = Args::parse(args.iter().copied());
            assert!(matches!(result, Err(MatmulError::UsageError(_))), "{args:?} {result:?}");
        }
    }
}
