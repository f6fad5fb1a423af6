use std::io::stdin;
use std::process::ExitCode;
use std::sync::Arc;

use nulll::config::Config;
use nulll::host::{self, PumpErr, Registry};
use nulll::{AccountingSink, Query};
use tracing::error;

const CHUNK: usize = 0x10000;

/// nulll [capacity=N] [name=NAME]
///
/// Registers a sink, swallows stdin into it and prints the number of bytes
/// the device accepted.
fn main() -> ExitCode {
	if let Err(err) = nulll::logging::init() {
		eprintln!("failed to set up logging: {err}");
	}

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(err) => {
			error!(%err, "invalid configuration");
			return ExitCode::from(2);
		}
	};

	let registry = Registry::new();
	let sink = Arc::new(AccountingSink::new(config.capacity));
	// Registration failing is fatal: nothing gets served.
	if let Err(err) = registry.register(&config.name, sink) {
		error!(%err, "device registration failed");
		return ExitCode::from(2);
	}

	let status = serve(&registry, &config.name);
	registry.deregister(&config.name);
	status
}

fn serve(registry: &Registry, name: &str) -> ExitCode {
	let file = match registry.open(name) {
		Ok(file) => file,
		Err(err) => {
			error!(%err, "failed to open device");
			return ExitCode::from(2);
		}
	};

	let mut buf = vec![0u8; CHUNK];
	let pumped = host::pump(stdin(), &file, &mut buf);

	let mut out = [0u8; 8];
	match file.ioctl(Query::TotalSize.code(), &mut out) {
		Ok(()) => println!("{}", u64::from_le_bytes(out)),
		Err(errno) => error!(%errno, "size query failed"),
	}

	match pumped {
		Ok(_) => ExitCode::SUCCESS,
		Err(err @ PumpErr::Device { .. }) => {
			error!(%err, "device stopped accepting input");
			ExitCode::from(1)
		}
		Err(err @ PumpErr::Read(_)) => {
			error!(%err, "stdin");
			ExitCode::from(2)
		}
	}
}
