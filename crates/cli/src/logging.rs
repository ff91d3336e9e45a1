use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber; `RUST_LOG` wins over `verbosity`.
///
/// Stdout carries result envelopes (and frames under `serve`), so logs never go there.
pub fn init_logging(verbosity: u8) {
	// 0 = errors only, bridge internals silent
	// 1 (-v) = info for the CLI, warn for the libraries
	// 2+ (-vv) = debug for everything
	let filter = match verbosity {
		0 => "error,pdf_bridge=off,pdf_bridge_runtime=off",
		1 => "info,pdf_bridge=warn,pdf_bridge_runtime=warn",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
