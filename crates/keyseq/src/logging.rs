//! Tracing setup for embedders that do not install their own subscriber.

use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

/// Directory for per-process log files; stderr is used when unset or unwritable.
pub const LOG_DIR_ENV: &str = "KEYSEQ_LOG_DIR";

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the default filter. Fails if a subscriber is already set.
pub fn init(verbose: bool) -> Result<(), TryInitError> {
	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("keyseq=trace,debug")
			} else {
				EnvFilter::new("keyseq=debug,info")
			}
		})
	};

	if let Some(log_dir) = std::env::var_os(LOG_DIR_ENV).map(PathBuf::from) {
		let log_path = log_dir.join(format!("keyseq.{}.log", std::process::id()));
		let file = std::fs::create_dir_all(&log_dir)
			.and_then(|()| OpenOptions::new().create(true).append(true).open(&log_path));
		if let Ok(file) = file {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_span_events(FmtSpan::CLOSE)
				.with_target(true);
			tracing_subscriber::registry().with(filter()).with(file_layer).try_init()?;
			tracing::info!(path = ?log_path, "keyseq tracing initialized");
			return Ok(());
		}
	}

	tracing_subscriber::registry()
		.with(filter())
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.try_init()
}
