use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const OWN_CRATES: [&str; 3] = ["skytravel", "skytravel_runtime", "skytravel_cli"];

/// Filter directive for a `-v` count.
///
/// 0 keeps stderr to errors so status lines stay readable, 1 adds our
/// lifecycle events (connects, reconnects, submissions), 2 adds every frame,
/// 3+ opens up the WebSocket stack too.
pub fn filter_for(verbosity: u8) -> String {
	let own = |level: &str| {
		OWN_CRATES
			.iter()
			.map(|krate| format!("{krate}={level}"))
			.collect::<Vec<_>>()
			.join(",")
	};

	match verbosity {
		0 => "error".to_string(),
		1 => format!("warn,{}", own("info")),
		2 => format!("warn,{}", own("debug")),
		_ => "trace".to_string(),
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_for(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
