
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use skytravel::TransportKind;

use crate::output::OutputFormat;
use crate::styles::cli_styles;

/// Transport preference (CLI wrapper for skytravel::TransportKind)
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliTransport {
	/// Persistent WebSocket stream
	DirectStream,
	/// Long-polling fallback
	FallbackPoll,
}

impl From<CliTransport> for TransportKind {
	fn from(transport: CliTransport) -> Self {
		match transport {
			CliTransport::DirectStream => TransportKind::DirectStream,
			CliTransport::FallbackPoll => TransportKind::FallbackPoll,
		}
	}
}

#[derive(Parser, Debug)]
#[command(name = "skytravel")]
#[command(about = "Sky Travel - real-time flight recommendations from the command line")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default), json or ndjson
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Search service URL (http(s) or ws(s))
	#[arg(long, global = true, env = "SKYTRAVEL_API_URL", value_name = "URL")]
	pub url: Option<String>,

	/// JSON connection config (camelCase keys); flags override its values
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Do not reconnect after the channel drops
	#[arg(long, global = true)]
	pub no_reconnect: bool,

	/// Delay between reconnect attempts
	#[arg(long, global = true, value_name = "MS")]
	pub reconnect_delay_ms: Option<u64>,

	/// Reconnect attempts before giving up
	#[arg(long, global = true, value_name = "N")]
	pub max_reconnect_attempts: Option<u32>,

	/// Transports to try, in order (repeatable or comma-separated)
	#[arg(long = "transport", global = true, value_enum, value_delimiter = ',', value_name = "KIND")]
	pub transports: Vec<CliTransport>,

	/// Timeout for each connect attempt
	#[arg(long, global = true, default_value_t = 10, value_name = "SECS")]
	pub connect_timeout_secs: u64,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Search flights and print the AI-ranked recommendations
	Search(SearchArgs),
	/// Connect to the search service and report the connection state
	Check(CheckArgs),
	/// Ask the service whether an offer from a search can be booked
	Details(DetailsArgs),
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Search(_) => "search",
			Commands::Check(_) => "check",
			Commands::Details(_) => "details",
		}
	}
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
	/// Departure city or airport
	pub origin: String,

	/// Arrival city or airport
	pub destination: String,

	/// Departure date (YYYY-MM-DD)
	pub date: String,

	/// Preferred airline
	#[arg(short, long)]
	pub airline: Option<String>,

	/// Give up if the search has not finished after this long
	#[arg(long, default_value_t = 120, value_name = "SECS")]
	pub timeout_secs: u64,

	/// Show at most this many recommendations
	#[arg(short = 'n', long, value_name = "N")]
	pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
	/// How long to wait for the connection and the server's acknowledgement
	#[arg(long, default_value_t = 10, value_name = "SECS")]
	pub timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct DetailsArgs {
	/// Offer id as listed by `search` (e.g. FL1001)
	pub flight_id: String,

	/// How long to wait for the connection and the answer
	#[arg(long, default_value_t = 10, value_name = "SECS")]
	pub timeout_secs: u64,
}
