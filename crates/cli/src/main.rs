use std::io::IsTerminal;

use clap::Parser;
use skytravel_cli::cli::Cli;
use skytravel_cli::error::CliError;
use skytravel_cli::output::{self, OutputFormat, ResultBuilder};
use skytravel_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);
	if !std::io::stdout().is_terminal() {
		colored::control::set_override(false);
	}

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		handle_error(err, command, format);
		std::process::exit(1);
	}
}

fn handle_error(err: CliError, command: &str, format: OutputFormat) {
	let cmd_error = err.to_command_error();

	// Humans read stderr
	output::print_error_stderr(&cmd_error);

	// Scripts read the envelope on stdout
	if format != OutputFormat::Text {
		let result: output::CommandResult<()> = ResultBuilder::new(command)
			.error_with_details(cmd_error.code, &cmd_error.message, cmd_error.details)
			.build();
		output::print_result(&result, format);
	}
}
