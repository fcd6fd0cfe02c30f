use std::time::Duration;

use skytravel::{ConnectionManager, ConnectionState};

use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::error::{CliError, Result};

pub mod check;
pub mod details;
pub mod search;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let settings = Settings::from_cli(&cli)?;
	let format = cli.format;

	match cli.command {
		Commands::Search(args) => search::run(&settings, args, format).await,
		Commands::Check(args) => check::run(&settings, args, format).await,
		Commands::Details(args) => details::run(&settings, args, format).await,
	}
}

/// Opens `manager` and waits until it is connected or has given up.
///
/// Handlers that must see the first frames have to be subscribed before this.
pub(crate) async fn open_and_wait(manager: &ConnectionManager, settings: &Settings, wait: Duration) -> Result<()> {
	let url = settings.connection.url.clone();
	manager.open(settings.connection.clone());

	let mut state = manager.watch_state();
	let settled = tokio::time::timeout(
		wait,
		state.wait_for(|s| s.is_connected() || *s == ConnectionState::Disconnected),
	)
	.await;

	let connected = match settled {
		Ok(Ok(current)) => current.is_connected(),
		Ok(Err(_)) => false,
		Err(_) => {
			return Err(CliError::Timeout {
				secs: wait.as_secs(),
				condition: format!("connection to {url}"),
			});
		}
	};

	if connected {
		Ok(())
	} else {
		Err(CliError::Connection {
			url,
			reason: manager
				.last_error()
				.unwrap_or_else(|| "connection closed by server".to_string()),
		})
	}
}
