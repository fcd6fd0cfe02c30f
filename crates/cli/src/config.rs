//! Connection settings assembled from the config file, environment and flags.
//!
//! Precedence, lowest first: built-in defaults, `--config` file, then
//! `SKYTRAVEL_API_URL` / individual flags.

use std::path::Path;
use std::time::Duration;

use skytravel::{ConnectionConfig, ConnectionManager, TransportKind};
use skytravel_runtime::WebSocketConnector;

use crate::cli::Cli;
use crate::error::{CliError, Result};

#[derive(Debug, Clone)]
pub struct Settings {
	pub connection: ConnectionConfig,
	pub connect_timeout: Duration,
}

impl Settings {
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let mut connection = match &cli.config {
			Some(path) => load_config_file(path)?,
			None => ConnectionConfig::default(),
		};

		if let Some(url) = &cli.url {
			connection.url = url.clone();
		}
		if cli.no_reconnect {
			connection.auto_reconnect = false;
		}
		if let Some(delay) = cli.reconnect_delay_ms {
			connection.reconnect_delay_ms = delay;
		}
		if let Some(attempts) = cli.max_reconnect_attempts {
			connection.max_reconnect_attempts = attempts;
		}
		if !cli.transports.is_empty() {
			connection.transports = cli.transports.iter().copied().map(Into::into).collect();
		}

		Ok(Self {
			connection,
			connect_timeout: Duration::from_secs(cli.connect_timeout_secs),
		})
	}

	/// A closed manager that dials `direct-stream` over WebSocket.
	pub fn connection_manager(&self) -> ConnectionManager {
		let connector = WebSocketConnector::new().with_connect_timeout(self.connect_timeout);
		ConnectionManager::without_connectors().with_connector(TransportKind::DirectStream, connector)
	}
}

pub fn load_config_file(path: &Path) -> Result<ConnectionConfig> {
	let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
		path: path.to_path_buf(),
		source,
	})?;
	serde_json::from_str(&text).map_err(|source| CliError::ConfigFormat {
		path: path.to_path_buf(),
		source,
	})
}
