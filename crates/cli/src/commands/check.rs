use std::time::{Duration, Instant};

use colored::Colorize;
use serde::Serialize;
use skytravel::ConnectionState;
use skytravel_protocol::CONNECTION_ACK;
use tokio::sync::mpsc;

use crate::cli::CheckArgs;
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat, ResultBuilder};

/// How long to wait for the optional `connection-ack` once connected.
const ACK_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutput {
	pub url: String,
	pub endpoint: String,
	pub connection: ConnectionState,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_sid: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_message: Option<String>,
}

pub async fn run(settings: &Settings, args: CheckArgs, format: OutputFormat) -> Result<()> {
	let started = Instant::now();
	let url = settings.connection.url.clone();
	let endpoint = settings.connection.endpoint().map_err(|e| CliError::Connection {
		url: url.clone(),
		reason: e.to_string(),
	})?;

	let manager = settings.connection_manager();
	let (ack_tx, mut ack_rx) = mpsc::unbounded_channel();
	let _ack = manager.subscribe(CONNECTION_ACK, move |frame| {
		let message = frame.data.get("message").and_then(|m| m.as_str()).map(str::to_string);
		let _ = ack_tx.send(message);
	});

	super::open_and_wait(&manager, settings, Duration::from_secs(args.timeout_secs)).await?;

	let server_message = match tokio::time::timeout(ACK_GRACE, ack_rx.recv()).await {
		Ok(Some(message)) => message,
		_ => {
			tracing::debug!("No connection-ack from server");
			None
		}
	};

	let data = CheckOutput {
		url,
		endpoint: endpoint.to_string(),
		connection: manager.state(),
		server_sid: manager.server_sid(),
		server_message,
	};
	manager.close();

	if format == OutputFormat::Text {
		let mut line = format!("{} {}", "connected".green().bold(), data.endpoint);
		if let Some(sid) = &data.server_sid {
			line.push_str(&format!(" (sid {sid})"));
		}
		println!("{line}");
		if let Some(message) = &data.server_message {
			println!("{message}");
		}
		return Ok(());
	}

	let envelope = ResultBuilder::new("check").started_at(started).data(data).build();
	output::print_result(&envelope, format);
	Ok(())
}
