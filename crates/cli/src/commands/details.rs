use std::time::{Duration, Instant};

use anyhow::anyhow;
use colored::Colorize;
use serde::Serialize;
use skytravel::ValidationError;
use skytravel_protocol::{
	ClientEvent, FLIGHT_DETAILS, FLIGHT_DETAILS_ERROR, FlightDetails, FlightDetailsRequest, ServerEvent,
};
use tokio::sync::mpsc;

use crate::cli::DetailsArgs;
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat, ResultBuilder};

type Reply = serde_json::Result<Option<ServerEvent>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsOutput {
	pub flight_id: String,
	pub booking_ready: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl From<FlightDetails> for DetailsOutput {
	fn from(details: FlightDetails) -> Self {
		Self {
			flight_id: details.flight_id,
			booking_ready: details.booking_ready,
			message: details.message,
		}
	}
}

pub async fn run(settings: &Settings, args: DetailsArgs, format: OutputFormat) -> Result<()> {
	let started = Instant::now();
	let flight_id = args.flight_id.trim().to_string();
	if flight_id.is_empty() {
		return Err(ValidationError::MissingField("flight_id").into());
	}

	let wait = Duration::from_secs(args.timeout_secs);
	let manager = settings.connection_manager();
	let (reply_tx, mut replies) = mpsc::unbounded_channel::<Reply>();
	let _subscriptions = [FLIGHT_DETAILS, FLIGHT_DETAILS_ERROR].map(|event| {
		let reply_tx = reply_tx.clone();
		manager.subscribe(event, move |frame| {
			let _ = reply_tx.send(ServerEvent::from_frame(frame));
		})
	});
	drop(reply_tx);

	super::open_and_wait(&manager, settings, wait).await?;

	let request = ClientEvent::GetFlightDetails(FlightDetailsRequest {
		flight_id: flight_id.clone(),
	})
	.into_frame()?;
	if !manager.send(request) {
		return Err(CliError::Connection {
			url: settings.connection.url.clone(),
			reason: "connection dropped before the request was sent".to_string(),
		});
	}
	tracing::info!(%flight_id, "Requested flight details");

	let answer = tokio::time::timeout(wait, next_answer(&mut replies, &flight_id)).await;
	manager.close();

	let details = answer.map_err(|_| CliError::Timeout {
		secs: args.timeout_secs,
		condition: format!("details for flight {flight_id}"),
	})??;
	let data = DetailsOutput::from(details);

	if format == OutputFormat::Text {
		let verdict = if data.booking_ready {
			"ready to book".green().bold()
		} else {
			"not bookable yet".yellow().bold()
		};
		println!("{} {verdict}", data.flight_id);
		if let Some(message) = &data.message {
			println!("{message}");
		}
		return Ok(());
	}

	let envelope = ResultBuilder::new("details").started_at(started).data(data).build();
	output::print_result(&envelope, format);
	Ok(())
}

/// First answer about `flight_id`. Replies naming another flight are skipped.
async fn next_answer(replies: &mut mpsc::UnboundedReceiver<Reply>, flight_id: &str) -> Result<FlightDetails> {
	while let Some(reply) = replies.recv().await {
		match reply {
			Ok(Some(ServerEvent::FlightDetails(details))) if details.flight_id == flight_id => return Ok(details),
			Ok(Some(ServerEvent::FlightDetails(details))) => {
				tracing::debug!(other = %details.flight_id, "Skipping details for another flight");
			}
			Ok(Some(ServerEvent::FlightDetailsError(refused))) => {
				return Err(CliError::DetailsRefused {
					flight_id: flight_id.to_string(),
					error: refused.error,
				});
			}
			Ok(_) => {}
			Err(e) => return Err(anyhow!("malformed flight details reply: {e}").into()),
		}
	}
	Err(anyhow!("connection closed before flight details arrived").into())
}
