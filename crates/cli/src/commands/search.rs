use std::time::{Duration, Instant};

use anyhow::anyhow;
use chrono::Local;
use serde::Serialize;
use skytravel::{
	FailureKind, RecommendationResult, SearchController, SearchRequest, SearchSession, SessionPhase, SessionState,
	SessionToken,
};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

use crate::cli::SearchArgs;
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat, ResultBuilder};
use crate::render;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutput {
	pub request: SearchRequest,
	pub token: SessionToken,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_sid: Option<String>,
	pub result: RecommendationResult,
}

/// One `ndjson` progress line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Progress<'a> {
	phase: SessionPhase,
	#[serde(skip_serializing_if = "Option::is_none")]
	stage: Option<&'a str>,
	message: &'a str,
}

pub async fn run(settings: &Settings, args: SearchArgs, format: OutputFormat) -> Result<()> {
	let started = Instant::now();

	let mut request = SearchRequest::new(args.origin, args.destination, args.date);
	if let Some(airline) = args.airline {
		request = request.with_airline(airline);
	}
	// Nothing touches the network for a request the controller would reject.
	request.validate(Local::now().date_naive())?;

	let wait = Duration::from_secs(args.timeout_secs);
	let manager = settings.connection_manager();
	let controller = SearchController::new(manager.handle());
	super::open_and_wait(&manager, settings, wait).await?;

	let mut updates = WatchStream::new(controller.watch());
	let token = controller.submit(request.clone())?;
	tracing::info!(token, origin = %request.origin, destination = %request.destination, "Search submitted");

	let outcome = tokio::time::timeout(wait, follow(&mut updates, token, format)).await;
	let server_sid = manager.server_sid();
	manager.close();

	let session = outcome
		.map_err(|_| CliError::Timeout {
			secs: args.timeout_secs,
			condition: "search results".to_string(),
		})?
		.ok_or_else(|| anyhow!("search session ended unexpectedly"))?;

	match session.state() {
		SessionState::Completed { result } => {
			let mut result = result.clone();
			if format == OutputFormat::Text {
				print!("{}", render::render_result(&request, &result, args.limit));
				return Ok(());
			}
			if let Some(limit) = args.limit {
				result.recommendations.truncate(limit);
			}
			let data = SearchOutput {
				request,
				token,
				server_sid,
				result,
			};
			let envelope = ResultBuilder::new("search").started_at(started).data(data).build();
			output::print_result(&envelope, format);
			Ok(())
		}
		SessionState::Failed {
			kind: FailureKind::Connection,
			error_message,
			..
		} => Err(CliError::ConnectionLost {
			url: settings.connection.url.clone(),
			reason: controller
				.last_connection_error()
				.unwrap_or_else(|| error_message.clone()),
		}),
		SessionState::Failed {
			kind,
			error_kind,
			error_message,
		} => Err(CliError::SearchFailed {
			kind: *kind,
			error_kind: error_kind.clone(),
			message: error_message.clone(),
		}),
		other => Err(anyhow!("search stopped in phase {}", other.phase()).into()),
	}
}

/// Reports progress until the search with `token` ends.
async fn follow(
	updates: &mut WatchStream<SearchSession>,
	token: SessionToken,
	format: OutputFormat,
) -> Option<SearchSession> {
	let mut last_message: Option<String> = None;

	while let Some(session) = updates.next().await {
		if session.token() != Some(token) {
			continue;
		}

		if let Some(message) = session.status_message() {
			if last_message.as_deref() != Some(message) {
				last_message = Some(message.to_string());
				match format {
					OutputFormat::Text => {
						if let Some(line) = render::status_line(&session) {
							eprintln!("{line}");
						}
					}
					OutputFormat::Ndjson => output::print_line(&Progress {
						phase: session.phase(),
						stage: session.stage(),
						message,
					}),
					OutputFormat::Json => {}
				}
			}
		}

		if session.phase().is_terminal() {
			return Some(session);
		}
	}
	None
}
