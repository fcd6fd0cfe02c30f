//! Text rendering for search progress and recommendations.

use std::fmt::Write;

use colored::Colorize;
use skytravel::{FlightOffer, RecommendationResult, SearchRequest, SearchSession};

/// One progress line, e.g. `[analyzing] 12 flights found`.
pub fn status_line(session: &SearchSession) -> Option<String> {
	let message = session.status_message()?;
	Some(match session.stage() {
		Some(stage) => format!("{} {message}", format!("[{stage}]").cyan()),
		None => format!("{} {message}", "..".dimmed()),
	})
}

pub fn format_price(price: f64, currency: &str) -> String {
	if currency.is_empty() {
		format!("{price:.2}")
	} else {
		format!("{price:.2} {currency}")
	}
}

pub fn stops_label(stops: u32) -> String {
	match stops {
		0 => "Direct".to_string(),
		1 => "1 stop".to_string(),
		n => format!("{n} stops"),
	}
}

/// Renders the recommendation list, best first.
pub fn render_result(request: &SearchRequest, result: &RecommendationResult, limit: Option<usize>) -> String {
	let mut out = String::new();

	let mut route = format!("{} → {} on {}", request.origin, request.destination, request.date);
	if let Some(airline) = &request.preferred_airline {
		let _ = write!(route, " ({airline})");
	}
	let _ = writeln!(out, "{}", route.bold());
	let _ = writeln!(
		out,
		"{} flights analyzed, {} recommended",
		result.total_analyzed,
		result.recommendations.len()
	);

	if result.recommendations.is_empty() {
		let _ = writeln!(out, "\n{}", "No flights match this search.".yellow());
	}

	let shown = limit.unwrap_or(usize::MAX);
	for (index, offer) in result.recommendations.iter().take(shown).enumerate() {
		out.push('\n');
		render_offer(&mut out, index + 1, offer);
	}
	if result.recommendations.len() > shown {
		let _ = writeln!(out, "\n... {} more", result.recommendations.len() - shown);
	}

	if let Some(note) = &result.note {
		let _ = writeln!(out, "\n{} {note}", "Note:".dimmed());
	}
	out
}

fn render_offer(out: &mut String, position: usize, offer: &FlightOffer) {
	let rank = offer.ai_analysis.as_ref().map(|a| a.rank as usize).unwrap_or(position);
	let _ = writeln!(
		out,
		"{} {} {}  {}",
		format!("#{rank}").green().bold(),
		offer.airline,
		offer.flight_number,
		format_price(offer.price, &offer.currency).bold()
	);

	let mut schedule = format!(
		"   {} {} → {} {}",
		offer.origin, offer.departure_time, offer.destination, offer.arrival_time
	);
	if !offer.duration.is_empty() {
		let _ = write!(schedule, " · {}", offer.duration);
	}
	let _ = write!(schedule, " · {}", stops_label(offer.stops));
	if !offer.cabin_class.is_empty() {
		let _ = write!(schedule, " · {}", offer.cabin_class);
	}
	let _ = writeln!(out, "{schedule}");

	if let Some(analysis) = &offer.ai_analysis {
		if !analysis.reason.is_empty() {
			let _ = writeln!(out, "   {}", analysis.reason.italic());
		}
		for highlight in &analysis.highlights {
			let _ = writeln!(out, "   {} {highlight}", "+".green());
		}
	}
	if !offer.booking_url.is_empty() {
		let _ = writeln!(out, "   {} {}", "Book:".dimmed(), offer.booking_url);
	}
}
