//! Search criteria submitted by the caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Departure date of a search.
pub type CalendarDate = NaiveDate;

/// Wire format of [`SearchRequest::date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reasons a [`SearchRequest`] is rejected before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("{0} is required")]
	MissingField(&'static str),

	#[error("invalid date '{0}': expected YYYY-MM-DD")]
	InvalidDate(String),

	#[error("departure date {date} is in the past (today is {today})")]
	DateInPast {
		date: CalendarDate,
		today: CalendarDate,
	},
}

/// One flight search, exactly as it is sent in a `start-search` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
	pub origin: String,
	pub destination: String,
	/// ISO calendar date (`YYYY-MM-DD`).
	pub date: String,
	#[serde(rename = "airline", default, skip_serializing_if = "Option::is_none")]
	pub preferred_airline: Option<String>,
}

impl SearchRequest {
	/// Builds a request, trimming the free-text fields.
	pub fn new(origin: impl Into<String>, destination: impl Into<String>, date: impl Into<String>) -> Self {
		Self {
			origin: origin.into().trim().to_string(),
			destination: destination.into().trim().to_string(),
			date: date.into().trim().to_string(),
			preferred_airline: None,
		}
	}

	/// Sets the preferred airline. Blank input clears it.
	pub fn with_airline(mut self, airline: impl Into<String>) -> Self {
		let airline = airline.into().trim().to_string();
		self.preferred_airline = (!airline.is_empty()).then_some(airline);
		self
	}

	/// Parses [`date`](Self::date).
	pub fn calendar_date(&self) -> Result<CalendarDate, ValidationError> {
		NaiveDate::parse_from_str(&self.date, DATE_FORMAT).map_err(|_| ValidationError::InvalidDate(self.date.clone()))
	}

	/// Checks required fields and that the departure date is not before `today`.
	///
	/// Fields are checked in form order: origin, destination, date.
	pub fn validate(&self, today: CalendarDate) -> Result<CalendarDate, ValidationError> {
		if self.origin.trim().is_empty() {
			return Err(ValidationError::MissingField("origin"));
		}
		if self.destination.trim().is_empty() {
			return Err(ValidationError::MissingField("destination"));
		}
		if self.date.trim().is_empty() {
			return Err(ValidationError::MissingField("date"));
		}

		let date = self.calendar_date()?;
		if date < today {
			return Err(ValidationError::DateInPast { date, today });
		}
		Ok(date)
	}

	/// Compares two requests the way the backend echoes them back.
	///
	/// Whitespace and case around place names are ignored, and an empty
	/// airline is the same as no airline.
	pub fn same_search(&self, other: &SearchRequest) -> bool {
		fn norm(value: &str) -> String {
			value.trim().to_lowercase()
		}
		fn airline(request: &SearchRequest) -> Option<String> {
			request.preferred_airline.as_deref().map(norm).filter(|a| !a.is_empty())
		}

		norm(&self.origin) == norm(&other.origin)
			&& norm(&self.destination) == norm(&other.destination)
			&& self.date.trim() == other.date.trim()
			&& airline(self) == airline(other)
	}
}
