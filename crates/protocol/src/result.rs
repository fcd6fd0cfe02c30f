//! Recommendation payload carried by `search-complete`.
//!
//! These types are passed through untouched. Missing fields and fields sent
//! as `null` both fall back to their defaults, so a partially filled offer
//! still decodes.

use serde::{Deserialize, Deserializer, Serialize};

fn default_success() -> bool {
	true
}

/// Reads `null` as the type's default.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_success<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_success))
}

/// Final answer of one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
	#[serde(default = "default_success", deserialize_with = "nullable_success")]
	pub success: bool,
	/// Number of offers the backend looked at before ranking.
	#[serde(rename = "total_flights_analyzed", default, deserialize_with = "nullable")]
	pub total_analyzed: u32,
	/// Ranked offers, best first.
	#[serde(default, deserialize_with = "nullable")]
	pub recommendations: Vec<FlightOffer>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
}

impl Default for RecommendationResult {
	fn default() -> Self {
		Self {
			success: true,
			total_analyzed: 0,
			recommendations: Vec::new(),
			note: None,
		}
	}
}

/// One bookable flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightOffer {
	#[serde(deserialize_with = "nullable")]
	pub id: String,
	#[serde(deserialize_with = "nullable")]
	pub airline: String,
	#[serde(deserialize_with = "nullable")]
	pub flight_number: String,
	#[serde(deserialize_with = "nullable")]
	pub origin: String,
	#[serde(deserialize_with = "nullable")]
	pub destination: String,
	#[serde(deserialize_with = "nullable")]
	pub departure_time: String,
	#[serde(deserialize_with = "nullable")]
	pub arrival_time: String,
	#[serde(deserialize_with = "nullable")]
	pub duration: String,
	#[serde(deserialize_with = "nullable")]
	pub price: f64,
	#[serde(deserialize_with = "nullable")]
	pub currency: String,
	#[serde(deserialize_with = "nullable")]
	pub stops: u32,
	#[serde(deserialize_with = "nullable")]
	pub cabin_class: String,
	#[serde(deserialize_with = "nullable")]
	pub available_seats: u32,
	#[serde(deserialize_with = "nullable")]
	pub baggage: Baggage,
	#[serde(deserialize_with = "nullable")]
	pub amenities: Vec<String>,
	#[serde(deserialize_with = "nullable")]
	pub booking_url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ai_analysis: Option<AiAnalysis>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Baggage {
	#[serde(deserialize_with = "nullable")]
	pub carry_on: u32,
	#[serde(deserialize_with = "nullable")]
	pub checked: u32,
}

/// Ranking annotation added by the recommendation engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiAnalysis {
	#[serde(deserialize_with = "nullable")]
	pub rank: u32,
	#[serde(deserialize_with = "nullable")]
	pub reason: String,
	#[serde(deserialize_with = "nullable")]
	pub highlights: Vec<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_backend_result() {
		let json = serde_json::json!({
			"success": true,
			"total_flights_analyzed": 12,
			"recommendations": [{
				"id": "FL1001",
				"airline": "Air France",
				"flight_number": "AI123",
				"origin": "Paris",
				"destination": "Tokyo",
				"departure_time": "2025-06-01 09:30",
				"arrival_time": "2025-06-02 05:10",
				"duration": "12h 40m",
				"price": 642,
				"currency": "EUR",
				"stops": 0,
				"cabin_class": "Economy",
				"available_seats": 14,
				"baggage": {"carry_on": 1, "checked": 1},
				"amenities": ["WiFi"],
				"booking_url": "https://booking.example.com/flight/1001",
				"ai_analysis": {"rank": 1, "reason": "Direct", "highlights": ["no stops"]}
			}],
			"note": "fallback ranking"
		});

		let result: RecommendationResult = serde_json::from_value(json).unwrap();
		assert_eq!(result.total_analyzed, 12);
		assert_eq!(result.note.as_deref(), Some("fallback ranking"));

		let offer = &result.recommendations[0];
		assert_eq!(offer.id, "FL1001");
		assert_eq!(offer.price, 642.0);
		assert_eq!(offer.baggage.checked, 1);
		assert_eq!(offer.ai_analysis.as_ref().map(|a| a.rank), Some(1));
	}

	#[test]
	fn sparse_result_uses_defaults() {
		let result: RecommendationResult = serde_json::from_value(serde_json::json!({
			"recommendations": [{"id": "FL1"}]
		}))
		.unwrap();

		assert!(result.success);
		assert_eq!(result.total_analyzed, 0);
		assert_eq!(result.recommendations[0].ai_analysis, None);
		assert!(result.recommendations[0].amenities.is_empty());
	}

	#[test]
	fn null_fields_decode_as_defaults() {
		let result: RecommendationResult = serde_json::from_value(serde_json::json!({
			"success": null,
			"total_flights_analyzed": null,
			"recommendations": [{
				"id": "FL2",
				"airline": null,
				"price": null,
				"stops": null,
				"baggage": {"carry_on": null, "checked": 2},
				"amenities": null,
				"ai_analysis": {"rank": null, "reason": null, "highlights": null}
			}]
		}))
		.unwrap();

		assert!(result.success);
		assert_eq!(result.total_analyzed, 0);

		let offer = &result.recommendations[0];
		assert_eq!(offer.id, "FL2");
		assert_eq!(offer.airline, "");
		assert_eq!(offer.price, 0.0);
		assert_eq!(offer.baggage, Baggage { carry_on: 0, checked: 2 });
		assert!(offer.amenities.is_empty());
		assert_eq!(offer.ai_analysis, Some(AiAnalysis::default()));
	}

	#[test]
	fn null_recommendations_is_empty() {
		let result: RecommendationResult =
			serde_json::from_value(serde_json::json!({"recommendations": null, "ai_analysis": null})).unwrap();
		assert!(result.recommendations.is_empty());
	}
}
