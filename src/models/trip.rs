use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// Raw `/view_trip` submission. Checkbox groups arrive as repeated keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripForm {
    #[serde(rename = "location-search")]
    pub location: Option<String>,
    #[serde(rename = "trip-start")]
    pub trip_start: Option<String>,
    #[serde(rename = "trip-end")]
    pub trip_end: Option<String>,
    #[serde(rename = "trip-name")]
    pub trip_name: Option<String>,
    #[serde(rename = "traveling-with", default)]
    pub traveling_with: Vec<String>,
    #[serde(default)]
    pub lodging: Vec<String>,
    #[serde(default)]
    pub adventure: Vec<String>,
}

impl TripForm {
    /// Checks presence of the required fields and cleans up the rest.
    /// The error lists the human-readable names of every missing field.
    pub fn into_request(self) -> Result<TripRequest, Vec<&'static str>> {
        let location = normalize_optional(self.location);
        let trip_start = normalize_optional(self.trip_start);
        let trip_end = normalize_optional(self.trip_end);

        let mut missing = Vec::new();
        if location.is_none() {
            missing.push("destination");
        }
        if trip_start.is_none() {
            missing.push("start date");
        }
        if trip_end.is_none() {
            missing.push("end date");
        }
        let (Some(location), Some(trip_start), Some(trip_end)) = (location, trip_start, trip_end)
        else {
            return Err(missing);
        };

        let trip_name = normalize_optional(self.trip_name)
            .unwrap_or_else(|| format!("My trip to {location}"));

        Ok(TripRequest {
            location,
            trip_start,
            trip_end,
            trip_name,
            traveling_with: clean_list(self.traveling_with),
            lodging: clean_list(self.lodging),
            adventure: clean_list(self.adventure),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    pub location: String,
    pub trip_start: String,
    pub trip_end: String,
    pub trip_name: String,
    pub traveling_with: Vec<String>,
    pub lodging: Vec<String>,
    pub adventure: Vec<String>,
}

impl TripRequest {
    pub fn traveling_with_list(&self) -> String {
        self.traveling_with.join(", ")
    }

    pub fn lodging_list(&self) -> String {
        self.lodging.join(", ")
    }

    pub fn adventure_list(&self) -> String {
        self.adventure.join(", ")
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryItem {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub day: u32,
    pub date: String,
    pub morning: String,
    pub afternoon: String,
    pub evening: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
}

impl ItineraryItem {
    pub fn has_weather(&self) -> bool {
        self.weather.is_some()
    }

    pub fn weather_text(&self) -> &str {
        self.weather.as_deref().unwrap_or("")
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripResponse {
    pub trip_name: String,
    pub location: String,
    pub trip_start: String,
    pub trip_end: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub num_days: u32,
    pub traveling_with: String,
    pub lodging: String,
    pub adventure: String,
    pub itinerary: Vec<ItineraryItem>,
}

impl TripResponse {
    /// Parses and validates a model answer in one go.
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        let trip: TripResponse =
            serde_json::from_str(raw).map_err(|err| format!("invalid itinerary JSON: {err}"))?;
        trip.validate()?;
        Ok(trip)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.itinerary.is_empty() {
            return Err("itinerary has no days".into());
        }
        for (idx, item) in self.itinerary.iter().enumerate() {
            let expected = idx as u32 + 1;
            if item.day != expected {
                return Err(format!(
                    "itinerary day {} found where day {expected} was expected",
                    item.day
                ));
            }
        }
        if self.num_days as usize != self.itinerary.len() {
            return Err(format!(
                "num_days is {} but the itinerary lists {} days",
                self.num_days,
                self.itinerary.len()
            ));
        }
        Ok(())
    }

    pub fn has_weather(&self) -> bool {
        self.itinerary.iter().any(ItineraryItem::has_weather)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// File-name friendly version of the trip name.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.trip_name.len());
        for ch in self.trip_name.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
        }
        let slug = slug.trim_end_matches('-').to_string();
        if slug.is_empty() {
            "itinerary".into()
        } else {
            slug
        }
    }

    /// Field descriptions handed to the model alongside the format instructions.
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "trip_name": {"type": "string", "description": "The name of the trip"},
                "location": {"type": "string", "description": "The location of the trip"},
                "trip_start": {"type": "string", "description": "The start date of the trip"},
                "trip_end": {"type": "string", "description": "The end date of the trip"},
                "num_days": {"type": "integer", "description": "The number of days in the trip"},
                "traveling_with": {"type": "string", "description": "The people the traveler is traveling with"},
                "lodging": {"type": "string", "description": "The type of lodging the traveler is staying in"},
                "adventure": {"type": "string", "description": "The activities the traveler wants to do"},
                "itinerary": {
                    "type": "array",
                    "description": "List of itinerary items",
                    "items": {
                        "type": "object",
                        "properties": {
                            "day": {"type": "integer", "description": "The day number of the trip"},
                            "date": {"type": "string", "description": "The date of the itinerary item"},
                            "morning": {"type": "string", "description": "The morning activity"},
                            "afternoon": {"type": "string", "description": "The afternoon activity"},
                            "evening": {"type": "string", "description": "The evening activity"},
                            "weather": {"type": "string", "description": "Expected weather for the day"}
                        },
                        "required": ["day", "date", "morning", "afternoon", "evening"]
                    }
                }
            },
            "required": [
                "trip_name", "location", "trip_start", "trip_end", "num_days",
                "traveling_with", "lodging", "adventure", "itinerary"
            ]
        })
    }
}

fn normalize_optional(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| normalize_optional(Some(value)))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_trip() -> TripResponse {
        TripResponse {
            trip_name: "Utah loop".into(),
            location: "Zion National Park".into(),
            trip_start: "2024-05-01".into(),
            trip_end: "2024-05-02".into(),
            num_days: 2,
            traveling_with: "partner".into(),
            lodging: "campsite".into(),
            adventure: "hiking".into(),
            itinerary: vec![
                ItineraryItem {
                    day: 1,
                    date: "2024-05-01".into(),
                    morning: "Angels Landing".into(),
                    afternoon: "Riverside Walk".into(),
                    evening: "Stargazing".into(),
                    weather: None,
                },
                ItineraryItem {
                    day: 2,
                    date: "2024-05-02".into(),
                    morning: "Canyon Overlook".into(),
                    afternoon: "Kolob Canyons".into(),
                    evening: "Drive home".into(),
                    weather: None,
                },
            ],
        }
    }

    #[test]
    fn form_with_all_fields_becomes_request() {
        let form = TripForm {
            location: Some(" Yosemite ".into()),
            trip_start: Some("2024-06-01".into()),
            trip_end: Some("2024-06-03".into()),
            trip_name: Some(String::new()),
            traveling_with: vec!["kids".into(), " ".into(), "partner".into()],
            lodging: vec!["cabin".into()],
            adventure: vec!["hiking".into(), "fishing".into()],
        };
        let req = form.into_request().unwrap();
        assert_eq!(req.location, "Yosemite");
        assert_eq!(req.trip_name, "My trip to Yosemite");
        assert_eq!(req.traveling_with_list(), "kids, partner");
        assert_eq!(req.adventure_list(), "hiking, fishing");
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let form = TripForm {
            location: Some("Acadia".into()),
            trip_end: Some("   ".into()),
            ..Default::default()
        };
        let missing = form.into_request().unwrap_err();
        assert_eq!(missing, vec!["start date", "end date"]);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let raw = r#"{
            "trip_name": "t", "location": "l", "trip_start": "a", "trip_end": "b",
            "num_days": "1", "traveling_with": "", "lodging": "", "adventure": "",
            "itinerary": [{"day": "1", "date": "a", "morning": "m", "afternoon": "n", "evening": "e"}]
        }"#;
        let trip = TripResponse::from_json_str(raw).unwrap();
        assert_eq!(trip.num_days, 1);
        assert_eq!(trip.itinerary[0].day, 1);
        assert!(!trip.has_weather());
    }

    #[test]
    fn miscounted_days_fail_validation() {
        let mut trip = sample_trip();
        trip.num_days = 3;
        assert!(trip.validate().unwrap_err().contains("num_days is 3"));
    }

    #[test]
    fn out_of_order_days_fail_validation() {
        let mut trip = sample_trip();
        trip.itinerary[1].day = 5;
        assert!(trip.validate().is_err());
        trip.itinerary.clear();
        assert_eq!(trip.validate().unwrap_err(), "itinerary has no days");
    }

    #[test]
    fn missing_itinerary_field_is_rejected() {
        let err = TripResponse::from_json_str(r#"{"trip_name": "x"}"#).unwrap_err();
        assert!(err.starts_with("invalid itinerary JSON"));
    }

    #[test]
    fn slug_is_filename_safe() {
        let mut trip = sample_trip();
        assert_eq!(trip.slug(), "utah-loop");
        trip.trip_name = "  ¡Gran Cañón! 2024 ".into();
        assert_eq!(trip.slug(), "gran-ca-n-2024");
        trip.trip_name = "!!!".into();
        assert_eq!(trip.slug(), "itinerary");
    }
}
