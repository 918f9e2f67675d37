use crate::models::trip::{TripRequest, TripResponse};

pub const NEW_TRIP_TEMPLATE: &str = "This trip is to {location} between {trip_start} and {trip_end}. \
This person will be traveling {traveling_with_list} and would like to stay in {lodging_list}. \
They want to {adventure_list}. The trip is called \"{trip_name}\". \
Create a daily itinerary for this trip using this information.";

const WEATHER_TEMPLATE: &str = "Here is a trip itinerary as JSON:\n{itinerary}\n\n\
For every day, add a \"weather\" field describing the typical weather at {location} on that date \
(temperature range and conditions). Adjust an activity only if the weather would make it unsafe. \
Keep every other field exactly as it is.";

const AGENT_SYSTEM_PROMPT: &str = "You are a trip planner. Before writing the itinerary, use the \
park_lookup tool when the destination is or contains a US national park, and the wikipedia tool \
for background on any other place or attraction. Use what the tools return to pick realistic \
activities. When you are done researching, answer with the final itinerary only.";

/// Substitutes `{name}` placeholders in one left-to-right pass, so
/// substituted text is never rescanned. Unknown placeholders stay as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substitution = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match substitution {
            Some((value, close)) => {
                rendered.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

pub fn build_new_trip_prompt(req: &TripRequest) -> String {
    render(
        NEW_TRIP_TEMPLATE,
        &[
            ("location", req.location.as_str()),
            ("trip_start", req.trip_start.as_str()),
            ("trip_end", req.trip_end.as_str()),
            ("traveling_with_list", req.traveling_with_list().as_str()),
            ("lodging_list", req.lodging_list().as_str()),
            ("adventure_list", req.adventure_list().as_str()),
            ("trip_name", req.trip_name.as_str()),
        ],
    )
}

/// One worked example shown to the model before the real request.
pub fn few_shot_examples() -> Vec<(String, String)> {
    let request = TripRequest {
        location: "Acadia National Park".into(),
        trip_start: "2024-09-14".into(),
        trip_end: "2024-09-15".into(),
        trip_name: "Acadia weekend".into(),
        traveling_with: vec!["my partner".into()],
        lodging: vec!["a campsite".into()],
        adventure: vec!["hike".into(), "watch the sunrise".into()],
    };
    let answer = r#"{"trip_name":"Acadia weekend","location":"Acadia National Park","trip_start":"2024-09-14","trip_end":"2024-09-15","num_days":2,"traveling_with":"my partner","lodging":"a campsite","adventure":"hike, watch the sunrise","itinerary":[{"day":1,"date":"2024-09-14","morning":"Hike the Beehive Trail","afternoon":"Bike the carriage roads around Jordan Pond","evening":"Set up camp at Blackwoods Campground"},{"day":2,"date":"2024-09-15","morning":"Sunrise from Cadillac Mountain","afternoon":"Ocean Path from Sand Beach to Otter Cliff","evening":"Lobster dinner in Bar Harbor"}]}"#;
    vec![(build_new_trip_prompt(&request), answer.to_string())]
}

pub fn format_instructions() -> String {
    let schema = serde_json::to_string_pretty(&TripResponse::json_schema()).unwrap_or_default();
    format!(
        "Respond with a single JSON object and nothing else: no markdown, no commentary. \
The object must conform to this JSON schema:\n{schema}\n\
`num_days` must equal the number of entries in `itinerary`, and days are numbered from 1."
    )
}

pub fn weather_prompt(trip: &TripResponse) -> String {
    render(
        WEATHER_TEMPLATE,
        &[
            ("itinerary", trip.to_json().as_str()),
            ("location", trip.location.as_str()),
        ],
    )
}

pub fn agent_system_prompt() -> String {
    format!("{AGENT_SYSTEM_PROMPT}\n\n{}", format_instructions())
}

/// Returns the outermost `{...}` slice of a model answer, skipping code
/// fences or prose around it.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
