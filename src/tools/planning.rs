//! Trip planning tools: activities, movie listings and today's date.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;

/// List activities available in a city on a date.
pub struct GetActivities;

#[async_trait]
impl Tool for GetActivities {
    fn name(&self) -> &str {
        "get_activities"
    }

    fn description(&self) -> &str {
        "Returns a list of activities for a given city and date."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The city to get activities for."
                },
                "date": {
                    "type": "string",
                    "description": "The date to get activities for in format YYYY-MM-DD."
                }
            },
            "required": ["city", "date"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let city = args["city"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'city' argument"))?;
        let date = args["date"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'date' argument"))?;

        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("Invalid date '{}': {}", date, e))?;

        tracing::info!("Getting activities for {} on {}", city, date);

        Ok(json!([
            {"name": "Hiking", "location": city},
            {"name": "Beach", "location": city},
            {"name": "Museum", "location": city},
        ]))
    }
}

/// Today's date from the system clock.
pub struct GetCurrentDate;

#[async_trait]
impl Tool for GetCurrentDate {
    fn name(&self) -> &str {
        "get_current_date"
    }

    fn description(&self) -> &str {
        "Gets the current date from the system and returns it as a string in format YYYY-MM-DD."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<Value> {
        tracing::info!("Getting current date");
        Ok(Value::String(
            chrono::Local::now().format("%Y-%m-%d").to_string(),
        ))
    }
}

/// Movies showing in a city or zip code.
pub struct LookupMovies;

#[async_trait]
impl Tool for LookupMovies {
    fn name(&self) -> &str {
        "lookup_movies"
    }

    fn description(&self) -> &str {
        "Lookup movies playing in a given city name or zip code."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city_name": {
                    "type": "string",
                    "description": "The city name"
                },
                "zip_code": {
                    "type": "string",
                    "description": "The zip code"
                }
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let location = args["city_name"]
            .as_str()
            .or_else(|| args["zip_code"].as_str())
            .unwrap_or("unknown");

        tracing::info!("Looking up movies in {}", location);

        Ok(json!({
            "location": location,
            "movies": [
                {"title": "The Quantum Reef", "rating": "PG-13"},
                {"title": "Storm Over Harbour Bay", "rating": "PG"},
                {"title": "Midnight Koala", "rating": "R"},
            ]
        }))
    }
}
