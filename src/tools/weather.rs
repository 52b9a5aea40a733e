//! Weather lookup tool.

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};

use super::Tool;

/// Mock weather report for a city. Mostly rainy.
pub struct GetWeather {
    sunny_chance: f64,
}

impl GetWeather {
    /// Weather tool that reports sunshine with the given probability.
    pub fn with_sunny_chance(sunny_chance: f64) -> Self {
        Self {
            sunny_chance: sunny_chance.clamp(0.0, 1.0),
        }
    }
}

impl Default for GetWeather {
    fn default() -> Self {
        Self::with_sunny_chance(0.05)
    }
}

#[async_trait]
impl Tool for GetWeather {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Returns weather data for a given city, an object with temperature and description."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The city to get the weather for."
                }
            },
            "required": ["city"],
            "additionalProperties": false
        })
    }

    fn strict(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let city = args["city"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'city' argument"))?;

        tracing::info!("Getting weather for {}", city);

        let sunny = rand::thread_rng().gen_bool(self.sunny_chance);
        Ok(if sunny {
            json!({"temperature": 72, "description": "Sunny"})
        } else {
            json!({"temperature": 60, "description": "Rainy"})
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_sunny_reports_rain() {
        let tool = GetWeather::with_sunny_chance(0.0);
        let result = tool.execute(json!({"city": "Sydney"})).await.unwrap();
        assert_eq!(result, json!({"temperature": 60, "description": "Rainy"}));
    }

    #[tokio::test]
    async fn missing_city_is_an_error() {
        let tool = GetWeather::default();
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("city"));
    }
}
