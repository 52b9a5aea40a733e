//! Meal planning tools: recipe search and fridge contents.

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};

use super::Tool;

/// Recipes matching a meal or ingredient.
pub struct FindRecipes;

#[async_trait]
impl Tool for FindRecipes {
    fn name(&self) -> &str {
        "find_recipes"
    }

    fn description(&self) -> &str {
        "Returns recipes (JSON) based on a query."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "User query or desired meal/ingredient"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;

        tracing::info!("Finding recipes for '{}'", query);

        let query = query.to_lowercase();
        let recipe = if query.contains("pasta") {
            json!({
                "title": "Pasta Primavera",
                "ingredients": ["pasta", "vegetables", "olive oil"],
                "steps": ["Cook pasta.", "Sauté vegetables."]
            })
        } else if query.contains("tofu") {
            json!({
                "title": "Tofu Stir Fry",
                "ingredients": ["tofu", "soy sauce", "vegetables"],
                "steps": ["Cube tofu.", "Stir fry veggies."]
            })
        } else {
            json!({
                "title": "Grilled Cheese Sandwich",
                "ingredients": ["bread", "cheese", "butter"],
                "steps": ["Butter bread.", "Place cheese between slices.", "Grill until golden brown."]
            })
        };
        Ok(json!([recipe]))
    }
}

/// Ingredients currently in the fridge. Either a pasta night or a tofu night.
pub struct CheckFridge {
    pasta_chance: f64,
}

impl CheckFridge {
    pub fn with_pasta_chance(pasta_chance: f64) -> Self {
        Self {
            pasta_chance: pasta_chance.clamp(0.0, 1.0),
        }
    }
}

impl Default for CheckFridge {
    fn default() -> Self {
        Self::with_pasta_chance(0.5)
    }
}

#[async_trait]
impl Tool for CheckFridge {
    fn name(&self) -> &str {
        "check_fridge"
    }

    fn description(&self) -> &str {
        "Returns a JSON list of ingredients currently in the fridge."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<Value> {
        tracing::info!("Checking fridge for current ingredients");

        let pasta = rand::thread_rng().gen_bool(self.pasta_chance);
        Ok(if pasta {
            json!(["pasta", "tomato sauce", "bell peppers", "olive oil"])
        } else {
            json!(["tofu", "soy sauce", "broccoli", "carrots"])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recipes_follow_the_query() {
        let out = FindRecipes
            .execute(json!({"query": "Pasta for the kids"}))
            .await
            .unwrap();
        assert_eq!(out[0]["title"], "Pasta Primavera");

        let out = FindRecipes.execute(json!({"query": "tofu"})).await.unwrap();
        assert_eq!(out[0]["title"], "Tofu Stir Fry");

        let out = FindRecipes.execute(json!({"query": "anything"})).await.unwrap();
        assert_eq!(out[0]["title"], "Grilled Cheese Sandwich");
    }

    #[tokio::test]
    async fn fridge_contents_are_one_of_two_sets() {
        let out = CheckFridge::with_pasta_chance(1.0)
            .execute(json!({}))
            .await
            .unwrap();
        assert_eq!(out[0], "pasta");

        let out = CheckFridge::with_pasta_chance(0.0)
            .execute(json!({}))
            .await
            .unwrap();
        assert_eq!(out[0], "tofu");
    }
}
