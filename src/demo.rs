//! Ready-made agents behind the `tool-loop` binary.
//!
//! - `tourism`: one agent with weather, activity, date and movie tools.
//! - `supervisor`: an agent that delegates to a weekend planner and a meal
//!   planner, each exposed to it as a tool.
//! - `handoff`: a triage agent that hands the conversation to a Spanish or
//!   English speaking agent.

use std::str::FromStr;
use std::sync::Arc;

use crate::agent::{build_system_prompt, Agent, Handoff, DEFAULT_PERSONA};
use crate::llm::ModelAdapter;
use crate::tools::{
    AgentTool, CheckFridge, FindRecipes, GetActivities, GetCurrentDate, GetWeather, RegistryError,
    Tool, ToolRegistry,
};

const WEEKEND_INSTRUCTIONS: &str = "You help users plan their weekends and choose the best \
activities for the given weather. If an activity would be unpleasant in the weather, don't \
suggest it. Include the date of the weekend in your response.";

const MEAL_INSTRUCTIONS: &str = "You help users plan meals and choose the best recipes. Include \
the ingredients and cooking instructions in your response. Indicate what the user needs to buy \
from the store when their fridge is missing ingredients.";

const SUPERVISOR_INSTRUCTIONS: &str = "You are a supervisor managing two specialist agents: a \
weekend planning agent and a meal planning agent. Break down the user's request, decide which \
specialist (or both) to call via the available tools, and then synthesize a final helpful answer. \
When invoking a tool, provide clear, concise queries.";

const TRIAGE_INSTRUCTIONS: &str =
    "Handoff to the appropriate agent based on the language of the request.";

/// Which demo the binary runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Demo {
    #[default]
    Tourism,
    Supervisor,
    Handoff,
}

impl Demo {
    /// Prompt used when none is given on the command line.
    pub fn default_prompt(self) -> &'static str {
        match self {
            Self::Tourism => "Is it rainy enough in Sydney to watch movies and which ones are on?",
            Self::Supervisor => "my kids want pasta for dinner and i need a recipe",
            Self::Handoff => {
                "Hola, ¿cómo estás? ¿Puedes darme el clima para San Francisco CA?"
            }
        }
    }

    /// Build the entry agent. `persona` replaces its default instructions.
    pub fn build(
        self,
        model: Arc<dyn ModelAdapter>,
        persona: Option<&str>,
    ) -> Result<Agent, RegistryError> {
        match self {
            Self::Tourism => tourism(model, persona),
            Self::Supervisor => supervisor(model, persona),
            Self::Handoff => triage(model, persona),
        }
    }
}

impl FromStr for Demo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tourism" => Ok(Self::Tourism),
            "supervisor" => Ok(Self::Supervisor),
            "handoff" | "handoffs" => Ok(Self::Handoff),
            other => Err(format!(
                "expected tourism, supervisor or handoff, got: {}",
                other
            )),
        }
    }
}

impl std::fmt::Display for Demo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tourism => write!(f, "tourism"),
            Self::Supervisor => write!(f, "supervisor"),
            Self::Handoff => write!(f, "handoff"),
        }
    }
}

/// Tourism chatbot with the weather, activity, date and movie tools.
pub fn tourism(model: Arc<dyn ModelAdapter>, persona: Option<&str>) -> Result<Agent, RegistryError> {
    let registry = ToolRegistry::demo()?;
    let instructions = build_system_prompt(persona.unwrap_or(DEFAULT_PERSONA), &registry);
    Ok(Agent::new(model, Arc::new(registry))
        .with_name("Tourism agent")
        .with_instructions(instructions))
}

/// Supervisor that calls a weekend planner and a meal planner as tools.
pub fn supervisor(
    model: Arc<dyn ModelAdapter>,
    persona: Option<&str>,
) -> Result<Agent, RegistryError> {
    let weekend_tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(GetWeather::default()),
        Arc::new(GetActivities),
        Arc::new(GetCurrentDate),
    ];
    let weekend = Agent::new(model.clone(), Arc::new(ToolRegistry::from_tools(weekend_tools)?))
        .with_name("Weekend agent")
        .with_instructions(WEEKEND_INSTRUCTIONS);

    let meal_tools: Vec<Arc<dyn Tool>> =
        vec![Arc::new(FindRecipes), Arc::new(CheckFridge::default())];
    let meal = Agent::new(model.clone(), Arc::new(ToolRegistry::from_tools(meal_tools)?))
        .with_name("Meal agent")
        .with_instructions(MEAL_INSTRUCTIONS);

    let specialists: Vec<Arc<dyn Tool>> = vec![
        Arc::new(AgentTool::new(
            "plan_weekend",
            "Plan a weekend based on user query and return the final response.",
            Arc::new(weekend),
        )),
        Arc::new(AgentTool::new(
            "plan_meal",
            "Plan a meal based on user query and return the final response.",
            Arc::new(meal),
        )),
    ];

    Ok(
        Agent::new(model, Arc::new(ToolRegistry::from_tools(specialists)?))
            .with_name("Supervisor agent")
            .with_instructions(persona.unwrap_or(SUPERVISOR_INSTRUCTIONS)),
    )
}

/// Triage agent that hands off to a Spanish or English speaking agent.
pub fn triage(model: Arc<dyn ModelAdapter>, persona: Option<&str>) -> Result<Agent, RegistryError> {
    let language_agent = |name: &str, instructions: &str| -> Result<Agent, RegistryError> {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(GetWeather::default())];
        Ok(Agent::new(model.clone(), Arc::new(ToolRegistry::from_tools(tools)?))
            .with_name(name)
            .with_instructions(instructions))
    };

    let spanish = language_agent("Spanish agent", "You only speak Spanish.")?;
    let english = language_agent("English agent", "You only speak English")?;

    Ok(Agent::new(model, Arc::new(ToolRegistry::new()))
        .with_name("Triage agent")
        .with_instructions(persona.unwrap_or(TRIAGE_INSTRUCTIONS))
        .with_handoff(Handoff::to(Arc::new(spanish)))
        .with_handoff(Handoff::to(Arc::new(english))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ToolCallResult, Turn};
    use crate::llm::{ModelResponse, ResponseItem, ScriptedModel};

    fn call(id: &str, name: &str, arguments: &str) -> ModelResponse {
        ModelResponse::new(vec![ResponseItem::function_call(id, name, arguments)])
    }

    fn answer(text: &str) -> ModelResponse {
        ModelResponse::new(vec![ResponseItem::message(text)])
    }

    #[test]
    fn demo_names_parse() {
        assert_eq!("Supervisor".parse::<Demo>(), Ok(Demo::Supervisor));
        assert_eq!(" handoffs ".parse::<Demo>(), Ok(Demo::Handoff));
        assert!("chess".parse::<Demo>().unwrap_err().contains("chess"));
        assert_eq!(Demo::default().to_string(), "tourism");
    }

    #[tokio::test]
    async fn supervisor_delegates_to_meal_planner() {
        let model = Arc::new(ScriptedModel::new(vec![
            call("s1", "plan_meal", r#"{"query":"pasta dinner for kids"}"#),
            call("m1", "find_recipes", r#"{"query":"pasta"}"#),
            answer("Make Pasta Primavera."),
            answer("Here is a recipe: Pasta Primavera."),
        ]));
        let agent = Demo::Supervisor.build(model.clone(), None).unwrap();

        let result = agent.run(Demo::Supervisor.default_prompt()).await.unwrap();
        assert_eq!(result.agent, "Supervisor agent");
        assert!(result.content.contains("Pasta Primavera"));
        assert!(result
            .ledger
            .contains(&Turn::ToolResult(ToolCallResult::success("s1", "Make Pasta Primavera."))));

        let requests = model.requests();
        assert_eq!(requests.len(), 4);
        assert!(matches!(&requests[1][0], Turn::System { content } if content == MEAL_INSTRUCTIONS));
        assert_eq!(
            requests[1][1],
            Turn::User {
                content: "pasta dinner for kids".to_string()
            }
        );
        let recipes = requests[2].iter().find_map(|turn| match turn {
            Turn::ToolResult(result) if result.call_id == "m1" => Some(result.output.clone()),
            _ => None,
        });
        assert!(recipes.unwrap().contains("Pasta Primavera"));
    }

    #[tokio::test]
    async fn triage_hands_spanish_requests_to_spanish_agent() {
        let model = Arc::new(ScriptedModel::new(vec![
            call("h1", "transfer_to_spanish_agent", "{}"),
            answer("¡Hola! Estoy bien."),
        ]));
        let agent = Demo::Handoff.build(model.clone(), None).unwrap();

        let result = agent.run(Demo::Handoff.default_prompt()).await.unwrap();
        assert_eq!(result.agent, "Spanish agent");
        assert_eq!(
            model.requests()[1][0],
            Turn::System {
                content: "You only speak Spanish.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn persona_replaces_entry_instructions() {
        let model = Arc::new(ScriptedModel::new(vec![answer("Sydney is rainy.")]));
        let agent = Demo::Tourism.build(model.clone(), Some("You are terse.")).unwrap();
        assert_eq!(agent.name(), "Tourism agent");

        agent.run("Weather?").await.unwrap();
        match &model.requests()[0][0] {
            Turn::System { content } => {
                assert!(content.starts_with("You are terse."));
                assert!(content.contains("**lookup_movies**"));
            }
            other => panic!("expected system turn, got {:?}", other),
        }
    }
}
