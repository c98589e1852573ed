//! Default catalogue resources.
//!
//! Every resource is static JSON served as a single `application/json`
//! text block:
//!
//! - `curriculum://grade-1/math`, `curriculum://grade-2/math` - Curriculum outlines
//! - `knowledge-graph://math/elementary` - Concept prerequisites
//! - `template://lesson-plan/5e-model` - The 5E lesson template

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::registry::{ResourceDefinition, ResourceHandler};
use crate::mcp::types::ResourceReadResult;
use crate::tools::FIVE_E_PHASES;

/// MIME type of every default resource.
const JSON_MIME: &str = "application/json";

/// Registers every default resource with the dispatcher.
pub fn register_default_resources(dispatcher: &Dispatcher) {
    for (grade, label) in [(1, "Grade 1"), (2, "Grade 2")] {
        dispatcher.register_resource(ResourceDefinition::new(
            format!("curriculum://grade-{grade}/math"),
            format!("{label} Mathematics Curriculum"),
            format!("{label} mathematics outline with objectives and units"),
            JSON_MIME,
            StaticJson(curriculum_outline(grade)),
        ));
    }

    dispatcher.register_resource(ResourceDefinition::new(
        "knowledge-graph://math/elementary",
        "Elementary Mathematics Knowledge Graph",
        "Concepts of elementary mathematics and their prerequisite links",
        JSON_MIME,
        StaticJson(knowledge_graph()),
    ));

    dispatcher.register_resource(ResourceDefinition::new(
        "template://lesson-plan/5e-model",
        "5E Lesson Template",
        "Engage, Explore, Explain, Elaborate and Evaluate phases with timings",
        JSON_MIME,
        StaticJson(five_e_template()),
    ));
}

/// Serves a fixed JSON document.
struct StaticJson(Value);

#[async_trait]
impl ResourceHandler for StaticJson {
    async fn read(&self, uri: &str) -> Result<Value, ToolError> {
        let text = serde_json::to_string(&self.0).map_err(|e| ToolError::Failed(e.to_string()))?;
        serde_json::to_value(ResourceReadResult::text(uri, JSON_MIME, text))
            .map_err(|e| ToolError::Failed(e.to_string()))
    }
}

fn curriculum_outline(grade: u8) -> Value {
    let (objectives, units) = match grade {
        1 => (
            vec![
                "Recognise the numbers 1 to 20",
                "Add and subtract within 20",
                "Identify basic geometric shapes",
            ],
            vec![
                "Numbers and operations",
                "Shapes and measurement",
                "Introduction to statistics and probability",
            ],
        ),
        _ => (
            vec![
                "Add and subtract within 100",
                "Understand multiplication as repeated addition",
                "Measure length with standard units",
            ],
            vec![
                "Numbers to 100",
                "Multiplication tables",
                "Length and time",
            ],
        ),
    };

    json!({
        "grade": format!("grade_{grade}"),
        "subject": "math",
        "objectives": objectives,
        "units": units,
    })
}

fn knowledge_graph() -> Value {
    json!({
        "nodes": [
            { "id": "addition", "label": "Addition", "level": "basic" },
            { "id": "subtraction", "label": "Subtraction", "level": "basic" },
            { "id": "multiplication", "label": "Multiplication", "level": "intermediate" }
        ],
        "edges": [
            { "source": "addition", "target": "multiplication", "relation": "prerequisite" }
        ]
    })
}

fn five_e_template() -> Value {
    let phases: Vec<Value> = FIVE_E_PHASES
        .iter()
        .map(|(phase, description, duration)| {
            json!({ "phase": phase, "description": description, "duration": duration })
        })
        .collect();
    json!({ "model": "5E", "phases": phases })
}
