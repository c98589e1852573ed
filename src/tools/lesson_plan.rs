//! Lesson plan generation.
//!
//! Plans follow the 5E instructional model: Engage, Explore, Explain,
//! Elaborate and Evaluate. The first selected material anchors the
//! exploration phase.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::text_result;
use crate::catalog::{parse_material_id, Material, MaterialLookup};
use crate::error::ToolError;
use crate::mcp::context::ToolContext;
use crate::mcp::registry::{ToolDefinition, ToolHandler};

/// The 5E phases as `(name, focus, minutes)`.
pub const FIVE_E_PHASES: [(&str, &str, u32); 5] = [
    ("Engage", "Spark interest", 5),
    ("Explore", "Independent exploration", 15),
    ("Explain", "Concept explanation", 10),
    ("Elaborate", "Deepen and apply", 10),
    ("Evaluate", "Assess understanding", 5),
];

/// Lesson length when the caller gives none.
const DEFAULT_DURATION_MINUTES: u32 = 45;

/// How far along the students are.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StudentLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl StudentLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Deserialize)]
struct LessonPlanArgs {
    material_ids: Vec<String>,
    objectives: Vec<String>,
    grade: String,
    #[serde(default)]
    student_level: StudentLevel,
    duration: Option<u32>,
}

/// `generate_lesson_plan`: a markdown lesson plan.
pub struct LessonPlanGenerator {
    catalog: Arc<dyn MaterialLookup>,
}

impl LessonPlanGenerator {
    /// Tool name.
    pub const NAME: &'static str = "generate_lesson_plan";

    /// Creates the tool over a catalogue.
    #[must_use]
    pub fn new(catalog: Arc<dyn MaterialLookup>) -> Self {
        Self { catalog }
    }

    /// Builds the registry entry.
    #[must_use]
    pub fn definition(catalog: Arc<dyn MaterialLookup>) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "Generate a 5E lesson plan (Engage, Explore, Explain, Elaborate, Evaluate) \
             around the selected materials and learning objectives. Returns markdown.",
            json!({
                "type": "object",
                "properties": {
                    "material_ids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Material IDs to build the lesson around"
                    },
                    "objectives": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Learning objectives"
                    },
                    "grade": {
                        "type": "string",
                        "description": "Grade"
                    },
                    "student_level": {
                        "type": "string",
                        "enum": ["beginner", "intermediate", "advanced"],
                        "description": "Optional: student level (default: intermediate)"
                    },
                    "duration": {
                        "type": "integer",
                        "default": DEFAULT_DURATION_MINUTES,
                        "description": "Lesson length in minutes"
                    }
                },
                "required": ["material_ids", "objectives", "grade"]
            }),
            Self::new(catalog),
        )
    }
}

#[async_trait]
impl ToolHandler for LessonPlanGenerator {
    async fn call(&self, ctx: ToolContext) -> Result<Value, ToolError> {
        let args: LessonPlanArgs = ctx.arguments()?;
        if args.material_ids.is_empty() || args.objectives.is_empty() {
            return Err(ToolError::InvalidArguments(
                "material_ids and objectives are required".to_string(),
            ));
        }

        let ids = args
            .material_ids
            .iter()
            .map(|raw| parse_material_id(raw))
            .collect::<Result<Vec<_>, _>>()?;

        // A missing anchor material falls back to generic wording
        let anchor = match self.catalog.get_by_id(ids[0]).await {
            Ok(material) => Some(material),
            Err(e) => {
                debug!(error = %e, "Lesson plan anchor unavailable");
                None
            }
        };

        debug!(user = %ctx.user, grade = %args.grade, materials = ids.len(), "Generating lesson plan");
        text_result(render_plan(&args, anchor.as_ref()))
    }
}

fn render_plan(args: &LessonPlanArgs, anchor: Option<&Material>) -> String {
    let mut plan = String::from("# Lesson Plan\n\n## Overview\n");
    let _ = writeln!(plan, "- **Grade**: {}", args.grade);
    let _ = writeln!(plan, "- **Student level**: {}", args.student_level.as_str());
    let _ = writeln!(
        plan,
        "- **Duration**: {} minutes",
        args.duration.unwrap_or(DEFAULT_DURATION_MINUTES)
    );
    plan.push_str("- **Format**: Live instruction with interactive practice\n");

    plan.push_str("\n## Learning Objectives\n");
    for (i, objective) in args.objectives.iter().enumerate() {
        let _ = writeln!(plan, "{}. {objective}", i + 1);
    }

    let anchor_text = anchor.map_or_else(
        || "Teaching demonstration video".to_string(),
        |m| format!("{} ({})", m.title, m.material_type),
    );

    plan.push_str("\n## Lesson Flow (5E Model)\n");
    for (step, (phase, focus, minutes)) in FIVE_E_PHASES.iter().enumerate() {
        let _ = writeln!(plan, "\n### {}. {phase} ({focus}) - {minutes} minutes", step + 1);
        match *phase {
            "Engage" => plan.push_str(
                "- **Activity**: Introduce the concept through a real-world problem\n\
                 - **Interaction**: Students share related everyday experiences\n",
            ),
            "Explore" => {
                plan.push_str("- **Activity**: Students investigate and look for patterns\n");
                let _ = writeln!(plan, "- **Materials**: {anchor_text}");
                plan.push_str("- **Group work**: Small-group discussion and first attempts\n");
            }
            "Explain" => plan.push_str(
                "- **Focus**: State the core concepts and principles clearly\n\
                 - **Examples**: Connect to everyday situations\n\
                 - **Questions**: Address common misconceptions\n",
            ),
            "Elaborate" => plan.push_str(
                "- **Practice**: Tiered exercises for different levels\n\
                 - **Application**: Solve an open-ended problem\n",
            ),
            _ => plan.push_str(
                "- **Formative**: Check understanding during the lesson\n\
                 - **Summative**: Short exit quiz\n\
                 - **Feedback**: Collect student reflections\n",
            ),
        }
    }

    plan.push_str(
        "\n## Resources\n\
         - **Core materials**: Selected catalogue materials\n\
         - **Supporting materials**: Interactive workbook\n\
         \n## Assessment Criteria\n\
         - **Knowledge**: Understands and applies the concepts correctly\n\
         - **Skills**: Can solve standard problems independently\n\
         - **Attitude**: Shows interest and good study habits\n\
         \n## Notes\n\
         - Adjust pacing to student feedback\n\
         - Give individual support to students who struggle\n",
    );

    plan
}
