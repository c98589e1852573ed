//! Search tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{format_listing, grade_names, subject_names, text_result};
use crate::catalog::{Difficulty, GradeLevel, MaterialLookup, Pagination, SearchFilters, Subject};
use crate::error::ToolError;
use crate::mcp::context::ToolContext;
use crate::mcp::registry::{ToolDefinition, ToolHandler};

/// Results returned when the caller gives no limit.
const DEFAULT_LIMIT: usize = 10;

/// Upper bound on results per call.
const MAX_LIMIT: usize = 50;

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// `search_teaching_materials`: keyword search.
pub struct SearchMaterials {
    catalog: Arc<dyn MaterialLookup>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    grade: Vec<GradeLevel>,
    subject: Option<Subject>,
    limit: Option<usize>,
}

impl SearchMaterials {
    /// Tool name.
    pub const NAME: &'static str = "search_teaching_materials";

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
            "Search teaching materials by keyword. Matches titles and descriptions \
             case-insensitively and can be narrowed by grade and subject.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search keywords"
                    },
                    "grade": {
                        "type": "array",
                        "items": { "type": "string", "enum": grade_names() },
                        "description": "Optional: grades to include (any match)"
                    },
                    "subject": {
                        "type": "string",
                        "enum": subject_names(),
                        "description": "Optional: subject"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": DEFAULT_LIMIT,
                        "maximum": MAX_LIMIT
                    }
                },
                "required": ["query"]
            }),
            Self::new(catalog),
        )
    }
}

#[async_trait]
impl ToolHandler for SearchMaterials {
    async fn call(&self, ctx: ToolContext) -> Result<Value, ToolError> {
        let args: SearchArgs = ctx.arguments()?;
        debug!(user = %ctx.user, query = %args.query, "Searching materials");

        let filters = SearchFilters {
            grades: args.grade,
            subject: args.subject,
            ..SearchFilters::default()
        };
        let (materials, total) = self
            .catalog
            .search(&args.query, &filters, Pagination::first(clamp_limit(args.limit)))
            .await?;

        if materials.is_empty() {
            return text_result(format!("No materials found for \"{}\".", args.query));
        }

        text_result(format!(
            "Found {total} materials, showing {}:\n{}",
            materials.len(),
            format_listing(&materials)
        ))
    }
}

/// Teaching stage a browse request is aimed at.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TeachingStage {
    Basic,
    Advanced,
    Olympic,
}

impl TeachingStage {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::Olympic => "olympic",
        }
    }
}

/// `search_by_grade_subject`: browse without a keyword.
pub struct SearchByGradeSubject {
    catalog: Arc<dyn MaterialLookup>,
}

#[derive(Debug, Deserialize)]
struct GradeSubjectArgs {
    grade: GradeLevel,
    subject: Subject,
    difficulty: Option<Difficulty>,
    teaching_stage: Option<TeachingStage>,
    limit: Option<usize>,
}

impl SearchByGradeSubject {
    /// Tool name.
    pub const NAME: &'static str = "search_by_grade_subject";

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
            "List teaching materials for a grade and subject, optionally filtered by difficulty.",
            json!({
                "type": "object",
                "properties": {
                    "grade": {
                        "type": "string",
                        "enum": grade_names(),
                        "description": "Grade"
                    },
                    "subject": {
                        "type": "string",
                        "enum": subject_names(),
                        "description": "Subject"
                    },
                    "difficulty": {
                        "type": "string",
                        "enum": ["easy", "medium", "hard"],
                        "description": "Optional: difficulty level"
                    },
                    "teaching_stage": {
                        "type": "string",
                        "enum": ["basic", "advanced", "olympic"],
                        "description": "Optional: teaching stage"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": DEFAULT_LIMIT,
                        "maximum": MAX_LIMIT
                    }
                },
                "required": ["grade", "subject"]
            }),
            Self::new(catalog),
        )
    }
}

#[async_trait]
impl ToolHandler for SearchByGradeSubject {
    async fn call(&self, ctx: ToolContext) -> Result<Value, ToolError> {
        let args: GradeSubjectArgs = ctx.arguments()?;
        debug!(user = %ctx.user, grade = %args.grade, subject = %args.subject, "Browsing materials");

        let filters = SearchFilters {
            grades: vec![args.grade],
            subject: Some(args.subject),
            difficulty: args.difficulty,
            material_type: None,
        };
        let (materials, total) = self
            .catalog
            .search("", &filters, Pagination::first(clamp_limit(args.limit)))
            .await?;

        let mut heading = format!("{} {}", args.grade, args.subject);
        if let Some(difficulty) = args.difficulty {
            heading.push_str(&format!(", {difficulty}"));
        }
        if let Some(stage) = args.teaching_stage {
            heading.push_str(&format!(", {} stage", stage.as_str()));
        }

        if materials.is_empty() {
            return text_result(format!("No materials found for {heading}."));
        }

        text_result(format!(
            "Found {total} materials for {heading}, showing {}:\n{}",
            materials.len(),
            format_listing(&materials)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::mcp::context::CallContext;
    use crate::mcp::protocol::RequestId;

    fn catalog() -> Arc<dyn MaterialLookup> {
        Arc::new(InMemoryCatalog::with_sample_data())
    }

    fn context(args: Value) -> ToolContext {
        let Value::Object(map) = args else {
            panic!("arguments must be an object");
        };
        ToolContext::new(&CallContext::new(), RequestId::from(1), map)
    }

    fn text_of(value: &Value) -> &str {
        value["content"][0]["text"].as_str().unwrap()
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(500)), MAX_LIMIT);
    }

    #[tokio::test]
    async fn keyword_search_lists_titles_with_ids() {
        let tool = SearchMaterials::new(catalog());
        let result = tool
            .call(context(json!({ "query": "vocabulary" })))
            .await
            .unwrap();

        let text = text_of(&result);
        assert!(text.starts_with("Found 1 materials, showing 1:"));
        assert!(text.contains("Techniques for Memorising Vocabulary (ID: "));
    }

    #[tokio::test]
    async fn keyword_search_without_hits() {
        let tool = SearchMaterials::new(catalog());
        let result = tool
            .call(context(json!({ "query": "astronomy" })))
            .await
            .unwrap();
        assert_eq!(text_of(&result), "No materials found for \"astronomy\".");
    }

    #[tokio::test]
    async fn missing_query_is_invalid() {
        let tool = SearchMaterials::new(catalog());
        let err = tool.call(context(json!({}))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn unknown_subject_is_invalid() {
        let tool = SearchMaterials::new(catalog());
        let err = tool
            .call(context(json!({ "query": "x", "subject": "alchemy" })))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid parameters"));
    }

    #[tokio::test]
    async fn browse_by_grade_and_subject() {
        let tool = SearchByGradeSubject::new(catalog());
        let result = tool
            .call(context(json!({
                "grade": "grade_2",
                "subject": "english",
                "teaching_stage": "basic"
            })))
            .await
            .unwrap();

        let text = text_of(&result);
        assert!(text.starts_with("Found 2 materials for grade_2 english, basic stage"));
    }

    #[tokio::test]
    async fn browse_with_difficulty_filter() {
        let tool = SearchByGradeSubject::new(catalog());
        let result = tool
            .call(context(json!({
                "grade": "grade_3",
                "subject": "math",
                "difficulty": "easy"
            })))
            .await
            .unwrap();
        assert_eq!(text_of(&result), "No materials found for grade_3 math, easy.");
    }
}
