//! Material detail and relation tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{format_duration, format_listing, text_result};
use crate::catalog::{parse_material_id, Material, MaterialLookup, Relation};
use crate::error::ToolError;
use crate::mcp::context::ToolContext;
use crate::mcp::registry::{ToolDefinition, ToolHandler};

/// `get_material_detail`: one material in full.
pub struct MaterialDetail {
    catalog: Arc<dyn MaterialLookup>,
}

#[derive(Debug, Deserialize)]
struct DetailArgs {
    material_id: String,
}

impl MaterialDetail {
    /// Tool name.
    pub const NAME: &'static str = "get_material_detail";

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
            "Get the full details of a teaching material, including curriculum objectives \
             and usage statistics.",
            json!({
                "type": "object",
                "properties": {
                    "material_id": {
                        "type": "string",
                        "description": "Material ID (UUID)"
                    }
                },
                "required": ["material_id"]
            }),
            Self::new(catalog),
        )
    }
}

fn render_detail(material: &Material) -> String {
    let grades = material
        .grade_levels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let stats = &material.statistics;

    format!(
        "Material detail:\n\
         Title: {}\n\
         Description: {}\n\
         Type: {}\n\
         Grades: {grades}\n\
         Subject: {}\n\
         Difficulty: {}\n\
         Duration: {}\n\
         Views: {}\n\
         Rating: {:.1} ({} ratings)\n\
         Tags: {}\n\
         Objectives: {}",
        material.title,
        material.description,
        material.material_type,
        material.subject,
        material.difficulty,
        format_duration(material.metadata.duration),
        stats.view_count,
        stats.average_rating,
        stats.rating_count,
        material.tags.join(", "),
        material.curriculum_alignment.objectives.join("; "),
    )
}

#[async_trait]
impl ToolHandler for MaterialDetail {
    async fn call(&self, ctx: ToolContext) -> Result<Value, ToolError> {
        let args: DetailArgs = ctx.arguments()?;
        let id = parse_material_id(&args.material_id)?;
        debug!(user = %ctx.user, material = %id, "Fetching material detail");

        let material = self.catalog.get_by_id(id).await?;
        text_result(render_detail(&material))
    }
}

/// `get_related_materials`: neighbours of a material.
pub struct RelatedMaterials {
    catalog: Arc<dyn MaterialLookup>,
}

/// Related materials returned when the caller gives no limit.
const DEFAULT_RELATED_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
struct RelatedArgs {
    material_id: String,
    #[serde(default)]
    relation_type: Relation,
    limit: Option<usize>,
}

impl RelatedMaterials {
    /// Tool name.
    pub const NAME: &'static str = "get_related_materials";

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
            "List materials related to a given material, such as prerequisites, \
             follow-ups or similar content.",
            json!({
                "type": "object",
                "properties": {
                    "material_id": {
                        "type": "string",
                        "description": "Material ID (UUID)"
                    },
                    "relation_type": {
                        "type": "string",
                        "enum": ["prerequisite", "followup", "similar", "complementary"],
                        "default": "similar",
                        "description": "Kind of relation"
                    },
                    "limit": {
                        "type": "integer",
                        "default": DEFAULT_RELATED_LIMIT,
                        "description": "Maximum number of results"
                    }
                },
                "required": ["material_id"]
            }),
            Self::new(catalog),
        )
    }
}

#[async_trait]
impl ToolHandler for RelatedMaterials {
    async fn call(&self, ctx: ToolContext) -> Result<Value, ToolError> {
        let args: RelatedArgs = ctx.arguments()?;
        let id = parse_material_id(&args.material_id)?;
        let limit = args.limit.unwrap_or(DEFAULT_RELATED_LIMIT);
        debug!(user = %ctx.user, material = %id, relation = ?args.relation_type, "Fetching related materials");

        let source = self.catalog.get_by_id(id).await?;
        let related = self.catalog.related(id, args.relation_type, limit).await?;

        if related.is_empty() {
            return text_result(format!("No related materials found for {}.", source.title));
        }

        text_result(format!(
            "Found {} materials related to {}:\n{}",
            related.len(),
            source.title,
            format_listing(&related)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, Pagination, SearchFilters};
    use crate::error::CatalogError;
    use crate::mcp::context::CallContext;
    use crate::mcp::protocol::RequestId;

    fn context(args: Value) -> ToolContext {
        let Value::Object(map) = args else {
            panic!("arguments must be an object");
        };
        ToolContext::new(&CallContext::new(), RequestId::from(1), map)
    }

    async fn id_of(catalog: &InMemoryCatalog, query: &str) -> String {
        let (items, _) = catalog
            .search(query, &SearchFilters::default(), Pagination::first(1))
            .await
            .unwrap();
        items[0].id.to_string()
    }

    #[tokio::test]
    async fn detail_renders_every_field() {
        let catalog = Arc::new(InMemoryCatalog::with_sample_data());
        let id = id_of(&catalog, "quadratic").await;
        let tool = MaterialDetail::new(catalog);

        let result = tool.call(context(json!({ "material_id": id }))).await.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();

        assert!(text.contains("Title: Solving Quadratic Equations"));
        assert!(text.contains("Type: video"));
        assert!(text.contains("Grades: grade_2"));
        assert!(text.contains("Duration: 30 minutes"));
        assert!(text.contains("Rating: 4.6 (45 ratings)"));
        assert!(text.contains("Tags: algebra, equations"));
    }

    #[tokio::test]
    async fn detail_rejects_malformed_id() {
        let tool = MaterialDetail::new(Arc::new(InMemoryCatalog::with_sample_data()));
        let err = tool
            .call(context(json!({ "material_id": "not-a-uuid" })))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid material_id format: not-a-uuid");
    }

    #[tokio::test]
    async fn detail_reports_unknown_material() {
        let tool = MaterialDetail::new(Arc::new(InMemoryCatalog::with_sample_data()));
        let id = uuid::Uuid::new_v4();
        let err = tool
            .call(context(json!({ "material_id": id.to_string() })))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Catalog(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn related_lists_neighbours() {
        let catalog = Arc::new(InMemoryCatalog::with_sample_data());
        let id = id_of(&catalog, "cell structure").await;
        let tool = RelatedMaterials::new(catalog);

        let result = tool
            .call(context(json!({ "material_id": id, "relation_type": "prerequisite" })))
            .await
            .unwrap();
        assert_eq!(
            result["content"][0]["text"],
            "No related materials found for Cell Structure and Function."
        );
    }

    #[tokio::test]
    async fn related_defaults_to_similar() {
        let catalog = Arc::new(InMemoryCatalog::with_sample_data());
        let id = id_of(&catalog, "mechanics").await;
        let tool = RelatedMaterials::new(catalog);

        let result = tool.call(context(json!({ "material_id": id }))).await.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("No related materials found for Foundations of Mechanics"));
    }

    #[tokio::test]
    async fn related_within_subject() {
        let catalog = Arc::new(InMemoryCatalog::with_sample_data());
        let id = id_of(&catalog, "vocabulary").await;
        let tool = RelatedMaterials::new(catalog);

        let result = tool
            .call(context(json!({ "material_id": id, "limit": 3 })))
            .await
            .unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Found 1 materials related to Techniques for Memorising Vocabulary"));
        assert!(text.contains("English Grammar Basics: Tenses (ID: "));
    }
}
