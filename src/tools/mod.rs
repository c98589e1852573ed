//! Catalogue tools exposed over MCP.
//!
//! # Available Tools
//!
//! ## Search
//! - `search_teaching_materials` - Keyword search with optional grade and subject filters
//! - `search_by_grade_subject` - Browse by grade, subject and difficulty
//!
//! ## Content
//! - `get_material_detail` - Full description of one material
//! - `get_related_materials` - Materials related to a given one
//!
//! ## Generation
//! - `generate_lesson_plan` - 5E lesson plan built around selected materials
//!
//! Every tool answers with a single text content block.

mod detail;
mod lesson_plan;
mod search;

pub use detail::{MaterialDetail, RelatedMaterials};
pub use lesson_plan::{LessonPlanGenerator, FIVE_E_PHASES};
pub use search::{SearchByGradeSubject, SearchMaterials};

use std::sync::Arc;

use serde_json::Value;

use crate::catalog::{GradeLevel, Material, MaterialLookup, Subject};
use crate::error::ToolError;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::types::ToolCallResult;

/// Registers every catalogue tool with the dispatcher.
pub fn register_default_tools(dispatcher: &Dispatcher, catalog: &Arc<dyn MaterialLookup>) {
    dispatcher.register_tool(SearchMaterials::definition(Arc::clone(catalog)));
    dispatcher.register_tool(SearchByGradeSubject::definition(Arc::clone(catalog)));
    dispatcher.register_tool(MaterialDetail::definition(Arc::clone(catalog)));
    dispatcher.register_tool(RelatedMaterials::definition(Arc::clone(catalog)));
    dispatcher.register_tool(LessonPlanGenerator::definition(Arc::clone(catalog)));
}

/// Wraps text in a `tools/call` result.
fn text_result(text: impl Into<String>) -> Result<Value, ToolError> {
    serde_json::to_value(ToolCallResult::text(text)).map_err(|e| ToolError::Failed(e.to_string()))
}

/// Subject names for schema enums.
fn subject_names() -> Vec<&'static str> {
    Subject::ALL.iter().map(|s| s.as_str()).collect()
}

/// Grade names for schema enums.
fn grade_names() -> Vec<String> {
    (1..=GradeLevel::MAX).map(|n| format!("grade_{n}")).collect()
}

/// Renders one list entry per material.
fn format_listing(materials: &[Material]) -> String {
    materials
        .iter()
        .map(|m| format!("- {} (ID: {})", m.title, m.id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats a running time given in seconds.
fn format_duration(seconds: Option<u32>) -> String {
    let Some(seconds) = seconds else {
        return "unknown".to_string();
    };
    let minutes = seconds / 60;
    if minutes < 60 {
        format!("{minutes} minutes")
    } else {
        format!("{} h {} min", minutes / 60, minutes % 60)
    }
}
