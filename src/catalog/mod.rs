//! Teaching material catalogue.
//!
//! Tools never touch storage directly; they go through the
//! [`MaterialLookup`] trait. [`InMemoryCatalog`] is the bundled
//! implementation, seeded with a small sample library. Callers are
//! identified through [`IdentityResolver`].

mod identity;
mod memory;

pub use identity::{ApiKeyResolver, IdentityResolver};
pub use memory::InMemoryCatalog;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CatalogError;

/// Kind of teaching material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    /// Recorded lesson or demonstration.
    Video,
    /// Slide deck.
    Ppt,
    /// Printable document.
    Pdf,
    /// Editable document.
    Document,
    /// Practice problems.
    Exercise,
    /// Ready-made lesson plan.
    LessonPlan,
    /// Interactive web activity.
    Interactive,
    /// Audio recording.
    Audio,
    /// Picture or diagram.
    Image,
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Video => "video",
            Self::Ppt => "ppt",
            Self::Pdf => "pdf",
            Self::Document => "document",
            Self::Exercise => "exercise",
            Self::LessonPlan => "lesson_plan",
            Self::Interactive => "interactive",
            Self::Audio => "audio",
            Self::Image => "image",
        };
        f.write_str(name)
    }
}

/// School subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    /// Mathematics.
    Math,
    /// Chinese language and literature.
    Chinese,
    /// English language.
    English,
    /// Physics.
    Physics,
    /// Chemistry.
    Chemistry,
    /// Biology.
    Biology,
    /// History.
    History,
    /// Geography.
    Geography,
    /// Civics.
    Politics,
}

impl Subject {
    /// Subjects offered as tool enum values.
    pub const ALL: [Self; 9] = [
        Self::Math,
        Self::Chinese,
        Self::English,
        Self::Physics,
        Self::Chemistry,
        Self::Biology,
        Self::History,
        Self::Geography,
        Self::Politics,
    ];

    /// Wire name of the subject.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Chinese => "chinese",
            Self::English => "english",
            Self::Physics => "physics",
            Self::Chemistry => "chemistry",
            Self::Biology => "biology",
            Self::History => "history",
            Self::Geography => "geography",
            Self::Politics => "politics",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Difficulty rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Introductory.
    Easy,
    /// Standard.
    Medium,
    /// Challenging.
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        })
    }
}

/// School grade, 1 to 12.
///
/// Serialised as `grade_N`; parsing also accepts `grade-N` and bare `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GradeLevel(u8);

impl GradeLevel {
    /// Highest supported grade.
    pub const MAX: u8 = 12;

    /// Creates a grade level.
    ///
    /// # Errors
    ///
    /// Returns an error if `grade` is outside 1..=12.
    pub fn new(grade: u8) -> Result<Self, String> {
        if (1..=Self::MAX).contains(&grade) {
            Ok(Self(grade))
        } else {
            Err(format!("grade must be between 1 and {}, got {grade}", Self::MAX))
        }
    }

    /// The numeric grade.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl FromStr for GradeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("grade_")
            .or_else(|| trimmed.strip_prefix("grade-"))
            .unwrap_or(trimmed);
        let grade: u8 = digits
            .parse()
            .map_err(|_| format!("invalid grade level: {s}"))?;
        Self::new(grade)
    }
}

impl TryFrom<String> for GradeLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GradeLevel> for String {
    fn from(grade: GradeLevel) -> Self {
        grade.to_string()
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grade_{}", self.0)
    }
}

/// Curriculum standard a material is aligned to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurriculumAlignment {
    /// Curriculum standard name.
    pub standard: String,
    /// Learning objectives covered.
    pub objectives: Vec<String>,
    /// Alignment score, 0 to 100.
    pub competency_level: u8,
}

/// File-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialMetadata {
    /// Running time in seconds, for timed media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Page count, for documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    /// File format.
    pub format: String,
    /// Content language.
    pub language: String,
}

/// Usage counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialStatistics {
    /// Number of views.
    pub view_count: u64,
    /// Number of downloads.
    pub download_count: u64,
    /// Number of ratings.
    pub rating_count: u64,
    /// Mean rating, 0 to 5.
    pub average_rating: f64,
}

/// A catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Stable identifier.
    pub id: Uuid,
    /// Title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Kind of material.
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    /// Grades the material targets.
    pub grade_levels: Vec<GradeLevel>,
    /// Subject.
    pub subject: Subject,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Difficulty rating.
    pub difficulty: Difficulty,
    /// Curriculum alignment.
    pub curriculum_alignment: CurriculumAlignment,
    /// File metadata.
    pub metadata: MaterialMetadata,
    /// Usage counters.
    pub statistics: MaterialStatistics,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Material {
    /// Returns `true` if the material targets any of `grades`.
    #[must_use]
    pub fn targets_any(&self, grades: &[GradeLevel]) -> bool {
        self.grade_levels.iter().any(|g| grades.contains(g))
    }
}

/// Filters narrowing a search. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// Material must target at least one of these grades.
    pub grades: Vec<GradeLevel>,
    /// Material must be in this subject.
    pub subject: Option<Subject>,
    /// Material must have this difficulty.
    pub difficulty: Option<Difficulty>,
    /// Material must be of this type.
    pub material_type: Option<MaterialType>,
}

impl SearchFilters {
    /// Returns `true` if `material` passes every set filter.
    #[must_use]
    pub fn matches(&self, material: &Material) -> bool {
        (self.grades.is_empty() || material.targets_any(&self.grades))
            && self.subject.map_or(true, |s| material.subject == s)
            && self.difficulty.map_or(true, |d| material.difficulty == d)
            && self.material_type.map_or(true, |t| material.material_type == t)
    }
}

/// One-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number, starting at 1.
    pub page: usize,
    /// Items per page.
    pub page_size: usize,
}

impl Pagination {
    /// The first page of `page_size` items.
    #[must_use]
    pub const fn first(page_size: usize) -> Self {
        Self { page: 1, page_size }
    }

    /// Number of items skipped before this page.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// How two materials are related.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Should be studied before.
    Prerequisite,
    /// Should be studied after.
    Followup,
    /// Covers similar ground.
    #[default]
    Similar,
    /// Complements the material.
    Complementary,
}

/// Read access to the catalogue.
#[async_trait]
pub trait MaterialLookup: Send + Sync {
    /// Searches by case-insensitive keyword over title and description.
    ///
    /// Returns the requested page and the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        page: Pagination,
    ) -> Result<(Vec<Material>, usize), CatalogError>;

    /// Fetches one material.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if no material has this id.
    async fn get_by_id(&self, id: Uuid) -> Result<Material, CatalogError>;

    /// Lists materials related to `id`, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if no material has this id.
    async fn related(
        &self,
        id: Uuid,
        relation: Relation,
        limit: usize,
    ) -> Result<Vec<Material>, CatalogError>;
}

/// Parses a material id supplied by a client.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidId`] if `raw` is not a UUID.
pub fn parse_material_id(raw: &str) -> Result<Uuid, CatalogError> {
    Uuid::parse_str(raw.trim()).map_err(|_| CatalogError::InvalidId(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_level_parsing() {
        assert_eq!("grade_3".parse::<GradeLevel>().unwrap().number(), 3);
        assert_eq!("grade-11".parse::<GradeLevel>().unwrap().number(), 11);
        assert_eq!("7".parse::<GradeLevel>().unwrap().number(), 7);
        assert!("grade_0".parse::<GradeLevel>().is_err());
        assert!("grade_13".parse::<GradeLevel>().is_err());
        assert!("first".parse::<GradeLevel>().is_err());
    }

    #[test]
    fn grade_level_serde() {
        let grade = GradeLevel::new(2).unwrap();
        assert_eq!(serde_json::to_value(grade).unwrap(), "grade_2");
        let parsed: GradeLevel = serde_json::from_value(serde_json::json!("grade_2")).unwrap();
        assert_eq!(parsed, grade);
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_value(MaterialType::LessonPlan).unwrap(), "lesson_plan");
        assert_eq!(serde_json::to_value(Subject::Math).unwrap(), "math");
        assert_eq!(MaterialType::LessonPlan.to_string(), "lesson_plan");
        assert_eq!(Subject::Politics.to_string(), "politics");
        assert_eq!(Difficulty::Hard.to_string(), "hard");
    }

    #[test]
    fn pagination_offset() {
        assert_eq!(Pagination::first(10).offset(), 0);
        assert_eq!(Pagination { page: 3, page_size: 5 }.offset(), 10);
        assert_eq!(Pagination { page: 0, page_size: 5 }.offset(), 0);
    }

    #[test]
    fn material_id_parsing() {
        assert!(parse_material_id("67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
        assert_eq!(
            parse_material_id("nope"),
            Err(CatalogError::InvalidId("nope".to_string()))
        );
    }
}
