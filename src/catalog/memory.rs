//! In-memory catalogue.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use super::{
    CurriculumAlignment, Difficulty, GradeLevel, Material, MaterialLookup, MaterialMetadata,
    MaterialStatistics, MaterialType, Pagination, Relation, SearchFilters, Subject,
};
use crate::error::CatalogError;

/// A catalogue held in process memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    materials: RwLock<IndexMap<Uuid, Material>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalogue seeded with the sample library.
    #[must_use]
    pub fn with_sample_data() -> Self {
        let catalog = Self::new();
        for material in sample_materials() {
            catalog.insert(material);
        }
        catalog
    }

    /// Inserts or replaces a material.
    pub fn insert(&self, material: Material) -> Option<Material> {
        self.materials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(material.id, material)
    }

    /// Removes a material.
    pub fn remove(&self, id: Uuid) -> Option<Material> {
        self.materials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(&id)
    }

    /// Returns every material in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<Material> {
        self.materials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Number of materials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.materials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the catalogue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl MaterialLookup for InMemoryCatalog {
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        page: Pagination,
    ) -> Result<(Vec<Material>, usize), CatalogError> {
        let materials = self
            .materials
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let query = query.trim();

        let matches: Vec<&Material> = materials
            .values()
            .filter(|m| {
                query.is_empty()
                    || contains_ignore_case(&m.title, query)
                    || contains_ignore_case(&m.description, query)
            })
            .filter(|m| filters.matches(m))
            .collect();

        let total = matches.len();
        let items = matches
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .cloned()
            .collect();

        Ok((items, total))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Material, CatalogError> {
        self.materials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn related(
        &self,
        id: Uuid,
        _relation: Relation,
        limit: usize,
    ) -> Result<Vec<Material>, CatalogError> {
        let materials = self
            .materials
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let source = materials
            .get(&id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        // Every relation kind uses the same rule: same subject, shared grade
        Ok(materials
            .values()
            .filter(|m| m.id != id)
            .filter(|m| m.subject == source.subject && m.targets_any(&source.grade_levels))
            .take(limit)
            .cloned()
            .collect())
    }
}

fn grades(levels: &[u8]) -> Vec<GradeLevel> {
    levels.iter().map(|&n| GradeLevel(n)).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn base(
    title: &str,
    description: &str,
    material_type: MaterialType,
    subject: Subject,
    difficulty: Difficulty,
    age_hours: i64,
) -> Material {
    let now = Utc::now();
    Material {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: description.to_string(),
        material_type,
        grade_levels: Vec::new(),
        subject,
        tags: Vec::new(),
        difficulty,
        curriculum_alignment: CurriculumAlignment::default(),
        metadata: MaterialMetadata {
            language: "en".to_string(),
            ..MaterialMetadata::default()
        },
        statistics: MaterialStatistics::default(),
        created_at: now - Duration::hours(age_hours),
        updated_at: now,
    }
}

fn stats(views: u64, downloads: u64, ratings: u64, average: f64) -> MaterialStatistics {
    MaterialStatistics {
        view_count: views,
        download_count: downloads,
        rating_count: ratings,
        average_rating: average,
    }
}

fn alignment(standard: &str, objectives: &[&str], competency_level: u8) -> CurriculumAlignment {
    CurriculumAlignment {
        standard: standard.to_string(),
        objectives: strings(objectives),
        competency_level,
    }
}

fn timed(seconds: u32, format: &str) -> MaterialMetadata {
    MaterialMetadata {
        duration: Some(seconds),
        pages: None,
        format: format.to_string(),
        language: "en".to_string(),
    }
}

fn paged(pages: u32, format: &str) -> MaterialMetadata {
    MaterialMetadata {
        duration: None,
        pages: Some(pages),
        format: format.to_string(),
        language: "en".to_string(),
    }
}

/// The bundled sample library.
#[allow(clippy::too_many_lines)]
fn sample_materials() -> Vec<Material> {
    vec![
        Material {
            grade_levels: grades(&[2]),
            tags: strings(&["algebra", "equations", "quadratics", "problem solving"]),
            curriculum_alignment: alignment(
                "Middle school mathematics",
                &["Solve quadratic equations", "Choose between solution methods"],
                85,
            ),
            metadata: timed(1800, "mp4"),
            statistics: stats(1250, 320, 45, 4.6),
            ..base(
                "Solving Quadratic Equations",
                "Walks through factoring, completing the square and the quadratic formula",
                MaterialType::Video,
                Subject::Math,
                Difficulty::Medium,
                24,
            )
        },
        Material {
            grade_levels: grades(&[1]),
            tags: strings(&["fractions", "arithmetic", "common denominators"]),
            curriculum_alignment: alignment(
                "Primary school mathematics",
                &["Add, subtract, multiply and divide fractions", "Understand what a fraction is"],
                90,
            ),
            metadata: timed(1200, "html"),
            statistics: stats(2100, 150, 67, 4.8),
            ..base(
                "Fraction Arithmetic",
                "Interactive practice with the four operations on fractions and finding common denominators",
                MaterialType::Interactive,
                Subject::Math,
                Difficulty::Easy,
                48,
            )
        },
        Material {
            grade_levels: grades(&[3]),
            tags: strings(&["geometry", "proofs", "reasoning"]),
            curriculum_alignment: alignment(
                "High school mathematics",
                &["Construct geometric proofs", "Develop logical reasoning"],
                70,
            ),
            metadata: paged(30, "pdf"),
            statistics: stats(750, 280, 28, 4.3),
            ..base(
                "Approaches to Geometry Proofs",
                "Worked strategies and practice problems for high school geometry proofs",
                MaterialType::Exercise,
                Subject::Math,
                Difficulty::Hard,
                18,
            )
        },
        Material {
            grade_levels: grades(&[1, 2]),
            tags: strings(&["grammar", "tenses", "language learning"]),
            curriculum_alignment: alignment(
                "Middle school English",
                &["Use verb tenses correctly", "Distinguish between similar tenses"],
                90,
            ),
            metadata: paged(45, "pptx"),
            statistics: stats(2100, 180, 78, 4.8),
            ..base(
                "English Grammar Basics: Tenses",
                "A systematic tour of English verb tenses with exercises and common mistakes",
                MaterialType::Ppt,
                Subject::English,
                Difficulty::Easy,
                48,
            )
        },
        Material {
            grade_levels: grades(&[1, 2, 3]),
            tags: strings(&["vocabulary", "memory", "study skills"]),
            curriculum_alignment: alignment(
                "General English teaching",
                &["Apply vocabulary memorisation techniques", "Grow vocabulary"],
                95,
            ),
            metadata: timed(1500, "mp4"),
            statistics: stats(3200, 450, 120, 4.9),
            ..base(
                "Techniques for Memorising Vocabulary",
                "Effective ways to learn and retain English vocabulary for learners of all grades",
                MaterialType::Video,
                Subject::English,
                Difficulty::Easy,
                72,
            )
        },
        Material {
            grade_levels: grades(&[2, 3]),
            tags: strings(&["mechanics", "newton's laws", "experiments"]),
            curriculum_alignment: alignment(
                "High school physics",
                &["Understand Newton's laws of motion", "Master core mechanics concepts"],
                75,
            ),
            metadata: MaterialMetadata {
                format: "pdf".to_string(),
                language: "en".to_string(),
                ..MaterialMetadata::default()
            },
            statistics: stats(890, 450, 32, 4.4),
            ..base(
                "Foundations of Mechanics",
                "Newtonian mechanics explained with experiment walkthroughs and solved problems",
                MaterialType::Exercise,
                Subject::Physics,
                Difficulty::Hard,
                12,
            )
        },
        Material {
            grade_levels: grades(&[1, 2]),
            tags: strings(&["classical poetry", "appreciation", "reading skills"]),
            curriculum_alignment: alignment(
                "Middle school Chinese",
                &["Analyse classical poems", "Build literary appreciation"],
                80,
            ),
            metadata: paged(25, "docx"),
            statistics: stats(1650, 380, 55, 4.7),
            ..base(
                "Reading Classical Poetry",
                "Methods for reading and appreciating classical poetry with annotated examples",
                MaterialType::Document,
                Subject::Chinese,
                Difficulty::Medium,
                36,
            )
        },
        Material {
            grade_levels: grades(&[2, 3]),
            tags: strings(&["chemical reactions", "reaction types", "experiments"]),
            curriculum_alignment: alignment(
                "High school chemistry",
                &["Classify chemical reactions", "Explain reaction patterns"],
                85,
            ),
            metadata: timed(2100, "mp4"),
            statistics: stats(980, 120, 38, 4.5),
            ..base(
                "Types of Chemical Reactions",
                "Classification of chemical reactions with recorded lab demonstrations",
                MaterialType::Video,
                Subject::Chemistry,
                Difficulty::Medium,
                30,
            )
        },
        Material {
            grade_levels: grades(&[1, 2]),
            tags: strings(&["cells", "microscopy", "life science"]),
            curriculum_alignment: alignment(
                "Middle school biology",
                &["Identify cell structures", "Explain what each structure does"],
                88,
            ),
            metadata: timed(900, "html"),
            statistics: stats(1400, 200, 42, 4.6),
            ..base(
                "Cell Structure and Function",
                "Labelled diagrams of cell structures and interactive practice",
                MaterialType::Interactive,
                Subject::Biology,
                Difficulty::Easy,
                42,
            )
        },
    ]
}
