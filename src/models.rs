// Data models for study tasks

use chrono::{SecondsFormat, Utc};
use colored::Color;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A single study to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "or_default")]
    pub description: String,
    pub category: Category,
    pub completed: bool,
    #[serde(default, deserialize_with = "or_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "or_default")]
    pub has_exercise: bool,
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub exercise_file: Option<ExerciseFile>,
}

/// Decode an optional field, falling back to its default on null or a type mismatch
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Exercise attachment stored inline as a data URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseFile {
    pub name: String,
    pub data_url: String,
}

impl Task {
    /// Build a fresh, incomplete task. The title is trimmed and must not be empty.
    pub fn new(id: i64, title: &str, category: Category, has_exercise: bool) -> crate::Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(crate::TaskError::EmptyTitle);
        }

        Ok(Self {
            id,
            title: title.to_string(),
            description: String::new(),
            category,
            completed: false,
            created_at: now_iso(),
            has_exercise,
            exercise_file: None,
        })
    }

    /// Shallow merge: every field set in the patch replaces the current value
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(has_exercise) = patch.has_exercise {
            self.has_exercise = has_exercise;
        }
        if let Some(exercise_file) = patch.exercise_file {
            self.exercise_file = exercise_file;
        }
        self.normalize();
    }

    /// Drop an attachment that is not backed by `has_exercise`
    pub fn normalize(&mut self) {
        if !self.has_exercise && self.exercise_file.is_some() {
            tracing::debug!(id = self.id, "Dropping exercise file from task without exercise flag");
            self.exercise_file = None;
        }
    }
}

/// Partial task fields for `TaskStore::update`
///
/// `id` and `created_at` are immutable and have no counterpart here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub completed: Option<bool>,
    pub has_exercise: Option<bool>,
    /// `Some(None)` clears the attachment
    pub exercise_file: Option<Option<ExerciseFile>>,
}

impl TaskPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn has_exercise(mut self, has_exercise: bool) -> Self {
        self.has_exercise = Some(has_exercise);
        self
    }

    pub fn exercise_file(mut self, exercise_file: Option<ExerciseFile>) -> Self {
        self.exercise_file = Some(exercise_file);
        self
    }
}

/// Input for `TaskStore::create`
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub category: Category,
    pub has_exercise: bool,
    pub exercise: Option<ExerciseSource>,
}

/// A file selected for attachment, with the content type it declares
#[derive(Debug, Clone)]
pub struct ExerciseSource {
    pub path: PathBuf,
    pub content_type: String,
}

/// Direction for reordering a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Subject-matter tag for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Direito Constitucional")]
    DireitoConstitucional,
    #[serde(rename = "Direito Penal")]
    DireitoPenal,
    #[serde(rename = "Direito Penal Especial")]
    DireitoPenalEspecial,
    #[serde(rename = "Legislação Penal Especial")]
    LegislacaoPenalEspecial,
    #[serde(rename = "Direitos Humanos")]
    DireitosHumanos,
    #[serde(rename = "Direito Administrativo")]
    DireitoAdministrativo,
    #[serde(rename = "Direito Penal Militar")]
    DireitoPenalMilitar,
    #[serde(rename = "Português")]
    Portugues,
    #[serde(rename = "Informática")]
    Informatica,
    #[serde(rename = "Matemática")]
    Matematica,
    #[serde(rename = "Geografia")]
    Geografia,
    #[serde(rename = "Atualidades")]
    Atualidades,
    #[serde(rename = "História")]
    Historia,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::DireitoConstitucional,
        Category::DireitoPenal,
        Category::DireitoPenalEspecial,
        Category::LegislacaoPenalEspecial,
        Category::DireitosHumanos,
        Category::DireitoAdministrativo,
        Category::DireitoPenalMilitar,
        Category::Portugues,
        Category::Informatica,
        Category::Matematica,
        Category::Geografia,
        Category::Atualidades,
        Category::Historia,
    ];

    /// Display name, identical to the serialized form
    pub fn name(self) -> &'static str {
        match self {
            Category::DireitoConstitucional => "Direito Constitucional",
            Category::DireitoPenal => "Direito Penal",
            Category::DireitoPenalEspecial => "Direito Penal Especial",
            Category::LegislacaoPenalEspecial => "Legislação Penal Especial",
            Category::DireitosHumanos => "Direitos Humanos",
            Category::DireitoAdministrativo => "Direito Administrativo",
            Category::DireitoPenalMilitar => "Direito Penal Militar",
            Category::Portugues => "Português",
            Category::Informatica => "Informática",
            Category::Matematica => "Matemática",
            Category::Geografia => "Geografia",
            Category::Atualidades => "Atualidades",
            Category::Historia => "História",
        }
    }

    /// Terminal color used when rendering the category tag
    pub fn color(self) -> Color {
        match self {
            Category::DireitoConstitucional => Color::Blue,
            Category::DireitoPenal => Color::Red,
            Category::DireitoPenalEspecial => Color::Magenta,
            Category::LegislacaoPenalEspecial => Color::Green,
            Category::DireitosHumanos => Color::Yellow,
            Category::DireitoAdministrativo => Color::BrightBlue,
            Category::DireitoPenalMilitar => Color::BrightMagenta,
            Category::Portugues => Color::Cyan,
            Category::Informatica => Color::TrueColor { r: 249, g: 115, b: 22 },
            Category::Matematica => Color::BrightCyan,
            Category::Geografia => Color::TrueColor { r: 245, g: 158, b: 11 },
            Category::Atualidades => Color::BrightGreen,
            Category::Historia => Color::TrueColor { r: 132, g: 204, b: 22 },
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .iter()
            .find(|c| c.name() == s)
            .or_else(|| {
                let lower = s.to_lowercase();
                Category::ALL.iter().find(|c| c.name().to_lowercase() == lower)
            })
            .copied()
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// Current time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as an RFC 3339 string with millisecond precision
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Timestamp id that is strictly greater than every id already in use
pub fn fresh_id(tasks: &[Task]) -> i64 {
    let next = tasks.iter().map(|t| t.id).max().map_or(i64::MIN, |max| max.saturating_add(1));
    now_ms().max(next)
}
