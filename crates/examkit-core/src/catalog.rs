//! Exam catalog trait and built-in catalogs.
//!
//! A catalog resolves exam ids to fully loaded definitions before a session
//! starts. Remote catalogs implement the same trait; fetch failures are
//! handled by the caller and never reach a running session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ExamDefinition, Level};
use crate::parser;

/// Listing entry for an exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSummary {
    pub id: String,
    pub title: String,
    pub level: Level,
    pub question_count: usize,
    pub section_count: usize,
    pub time_limit_secs: u64,
    pub passing_threshold: u8,
}

impl From<&ExamDefinition> for ExamSummary {
    fn from(exam: &ExamDefinition) -> Self {
        Self {
            id: exam.id.clone(),
            title: exam.title.clone(),
            level: exam.level,
            question_count: exam.total_questions(),
            section_count: exam.sections.len(),
            time_limit_secs: exam.total_time_budget_seconds,
            passing_threshold: exam.passing_threshold,
        }
    }
}

/// Source of exam definitions.
#[async_trait]
pub trait ExamCatalog: Send + Sync {
    /// Human-readable catalog name (e.g. "directory").
    fn name(&self) -> &str;

    /// All exams in the catalog, sorted by id.
    async fn list(&self) -> Result<Vec<ExamSummary>>;

    /// Resolve one exam by id.
    async fn fetch(&self, exam_id: &str) -> Result<Arc<ExamDefinition>>;
}

/// A fixed set of definitions held in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    exams: BTreeMap<String, Arc<ExamDefinition>>,
}

impl InMemoryCatalog {
    pub fn new(exams: impl IntoIterator<Item = ExamDefinition>) -> Self {
        Self {
            exams: exams
                .into_iter()
                .map(|e| (e.id.clone(), Arc::new(e)))
                .collect(),
        }
    }

    /// Add or replace an exam.
    pub fn insert(&mut self, exam: ExamDefinition) {
        self.exams.insert(exam.id.clone(), Arc::new(exam));
    }

    pub fn len(&self) -> usize {
        self.exams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exams.is_empty()
    }
}

#[async_trait]
impl ExamCatalog for InMemoryCatalog {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<ExamSummary>> {
        Ok(self.exams.values().map(|e| ExamSummary::from(e.as_ref())).collect())
    }

    async fn fetch(&self, exam_id: &str) -> Result<Arc<ExamDefinition>> {
        self.exams
            .get(exam_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("exam not found: {exam_id}"))
    }
}

/// Catalog backed by a directory of TOML exam files, read on every call.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn load_all(&self) -> Result<Vec<ExamDefinition>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || parser::load_exam_directory(&root))
            .await
            .map_err(|e| anyhow::anyhow!("catalog loader panicked: {e}"))?
    }
}

#[async_trait]
impl ExamCatalog for DirectoryCatalog {
    fn name(&self) -> &str {
        "directory"
    }

    async fn list(&self) -> Result<Vec<ExamSummary>> {
        let exams = self.load_all().await?;
        Ok(exams.iter().map(ExamSummary::from).collect())
    }

    async fn fetch(&self, exam_id: &str) -> Result<Arc<ExamDefinition>> {
        let exam = self
            .load_all()
            .await?
            .into_iter()
            .find(|e| e.id == exam_id)
            .ok_or_else(|| {
                anyhow::anyhow!("exam not found in {}: {exam_id}", self.root.display())
            })?;
        tracing::debug!(exam_id, root = %self.root.display(), "exam loaded from directory");
        Ok(Arc::new(exam))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::three_section_exam;

    const EXAM_TOML: &str = r#"
[exam]
id = "dir-exam"
title = "Directory Exam"
level = "N3"
time_limit_secs = 120

[[sections]]
name = "Grammar"
type = "grammar"

[[sections.questions]]
id = "g1"
prompt = "?"
options = ["a", "b", "c"]
correct = 2
"#;

    #[tokio::test]
    async fn in_memory_fetch_and_list() {
        let catalog = InMemoryCatalog::new([three_section_exam()]);
        assert_eq!(catalog.name(), "memory");
        assert_eq!(catalog.len(), 1);

        let exam = catalog.fetch("abc").await.unwrap();
        assert_eq!(exam.total_questions(), 3);

        let listed = catalog.list().await.unwrap();
        assert_eq!(listed[0].question_count, 3);
        assert_eq!(listed[0].section_count, 3);

        let err = catalog.fetch("nope").await.unwrap_err();
        assert!(err.to_string().contains("exam not found"));
    }

    #[tokio::test]
    async fn fetched_definitions_are_shared() {
        let catalog = InMemoryCatalog::new([three_section_exam()]);
        let a = catalog.fetch("abc").await.unwrap();
        let b = catalog.fetch("abc").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn directory_catalog_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("exam.toml"), EXAM_TOML).unwrap();
        let catalog = DirectoryCatalog::new(dir.path());

        let listed = catalog.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].level, Level::N3);
        assert_eq!(listed[0].time_limit_secs, 120);

        let exam = catalog.fetch("dir-exam").await.unwrap();
        assert_eq!(exam.question("g1").unwrap().correct_option_index, 2);
        assert!(catalog.fetch("other").await.is_err());
    }

    #[tokio::test]
    async fn directory_catalog_missing_root() {
        let catalog = DirectoryCatalog::new("/definitely/not/here");
        assert!(catalog.list().await.is_err());
    }
}
