//! Composition persistence use-cases.
//!
//! # Responsibility
//! - Save/open/list/delete compositions on behalf of UI callers.
//! - Map repository errors into use-case level errors.
//!
//! # Invariants
//! - `save` reads the summary back and fails loudly if the write vanished.
//! - Listing always reports the limit it actually applied.

use crate::model::composition::{CompositionData, CompositionValidationError};
use crate::repo::composition_repo::{
    normalize_composition_limit, CompositionListQuery, CompositionRepository, CompositionSummary,
    RepoError,
};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for composition use-cases.
#[derive(Debug)]
pub enum CompositionServiceError {
    /// Composition failed validation before write.
    Invalid(CompositionValidationError),
    /// Target composition does not exist.
    CompositionNotFound(String),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for CompositionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "invalid composition: {err}"),
            Self::CompositionNotFound(id) => write!(f, "composition not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent composition state: {details}")
            }
        }
    }
}

impl Error for CompositionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CompositionServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::CompositionNotFound(id),
            RepoError::Validation(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionListResult {
    /// Items sorted by `date_created DESC, uuid ASC`.
    pub items: Vec<CompositionSummary>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
}

/// Composition service facade over repository implementations.
pub struct CompositionService<R: CompositionRepository> {
    repo: R,
}

impl<R: CompositionRepository> CompositionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Inserts or replaces a composition and returns its stored summary.
    pub fn save(
        &self,
        composition: &CompositionData,
    ) -> Result<CompositionSummary, CompositionServiceError> {
        if let Err(err) = self.repo.save_composition(composition) {
            error!("event=composition_save module=service status=error error={err}");
            return Err(err.into());
        }

        let summary = self
            .repo
            .get_summary(&composition.id)?
            .ok_or(CompositionServiceError::InconsistentState(
                "saved composition not found in read-back",
            ))?;
        info!(
            "event=composition_save module=service status=ok notes={}",
            summary.note_count
        );
        Ok(summary)
    }

    /// Loads a full composition by id.
    pub fn open(&self, id: &str) -> Result<CompositionData, CompositionServiceError> {
        self.repo
            .get_composition(id)?
            .ok_or_else(|| CompositionServiceError::CompositionNotFound(id.to_string()))
    }

    /// Lists composition summaries with pagination.
    pub fn list(
        &self,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<CompositionListResult, CompositionServiceError> {
        let applied_limit = normalize_composition_limit(limit);
        let query = CompositionListQuery {
            limit: Some(applied_limit),
            offset,
        };
        let items = self.repo.list_compositions(&query)?;
        Ok(CompositionListResult {
            items,
            applied_limit,
        })
    }

    /// Deletes a composition permanently.
    pub fn delete(&self, id: &str) -> Result<(), CompositionServiceError> {
        self.repo.delete_composition(id)?;
        info!("event=composition_delete module=service status=ok");
        Ok(())
    }
}
