//! Per-image outcomes returned to the caller.
//!
//! A result is never persisted. Each variant of [`Outcome`] carries only
//! the fields that make sense for it.

use serde::Serialize;
use std::fmt;

/// Coarse status of one ingested image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Duplicate,
    Error,
}

/// Where in the pipeline an image failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Upload was missing bytes or a name
    Validation,
    /// Image could not be saved
    Storage,
    /// Extraction service returned a typed failure
    Extraction,
    /// Extraction succeeded but mandatory fields were missing
    Unreadable,
    /// Catalog lookup failed
    Lookup,
    /// Catalog append failed (the asset may already be renamed)
    Registration,
    /// Whole batch refused before any work
    Rejected,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Validation => "validation",
            FailureStage::Storage => "storage",
            FailureStage::Extraction => "extraction",
            FailureStage::Unreadable => "unreadable",
            FailureStage::Lookup => "lookup",
            FailureStage::Registration => "registration",
            FailureStage::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Terminal state of the pipeline for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Outcome {
    /// New card registered in the catalog
    Success {
        card_id: String,
        registered_file_name: String,
        asset_id: String,
    },

    /// Card already in the catalog; the photo was kept under a timestamped name
    Duplicate {
        card_id: String,
        registered_file_name: String,
        asset_id: String,
    },

    #[serde(rename = "error")]
    Failed {
        stage: FailureStage,
        #[serde(skip_serializing_if = "Option::is_none")]
        card_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        registered_file_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        asset_id: Option<String>,
    },
}

/// Outcome of ingesting one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// Name the image was uploaded with (absent for whole-batch rejections)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_file_name: Option<String>,

    pub message: String,

    #[serde(flatten)]
    pub outcome: Outcome,
}

impl PipelineResult {
    pub fn success(
        original_file_name: impl Into<String>,
        card_id: impl Into<String>,
        registered_file_name: impl Into<String>,
        asset_id: impl Into<String>,
    ) -> Self {
        let card_id = card_id.into();
        Self {
            original_file_name: Some(original_file_name.into()),
            message: format!("Registered new card {}.", card_id),
            outcome: Outcome::Success {
                card_id,
                registered_file_name: registered_file_name.into(),
                asset_id: asset_id.into(),
            },
        }
    }

    pub fn duplicate(
        original_file_name: impl Into<String>,
        card_id: impl Into<String>,
        registered_file_name: impl Into<String>,
        asset_id: impl Into<String>,
    ) -> Self {
        let card_id = card_id.into();
        Self {
            original_file_name: Some(original_file_name.into()),
            message: format!("Card {} is already registered.", card_id),
            outcome: Outcome::Duplicate {
                card_id,
                registered_file_name: registered_file_name.into(),
                asset_id: asset_id.into(),
            },
        }
    }

    pub fn failed(
        original_file_name: impl Into<String>,
        stage: FailureStage,
        message: impl Into<String>,
    ) -> Self {
        Self {
            original_file_name: Some(original_file_name.into()),
            message: message.into(),
            outcome: Outcome::Failed {
                stage,
                card_id: None,
                registered_file_name: None,
                asset_id: None,
            },
        }
    }

    /// Single error element standing in for a refused batch.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            original_file_name: None,
            message: message.into(),
            outcome: Outcome::Failed {
                stage: FailureStage::Rejected,
                card_id: None,
                registered_file_name: None,
                asset_id: None,
            },
        }
    }

    /// Attach the stored asset to a failure.
    pub fn with_asset_id(mut self, id: impl Into<String>) -> Self {
        if let Outcome::Failed { asset_id, .. } = &mut self.outcome {
            *asset_id = Some(id.into());
        }
        self
    }

    /// Attach the extracted card id to a failure.
    pub fn with_card_id(mut self, id: impl Into<String>) -> Self {
        if let Outcome::Failed { card_id, .. } = &mut self.outcome {
            *card_id = Some(id.into());
        }
        self
    }

    /// Attach the asset's current display name to a failure.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        if let Outcome::Failed {
            registered_file_name,
            ..
        } = &mut self.outcome
        {
            *registered_file_name = Some(name.into());
        }
        self
    }

    pub fn status(&self) -> Status {
        match self.outcome {
            Outcome::Success { .. } => Status::Success,
            Outcome::Duplicate { .. } => Status::Duplicate,
            Outcome::Failed { .. } => Status::Error,
        }
    }

    pub fn failure_stage(&self) -> Option<FailureStage> {
        match self.outcome {
            Outcome::Failed { stage, .. } => Some(stage),
            _ => None,
        }
    }

    pub fn card_id(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { card_id, .. } | Outcome::Duplicate { card_id, .. } => Some(card_id),
            Outcome::Failed { card_id, .. } => card_id.as_deref(),
        }
    }

    pub fn registered_file_name(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success {
                registered_file_name,
                ..
            }
            | Outcome::Duplicate {
                registered_file_name,
                ..
            } => Some(registered_file_name),
            Outcome::Failed {
                registered_file_name,
                ..
            } => registered_file_name.as_deref(),
        }
    }

    pub fn asset_id(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { asset_id, .. } | Outcome::Duplicate { asset_id, .. } => {
                Some(asset_id)
            }
            Outcome::Failed { asset_id, .. } => asset_id.as_deref(),
        }
    }
}

/// Outcome counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[PipelineResult]) -> Self {
        results
            .iter()
            .fold(Self::default(), |mut summary, result| {
                match result.status() {
                    Status::Success => summary.succeeded += 1,
                    Status::Duplicate => summary.duplicates += 1,
                    Status::Error => summary.failed += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.duplicates + self.failed
    }
}
