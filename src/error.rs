//! Application error type.
//!
//! Every failure is fatal to the run. An error records which pipeline stage
//! failed and what category of failure it was; the category decides the process
//! exit code.

use std::fmt;

/// Failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration (CLI flags / environment).
    Config,
    /// Network or source unavailable.
    Fetch,
    /// Expected columns or headers absent.
    Schema,
    /// Date or numeric parse failure.
    Parse,
    /// No joined rows for a region that must have data.
    Join,
    /// Forecasting input degenerate or too short.
    ModelFit,
    /// Terminal UI setup/draw failure.
    Terminal,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config => 2,
            ErrorKind::Schema | ErrorKind::Parse => 3,
            ErrorKind::Fetch => 4,
            ErrorKind::ModelFit => 5,
            ErrorKind::Join => 6,
            ErrorKind::Terminal => 7,
        }
    }
}

/// Pipeline stage in which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Load,
    Reshape,
    Merge,
    Aggregate,
    Smooth,
    Forecast,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Load => "load",
            Stage::Reshape => "reshape",
            Stage::Merge => "merge",
            Stage::Aggregate => "aggregate",
            Stage::Smooth => "smooth",
            Stage::Forecast => "forecast",
            Stage::Report => "report",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{stage} failed: {message}")]
pub struct AppError {
    kind: ErrorKind,
    stage: Stage,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, Stage::Config, message)
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch, Stage::Load, message)
    }

    pub fn schema(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, stage, message)
    }

    pub fn parse(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, stage, message)
    }

    pub fn model_fit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModelFit, Stage::Forecast, message)
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Terminal, Stage::Report, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}
