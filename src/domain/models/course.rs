use serde::{Deserialize, Serialize};
use crate::error::AppError;

pub const CUSTOM_PRICE_PER_SESSION: u64 = 400_000;
pub const MAX_CUSTOM_SESSIONS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseKind {
    Allcare,
    Perfect,
    Finish,
    Custom,
}

/// A purchasable course: fixes how many sessions a customer books and what
/// they pay for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Course {
    kind: CourseKind,
    sessions: u32,
}

impl Course {
    /// Resolves a course from the catalog. `requested_sessions` is only
    /// consulted for custom courses; for the fixed packages it must either
    /// be absent or match the package.
    pub fn resolve(kind: CourseKind, requested_sessions: Option<u32>) -> Result<Self, AppError> {
        let fixed = match kind {
            CourseKind::Allcare => Some(3),
            CourseKind::Perfect => Some(5),
            CourseKind::Finish => Some(8),
            CourseKind::Custom => None,
        };

        match (fixed, requested_sessions) {
            (Some(sessions), None) => Ok(Self { kind, sessions }),
            (Some(sessions), Some(requested)) if requested == sessions => Ok(Self { kind, sessions }),
            (Some(sessions), Some(requested)) => Err(AppError::Validation(format!(
                "Course {:?} has {} sessions, not {}", kind, sessions, requested
            ))),
            (None, Some(requested)) if (1..=MAX_CUSTOM_SESSIONS).contains(&requested) => {
                Ok(Self { kind, sessions: requested })
            }
            (None, _) => Err(AppError::Validation(format!(
                "Custom courses need between 1 and {} sessions", MAX_CUSTOM_SESSIONS
            ))),
        }
    }

    pub fn kind(&self) -> CourseKind {
        self.kind
    }

    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    pub fn price(&self) -> u64 {
        match self.kind {
            CourseKind::Allcare => 950_000,
            CourseKind::Perfect => 1_400_000,
            CourseKind::Finish => 2_000_000,
            CourseKind::Custom => CUSTOM_PRICE_PER_SESSION * self.sessions as u64,
        }
    }

    pub fn display_name(&self) -> String {
        let label = match self.kind {
            CourseKind::Allcare => "All Care",
            CourseKind::Perfect => "Perfect",
            CourseKind::Finish => "Finish",
            CourseKind::Custom => "Custom",
        };
        format!("{} ({} sessions)", label, self.sessions)
    }
}
