use serde::Serialize;

/// Colour family a dashboard uses to render a status badge.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Primary,
    Accent,
    Success,
    Warning,
    Destructive,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StatusBadge {
    pub label: &'static str,
    pub tone: Tone,
    /// Spinner-style badge for states that are still moving.
    pub animated: bool,
}

impl StatusBadge {
    pub const fn new(label: &'static str, tone: Tone) -> Self {
        Self {
            label,
            tone,
            animated: false,
        }
    }

    pub const fn animated(label: &'static str, tone: Tone) -> Self {
        Self {
            label,
            tone,
            animated: true,
        }
    }
}

/// Display metadata for a status value. Implementations match exhaustively so
/// that adding a status variant fails to compile until it has a badge.
pub trait StatusDisplay {
    fn badge(&self) -> StatusBadge;
}
