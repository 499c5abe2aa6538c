//! Post-office notifications
//!
//! Mishandled mail is an expected outcome of the simulation, not a
//! failure: when the commit phase detects a mistake it files a
//! [`Notification`] with the town that should learn from it. Towns keep
//! a pending queue of these; the day loop drains them into the day
//! report for display.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What went wrong with a piece of mail, from the notified town's
/// point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteKind {
    /// Mail was physically placed at the wrong house.
    MisdeliveredResidence,

    /// Mail was forwarded back toward where it came from.
    RoutedInError,

    /// Mail arrived at a residence with unrepaired damage.
    ArrivedResidenceDamaged,

    /// Mail arrived at a post office with unrepaired damage.
    ArrivedPostOfficeDamaged,
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NoteKind::MisdeliveredResidence => "Mail routed to incorrect residence.",
            NoteKind::RoutedInError => "Mail routed in error.",
            NoteKind::ArrivedResidenceDamaged => "Mail arrived at residence damaged.",
            NoteKind::ArrivedPostOfficeDamaged => "Mail arrived at post office damaged.",
        };
        write!(f, "{}", text)
    }
}

/// A single notification in a town's pending queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Formatted address of the location that filed the report.
    pub reporter: String,

    /// What happened.
    pub kind: NoteKind,
}

impl Notification {
    pub fn new(reporter: String, kind: NoteKind) -> Self {
        Self { reporter, kind }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reporter, self.kind)
    }
}
