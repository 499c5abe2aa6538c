//! Core data models for the postal network simulation

pub mod event;
pub mod mail;
pub mod state;
pub mod town;

pub use event::{NoteKind, Notification};
pub use mail::{Location, MailAction, MailError, MailId, MailItem, Stamp, MAX_DAMAGE};
pub use state::SimulationState;
pub use town::{House, HouseRef, Sender, SenderId, Street, Town, World, Zip};
