//! Logical records persisted in the key-value store and wire types for the
//! Harvest API and the chat transport.

pub mod credential;
pub mod harvest;
pub mod message;
pub mod reminder;

pub use credential::UserCredential;
pub use harvest::{
    ClientRef, LastTimeEntry, ProjectAssignment, ProjectRef, Selection, TaskAssignment, TaskRef,
    TimeEntry,
};
pub use message::{Block, Button, MessageContent, SelectOption};
pub use reminder::ReminderConfig;
