//! Client-side session and data-synchronization core of the roster console.

pub mod api;
pub mod collection;
pub mod console;
pub mod error;
pub mod mutation;
pub mod navigation;
pub mod session;

pub use api::{GraphqlClient, RosterApi};
pub use collection::{CollectionView, FetchOutcome, FetchTicket, PageView};
pub use console::{ConsoleEvent, ConsoleOptions, RosterConsole};
pub use error::ClientError;
pub use mutation::{
    ConfirmedDelete, DeleteRequest, Draft, FormMode, MutationForm, MutationOutcome, SubjectDraft,
};
pub use navigation::{Affordances, Navigation, Screen, ViewMode};
pub use session::{
    AccessGate, FileTokenSlot, MemoryTokenSlot, SessionStatus, SessionStore, TokenSlot,
    ValidationOutcome, ValidationTicket,
};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
