//! The collect, preview and generate flow.

pub mod state;
pub mod store;

pub use state::{
    DocumentRequest, WizardEvent, WizardForm, WizardSession, WizardStage, WizardState,
};
pub use store::{SESSION_COOKIE, SESSION_HEADER, WizardStore, session_id};
