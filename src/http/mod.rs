//! JSON API for embedding the questionnaire in a web page.
//!
//! Each `POST /api/flows` opens an independent conversation held in the
//! `SessionRegistry`; the page polls or re-fetches the snapshot to render it.

pub mod registry;
pub mod routes;

pub use registry::{DEFAULT_SESSION_TTL, SessionRegistry, spawn_expiry_task};
pub use routes::{AppState, flow_routes};
