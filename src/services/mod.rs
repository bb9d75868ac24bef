//! Service layer: business logic behind the HTTP routes.
//!
//! `chat` orchestrates a message through `validation`, `prompt`, the relay,
//! and a `history` store (in-memory or Postgres via `history_db`).

pub mod chat;
pub mod history;
pub mod history_db;
pub mod prompt;
pub mod validation;
