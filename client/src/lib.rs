//! Editing-side library for the link page service.
//!
//! Wraps the backend's link routes behind [`api::LinkApi`] and keeps an
//! optimistic in-memory mirror of the collection in
//! [`session::EditorSession`]: mutations show up immediately, the server
//! stays authoritative, and failures roll the display back to the state
//! captured before the change.

pub mod api;
pub mod error;
pub mod session;

pub use api::{HttpApi, LinkApi};
pub use error::ClientError;
pub use session::{EditorSession, Notice, NoticeKind};
