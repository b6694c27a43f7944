//! Client reconciler.
//!
//! Keeps a local view of each entity stream consistent while changes arrive
//! on two edges at once: push envelopes from the server and periodic pulls
//! of the full authoritative collection.
//!
//! - [`merge`] - versioned replace-by-key store shared by both edges
//! - [`entities`] - per-kind version, ordering and badge rules
//! - [`push`] - validation and routing of server messages to streams
//! - [`stream`] - the single-owner task driving one stream
//! - [`view`] - render-ready snapshots
//! - [`draft`] - local placeholder for a conversation not yet created

pub mod draft;
mod entities;
pub mod merge;
pub mod push;
pub mod stream;
pub mod view;

pub use draft::{ConversationRef, DraftConversation};
pub use merge::{LocalStore, MergeOutcome, PullMerge, Reconcilable, Version};
pub use push::{PushConnector, PushRouter, PushScope, PushSignal, ReconnectBackoff};
pub use stream::{
    spawn_stream, ReconcilerCommand, ReconcilerHandle, ReconcilerNotice, StreamSettings,
};
pub use view::StreamView;
