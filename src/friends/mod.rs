//! Friendship graph: request lifecycle, exclusions, and profiles.
//!
//! This module implements a bidirectional friendship model with a pending
//! request workflow and a unidirectional exclusion list whose meaning is
//! chosen per deployment.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  FriendGraph                    │
//! │   resolve_caller / register / send / approve /  │
//! │   reject / cancel / unfriend / exclusions /     │
//! │   profiles / deregister                         │
//! └──────────┬──────────────────────┬───────────────┘
//!            │                      │
//!   ┌────────▼────────┐    ┌────────▼────────┐
//!   │ ExclusionPolicy │    │  RelationStore  │
//!   │ (mode semantics)│    │ (SQLite, atomic │
//!   └─────────────────┘    │  primitives)    │
//!                          └─────────────────┘
//! ```
//!
//! The engine composes idempotent store primitives and never holds
//! cross-record transactions; see [`engine`] for the consistency model.
//! Callers resolve an authenticated principal to a [`User`] once, then pass
//! it into the operations. Profile data crosses the trust boundary only as
//! [`FriendProfile`], which has no field for the identity reference.

pub mod engine;
pub mod error;
pub mod identity;
pub mod policy;
pub mod profile;
pub mod storage;
pub mod types;

pub use engine::FriendGraph;
pub use error::{FriendError, Result};
pub use identity::normalize_principal;
pub use policy::ExclusionPolicy;
pub use profile::{project, FriendProfile};
pub use storage::{RelationStore, SetField};
pub use types::{
    ExclusionMode, FriendRequest, Page, User, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, MAX_PROFILE_BATCH,
};
