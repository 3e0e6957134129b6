//! Kinship Core Library
//!
//! Core functionality for Kinship - a bidirectional friendship graph with a
//! pending-request workflow and a configurable exclusion (block/avoid) policy.
//! This crate implements the request lifecycle and the relationship store it
//! runs on; transport, authentication, and input-shape validation live in the
//! surrounding service.

pub mod friends;

pub use friends::FriendGraph;
