//! Friend-request lifecycle engine.
//!
//! [`FriendGraph`] orchestrates request creation, listing, approval,
//! rejection, and cancellation over the [`RelationStore`], consulting the
//! [`ExclusionPolicy`] selected at construction. Every operation re-reads
//! current state from the store; nothing is cached between calls.
//!
//! # Consistency Model
//!
//! Composite mutations (approval's two set-adds and two deletes, account
//! removal) have no cross-record transaction. Each sub-step is an
//! individually atomic, idempotent store primitive, so a partial failure
//! leaves a state that converges on retry instead of requiring repair.
//! Racing creates on the same ordered pair resolve through the uniqueness
//! constraint; racing approve/reject/cancel resolve by whichever delete
//! lands first, the loser observing `NotFound`.

use std::path::Path;

use log::{debug, info};
use rand::Rng;

use super::error::{FriendError, Result};
use super::identity;
use super::policy::ExclusionPolicy;
use super::profile::{self, FriendProfile};
use super::storage::{RelationStore, SetField};
use super::types::{ExclusionMode, FriendRequest, Page, User, MAX_PAGE_LIMIT, MAX_PROFILE_BATCH};

/// High-level API for the friendship graph.
///
/// Owns the relationship store and the exclusion policy. Constructed once
/// at startup; the surrounding service resolves the caller through
/// [`FriendGraph::resolve_caller`] and passes the returned [`User`] into
/// the mutating operations.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use kinship_core::friends::{ExclusionMode, FriendGraph};
///
/// let graph = FriendGraph::new(Path::new("/data/kinship"), ExclusionMode::MutualBlock)?;
/// let caller = graph.resolve_caller("alice@example.com")?;
/// graph.send_request(&caller, "target-public-id")?;
/// ```
pub struct FriendGraph {
    store: RelationStore,
    policy: ExclusionPolicy,
}

impl FriendGraph {
    /// Creates a new friend graph backed by `relations.db` under `data_dir`.
    ///
    /// Creates the directory and database if they don't exist. The
    /// exclusion mode is fixed for the lifetime of the instance.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    pub fn new(data_dir: &Path, mode: ExclusionMode) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| FriendError::Storage(format!("Failed to create data directory: {e}")))?;

        let store = RelationStore::new(&data_dir.join("relations.db"))?;
        Ok(Self {
            store,
            policy: ExclusionPolicy::new(mode),
        })
    }

    /// Creates a friend graph over an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory(mode: ExclusionMode) -> Result<Self> {
        Ok(Self {
            store: RelationStore::in_memory()?,
            policy: ExclusionPolicy::new(mode),
        })
    }

    /// The configured exclusion mode.
    #[must_use]
    pub const fn exclusion_mode(&self) -> ExclusionMode {
        self.policy.mode()
    }

    // ==================== Identity ====================

    /// Resolves an authenticated principal to its user record.
    ///
    /// Normalizes the principal (trim, lowercase) before lookup. A valid
    /// token with no matching record is an authenticated-but-unregistered
    /// caller and resolves to `Unauthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` when no user matches, or a storage error.
    pub fn resolve_caller(&self, principal: &str) -> Result<User> {
        let identity_ref = identity::normalize_principal(principal);
        self.store
            .find_user_by_identity_ref(&identity_ref)?
            .ok_or(FriendError::Unauthenticated(identity_ref))
    }

    /// Registers a new user for an authenticated principal.
    ///
    /// Generates the opaque `public_id` (16 random bytes, hex) and encodes
    /// the picture blob as base64 for storage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for an empty principal, `AlreadyRegistered`
    /// when the identity is already bound, or a storage error.
    pub fn register_user(
        &self,
        principal: &str,
        display_name: &str,
        picture: Option<&[u8]>,
    ) -> Result<User> {
        let identity_ref = identity::normalize_principal(principal);
        if identity_ref.is_empty() {
            return Err(FriendError::InvalidRequest(
                "identity must not be empty".to_string(),
            ));
        }

        let public_id = generate_public_id();
        let picture = picture
            .map(|bytes| base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes));
        let created_at = chrono::Utc::now().timestamp();

        let user = self.store.insert_user(
            &identity_ref,
            &public_id,
            display_name,
            picture.as_deref(),
            created_at,
        )?;

        info!("event=user_registered public_id={}", user.public_id);
        Ok(user)
    }

    /// Removes a user and drains their relationship state.
    ///
    /// Composed from idempotent primitives: pending requests in both
    /// directions, friendship links on both sides, and the user's own
    /// exclusion entries are removed before the record itself. Safe to
    /// retry after a partial failure.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub fn deregister(&self, user: &User) -> Result<()> {
        loop {
            let outgoing = self
                .store
                .requests_from(&user.public_id, Page::new(MAX_PAGE_LIMIT, 0))?;
            if outgoing.is_empty() {
                break;
            }
            for request in outgoing {
                self.store.delete_request(&request.from_id, &request.to_id)?;
            }
        }
        loop {
            let incoming = self
                .store
                .requests_to(&user.public_id, Page::new(MAX_PAGE_LIMIT, 0))?;
            if incoming.is_empty() {
                break;
            }
            for request in incoming {
                self.store.delete_request(&request.from_id, &request.to_id)?;
            }
        }

        for friend in self.store.links_of(&user.public_id, SetField::Friends)? {
            self.store
                .remove_link(&friend, SetField::Friends, &user.public_id)?;
            self.store
                .remove_link(&user.public_id, SetField::Friends, &friend)?;
        }
        for excluded in self.store.links_of(&user.public_id, SetField::Exclusions)? {
            self.store
                .remove_link(&user.public_id, SetField::Exclusions, &excluded)?;
        }

        self.store.delete_user(&user.public_id)?;
        info!("event=user_deregistered public_id={}", user.public_id);
        Ok(())
    }

    // ==================== Request Lifecycle ====================

    /// Creates a pending friend request from `requester` to a target.
    ///
    /// A reverse-direction request from the target may already exist; it is
    /// deliberately not rejected here. Both rows stand until either side
    /// approves, and approval cleans up both.
    ///
    /// # Errors
    ///
    /// Returns `SelfReference` when the target is the requester, `NotFound`
    /// for an unknown target, `Excluded` when the policy gates the pair,
    /// `AlreadyFriends` when already linked, or `DuplicateRequest` when the
    /// ordered pair already has a pending request.
    pub fn send_request(&self, requester: &User, target_public_id: &str) -> Result<FriendRequest> {
        if target_public_id == requester.public_id {
            return Err(FriendError::SelfReference);
        }

        let target = self
            .store
            .find_user_by_public_id(target_public_id)?
            .ok_or_else(|| FriendError::NotFound(format!("user: {target_public_id}")))?;

        self.check_exclusion(&requester.public_id, &target.public_id)?;

        if self
            .store
            .has_link(&requester.public_id, SetField::Friends, &target.public_id)?
        {
            return Err(FriendError::AlreadyFriends(target.public_id));
        }

        let request = self.store.insert_request(
            &requester.public_id,
            &target.public_id,
            chrono::Utc::now().timestamp(),
        )?;

        debug!(
            "event=request_created from={} to={}",
            request.from_id, request.to_id
        );
        Ok(request)
    }

    /// Lists pending requests addressed to `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store operation fails.
    pub fn incoming_requests(&self, user: &User, page: Page) -> Result<Vec<FriendRequest>> {
        self.store.requests_to(&user.public_id, page)
    }

    /// Lists pending requests sent by `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store operation fails.
    pub fn outgoing_requests(&self, user: &User, page: Page) -> Result<Vec<FriendRequest>> {
        self.store.requests_from(&user.public_id, page)
    }

    /// Approves the pending request from `from_public_id` to `approver`.
    ///
    /// On success both users appear in each other's friend sets and both
    /// direction requests between the pair are gone. The four sub-steps run
    /// set-adds first, deletes last; each is idempotent, so a retry after a
    /// partial failure converges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when approving one's own id, `NotFound`
    /// when the request or the requester record is missing, or `Excluded`
    /// when the policy gates the pair (a block added after the request was
    /// created still applies).
    pub fn approve_request(&self, approver: &User, from_public_id: &str) -> Result<()> {
        if from_public_id == approver.public_id {
            return Err(FriendError::InvalidRequest(
                "cannot approve a request from yourself".to_string(),
            ));
        }

        self.store
            .find_request(from_public_id, &approver.public_id)?
            .ok_or_else(|| {
                FriendError::NotFound(format!(
                    "friend request: {from_public_id} -> {}",
                    approver.public_id
                ))
            })?;

        // The requester may have been deleted between request and approval.
        let requester = self
            .store
            .find_user_by_public_id(from_public_id)?
            .ok_or_else(|| FriendError::NotFound(format!("user: {from_public_id}")))?;

        self.check_exclusion(&approver.public_id, &requester.public_id)?;

        self.store
            .add_link(&approver.public_id, SetField::Friends, &requester.public_id)?;
        self.store
            .add_link(&requester.public_id, SetField::Friends, &approver.public_id)?;
        self.store.delete_request(from_public_id, &approver.public_id)?;
        // Clear a crossed reverse-direction request too, if one exists
        self.store.delete_request(&approver.public_id, from_public_id)?;

        info!(
            "event=request_approved from={} to={}",
            from_public_id, approver.public_id
        );
        Ok(())
    }

    /// Rejects the pending request from `from_public_id` to `rejecter`.
    ///
    /// Leaves friendship state and any reverse-direction request untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no such request exists.
    pub fn reject_request(&self, rejecter: &User, from_public_id: &str) -> Result<()> {
        let removed = self
            .store
            .delete_request(from_public_id, &rejecter.public_id)?;
        if removed == 0 {
            return Err(FriendError::NotFound(format!(
                "friend request: {from_public_id} -> {}",
                rejecter.public_id
            )));
        }

        debug!(
            "event=request_rejected from={} to={}",
            from_public_id, rejecter.public_id
        );
        Ok(())
    }

    /// Cancels the pending request from `canceller` to `to_public_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no such request exists.
    pub fn cancel_request(&self, canceller: &User, to_public_id: &str) -> Result<()> {
        let removed = self
            .store
            .delete_request(&canceller.public_id, to_public_id)?;
        if removed == 0 {
            return Err(FriendError::NotFound(format!(
                "friend request: {} -> {to_public_id}",
                canceller.public_id
            )));
        }

        debug!(
            "event=request_cancelled from={} to={}",
            canceller.public_id, to_public_id
        );
        Ok(())
    }

    /// Removes the friendship between `user` and another user.
    ///
    /// Idempotent: succeeds even when the two were not friends.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the target is the caller itself.
    pub fn unfriend(&self, user: &User, other_public_id: &str) -> Result<()> {
        if other_public_id == user.public_id {
            return Err(FriendError::InvalidRequest(
                "cannot unfriend yourself".to_string(),
            ));
        }

        self.store
            .remove_link(&user.public_id, SetField::Friends, other_public_id)?;
        self.store
            .remove_link(other_public_id, SetField::Friends, &user.public_id)?;

        debug!(
            "event=unfriended a={} b={}",
            user.public_id, other_public_id
        );
        Ok(())
    }

    /// The sorted friend list of `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store operation fails.
    pub fn friends_of(&self, user: &User) -> Result<Vec<String>> {
        self.store.links_of(&user.public_id, SetField::Friends)
    }

    // ==================== Exclusions ====================

    /// Adds `other_public_id` to the caller's exclusion list.
    ///
    /// In the `MutualBlock` deployment this blocks interaction both ways;
    /// in `AvoidOnly` it only flags the caller's own profile projections.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for self-exclusion or `NotFound` for an
    /// unknown target.
    pub fn add_exclusion(&self, user: &User, other_public_id: &str) -> Result<()> {
        if other_public_id == user.public_id {
            return Err(FriendError::InvalidRequest(
                "cannot exclude yourself".to_string(),
            ));
        }

        self.store
            .find_user_by_public_id(other_public_id)?
            .ok_or_else(|| FriendError::NotFound(format!("user: {other_public_id}")))?;

        self.store
            .add_link(&user.public_id, SetField::Exclusions, other_public_id)?;

        debug!(
            "event=exclusion_added owner={} value={}",
            user.public_id, other_public_id
        );
        Ok(())
    }

    /// Removes `other_public_id` from the caller's exclusion list.
    ///
    /// Idempotent: succeeds even when no entry exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store operation fails.
    pub fn remove_exclusion(&self, user: &User, other_public_id: &str) -> Result<()> {
        self.store
            .remove_link(&user.public_id, SetField::Exclusions, other_public_id)?;
        Ok(())
    }

    // ==================== Profiles ====================

    /// Projects a single user for `viewer`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown subject.
    pub fn profile(&self, viewer: &User, subject_public_id: &str) -> Result<FriendProfile> {
        let subject = self
            .store
            .find_user_by_public_id(subject_public_id)?
            .ok_or_else(|| FriendError::NotFound(format!("user: {subject_public_id}")))?;

        let excluded = self.store.has_link(
            &viewer.public_id,
            SetField::Exclusions,
            &subject.public_id,
        )?;
        Ok(profile::project(&subject, excluded))
    }

    /// Projects a batch of users for `viewer`.
    ///
    /// Unknown ids are silently omitted; at most the first
    /// [`MAX_PROFILE_BATCH`] ids are considered.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub fn profiles(&self, viewer: &User, public_ids: &[String]) -> Result<Vec<FriendProfile>> {
        let mut projections = Vec::with_capacity(public_ids.len().min(MAX_PROFILE_BATCH));

        for public_id in public_ids.iter().take(MAX_PROFILE_BATCH) {
            if let Some(subject) = self.store.find_user_by_public_id(public_id)? {
                let excluded = self.store.has_link(
                    &viewer.public_id,
                    SetField::Exclusions,
                    &subject.public_id,
                )?;
                projections.push(profile::project(&subject, excluded));
            }
        }

        Ok(projections)
    }

    /// Fails with `Excluded` when the policy gates the pair.
    fn check_exclusion(&self, a_public_id: &str, b_public_id: &str) -> Result<()> {
        if !self.policy.gates_requests() {
            return Ok(());
        }

        let a_excludes_b = self
            .store
            .has_link(a_public_id, SetField::Exclusions, b_public_id)?;
        let b_excludes_a = self
            .store
            .has_link(b_public_id, SetField::Exclusions, a_public_id)?;

        if self.policy.excludes(a_excludes_b, b_excludes_a) {
            return Err(FriendError::Excluded);
        }
        Ok(())
    }
}

/// Generates an opaque public handle: 16 random bytes, hex-encoded.
fn generate_public_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}
