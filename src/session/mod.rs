//! Who is signed in, persisted across runs.
//!
//! [`SessionStore`] is constructed once by the application root and shared as an
//! `Arc`. Identity and tokens are always set and cleared together, both in memory
//! and in the three durable slots.

pub mod guard;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::ClinicApi;
use crate::api::models::{Credentials, Identity, SessionTokens};
use crate::db::{Slot, SlotStore};
use crate::error::{ClinicError, Result, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Session {
    identity: Identity,
    tokens: Option<SessionTokens>,
}

pub struct SessionStore<S> {
    slots: S,
    current: RwLock<Option<Session>>,
    // Bumped by every logout; a login that started under an older epoch is discarded.
    epoch: AtomicU64,
    commit: Mutex<()>,
}

impl<S: SlotStore> SessionStore<S> {
    pub fn new(slots: S) -> Self {
        Self {
            slots,
            current: RwLock::new(None),
            epoch: AtomicU64::new(0),
            commit: Mutex::new(()),
        }
    }

    /// Picks up whatever identity a previous run left behind. Never touches the network.
    pub async fn restore(&self) {
        let restored = match self.read_persisted().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Ignoring unreadable persisted session: {e}");
                None
            }
        };

        if let Some(session) = &restored {
            info!(username = %session.identity.username, "restored session");
        }
        self.set_current(restored);
    }

    async fn read_persisted(&self) -> std::result::Result<Option<Session>, StoreError> {
        let Some(raw) = self.slots.read(Slot::Identity).await? else {
            return Ok(None);
        };
        let identity: Identity = serde_json::from_str(&raw)?;

        let access = self.slots.read(Slot::AccessToken).await?;
        let refresh = self.slots.read(Slot::RefreshToken).await?;
        let tokens = access.map(|access| SessionTokens {
            access,
            refresh: refresh.unwrap_or_default(),
        });

        Ok(Some(Session { identity, tokens }))
    }

    /// Authenticates against the API and, on success, persists and adopts the session.
    ///
    /// On failure nothing is written and the current session is untouched.
    pub async fn login<A>(&self, api: &A, credentials: &Credentials) -> Result<Identity>
    where
        A: ClinicApi + ?Sized,
    {
        let started_in = self.epoch.load(Ordering::SeqCst);
        let grant = api.obtain_token(credentials).await?;

        let _commit = self.commit.lock().await;
        if self.epoch.load(Ordering::SeqCst) != started_in {
            warn!(username = %credentials.username, "discarding login that finished after a logout");
            return Err(ClinicError::LoginSuperseded);
        }

        let (tokens, identity) = grant.into_parts();
        let serialized = serde_json::to_string(&identity).map_err(StoreError::from)?;
        self.slots
            .write_all(&[
                (Slot::AccessToken, tokens.access.clone()),
                (Slot::RefreshToken, tokens.refresh.clone()),
                (Slot::Identity, serialized),
            ])
            .await?;

        self.set_current(Some(Session {
            identity: identity.clone(),
            tokens: Some(tokens),
        }));
        info!(username = %identity.username, role = %identity.role, "logged in");

        Ok(identity)
    }

    /// Forgets the session in memory and in storage. Always succeeds from the caller's view.
    pub async fn logout(&self) {
        let _commit = self.commit.lock().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let previous = self.take_current();
        if let Err(e) = self.slots.clear_all(&Slot::ALL).await {
            warn!("Failed to clear persisted session: {e}");
        }

        if let Some(session) = previous {
            info!(username = %session.identity.username, "logged out");
        }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.read_current(|s| s.identity.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_current(|_| ()).is_some()
    }

    /// Bearer token for authorized calls, if any.
    pub fn access_token(&self) -> Option<String> {
        self.read_current(|s| s.tokens.as_ref().map(|t| t.access.clone()))
            .flatten()
    }

    fn read_current<T>(&self, f: impl FnOnce(&Session) -> T) -> Option<T> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        current.as_ref().map(f)
    }

    fn set_current(&self, session: Option<Session>) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = session;
    }

    fn take_current(&self) -> Option<Session> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.take()
    }
}
