//! Reactive authentication state derived from the wrapped client.
//!
//! `AuthState` is the single source of truth for `is_loading`,
//! `is_authenticated`, `user` and `id_token_claims`. One background task owns
//! the derivation:
//!
//! 1. wait until loading has finished,
//! 2. query the client once,
//! 3. query again for every refresh request and every access token that
//!    differs from the previous one.
//!
//! Queries run strictly one after another, so a slow recomputation can never
//! overwrite the result of a later one. The client's `is_authenticated` can lag
//! right after a token refresh; whatever the most recent query returns is
//! published as is.

use crate::client::auth_client::{AuthClient, SharedAuthClient};
use crate::client::claims::IdTokenClaims;
use crate::client::error_channel::{ErrorChannel, replay_then_live};
use crate::error::AuthError;
use crate::user::User;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt, wrappers::WatchStream};

const SNAPSHOT_CAPACITY: usize = 64;

/// Result of one recomputation, published atomically.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthSnapshot {
    pub is_authenticated: bool,
    /// `None` whenever `is_authenticated` is false
    pub user: Option<User>,
    /// `None` whenever `is_authenticated` is false
    pub id_token_claims: Option<IdTokenClaims>,
}

#[derive(Debug)]
enum Trigger {
    Refresh,
    AccessToken(String),
}

#[derive(Debug)]
struct Queued {
    trigger: Trigger,
    /// Sent before loading finished; the initial check already covers it
    while_loading: bool,
}

struct Shared {
    client: SharedAuthClient,
    errors: ErrorChannel,
    is_loading: watch::Sender<bool>,
    /// Latest snapshot, for replay and point reads
    snapshot: watch::Sender<Option<Arc<AuthSnapshot>>>,
    /// Every snapshot, so back-to-back recomputations are not merged
    updates: broadcast::Sender<Arc<AuthSnapshot>>,
    disposed: AtomicBool,
}

/// Coordinator of the derived authentication state.
///
/// Must be created inside a Tokio runtime; the derivation task is spawned on
/// construction and aborted by [`dispose`](Self::dispose) or on drop.
pub struct AuthState {
    shared: Arc<Shared>,
    triggers: mpsc::UnboundedSender<Queued>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AuthState {
    pub fn new(client: SharedAuthClient, errors: ErrorChannel) -> Self {
        let (is_loading, _) = watch::channel(true);
        let (snapshot, _) = watch::channel(None);
        let (updates, _) = broadcast::channel(SNAPSHOT_CAPACITY);
        let shared = Arc::new(Shared {
            client,
            errors,
            is_loading,
            snapshot,
            updates,
            disposed: AtomicBool::new(false),
        });

        let (triggers, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(Arc::clone(&shared), receiver));

        Self {
            shared,
            triggers,
            task: Mutex::new(Some(task)),
        }
    }

    /// `true` until the initial session check finished, then `false` for good.
    pub fn is_loading(&self) -> impl Stream<Item = bool> + Send + 'static {
        WatchStream::new(self.shared.is_loading.subscribe())
    }

    /// Authentication status; nothing is emitted while loading and consecutive
    /// duplicates are dropped.
    pub fn is_authenticated(&self) -> impl Stream<Item = bool> + Send + 'static {
        let mut last = None;
        self.snapshots().filter_map(move |snapshot| {
            let value = snapshot.is_authenticated;
            if last == Some(value) {
                return None;
            }
            last = Some(value);
            Some(value)
        })
    }

    /// User profile, re-emitted after every recomputation.
    pub fn user(&self) -> impl Stream<Item = Option<User>> + Send + 'static {
        self.snapshots().map(|snapshot| snapshot.user.clone())
    }

    /// ID token claims, re-emitted after every recomputation.
    pub fn id_token_claims(&self) -> impl Stream<Item = Option<IdTokenClaims>> + Send + 'static {
        self.snapshots().map(|snapshot| snapshot.id_token_claims.clone())
    }

    /// Latest snapshot if any, then every later one.
    fn snapshots(&self) -> impl Stream<Item = Arc<AuthSnapshot>> + Send + 'static {
        // Publication holds the watch lock while broadcasting, so reading the
        // latest value and subscribing under the read lock neither loses nor
        // repeats a snapshot
        let current = self.shared.snapshot.borrow();
        let live = self.shared.updates.subscribe();
        let latest = current.clone();
        drop(current);
        replay_then_live(latest, live)
    }

    pub fn error(&self) -> impl Stream<Item = AuthError> + Send + 'static {
        self.shared.errors.subscribe()
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.shared.errors
    }

    pub fn is_loading_now(&self) -> bool {
        *self.shared.is_loading.borrow()
    }

    /// Latest published snapshot, `None` while loading.
    pub fn snapshot(&self) -> Option<AuthSnapshot> {
        self.shared.snapshot.borrow().as_deref().cloned()
    }

    pub fn current_user(&self) -> Option<User> {
        self.snapshot().and_then(|s| s.user)
    }

    pub fn current_id_token_claims(&self) -> Option<IdTokenClaims> {
        self.snapshot().and_then(|s| s.id_token_claims)
    }

    /// Resolves once loading has finished. Never resolves if the state is
    /// disposed first.
    pub async fn wait_until_loaded(&self) {
        let mut is_loading = self.shared.is_loading.subscribe();
        if is_loading.wait_for(|loading| !*loading).await.is_err() {
            tracing::trace!("Auth state dropped while loading");
        }
    }

    /// First authentication status available after loading.
    ///
    /// Resolves to the last published status, or `false` if the state is
    /// disposed before anything was published.
    pub async fn authenticated(&self) -> bool {
        let mut snapshot = self.shared.snapshot.subscribe();
        let disposed = &self.shared.disposed;
        match snapshot
            .wait_for(|current| current.is_some() || disposed.load(Ordering::SeqCst))
            .await
        {
            Ok(current) => current.as_ref().is_some_and(|s| s.is_authenticated),
            Err(_) => false,
        }
    }

    /// Marks loading as finished when `is_loading` is false.
    ///
    /// Loading never goes back to `true`; such calls are ignored, as is any
    /// call after disposal.
    pub fn set_is_loading(&self, is_loading: bool) {
        if self.shared.disposed.load(Ordering::SeqCst) {
            tracing::trace!("Ignoring loading update on disposed auth state");
            return;
        }
        if is_loading {
            if !self.is_loading_now() {
                tracing::warn!("Ignoring request to re-enter loading state");
            }
            return;
        }

        let disposed = &self.shared.disposed;
        let finished = self.shared.is_loading.send_if_modified(|loading| {
            if disposed.load(Ordering::SeqCst) {
                return false;
            }
            let was_loading = *loading;
            *loading = false;
            was_loading
        });
        if finished {
            tracing::trace!("Authentication state finished loading");
        }
    }

    /// Feeds a freshly obtained access token; only a token different from the
    /// previous one triggers a recomputation.
    pub fn set_access_token(&self, access_token: impl Into<String>) {
        self.send(Trigger::AccessToken(access_token.into()));
    }

    /// Forces a recomputation.
    pub fn refresh(&self) {
        self.send(Trigger::Refresh);
    }

    /// Records `error` unless the state is disposed.
    pub fn set_error(&self, error: AuthError) {
        if self.shared.disposed.load(Ordering::SeqCst) {
            tracing::debug!("Ignoring error on disposed auth state: {}", error);
            return;
        }
        self.shared.errors.record(error);
    }

    /// Stops the derivation task. State already published stays readable but
    /// never changes again.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::trace!("Disposing authentication state");
        self.shared.errors.close();

        // Waits out a publication already holding either lock; later ones see
        // the flag. The snapshot notification wakes `authenticated` waiters.
        self.shared.is_loading.send_if_modified(|_| false);
        self.shared.snapshot.send_modify(|_| {});

        let task = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            task.abort();
        }
    }

    fn send(&self, trigger: Trigger) {
        if self.shared.disposed.load(Ordering::SeqCst) {
            tracing::trace!("Auth state disposed, dropping trigger");
            return;
        }
        let queued = Queued {
            trigger,
            while_loading: self.is_loading_now(),
        };
        if self.triggers.send(queued).is_err() {
            tracing::trace!("Auth state task has stopped, dropping trigger");
        }
    }
}

impl Drop for AuthState {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn run(shared: Arc<Shared>, mut triggers: mpsc::UnboundedReceiver<Queued>) {
    let mut is_loading = shared.is_loading.subscribe();
    let loaded = is_loading.wait_for(|loading| !*loading).await.is_ok();
    if !loaded {
        return;
    }

    shared.recompute().await;

    let mut last_token: Option<String> = None;
    while let Some(Queued {
        trigger,
        while_loading,
    }) = triggers.recv().await
    {
        match trigger {
            Trigger::Refresh => {
                if while_loading {
                    continue;
                }
                tracing::trace!("Refresh requested");
            }
            Trigger::AccessToken(token) => {
                let changed = last_token.as_deref() != Some(token.as_str());
                last_token = Some(token);
                if while_loading || !changed {
                    continue;
                }
                tracing::trace!("Access token changed");
            }
        }
        shared.recompute().await;
    }
}

impl Shared {
    async fn recompute(&self) {
        let snapshot = match self.client.get() {
            Ok(client) => self.query(client.as_ref()).await,
            Err(error) => {
                tracing::error!("Cannot derive authentication state: {}", error);
                self.errors.record(error);
                AuthSnapshot::default()
            }
        };

        let snapshot = Arc::new(snapshot);
        let published = self.snapshot.send_if_modified(|current| {
            if self.disposed.load(Ordering::SeqCst) {
                return false;
            }
            *current = Some(Arc::clone(&snapshot));
            // No subscribers yet is fine, the watch keeps the value for replay
            let _ = self.updates.send(Arc::clone(&snapshot));
            true
        });
        if published {
            tracing::trace!(
                "Published authentication state: authenticated={}, user={:?}",
                snapshot.is_authenticated,
                snapshot.user.as_ref().map(|u| u.sub.as_str())
            );
        }
    }

    async fn query(&self, client: &dyn AuthClient) -> AuthSnapshot {
        let is_authenticated = client.is_authenticated().await.unwrap_or_else(|error| {
            tracing::warn!("is_authenticated query failed: {}", error);
            self.errors.record(error);
            false
        });
        if !is_authenticated {
            return AuthSnapshot::default();
        }

        let user = client.get_user().await.unwrap_or_else(|error| {
            tracing::warn!("get_user query failed: {}", error);
            self.errors.record(error);
            None
        });
        let id_token_claims = client.get_id_token_claims().await.unwrap_or_else(|error| {
            tracing::warn!("get_id_token_claims query failed: {}", error);
            self.errors.record(error);
            None
        });

        AuthSnapshot {
            is_authenticated,
            user,
            id_token_claims,
        }
    }
}
