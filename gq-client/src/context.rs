//! Client global context

pub mod session;

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use derivative::Derivative;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::model::Claims;
use crate::model::token::{self, AuthToken};
use crate::storage::{self, TOKEN_KEY, TokenStorage};
pub use session::{Action, Session};

/// Callback invoked on every session change
pub type Listener = Arc<dyn Fn(&Session) + Send + Sync>;

/// Handle of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(Uuid);

#[derive(Derivative)]
#[derivative(Debug)]
struct SessionStoreInner {
    /// Token storage
    #[derivative(Debug = "ignore")]
    storage: Arc<dyn TokenStorage>,
    /// Current state
    session: Mutex<Session>,
    /// Change listeners in registration order
    #[derivative(Debug = "ignore")]
    listeners: Mutex<Vec<(Subscription, Listener)>>,
    /// Transitions not yet delivered to listeners
    notifications: Mutex<Notifications>,
}

/// Queue of session transitions waiting for delivery
#[derive(Debug, Default)]
struct Notifications {
    pending: VecDeque<Session>,
    /// Some call is already delivering the queue
    draining: bool,
}

/// Owner of the session state and of the stored token
///
/// Mutations are persisted before the state changes. Listeners are called synchronously after
/// the mutation, before `login`/`logout` returns. Every transition is delivered to all the
/// listeners in the order the transitions happened; a mutation made by a listener is delivered
/// once the current transition reached every listener.
#[derive(Debug, Clone)]
pub struct SessionStore(Arc<SessionStoreInner>);

impl SessionStore {
    /// Creates the store restoring the session from the storage
    pub fn initialize(storage: Arc<dyn TokenStorage>) -> Result<Self, storage::Error> {
        Self::initialize_at(storage, Utc::now())
    }

    /// Creates the store restoring the session from the storage, as if it happened at `now`.
    ///
    /// Malformed and expired tokens are removed from the storage, starting an anonymous session.
    #[instrument(skip(storage))]
    pub fn initialize_at(
        storage: Arc<dyn TokenStorage>,
        now: DateTime<Utc>,
    ) -> Result<Self, storage::Error> {
        let stored = match storage.get(TOKEN_KEY) {
            Ok(token) => token,
            Err(err @ storage::Error::Corrupted { .. }) => {
                warn!(%err, "Stored token is corrupted, removing");
                storage.remove(TOKEN_KEY)?;
                None
            }
            Err(err) => return Err(err),
        };

        let session = match stored {
            None => Session::Anonymous,
            Some(token) => match AuthToken::from(token).validate_at(now) {
                Ok(claims) => {
                    info!(sub = ?claims.subject(), "Session restored");
                    Session::Authenticated(claims)
                }
                Err(token::Error::Expired { expired_at, .. }) => {
                    info!(expired_at, "Stored token expired, removing");
                    storage.remove(TOKEN_KEY)?;
                    Session::Anonymous
                }
                Err(err @ token::Error::Malformed(_)) => {
                    warn!(%err, "Stored token is malformed, removing");
                    storage.remove(TOKEN_KEY)?;
                    Session::Anonymous
                }
            },
        };

        Ok(Self(Arc::new(SessionStoreInner {
            storage,
            session: Mutex::new(session),
            listeners: Mutex::new(Vec::new()),
            notifications: Mutex::default(),
        })))
    }

    /// Current session snapshot
    pub fn session(&self) -> Session {
        self.0.session.lock().clone()
    }

    /// Currently logged in user
    pub fn user(&self) -> Option<Claims> {
        self.0.session.lock().user().cloned()
    }

    /// Logs the user in, storing their token
    #[instrument(skip_all, fields(sub = ?claims.subject()))]
    pub fn login(&self, claims: Claims, token: impl Into<AuthToken>) -> Result<(), storage::Error> {
        let token = token.into();
        self.dispatch(Action::Login { claims }, |storage| {
            storage.set(TOKEN_KEY, token.as_str())
        })
    }

    /// Logs the user out, removing the stored token
    #[instrument(skip_all)]
    pub fn logout(&self) -> Result<(), storage::Error> {
        self.dispatch(Action::Logout, |storage| storage.remove(TOKEN_KEY))
    }

    /// Registers a change listener
    pub fn subscribe(&self, listener: impl Fn(&Session) + Send + Sync + 'static) -> Subscription {
        let subscription = Subscription(Uuid::new_v4());
        self.0
            .listeners
            .lock()
            .push((subscription, Arc::new(listener)));
        subscription
    }

    /// Removes a change listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut listeners = self.0.listeners.lock();
        let len = listeners.len();
        listeners.retain(|(id, _)| *id != subscription);
        listeners.len() != len
    }

    /// Persists the change and applies the action
    ///
    /// State is not modified if persisting fails.
    fn dispatch(
        &self,
        action: Action,
        persist: impl FnOnce(&dyn TokenStorage) -> Result<(), storage::Error>,
    ) -> Result<(), storage::Error> {
        let changed = {
            let mut session = self.0.session.lock();
            persist(self.0.storage.as_ref())?;

            let next = session.clone().reduce(action);
            if next == *session {
                None
            } else {
                *session = next.clone();
                Some(next)
            }
        };

        match changed {
            Some(session) => {
                debug!(authenticated = session.is_authenticated(), "Session changed");
                self.notify(session);
            }
            None => debug!("Session unchanged"),
        }

        Ok(())
    }

    /// Queues the transition and delivers the queue unless a delivery is already in progress
    fn notify(&self, session: Session) {
        {
            let mut notifications = self.0.notifications.lock();
            notifications.pending.push_back(session);
            if notifications.draining {
                return;
            }
            notifications.draining = true;
        }

        loop {
            let session = {
                let mut notifications = self.0.notifications.lock();
                match notifications.pending.pop_front() {
                    Some(session) => session,
                    None => {
                        notifications.draining = false;
                        return;
                    }
                }
            };

            // Listeners are called without the locks, so they can use the store
            let listeners: Vec<_> = self
                .0
                .listeners
                .lock()
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect();

            for listener in listeners {
                listener(&session);
            }
        }
    }
}
