//! Runtime for interactive construction sessions
//!
//! Every session is one actor task. Button presses reach it by session id
//! through the table kept here; the actor owns the state and is the only
//! writer, so presses on one session are handled strictly in order.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::catalog::{Catalog, Emojis};
use crate::config::SessionConfig;
use crate::ledger::{Ledger, Resources};
use crate::state_machine::{Effect, Event, Session, SessionContext, SessionState, TransitionError};
use crate::view::{Reply, View};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

pub type SessionTable = Arc<RwLock<HashMap<String, SessionHandle>>>;

/// Why a button press was not applied
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("This interaction is no longer active.")]
    NotFound(String),
    /// Anyone but the owner pressed a session's buttons
    #[error("You can't use these buttons!")]
    NotOwner,
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error(transparent)]
    Rejected(#[from] TransitionError),
}

/// Messages accepted by a session actor
#[derive(Debug)]
pub enum SessionCommand {
    Action {
        actor_id: String,
        event: Event,
        reply: oneshot::Sender<Result<Reply, DispatchError>>,
    },
}

/// Handle to interact with a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub command_tx: mpsc::Sender<SessionCommand>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    /// The session's message now shows this view
    View { view: View, state: SessionState },
    /// The session ended; no further views follow
    Closed { state: SessionState },
}

/// Manager for all live sessions
pub struct SessionManager {
    ledger: Arc<dyn Ledger>,
    catalog: Arc<Catalog>,
    emojis: Arc<Emojis>,
    config: SessionConfig,
    sessions: SessionTable,
}

impl SessionManager {
    pub fn new(ledger: Arc<dyn Ledger>, catalog: Arc<Catalog>, emojis: Arc<Emojis>) -> Self {
        Self {
            ledger,
            catalog,
            emojis,
            config: SessionConfig::default(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn emojis(&self) -> &Arc<Emojis> {
        &self.emojis
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Start a session for `owner_id` and return its id and first view.
    ///
    /// `snapshot` and `owned` are the owner's balances and buildings at
    /// start; every requirement check in the session runs against them.
    pub async fn start_build_session(
        &self,
        owner_id: &str,
        snapshot: Resources,
        owned: impl IntoIterator<Item = u32>,
    ) -> (String, View) {
        let context = self
            .context(owner_id, snapshot)
            .with_owned(owned)
            .with_emojis(self.emojis.clone());
        self.launch(Session::start(context)).await
    }

    /// Start a faction menu only `owner_id` may answer
    pub async fn start_faction_menu(&self, owner_id: &str) -> (String, View) {
        let context = self.context(owner_id, Resources::default());
        self.launch(Session::start_faction_menu(context)).await
    }

    fn context(&self, owner_id: &str, snapshot: Resources) -> SessionContext {
        let session_id = uuid::Uuid::new_v4().to_string();
        SessionContext::new(session_id, owner_id, self.catalog.clone(), snapshot)
            .with_config(self.config)
    }

    async fn launch(&self, (session, effects): (Session, Vec<Effect>)) -> (String, View) {
        let session_id = session.id().to_string();
        let owner_id = session.owner_id().to_string();
        let kind = session.state().name();
        let view = effects
            .into_iter()
            .find_map(|effect| match effect {
                Effect::Render { view } => Some(view),
                _ => None,
            })
            .unwrap_or_default();

        let (command_tx, command_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(64);

        let runtime =
            SessionRuntime::new(session, self.ledger.clone(), command_rx, broadcast_tx.clone());

        // Insert before spawning so the runtime's removal always finds it
        self.sessions.write().await.insert(
            session_id.clone(),
            SessionHandle {
                command_tx,
                broadcast_tx,
            },
        );

        let sessions = self.sessions.clone();
        let id = session_id.clone();
        tokio::spawn(async move {
            if AssertUnwindSafe(runtime.run()).catch_unwind().await.is_err() {
                tracing::error!(session_id = %id, "Session runtime panicked");
            }
            sessions.write().await.remove(&id);
            tracing::debug!(session_id = %id, "Session reclaimed");
        });

        tracing::info!(session_id = %session_id, owner_id = %owner_id, kind, "Session started");
        (session_id, view)
    }

    /// Route a button press to its session and wait for the answer
    pub async fn dispatch(
        &self,
        session_id: &str,
        actor_id: &str,
        action: &str,
    ) -> Result<Reply, DispatchError> {
        let event = Event::from_action(action)
            .ok_or_else(|| DispatchError::UnknownAction(action.to_string()))?;
        let handle = self.handle(session_id).await?;

        let (reply_tx, reply_rx) = oneshot::channel();
        handle
            .command_tx
            .send(SessionCommand::Action {
                actor_id: actor_id.to_string(),
                event,
                reply: reply_tx,
            })
            .await
            .map_err(|_| DispatchError::NotFound(session_id.to_string()))?;

        // A session that closes with the press still queued drops the sender
        reply_rx
            .await
            .map_err(|_| DispatchError::NotFound(session_id.to_string()))?
    }

    /// Subscribe to a session's view updates
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<broadcast::Receiver<SseEvent>, DispatchError> {
        Ok(self.handle(session_id).await?.broadcast_tx.subscribe())
    }

    /// Number of sessions still holding a table entry
    #[cfg(test)]
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn handle(&self, session_id: &str) -> Result<SessionHandle, DispatchError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| DispatchError::NotFound(session_id.to_string()))
    }
}
