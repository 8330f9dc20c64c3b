//! Session runtime executor

use super::{DispatchError, SessionCommand, SseEvent};

use crate::catalog::Building;
use crate::ledger::{Faction, Ledger, LedgerError};
use crate::state_machine::{Effect, Event, Session, SessionState};
use crate::view::{Reply, View, GENERIC_ERROR};
use chrono::Utc;
use std::collections::VecDeque;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};

/// Actor driving one session: applies presses and timeouts, executes effects
pub struct SessionRuntime<L>
where
    L: Ledger + 'static,
{
    session: Session,
    ledger: L,
    command_rx: mpsc::Receiver<SessionCommand>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    /// When the current state expires
    deadline: Option<Instant>,
    closed: bool,
}

impl<L> SessionRuntime<L>
where
    L: Ledger + 'static,
{
    pub fn new(
        session: Session,
        ledger: L,
        command_rx: mpsc::Receiver<SessionCommand>,
        broadcast_tx: broadcast::Sender<SseEvent>,
    ) -> Self {
        let deadline = session
            .state()
            .timeout(&session.context().config)
            .map(|t| Instant::now() + t);
        Self {
            session,
            ledger,
            command_rx,
            broadcast_tx,
            deadline,
            closed: false,
        }
    }

    pub async fn run(mut self) {
        tracing::debug!(session_id = %self.session.id(), "Starting session runtime");

        while !self.closed {
            let deadline = self.deadline;
            let expiry = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(SessionCommand::Action { actor_id, event, reply }) => {
                        let outcome = self.handle_action(&actor_id, event).await;
                        let _ = reply.send(outcome);
                    }
                    None => break,
                },
                () = expiry => self.expire().await,
            }
        }

        let _ = self.broadcast_tx.send(SseEvent::Closed {
            state: self.session.state().clone(),
        });
        let lifetime = Utc::now() - self.session.context().created_at;
        tracing::debug!(
            session_id = %self.session.id(),
            state = self.session.state().name(),
            lifetime_ms = lifetime.num_milliseconds(),
            "Session runtime stopped"
        );
    }

    async fn handle_action(
        &mut self,
        actor_id: &str,
        event: Event,
    ) -> Result<Reply, DispatchError> {
        if actor_id != self.session.owner_id() {
            tracing::debug!(
                session_id = %self.session.id(),
                actor_id = %actor_id,
                "Rejected press from non-owner"
            );
            return Err(DispatchError::NotOwner);
        }

        let before = self.session.state().clone();
        let result = self.session.apply(event);

        // Browsing counts inactivity from the last press; other states keep
        // the deadline they were entered with
        let changed = *self.session.state() != before;
        if changed || matches!(self.session.state(), SessionState::Browsing { .. }) {
            self.reset_deadline();
        }

        let effects = result?;
        Ok(match self.run_effects(effects).await {
            Some(view) => Reply::Update { view },
            None => Reply::Deferred,
        })
    }

    async fn expire(&mut self) {
        self.deadline = None;
        match self.session.apply(Event::Timeout) {
            Ok(effects) => {
                tracing::info!(session_id = %self.session.id(), "Session timed out");
                self.run_effects(effects).await;
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session.id(),
                    error = %e,
                    "Timeout not applicable"
                );
                self.closed = true;
            }
        }
    }

    /// Execute effects in order, feeding ledger outcomes back into the
    /// session. Returns the last view rendered.
    async fn run_effects(&mut self, effects: Vec<Effect>) -> Option<View> {
        let mut queue: VecDeque<Effect> = effects.into();
        let mut rendered = None;

        while let Some(effect) = queue.pop_front() {
            let outcome = match effect {
                Effect::Render { view } => {
                    rendered = Some(self.render(view));
                    continue;
                }
                Effect::Close => {
                    self.closed = true;
                    self.deadline = None;
                    continue;
                }
                Effect::CommitConstruction { building } => self.commit(&building).await,
                Effect::SetFaction { faction } => self.set_faction(faction).await,
            };

            match self.session.apply(outcome) {
                Ok(more) => queue.extend(more),
                Err(e) => {
                    tracing::error!(
                        session_id = %self.session.id(),
                        error = %e,
                        "Ledger outcome not applicable"
                    );
                    self.closed = true;
                }
            }
        }
        rendered
    }

    async fn commit(&self, building: &Building) -> Event {
        let owner = self.session.owner_id();
        match self.ledger.commit_construction(owner, building).await {
            Ok(()) => {
                tracing::info!(
                    session_id = %self.session.id(),
                    user_id = %owner,
                    building = %building.name,
                    "Building constructed"
                );
                Event::WriteSucceeded
            }
            Err(e @ (LedgerError::Insufficient { .. } | LedgerError::AlreadyOwned(_))) => {
                tracing::info!(
                    session_id = %self.session.id(),
                    building = %building.name,
                    reason = %e,
                    "Construction refused at commit"
                );
                Event::WriteFailed {
                    reason: e.to_string(),
                }
            }
            Err(e) => self.write_error("construction", &e),
        }
    }

    async fn set_faction(&self, faction: Faction) -> Event {
        let owner = self.session.owner_id();
        // Another menu may have recorded a faction since this one opened
        let current = match self.ledger.find_profile(owner).await {
            Ok(Some(profile)) => profile.faction,
            Ok(None) => {
                return Event::WriteFailed {
                    reason: "Please begin your Legion by using the `/start` command first!"
                        .to_string(),
                }
            }
            Err(e) => return self.write_error("faction", &e),
        };
        if current.is_some() {
            return Event::WriteFailed {
                reason: "You have already chosen your faction!".to_string(),
            };
        }

        match self.ledger.set_faction(owner, faction).await {
            Ok(()) => {
                tracing::info!(
                    session_id = %self.session.id(),
                    user_id = %owner,
                    faction = faction.display_name(),
                    "Faction chosen"
                );
                Event::WriteSucceeded
            }
            Err(e) => self.write_error("faction", &e),
        }
    }

    fn write_error(&self, write: &'static str, error: &LedgerError) -> Event {
        tracing::error!(
            session_id = %self.session.id(),
            write,
            error = %error,
            "Ledger write failed"
        );
        Event::WriteFailed {
            reason: GENERIC_ERROR.to_string(),
        }
    }

    fn render(&self, view: View) -> View {
        let _ = self.broadcast_tx.send(SseEvent::View {
            view: view.clone(),
            state: self.session.state().clone(),
        });
        view
    }

    fn reset_deadline(&mut self) {
        self.deadline = self
            .session
            .state()
            .timeout(&self.session.context().config)
            .map(|t| Instant::now() + t);
    }
}
