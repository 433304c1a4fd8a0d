//! # Game Session
//!
//! Runs a [`Game`] inside one tokio task that owns it outright.
//!
//! Hosts talk to the task through a cloneable [`SessionHandle`]: every request
//! is a message on an mpsc channel and every answer comes back on a oneshot
//! channel. Requests are handled one at a time in arrival order, so two steps
//! never overlap and a snapshot never sees a half-finished tick.

use crate::{codec, Action, DelveError, DelveResult, Direction, Game, GameEvent, GameSnapshot, ObjectId};
use log::{debug, info};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Pending requests a session buffers before senders have to wait.
const COMMAND_BUFFER: usize = 64;

/// Requests understood by the session task.
enum SessionCommand {
    SubmitAction {
        action: Action,
        reply: oneshot::Sender<DelveResult<()>>,
    },
    LegalDirections {
        actor: ObjectId,
        reply: oneshot::Sender<Vec<Direction>>,
    },
    Step {
        reply: oneshot::Sender<DelveResult<Vec<GameEvent>>>,
    },
    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    Serialize {
        reply: oneshot::Sender<Vec<u8>>,
    },
    Shutdown {
        reply: oneshot::Sender<Game>,
    },
}

/// Entry point for starting session tasks.
pub struct GameSession;

impl GameSession {
    /// Moves `game` into a new task and returns a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(game: Game) -> SessionHandle {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run(game, receiver));
        SessionHandle {
            sender,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }
}

async fn run(mut game: Game, mut receiver: mpsc::Receiver<SessionCommand>) -> Option<Game> {
    info!("Game session started");
    while let Some(command) = receiver.recv().await {
        match command {
            SessionCommand::SubmitAction { action, reply } => {
                let _ = reply.send(game.submit_action(action));
            }
            SessionCommand::LegalDirections { actor, reply } => {
                let _ = reply.send(game.legal_directions(actor));
            }
            SessionCommand::Step { reply } => {
                let result = game.step();
                debug!("Session finished turn {}", game.turn_number());
                let _ = reply.send(result);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(game.snapshot());
            }
            SessionCommand::Serialize { reply } => {
                let _ = reply.send(codec::serialize(game.map()));
            }
            SessionCommand::Shutdown { reply } => {
                info!("Game session shutting down after {} turns", game.turn_number());
                return match reply.send(game) {
                    Ok(()) => None,
                    Err(game) => Some(game),
                };
            }
        }
    }
    info!("Game session closed by its last handle");
    Some(game)
}

/// Summary of a ticker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerReport {
    /// Steps actually executed
    pub steps: u64,
    /// Everything that happened, in order
    pub events: Vec<GameEvent>,
    pub winner: Option<ObjectId>,
}

/// Cloneable handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    task: Arc<Mutex<Option<JoinHandle<Option<Game>>>>>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> DelveResult<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(command(reply))
            .await
            .map_err(|_| DelveError::SessionClosed)?;
        response.await.map_err(|_| DelveError::SessionClosed)
    }

    /// Queues `action` for its actor.
    pub async fn submit_action(&self, action: Action) -> DelveResult<()> {
        self.request(|reply| SessionCommand::SubmitAction { action, reply })
            .await?
    }

    pub async fn legal_directions(&self, actor: ObjectId) -> DelveResult<Vec<Direction>> {
        self.request(|reply| SessionCommand::LegalDirections { actor, reply })
            .await
    }

    /// Runs one tick.
    pub async fn step(&self) -> DelveResult<Vec<GameEvent>> {
        self.request(|reply| SessionCommand::Step { reply }).await?
    }

    pub async fn snapshot(&self) -> DelveResult<GameSnapshot> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Encodes the current map in the binary map format.
    pub async fn serialize(&self) -> DelveResult<Vec<u8>> {
        self.request(|reply| SessionCommand::Serialize { reply })
            .await
    }

    /// Stops the session and hands the game back.
    ///
    /// Every handle fails with [`DelveError::SessionClosed`] afterwards.
    pub async fn shutdown(&self) -> DelveResult<Game> {
        let game = self
            .request(|reply| SessionCommand::Shutdown { reply })
            .await?;
        let task = self
            .task
            .lock()
            .map_err(|_| DelveError::InvalidState("session task lock poisoned".to_string()))?
            .take();
        if let Some(task) = task {
            task.await
                .map_err(|err| DelveError::InvalidState(format!("session task failed: {}", err)))?;
        }
        Ok(game)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Steps the game once per `period` until someone wins or `max_steps`
    /// ticks have run.
    pub async fn run_ticker(&self, period: Duration, max_steps: u64) -> DelveResult<TickerReport> {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut report = TickerReport {
            steps: 0,
            events: Vec::new(),
            winner: None,
        };

        while report.steps < max_steps {
            ticker.tick().await;
            let events = self.step().await?;
            report.steps += 1;
            report.events.extend(events);

            report.winner = self.snapshot().await?.winner;
            if report.winner.is_some() {
                break;
            }
        }
        Ok(report)
    }
}
