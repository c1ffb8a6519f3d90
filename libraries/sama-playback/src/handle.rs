//! Actor handle for a playback session
//!
//! [`PlaybackSession::spawn`] moves the session into its own task. The task
//! multiplexes commands from any number of [`SessionHandle`] clones with the
//! session's own load reports and resource signals, so state is only ever
//! touched from one place.

use crate::backend::MediaBackend;
use crate::error::{Result, SessionError};
use crate::events::{EventBus, SessionEvent};
use crate::session::PlaybackSession;
use crate::types::SessionSnapshot;
use sama_core::{Playlist, TrackRef};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

type Reply<T> = oneshot::Sender<Result<T>>;

/// Commands accepted by the session task
#[derive(Debug)]
enum SessionCommand {
    LoadTrack { track: TrackRef, reply: Reply<()> },
    PlayPlaylist { playlist: Playlist, reply: Reply<()> },
    Select { index: usize, reply: Reply<TrackRef> },
    Play { reply: Reply<()> },
    Pause { reply: Reply<()> },
    TogglePlayback { reply: Reply<()> },
    Seek { target_ms: i64, reply: Reply<u64> },
    SkipBy { delta_ms: i64, reply: Reply<u64> },
    Next { reply: Reply<Option<TrackRef>> },
    Previous { reply: Reply<Option<TrackRef>> },
    Retry { reply: Reply<()> },
    Stop { reply: Reply<()> },
    Shutdown { reply: oneshot::Sender<()> },
}

impl<B: MediaBackend> PlaybackSession<B> {
    /// Move the session into a background task and return a handle to it
    ///
    /// The task exits on [`SessionHandle::shutdown`] or once every handle is
    /// dropped, releasing any live resource.
    pub fn spawn(self) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            commands: tx,
            events: self.events().clone(),
            state: self.watch(),
        };
        tokio::spawn(run(self, rx));
        handle
    }

    fn execute(&mut self, command: SessionCommand) {
        // A caller that stopped waiting for its reply is not an error
        match command {
            SessionCommand::LoadTrack { track, reply } => {
                let _ = reply.send(self.load_track(track));
            }
            SessionCommand::PlayPlaylist { playlist, reply } => {
                let _ = reply.send(self.play_playlist(playlist));
            }
            SessionCommand::Select { index, reply } => {
                let _ = reply.send(self.select(index));
            }
            SessionCommand::Play { reply } => {
                let _ = reply.send(self.play());
            }
            SessionCommand::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            SessionCommand::TogglePlayback { reply } => {
                let _ = reply.send(self.toggle_playback());
            }
            SessionCommand::Seek { target_ms, reply } => {
                let _ = reply.send(self.seek(target_ms));
            }
            SessionCommand::SkipBy { delta_ms, reply } => {
                let _ = reply.send(self.skip_by(delta_ms));
            }
            SessionCommand::Next { reply } => {
                let _ = reply.send(self.next());
            }
            SessionCommand::Previous { reply } => {
                let _ = reply.send(self.previous());
            }
            SessionCommand::Retry { reply } => {
                let _ = reply.send(self.retry());
            }
            SessionCommand::Stop { reply } => {
                let _ = reply.send(self.stop());
            }
            SessionCommand::Shutdown { reply } => {
                self.reset();
                let _ = reply.send(());
            }
        }
    }
}

async fn run<B: MediaBackend>(
    mut session: PlaybackSession<B>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
) {
    loop {
        tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(command @ SessionCommand::Shutdown { .. }) => {
                    session.execute(command);
                    break;
                }
                Some(command) => session.execute(command),
                None => break,
            },
            () = session.pump() => {}
        }
    }
    debug!("Session task exited");
}

/// Cloneable, thread-safe front end to a spawned session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    events: EventBus,
    state: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> SessionCommand) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn load_track(&self, track: TrackRef) -> Result<()> {
        self.request(|reply| SessionCommand::LoadTrack { track, reply })
            .await
    }

    pub async fn play_playlist(&self, playlist: Playlist) -> Result<()> {
        self.request(|reply| SessionCommand::PlayPlaylist { playlist, reply })
            .await
    }

    pub async fn select(&self, index: usize) -> Result<TrackRef> {
        self.request(|reply| SessionCommand::Select { index, reply })
            .await
    }

    pub async fn play(&self) -> Result<()> {
        self.request(|reply| SessionCommand::Play { reply }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| SessionCommand::Pause { reply }).await
    }

    pub async fn toggle_playback(&self) -> Result<()> {
        self.request(|reply| SessionCommand::TogglePlayback { reply })
            .await
    }

    pub async fn seek(&self, target_ms: i64) -> Result<u64> {
        self.request(|reply| SessionCommand::Seek { target_ms, reply })
            .await
    }

    pub async fn skip_by(&self, delta_ms: i64) -> Result<u64> {
        self.request(|reply| SessionCommand::SkipBy { delta_ms, reply })
            .await
    }

    pub async fn next(&self) -> Result<Option<TrackRef>> {
        self.request(|reply| SessionCommand::Next { reply }).await
    }

    pub async fn previous(&self) -> Result<Option<TrackRef>> {
        self.request(|reply| SessionCommand::Previous { reply }).await
    }

    pub async fn retry(&self) -> Result<()> {
        self.request(|reply| SessionCommand::Retry { reply }).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| SessionCommand::Stop { reply }).await
    }

    /// Stop playback and end the session task
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Shutdown { reply: tx })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Whether the session task has exited
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
