//! Start/stop control of the announcement worker.
//!
//! The worker is a plain OS thread that owns the [`AnnouncementLoop`]. The
//! foreground only talks to it through two channels: a stop signal going in
//! and [`Status`] messages coming out. Stop is cooperative: the worker
//! finishes the iteration it is in (fade and playback included) and exits.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendError, Sender, TryRecvError, bounded};
use tracing::{debug, error, info};

use crate::capabilities::{PlaybackSource, SpeechOutput};
use crate::errors::ControllerError;
use crate::events::{Status, StatusBus};
use crate::watcher::AnnouncementLoop;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Stopped,
    Running,
}

struct Worker<P, S> {
    stop_tx: Sender<()>,
    handle: JoinHandle<Option<(P, S)>>,
}

/// A refused [`Announcer::start`]. The loop is handed back untouched so its
/// collaborators can still be closed.
pub struct StartError<P, S> {
    error: ControllerError,
    announcement_loop: AnnouncementLoop<P, S>,
}

impl<P, S> StartError<P, S> {
    pub fn error(&self) -> &ControllerError {
        &self.error
    }

    pub fn into_inner(self) -> (ControllerError, AnnouncementLoop<P, S>) {
        (self.error, self.announcement_loop)
    }
}

impl<P, S> std::fmt::Debug for StartError<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartError").field("error", &self.error).finish()
    }
}

impl<P, S> std::fmt::Display for StartError<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Owns the announcement worker and the status bus it reports on.
pub struct Announcer<P, S> {
    status: StatusBus,
    worker: Option<Worker<P, S>>,
}

impl<P, S> std::fmt::Debug for Announcer<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Announcer")
            .field("status", &self.status)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl<P, S> Default for Announcer<P, S>
where
    P: PlaybackSource + Send + 'static,
    S: SpeechOutput + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, S> Announcer<P, S>
where
    P: PlaybackSource + Send + 'static,
    S: SpeechOutput + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            status: StatusBus::new(),
            worker: None,
        }
    }

    /// Receives every status message broadcast from now on.
    pub fn subscribe(&self) -> Receiver<Status> {
        self.status.subscribe()
    }

    pub fn state(&self) -> ControllerState {
        match &self.worker {
            Some(worker) if !worker.handle.is_finished() => ControllerState::Running,
            _ => ControllerState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == ControllerState::Running
    }

    /// Stopped -> Running: spawns the worker thread with `announcement_loop`.
    pub fn start(
        &mut self,
        announcement_loop: AnnouncementLoop<P, S>,
    ) -> Result<(), StartError<P, S>> {
        if self.is_running() {
            return Err(StartError {
                error: ControllerError::AlreadyRunning,
                announcement_loop,
            });
        }
        // A worker that died on its own still has to be reaped
        if let Some(stale) = self.worker.take() {
            let _ = stale.handle.join();
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        // Le loop n'est transmis qu'une fois le thread créé
        let (loop_tx, loop_rx) = bounded::<AnnouncementLoop<P, S>>(1);
        let announcement_loop = announcement_loop.with_status_bus(self.status.clone());
        let status = self.status.clone();

        info!(config = ?announcement_loop.config(), "Starting announcer");

        let spawned = thread::Builder::new()
            .name("herald-announcer".to_string())
            .spawn(move || {
                let mut announcement_loop = loop_rx.recv().ok()?;
                announcement_loop.set_running(true);
                status.broadcast(Status::Started);
                run_worker(&mut announcement_loop, &stop_rx);
                announcement_loop.set_running(false);
                Some(announcement_loop.into_parts())
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!("Cannot spawn announcer thread: {}", e);
                return Err(StartError {
                    error: ControllerError::Spawn(e.to_string()),
                    announcement_loop,
                });
            }
        };

        if let Err(SendError(announcement_loop)) = loop_tx.send(announcement_loop) {
            let _ = handle.join();
            return Err(StartError {
                error: ControllerError::Spawn("announcer thread exited early".to_string()),
                announcement_loop,
            });
        }

        self.worker = Some(Worker { stop_tx, handle });
        Ok(())
    }

    /// Running -> Stopped: signals the worker and waits for it to exit.
    ///
    /// Returns the collaborators so the caller can close them, or `None` if
    /// nothing was running or the worker panicked.
    pub fn stop(&mut self) -> Option<(P, S)> {
        let worker = self.worker.take()?;

        debug!("Stopping announcer");
        // Full buffer means a stop is already pending
        let _ = worker.stop_tx.try_send(());

        let parts = match worker.handle.join() {
            Ok(parts) => parts,
            Err(_) => {
                error!("Announcer thread panicked");
                None
            }
        };

        self.status.broadcast(Status::Stopped);
        info!("Announcer stopped");
        parts
    }
}

impl<P, S> Drop for Announcer<P, S> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.try_send(());
            let _ = worker.handle.join();
        }
    }
}

fn run_worker<P: PlaybackSource, S: SpeechOutput>(
    announcement_loop: &mut AnnouncementLoop<P, S>,
    stop_rx: &Receiver<()>,
) {
    loop {
        match stop_rx.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(()) | Err(TryRecvError::Disconnected) => break,
        }

        let wait = announcement_loop.run_iteration();

        if stop_requested_within(stop_rx, wait) {
            break;
        }
    }
    debug!("Announcer worker exiting");
}

/// Waits up to `wait` for a stop request.
fn stop_requested_within(stop_rx: &Receiver<()>, wait: Duration) -> bool {
    match stop_rx.recv_timeout(wait) {
        Err(RecvTimeoutError::Timeout) => false,
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
    }
}
