//! Actor that serialises every notification event through one task.
//!
//! Platform callbacks may arrive on any thread; they are turned into
//! [`ServiceCommand`]s and queued. The actor owns the [`NowPlayingTracker`],
//! so registry updates and snapshot transitions never interleave, and a
//! snapshot is only published once its artwork has been resolved.

use crate::error::ServiceError;
use crate::models::{NotificationKey, SourceIcon, TrackEvent, TrackSnapshot};
use crate::tracker::NowPlayingTracker;
use crate::traits::{
    ActiveNotification, HostTransport, NotificationEvent, NotificationSource, PermissionFacility,
};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 16;

/// Commands queued to the service actor
#[derive(Debug)]
pub enum ServiceCommand<H> {
    /// Listener (re)connected with this set of active notifications
    Connected { active: Vec<ActiveNotification<H>> },
    Posted {
        key: NotificationKey,
        handle: Option<H>,
        icon: Option<SourceIcon>,
    },
    Removed { key: NotificationKey },
    /// Last emitted snapshot, if any
    CurrentTrack {
        respond_to: oneshot::Sender<Option<TrackSnapshot>>,
    },
    Shutdown,
}

pub struct NowPlayingService<H> {
    tracker: NowPlayingTracker<H>,
    receiver: mpsc::Receiver<ServiceCommand<H>>,
    transport: Arc<dyn HostTransport>,
    events: broadcast::Sender<TrackEvent>,
}

impl<H> NowPlayingService<H>
where
    H: Clone + Debug + PartialEq + Send + Sync + 'static,
{
    pub fn new(
        tracker: NowPlayingTracker<H>,
        transport: Arc<dyn HostTransport>,
        permissions: Arc<dyn PermissionFacility>,
    ) -> (Self, NowPlayingHandle<H>) {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let handle = NowPlayingHandle {
            sender,
            events: events.clone(),
            permissions,
        };
        let service = Self {
            tracker,
            receiver,
            transport,
            events,
        };
        (service, handle)
    }

    /// Spawn the actor on the current runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Now-playing service starting");

        while let Some(cmd) = self.receiver.recv().await {
            if !self.handle_command(cmd) {
                break;
            }
        }

        info!("Now-playing service stopped");
    }

    /// Returns false once the actor should stop
    fn handle_command(&mut self, cmd: ServiceCommand<H>) -> bool {
        let decision = match cmd {
            ServiceCommand::Connected { active } => self.tracker.on_listener_connected(&active),
            ServiceCommand::Posted { key, handle, icon } => {
                self.tracker.on_posted(key, handle, icon)
            }
            ServiceCommand::Removed { key } => self.tracker.on_removed(&key),
            ServiceCommand::CurrentTrack { respond_to } => {
                let _ = respond_to.send(self.tracker.current().cloned());
                return true;
            }
            ServiceCommand::Shutdown => return false,
        };

        match decision.to_event() {
            Some(event) => {
                self.transport.emit_track(event.track.as_ref());
                // no subscribers is fine
                let _ = self.events.send(event);
            }
            None => debug!("Nothing to emit: {:?}", decision),
        }
        true
    }
}

/// Cheap-to-clone entry point into the service
#[derive(Clone)]
pub struct NowPlayingHandle<H> {
    sender: mpsc::Sender<ServiceCommand<H>>,
    events: broadcast::Sender<TrackEvent>,
    permissions: Arc<dyn PermissionFacility>,
}

impl<H> NowPlayingHandle<H>
where
    H: Send + 'static,
{
    async fn send(&self, cmd: ServiceCommand<H>) -> Result<(), ServiceError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| ServiceError::ChannelClosed)
    }

    pub async fn connected(&self, active: Vec<ActiveNotification<H>>) -> Result<(), ServiceError> {
        self.send(ServiceCommand::Connected { active }).await
    }

    pub async fn posted(
        &self,
        key: NotificationKey,
        handle: Option<H>,
        icon: Option<SourceIcon>,
    ) -> Result<(), ServiceError> {
        self.send(ServiceCommand::Posted { key, handle, icon }).await
    }

    pub async fn removed(&self, key: NotificationKey) -> Result<(), ServiceError> {
        self.send(ServiceCommand::Removed { key }).await
    }

    /// The track the host would currently be showing
    pub async fn current_track(&self) -> Result<Option<TrackSnapshot>, ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.send(ServiceCommand::CurrentTrack { respond_to: tx })
            .await?;
        rx.await.map_err(|_| ServiceError::ChannelClosed)
    }

    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.send(ServiceCommand::Shutdown).await
    }

    /// Every emitted track event from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TrackEvent> {
        self.events.subscribe()
    }

    pub fn is_listening_enabled(&self) -> bool {
        self.permissions.is_listening_enabled()
    }

    /// Open the listener settings unless listening is already enabled.
    /// The request itself always succeeds.
    pub fn request_listening_permission(&self) -> bool {
        if !self.permissions.is_listening_enabled() {
            info!("Listening not enabled, opening listener settings");
            self.permissions.open_listener_settings();
        }
        true
    }
}

/// Feed a notification source into the service until the source closes
pub async fn pump<S>(mut source: S, handle: NowPlayingHandle<S::Handle>) -> Result<(), ServiceError>
where
    S: NotificationSource,
{
    let active = source.active_notifications().await;
    debug!("Listener connected with {} active notifications", active.len());
    handle.connected(active).await?;

    while let Some(event) = source.next_event().await {
        match event {
            NotificationEvent::Posted { key, handle: session, icon } => {
                handle.posted(key, session, icon).await?
            }
            NotificationEvent::Removed { key } => handle.removed(key).await?,
        }
    }

    info!("Notification source closed");
    Ok(())
}
