use crate::models::{
    Bitmap, MediaMetadata, NotificationKey, PlaybackInfo, SourceIcon, TrackSnapshot,
};
use async_trait::async_trait;
use std::fmt::Debug;

/// Platform facility answering questions about a media session
pub trait SessionQuery: Send + Sync {
    /// Opaque reference to a session, owned by the platform
    type Handle: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Current playback state; `None` when the session reports nothing
    fn playback_state(&self, handle: &Self::Handle) -> Option<PlaybackInfo>;

    /// Current metadata; `None` when the session has nothing usable yet
    fn metadata(&self, handle: &Self::Handle) -> Option<MediaMetadata>;

    /// Identifier of the application owning the session
    fn source_app_id(&self, handle: &Self::Handle) -> String;

    /// No notification refers to the session anymore; drop anything kept for it
    fn release(&self, _handle: &Self::Handle) {}
}

/// Image codec used for artwork and notification icons
pub trait ArtworkEncoder: Send + Sync {
    fn encode_bitmap(&self, bitmap: &Bitmap) -> Option<Vec<u8>>;

    fn encode_icon(&self, icon: &SourceIcon) -> Option<Vec<u8>>;
}

/// Receives emitted track events on the host side
pub trait HostTransport: Send + Sync {
    /// `None` means nothing is playing
    fn emit_track(&self, track: Option<&TrackSnapshot>);
}

/// Platform permission to observe other applications' notifications
pub trait PermissionFacility: Send + Sync {
    fn is_listening_enabled(&self) -> bool;

    /// Send the user to wherever listening can be granted
    fn open_listener_settings(&self);
}

/// A notification that is active when the listener (re)connects
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveNotification<H> {
    pub key: NotificationKey,
    pub handle: Option<H>,
    pub icon: Option<SourceIcon>,
}

/// Raw notification lifecycle event
#[derive(Clone, Debug, PartialEq)]
pub enum NotificationEvent<H> {
    Posted {
        key: NotificationKey,
        /// Absent when the notification carries no media session
        handle: Option<H>,
        icon: Option<SourceIcon>,
    },
    Removed {
        key: NotificationKey,
    },
}

/// Stream of notification events from the platform
#[async_trait]
pub trait NotificationSource: Send {
    type Handle: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Every currently active notification, used on (re)connect
    async fn active_notifications(&mut self) -> Vec<ActiveNotification<Self::Handle>>;

    /// Next event; `None` once the source is closed
    async fn next_event(&mut self) -> Option<NotificationEvent<Self::Handle>>;
}
