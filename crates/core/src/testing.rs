//! In-memory collaborators shared by the unit tests

use crate::models::{
    Bitmap, MediaMetadata, PlaybackInfo, PlaybackStateKind, SourceIcon, TrackSnapshot,
};
use crate::traits::{ArtworkEncoder, HostTransport, PermissionFacility, SessionQuery};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn metadata(title: &str, artist: &str, album: &str) -> MediaMetadata {
    MediaMetadata {
        title: Some(title.to_string()),
        artist: Some(artist.to_string()),
        album: Some(album.to_string()),
        genre: Some("Rock".to_string()),
        duration_millis: 240_000,
        ..Default::default()
    }
}

struct FakeSession {
    playback: PlaybackInfo,
    metadata: Option<MediaMetadata>,
}

/// Sessions keyed by a static handle name
#[derive(Default)]
pub struct FakeSessions {
    sessions: Mutex<HashMap<&'static str, FakeSession>>,
    released: Mutex<Vec<&'static str>>,
}

impl FakeSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, handle: &'static str, kind: PlaybackStateKind, metadata: MediaMetadata) {
        self.sessions.lock().unwrap().insert(
            handle,
            FakeSession {
                playback: PlaybackInfo::new(kind, 0),
                metadata: Some(metadata),
            },
        );
    }

    pub fn set_without_metadata(&self, handle: &'static str, kind: PlaybackStateKind) {
        self.sessions.lock().unwrap().insert(
            handle,
            FakeSession {
                playback: PlaybackInfo::new(kind, 0),
                metadata: None,
            },
        );
    }

    pub fn released(&self) -> Vec<&'static str> {
        self.released.lock().unwrap().clone()
    }

    pub fn set_state(&self, handle: &'static str, kind: PlaybackStateKind, position_millis: i64) {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(handle) {
            session.playback = PlaybackInfo::new(kind, position_millis);
        }
    }
}

impl SessionQuery for FakeSessions {
    type Handle = &'static str;

    fn playback_state(&self, handle: &&'static str) -> Option<PlaybackInfo> {
        self.sessions.lock().unwrap().get(handle).map(|s| s.playback)
    }

    fn metadata(&self, handle: &&'static str) -> Option<MediaMetadata> {
        self.sessions
            .lock()
            .unwrap()
            .get(handle)
            .and_then(|s| s.metadata.clone())
    }

    fn source_app_id(&self, handle: &&'static str) -> String {
        format!("app.{handle}")
    }

    fn release(&self, handle: &&'static str) {
        self.released.lock().unwrap().push(*handle);
    }
}

/// Encoder that returns the raw pixels and counts how often it was asked
#[derive(Default)]
pub struct CountingEncoder {
    bitmap_calls: AtomicUsize,
    icon_calls: AtomicUsize,
    fail: bool,
}

impl CountingEncoder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn bitmap_calls(&self) -> usize {
        self.bitmap_calls.load(Ordering::SeqCst)
    }

    pub fn icon_calls(&self) -> usize {
        self.icon_calls.load(Ordering::SeqCst)
    }
}

impl ArtworkEncoder for CountingEncoder {
    fn encode_bitmap(&self, bitmap: &Bitmap) -> Option<Vec<u8>> {
        self.bitmap_calls.fetch_add(1, Ordering::SeqCst);
        (!self.fail).then(|| bitmap.rgba.clone())
    }

    fn encode_icon(&self, icon: &SourceIcon) -> Option<Vec<u8>> {
        self.icon_calls.fetch_add(1, Ordering::SeqCst);
        match icon {
            SourceIcon::Bitmap(bitmap) if !self.fail => Some(bitmap.rgba.clone()),
            _ => None,
        }
    }
}

/// Transport that records everything it is handed
#[derive(Default)]
pub struct RecordingTransport {
    emitted: Mutex<Vec<Option<TrackSnapshot>>>,
}

impl RecordingTransport {
    pub fn emitted(&self) -> Vec<Option<TrackSnapshot>> {
        self.emitted.lock().unwrap().clone()
    }
}

impl HostTransport for RecordingTransport {
    fn emit_track(&self, track: Option<&TrackSnapshot>) {
        self.emitted.lock().unwrap().push(track.cloned());
    }
}

/// Permission switch that counts settings requests
#[derive(Default)]
pub struct FakePermissions {
    pub enabled: AtomicBool,
    pub settings_opened: AtomicUsize,
}

impl PermissionFacility for FakePermissions {
    fn is_listening_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn open_listener_settings(&self) {
        self.settings_opened.fetch_add(1, Ordering::SeqCst);
    }
}
