use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Opaque identifier of a single posted notification
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationKey(String);

impl NotificationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for NotificationKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Playback state as far as track selection is concerned
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStateKind {
    Playing,
    Paused,
    Stopped,
    /// Buffering, error, nothing reported, ... never acted on
    Unknown,
}

impl PlaybackStateKind {
    /// Map a platform status string ("Playing", "Paused", "Stopped")
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "playing" => PlaybackStateKind::Playing,
            "paused" => PlaybackStateKind::Paused,
            "stopped" => PlaybackStateKind::Stopped,
            _ => PlaybackStateKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStateKind::Playing => "playing",
            PlaybackStateKind::Paused => "paused",
            PlaybackStateKind::Stopped => "stopped",
            PlaybackStateKind::Unknown => "unknown",
        }
    }
}

/// Result of a playback state query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackInfo {
    pub kind: PlaybackStateKind,
    pub position_millis: i64,
}

impl PlaybackInfo {
    pub fn new(kind: PlaybackStateKind, position_millis: i64) -> Self {
        Self { kind, position_millis }
    }
}

/// Raw decoded image as handed over by the platform
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major
    pub rgba: Vec<u8>,
}

/// Small icon attached to the notification that carried the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceIcon {
    Bitmap(Bitmap),
    /// Undecoded vector drawable (e.g. SVG source)
    Vector(Vec<u8>),
}

/// Metadata reported by a media session
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub duration_millis: i64,
    pub art_bitmap: Option<Bitmap>,
    pub album_art_bitmap: Option<Bitmap>,
    pub art_uri: Option<String>,
    pub album_art_uri: Option<String>,
}

impl MediaMetadata {
    /// Identity of the track described by this metadata
    pub fn identity(&self, placeholder: &str) -> TrackIdentity {
        TrackIdentity::derive(
            self.title.as_deref(),
            self.artist.as_deref(),
            self.album.as_deref(),
            placeholder,
        )
    }
}

/// Proxy key for "same logical track": `title:artist:album`.
///
/// Two recordings sharing all three fields collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackIdentity(String);

impl TrackIdentity {
    pub const DELIMITER: char = ':';

    pub fn derive(
        title: Option<&str>,
        artist: Option<&str>,
        album: Option<&str>,
        placeholder: &str,
    ) -> Self {
        let title = title.unwrap_or(placeholder);
        let artist = artist.unwrap_or(placeholder);
        let album = album.unwrap_or(placeholder);
        let d = Self::DELIMITER;
        Self(format!("{title}{d}{artist}{d}{album}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Artwork attached to a snapshot: encoded image bytes, or a URI the host resolves
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Artwork {
    Image(#[serde(serialize_with = "serialize_base64")] Vec<u8>),
    Uri(String),
}

/// The track currently reported as now playing
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub id: TrackIdentity,
    /// Application that owns the session
    pub source: String,
    pub state: PlaybackStateKind,
    pub album: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub duration_millis: i64,
    pub position_millis: i64,
    pub artwork: Option<Artwork>,
    #[serde(serialize_with = "serialize_optional_base64")]
    pub source_icon: Option<Vec<u8>>,
}

/// Why an event produced no emission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Posted notification carried no session handle
    NoSessionHandle,
    /// Removal of a key the registry never tracked
    UntrackedKey,
    NoMetadata,
    UnknownState,
    /// A different track paused while another one is shown
    PausedOtherTrack,
    StoppedOtherTrack,
    RemovedOtherTrack,
}

/// Outcome of feeding one event through the selector
#[derive(Clone, Debug, PartialEq)]
pub enum EmitDecision {
    /// Emit this snapshot; it is now the stored one
    Track(TrackSnapshot),
    /// Emit "nothing is playing"
    Cleared,
    Nothing(SkipReason),
}

impl EmitDecision {
    /// The event to hand to the host, if any
    pub fn to_event(&self) -> Option<TrackEvent> {
        match self {
            EmitDecision::Track(snapshot) => Some(TrackEvent {
                track: Some(snapshot.clone()),
            }),
            EmitDecision::Cleared => Some(TrackEvent { track: None }),
            EmitDecision::Nothing(_) => None,
        }
    }

    pub fn is_emission(&self) -> bool {
        !matches!(self, EmitDecision::Nothing(_))
    }
}

/// Envelope sent to the host; `track: None` means cleared
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackEvent {
    pub track: Option<TrackSnapshot>,
}

fn serialize_base64<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    use base64::Engine;
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes.as_ref()))
}

fn serialize_optional_base64<S: Serializer>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serialize_base64(bytes, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(title: &str, artist: &str, album: &str) -> MediaMetadata {
        MediaMetadata {
            title: Some(title.to_string()),
            artist: Some(artist.to_string()),
            album: Some(album.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_identity_format() {
        let id = metadata("A", "X", "Z").identity("");
        assert_eq!(id.as_str(), "A:X:Z");
    }

    #[test]
    fn test_identity_ignores_other_fields() {
        let plain = metadata("Time", "Pink Floyd", "The Dark Side of the Moon");
        let decorated = MediaMetadata {
            genre: Some("Progressive Rock".to_string()),
            duration_millis: 413_000,
            art_uri: Some("file:///tmp/cover.png".to_string()),
            ..plain.clone()
        };

        assert_eq!(plain.identity(""), decorated.identity(""));
    }

    #[test]
    fn test_identity_missing_fields_use_placeholder() {
        let partial = MediaMetadata {
            title: Some("Intro".to_string()),
            ..Default::default()
        };

        assert_eq!(partial.identity("").as_str(), "Intro::");
        assert_eq!(partial.identity("null").as_str(), "Intro:null:null");
    }

    #[test]
    fn test_playback_state_from_status() {
        assert_eq!(PlaybackStateKind::from_status("Playing"), PlaybackStateKind::Playing);
        assert_eq!(PlaybackStateKind::from_status("paused"), PlaybackStateKind::Paused);
        assert_eq!(PlaybackStateKind::from_status(" Stopped "), PlaybackStateKind::Stopped);
        assert_eq!(PlaybackStateKind::from_status("Buffering"), PlaybackStateKind::Unknown);
        assert_eq!(PlaybackStateKind::from_status(""), PlaybackStateKind::Unknown);
    }

    #[test]
    fn test_track_event_json() {
        let snapshot = TrackSnapshot {
            id: TrackIdentity::derive(Some("A"), Some("X"), Some("Z"), ""),
            source: "org.mpris.MediaPlayer2.spotify".to_string(),
            state: PlaybackStateKind::Playing,
            album: Some("Z".to_string()),
            title: Some("A".to_string()),
            artist: Some("X".to_string()),
            genre: None,
            duration_millis: 1000,
            position_millis: 10,
            artwork: Some(Artwork::Image(vec![1, 2, 3])),
            source_icon: None,
        };

        let json = serde_json::to_value(TrackEvent { track: Some(snapshot) }).unwrap();
        assert_eq!(json["track"]["id"], "A:X:Z");
        assert_eq!(json["track"]["state"], "playing");
        assert_eq!(json["track"]["artwork"]["image"], "AQID");
        assert!(json["track"]["source_icon"].is_null());

        let cleared = serde_json::to_value(TrackEvent { track: None }).unwrap();
        assert!(cleared["track"].is_null());
    }
}
