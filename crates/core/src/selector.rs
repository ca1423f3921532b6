//! Now-playing selection: which session wins, and whether an event is news.
//!
//! The selector keeps the last emitted [`TrackSnapshot`] and decides, for
//! every session event, whether the host should hear about it. Artwork is
//! only resolved when a different track becomes current.

use crate::models::{
    Artwork, EmitDecision, MediaMetadata, PlaybackInfo, PlaybackStateKind, SkipReason,
    SourceIcon, TrackIdentity, TrackSnapshot,
};
use crate::traits::{ActiveNotification, ArtworkEncoder, SessionQuery};
use tracing::{debug, info};

/// Pick the session to start from when several are active.
///
/// Playing beats Paused; among equals the first one listed wins. Stopped,
/// unknown, handle-less and state-less candidates are never chosen.
pub fn select_initial<'a, Q>(
    candidates: &'a [ActiveNotification<Q::Handle>],
    query: &Q,
) -> Option<&'a ActiveNotification<Q::Handle>>
where
    Q: SessionQuery + ?Sized,
{
    let mut paused = None;

    for candidate in candidates {
        let Some(handle) = &candidate.handle else {
            continue;
        };
        let Some(playback) = query.playback_state(handle) else {
            debug!("Skipping {}: no playback state", candidate.key);
            continue;
        };

        match playback.kind {
            PlaybackStateKind::Playing => return Some(candidate),
            PlaybackStateKind::Paused => {
                paused.get_or_insert(candidate);
            }
            PlaybackStateKind::Stopped | PlaybackStateKind::Unknown => {}
        }
    }

    paused
}

/// Coarse view of the selector's state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectorState {
    Empty,
    Showing {
        id: TrackIdentity,
        state: PlaybackStateKind,
    },
}

/// Owner of the currently displayed track
#[derive(Debug, Default)]
pub struct NowPlayingSelector {
    current: Option<TrackSnapshot>,
    placeholder: String,
}

impl NowPlayingSelector {
    /// `placeholder` substitutes missing title/artist/album in identities
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            current: None,
            placeholder: placeholder.into(),
        }
    }

    pub fn current(&self) -> Option<&TrackSnapshot> {
        self.current.as_ref()
    }

    pub fn state(&self) -> SelectorState {
        match &self.current {
            Some(snapshot) => SelectorState::Showing {
                id: snapshot.id.clone(),
                state: snapshot.state,
            },
            None => SelectorState::Empty,
        }
    }

    /// React to a session being posted or updated
    pub fn on_session_event<Q, E>(
        &mut self,
        query: &Q,
        encoder: &E,
        handle: &Q::Handle,
        icon: Option<&SourceIcon>,
    ) -> EmitDecision
    where
        Q: SessionQuery + ?Sized,
        E: ArtworkEncoder + ?Sized,
    {
        let Some(metadata) = query.metadata(handle) else {
            debug!("No metadata for {:?}", handle);
            return EmitDecision::Nothing(SkipReason::NoMetadata);
        };

        let playback = query
            .playback_state(handle)
            .unwrap_or(PlaybackInfo::new(PlaybackStateKind::Unknown, 0));

        let id = metadata.identity(&self.placeholder);
        let has_last = self.current.is_some();
        let same = self.current.as_ref().is_some_and(|s| s.id == id);

        match playback.kind {
            PlaybackStateKind::Unknown => {
                return EmitDecision::Nothing(SkipReason::UnknownState);
            }
            PlaybackStateKind::Paused if has_last && !same => {
                debug!("Ignoring pause of {} while another track is shown", id);
                return EmitDecision::Nothing(SkipReason::PausedOtherTrack);
            }
            PlaybackStateKind::Stopped if !same => {
                debug!("Ignoring stop of {}", id);
                return EmitDecision::Nothing(SkipReason::StoppedOtherTrack);
            }
            _ => {}
        }

        let (artwork, source_icon) = if playback.kind != PlaybackStateKind::Stopped && !same {
            (
                resolve_artwork(&metadata, encoder),
                icon.and_then(|icon| encoder.encode_icon(icon)),
            )
        } else {
            self.current
                .as_ref()
                .map(|prev| (prev.artwork.clone(), prev.source_icon.clone()))
                .unwrap_or_default()
        };

        let snapshot = TrackSnapshot {
            id,
            source: query.source_app_id(handle),
            state: playback.kind,
            album: metadata.album,
            title: metadata.title,
            artist: metadata.artist,
            genre: metadata.genre,
            duration_millis: metadata.duration_millis,
            position_millis: playback.position_millis,
            artwork,
            source_icon,
        };

        if same {
            debug!("Track {} now {}", snapshot.id, snapshot.state.as_str());
        } else {
            info!("Now playing {} ({})", snapshot.id, snapshot.source);
        }

        self.current = match snapshot.state {
            PlaybackStateKind::Stopped => None,
            _ => Some(snapshot.clone()),
        };

        EmitDecision::Track(snapshot)
    }

    /// React to a session going away
    pub fn on_session_removed<Q>(&mut self, query: &Q, handle: &Q::Handle) -> EmitDecision
    where
        Q: SessionQuery + ?Sized,
    {
        let Some(metadata) = query.metadata(handle) else {
            return EmitDecision::Nothing(SkipReason::NoMetadata);
        };

        let id = metadata.identity(&self.placeholder);
        if self.current.as_ref().is_some_and(|s| s.id == id) {
            info!("Track {} removed, clearing", id);
            self.current = None;
            EmitDecision::Cleared
        } else {
            EmitDecision::Nothing(SkipReason::RemovedOtherTrack)
        }
    }
}

/// First available artwork: art bitmap, album-art bitmap, art URI, album-art URI
fn resolve_artwork<E>(metadata: &MediaMetadata, encoder: &E) -> Option<Artwork>
where
    E: ArtworkEncoder + ?Sized,
{
    metadata
        .art_bitmap
        .as_ref()
        .and_then(|bitmap| encoder.encode_bitmap(bitmap))
        .or_else(|| {
            metadata
                .album_art_bitmap
                .as_ref()
                .and_then(|bitmap| encoder.encode_bitmap(bitmap))
        })
        .map(Artwork::Image)
        .or_else(|| metadata.art_uri.clone().map(Artwork::Uri))
        .or_else(|| metadata.album_art_uri.clone().map(Artwork::Uri))
}
