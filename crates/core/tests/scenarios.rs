use nowplaying_core::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Sessions the test can reconfigure between events
#[derive(Default)]
struct Sessions {
    state: Mutex<HashMap<String, (PlaybackStateKind, MediaMetadata)>>,
}

impl Sessions {
    fn set(&self, handle: &str, kind: PlaybackStateKind, title: &str, artist: &str, album: &str) {
        let metadata = MediaMetadata {
            title: Some(title.to_string()),
            artist: Some(artist.to_string()),
            album: Some(album.to_string()),
            art_bitmap: Some(Bitmap {
                width: 1,
                height: 1,
                rgba: vec![0xff; 4],
            }),
            ..Default::default()
        };
        self.state
            .lock()
            .unwrap()
            .insert(handle.to_string(), (kind, metadata));
    }
}

impl SessionQuery for Sessions {
    type Handle = String;

    fn playback_state(&self, handle: &String) -> Option<PlaybackInfo> {
        self.state
            .lock()
            .unwrap()
            .get(handle)
            .map(|(kind, _)| PlaybackInfo::new(*kind, 1_000))
    }

    fn metadata(&self, handle: &String) -> Option<MediaMetadata> {
        self.state.lock().unwrap().get(handle).map(|(_, m)| m.clone())
    }

    fn source_app_id(&self, handle: &String) -> String {
        format!("com.example.{handle}")
    }
}

#[derive(Default)]
struct Encoder {
    calls: AtomicUsize,
}

impl ArtworkEncoder for Encoder {
    fn encode_bitmap(&self, bitmap: &Bitmap) -> Option<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(bitmap.rgba.clone())
    }

    fn encode_icon(&self, _icon: &SourceIcon) -> Option<Vec<u8>> {
        None
    }
}

struct Fixture {
    sessions: Arc<Sessions>,
    encoder: Arc<Encoder>,
    tracker: NowPlayingTracker<String>,
}

fn fixture() -> Fixture {
    let sessions = Arc::new(Sessions::default());
    let encoder = Arc::new(Encoder::default());
    let tracker = NowPlayingTracker::new(sessions.clone(), encoder.clone(), "");
    Fixture {
        sessions,
        encoder,
        tracker,
    }
}

fn post(f: &mut Fixture, key: &str, handle: &str) -> EmitDecision {
    f.tracker
        .on_posted(key.into(), Some(handle.to_string()), None)
}

/// Scenario A: empty registry, a playing track is posted
fn scenario_a(f: &mut Fixture) {
    f.sessions.set("H1", PlaybackStateKind::Playing, "A", "X", "Z");

    let EmitDecision::Track(snapshot) = post(f, "K1", "H1") else {
        panic!("scenario A should emit a track");
    };
    assert_eq!(snapshot.id.as_str(), "A:X:Z");
    assert_eq!(snapshot.state, PlaybackStateKind::Playing);
    assert_eq!(snapshot.source, "com.example.H1");
    assert_eq!(snapshot.artwork, Some(Artwork::Image(vec![0xff; 4])));
}

#[test]
fn scenario_a_new_playing_track() {
    let mut f = fixture();
    scenario_a(&mut f);
    assert_eq!(f.encoder.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn scenario_b_other_app_paused_is_ignored() {
    let mut f = fixture();
    scenario_a(&mut f);

    f.sessions.set("H2", PlaybackStateKind::Paused, "B", "Y", "W");
    assert!(!post(&mut f, "K2", "H2").is_emission());
    assert_eq!(
        f.tracker.state(),
        SelectorState::Showing {
            id: TrackIdentity::derive(Some("A"), Some("X"), Some("Z"), ""),
            state: PlaybackStateKind::Playing,
        }
    );
}

#[test]
fn scenario_c_same_track_paused_no_artwork_refetch() {
    let mut f = fixture();
    scenario_a(&mut f);

    f.sessions.set("H1", PlaybackStateKind::Paused, "A", "X", "Z");
    let EmitDecision::Track(snapshot) = post(&mut f, "K1", "H1") else {
        panic!("scenario C should emit a track");
    };
    assert_eq!(snapshot.id.as_str(), "A:X:Z");
    assert_eq!(snapshot.state, PlaybackStateKind::Paused);
    assert_eq!(f.encoder.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn scenario_d_removal_clears() {
    let mut f = fixture();
    scenario_a(&mut f);
    f.sessions.set("H1", PlaybackStateKind::Paused, "A", "X", "Z");
    post(&mut f, "K1", "H1");

    assert_eq!(f.tracker.on_removed(&"K1".into()), EmitDecision::Cleared);
    assert!(!f.tracker.registry().contains(&"K1".into()));
    assert!(f.tracker.current().is_none());
}

#[test]
fn scenario_e_unrelated_stop_is_ignored() {
    let mut f = fixture();
    scenario_a(&mut f);

    f.sessions.set("H3", PlaybackStateKind::Stopped, "C", "Y", "W");
    assert_eq!(
        post(&mut f, "K3", "H3"),
        EmitDecision::Nothing(SkipReason::StoppedOtherTrack)
    );
    assert_eq!(
        f.tracker.current().map(|s| s.id.as_str().to_string()),
        Some("A:X:Z".to_string())
    );
}

#[test]
fn position_updates_never_refetch_artwork() {
    let mut f = fixture();
    scenario_a(&mut f);

    for _ in 0..5 {
        assert!(post(&mut f, "K1", "H1").is_emission());
    }
    assert_eq!(f.encoder.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn showing_playing_only_changes_on_playing_other_or_end_of_same() {
    let mut f = fixture();
    scenario_a(&mut f);

    f.sessions.set("H2", PlaybackStateKind::Paused, "B", "Y", "W");
    f.sessions.set("H3", PlaybackStateKind::Stopped, "C", "Y", "W");
    let before = f.tracker.current().cloned();
    post(&mut f, "K2", "H2");
    post(&mut f, "K3", "H3");
    f.tracker.on_removed(&"K2".into());
    assert_eq!(f.tracker.current().cloned(), before);

    f.sessions.set("H2", PlaybackStateKind::Playing, "B", "Y", "W");
    assert!(post(&mut f, "K2", "H2").is_emission());
    assert_eq!(f.encoder.calls.load(Ordering::SeqCst), 2);

    f.sessions.set("H2", PlaybackStateKind::Stopped, "B", "Y", "W");
    assert!(post(&mut f, "K2", "H2").is_emission());
    assert_eq!(f.tracker.state(), SelectorState::Empty);
}
