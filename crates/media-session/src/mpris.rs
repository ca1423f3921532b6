//! MPRIS (Media Player Remote Interfacing Specification) session collaborators
//!
//! Every MPRIS player owns a well-known bus name `org.mpris.MediaPlayer2.*`.
//! The bus name plays the role of both the notification key and the session
//! handle: it appears when a player starts, changes status or track while
//! it lives, and disappears when the player exits.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use nowplaying_core::{
    ActiveNotification, MediaMetadata, MprisConfig, NotificationEvent, NotificationSource,
    PermissionFacility, PlaybackInfo, PlaybackStateKind, SessionQuery,
};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";
const ROOT_INTERFACE: &str = "org.mpris.MediaPlayer2";
const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

/// Session handle: the player's bus name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MprisPlayer(pub String);

impl MprisPlayer {
    pub fn bus_name(&self) -> &str {
        &self.0
    }

    /// `org.mpris.MediaPlayer2.spotify` -> `spotify`
    pub fn short_name(&self) -> &str {
        self.0.strip_prefix(MPRIS_PREFIX).unwrap_or(&self.0)
    }
}

/// Minimal session-bus access
pub trait BusClient: Send + Sync {
    /// Names of every MPRIS player currently on the bus
    fn list_players(&self) -> Result<Vec<String>>;

    /// Raw `dbus-send --print-reply` output of `Properties.Get`
    fn get_property(&self, dest: &str, interface: &str, property: &str) -> Result<String>;
}

/// [`BusClient`] backed by the `dbus-send` tool
#[derive(Clone, Copy, Debug, Default)]
pub struct DbusSend;

impl DbusSend {
    fn run(args: &[&str]) -> Result<String> {
        let output = Command::new("dbus-send")
            .arg("--session")
            .arg("--print-reply")
            .args(args)
            .output()?;

        if !output.status.success() {
            return Err(anyhow!(
                "dbus-send failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl BusClient for DbusSend {
    fn list_players(&self) -> Result<Vec<String>> {
        let reply = Self::run(&[
            "--dest=org.freedesktop.DBus",
            "/org/freedesktop/DBus",
            "org.freedesktop.DBus.ListNames",
        ])?;
        Ok(parse_list_names(&reply))
    }

    fn get_property(&self, dest: &str, interface: &str, property: &str) -> Result<String> {
        Self::run(&[
            &format!("--dest={}", dest),
            "/org/mpris/MediaPlayer2",
            "org.freedesktop.DBus.Properties.Get",
            &format!("string:{}", interface),
            &format!("string:{}", property),
        ])
    }
}

/// MPRIS bus names out of a `ListNames` reply, in bus order
pub fn parse_list_names(reply: &str) -> Vec<String> {
    reply
        .lines()
        .filter_map(|line| quoted(line.trim()))
        .filter(|name| name.starts_with(MPRIS_PREFIX))
        .collect()
}

/// String payload of a single-variant reply (`variant string "Playing"`)
pub fn parse_variant_string(reply: &str) -> Option<String> {
    variant_line(reply).and_then(scalar)
}

/// Integer payload of a single-variant reply (`variant int64 1234`)
pub fn parse_variant_int(reply: &str) -> Option<i64> {
    variant_line(reply)
        .and_then(scalar)
        .and_then(|value| value.parse().ok())
}

/// Flatten a `Metadata` reply into key -> value.
///
/// Arrays (e.g. `xesam:artist`) keep their first element; numbers are kept
/// as their decimal text.
pub fn parse_metadata_reply(reply: &str) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    let mut lines = reply.lines().map(str::trim);

    while let Some(line) = lines.next() {
        if line != "dict entry(" {
            continue;
        }

        let Some(key) = lines.next().and_then(quoted) else {
            continue;
        };
        let Some(value) = lines
            .next()
            .and_then(|l| l.strip_prefix("variant"))
            .map(str::trim)
        else {
            continue;
        };

        if value.starts_with("array [") {
            let mut first = None;
            for element in lines.by_ref() {
                if element.starts_with(']') {
                    break;
                }
                if first.is_none() {
                    first = quoted(element);
                }
            }
            if let Some(first) = first {
                metadata.insert(key, first);
            }
        } else if let Some(value) = scalar(value) {
            metadata.insert(key, value);
        }
    }

    debug!("Parsed metadata map: {:?}", metadata);
    metadata
}

fn variant_line(reply: &str) -> Option<&str> {
    reply
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("variant"))
        .map(str::trim)
}

/// Text between the first and last double quote
fn quoted(line: &str) -> Option<String> {
    let (_, rest) = line.split_once('"')?;
    let (inner, _) = rest.rsplit_once('"')?;
    Some(inner.to_string())
}

/// `string "x"` / `object path "/x"` -> x, `uint64 42` -> 42
fn scalar(value: &str) -> Option<String> {
    if value.contains('"') {
        return quoted(value);
    }
    value.split_whitespace().nth(1).map(str::to_string)
}

/// [`SessionQuery`] over MPRIS players.
///
/// A player that exits takes its bus name with it, so the last metadata read
/// from each player is kept until the player is released. Removal of an exited
/// player is answered from there.
pub struct MprisQuery {
    bus: Arc<dyn BusClient>,
    last_metadata: Mutex<HashMap<String, MediaMetadata>>,
}

impl MprisQuery {
    pub fn new(bus: Arc<dyn BusClient>) -> Self {
        Self {
            bus,
            last_metadata: Mutex::new(HashMap::new()),
        }
    }

    fn metadata_cache(&self) -> MutexGuard<'_, HashMap<String, MediaMetadata>> {
        self.last_metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn player_property(&self, player: &MprisPlayer, property: &str) -> Result<String> {
        self.bus
            .get_property(player.bus_name(), PLAYER_INTERFACE, property)
    }
}

impl SessionQuery for MprisQuery {
    type Handle = MprisPlayer;

    fn playback_state(&self, player: &MprisPlayer) -> Option<PlaybackInfo> {
        let status = match self.player_property(player, "PlaybackStatus") {
            Ok(reply) => parse_variant_string(&reply)?,
            Err(e) => {
                warn!("Failed to get playback status of {}: {}", player.bus_name(), e);
                return None;
            }
        };

        // Position is optional in MPRIS and reported in microseconds
        let position_millis = self
            .player_property(player, "Position")
            .ok()
            .and_then(|reply| parse_variant_int(&reply))
            .map(|micros| micros / 1000)
            .unwrap_or(0);

        Some(PlaybackInfo::new(
            PlaybackStateKind::from_status(&status),
            position_millis,
        ))
    }

    fn metadata(&self, player: &MprisPlayer) -> Option<MediaMetadata> {
        let reply = match self.player_property(player, "Metadata") {
            Ok(reply) => reply,
            Err(e) => {
                let last = self.metadata_cache().get(player.bus_name()).cloned();
                match &last {
                    Some(_) => debug!("{} unreachable, using last metadata", player.bus_name()),
                    None => debug!("No metadata from {}: {}", player.bus_name(), e),
                }
                return last;
            }
        };

        let mut map = parse_metadata_reply(&reply);
        let title = map.remove("xesam:title");
        let artist = map
            .remove("xesam:artist")
            .or_else(|| map.remove("xesam:albumArtist"));
        let album = map.remove("xesam:album");

        if title.is_none() && artist.is_none() && album.is_none() {
            return None;
        }

        let duration_millis = map
            .get("mpris:length")
            .and_then(|micros| micros.parse::<i64>().ok())
            .map(|micros| micros / 1000)
            .unwrap_or(0);

        let metadata = MediaMetadata {
            title,
            artist,
            album,
            genre: map.remove("xesam:genre"),
            duration_millis,
            art_bitmap: None,
            album_art_bitmap: None,
            art_uri: map.remove("mpris:artUrl"),
            album_art_uri: None,
        };
        self.metadata_cache()
            .insert(player.bus_name().to_string(), metadata.clone());
        Some(metadata)
    }

    fn source_app_id(&self, player: &MprisPlayer) -> String {
        self.bus
            .get_property(player.bus_name(), ROOT_INTERFACE, "DesktopEntry")
            .ok()
            .and_then(|reply| parse_variant_string(&reply))
            .filter(|entry| !entry.is_empty())
            .unwrap_or_else(|| player.short_name().to_string())
    }

    fn release(&self, player: &MprisPlayer) {
        self.metadata_cache().remove(player.bus_name());
    }
}

/// Reachability of the session bus stands in for listener permission
pub struct MprisPermissions {
    bus: Arc<dyn BusClient>,
}

impl MprisPermissions {
    pub fn new(bus: Arc<dyn BusClient>) -> Self {
        Self { bus }
    }
}

impl PermissionFacility for MprisPermissions {
    fn is_listening_enabled(&self) -> bool {
        match self.bus.list_players() {
            Ok(_) => true,
            Err(e) => {
                warn!("Session bus not reachable: {}", e);
                false
            }
        }
    }

    fn open_listener_settings(&self) {
        info!("MPRIS needs no listener permission; make sure a D-Bus session bus is running");
    }
}

/// Polls the bus and reports players as notifications.
///
/// A player is posted when it appears and re-posted whenever its status or
/// metadata changes; it is removed when its bus name goes away.
pub struct MprisNotificationSource {
    bus: Arc<dyn BusClient>,
    config: MprisConfig,
    /// bus name -> status + metadata fingerprint
    known: HashMap<String, String>,
    pending: VecDeque<NotificationEvent<MprisPlayer>>,
    ticker: Interval,
}

impl MprisNotificationSource {
    /// Must be called inside a tokio runtime
    pub fn new(bus: Arc<dyn BusClient>, config: MprisConfig) -> Self {
        let mut ticker = interval(config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            bus,
            config,
            known: HashMap::new(),
            pending: VecDeque::new(),
            ticker,
        }
    }

    fn fingerprint(bus: &dyn BusClient, player: &str) -> String {
        let status = bus
            .get_property(player, PLAYER_INTERFACE, "PlaybackStatus")
            .ok()
            .and_then(|reply| parse_variant_string(&reply))
            .unwrap_or_default();
        let track = bus
            .get_property(player, PLAYER_INTERFACE, "Metadata")
            .map(|reply| {
                let mut entries: Vec<_> = parse_metadata_reply(&reply).into_iter().collect();
                entries.sort();
                format!("{:?}", entries)
            })
            .unwrap_or_default();
        format!("{}|{}", status, track)
    }

    /// Current players with their fingerprints; `None` if the bus is unreachable.
    ///
    /// The bus calls block, so they run on the blocking pool.
    fn scan(&self) -> impl Future<Output = Option<Vec<(String, String)>>> + Send + 'static {
        let bus = self.bus.clone();
        let config = self.config.clone();

        async move {
            let scanned = tokio::task::spawn_blocking(move || -> Result<Vec<(String, String)>> {
                let players = bus.list_players()?;
                Ok(players
                    .into_iter()
                    .filter(|player| !config.is_ignored(player))
                    .map(|player| {
                        let fingerprint = Self::fingerprint(bus.as_ref(), &player);
                        (player, fingerprint)
                    })
                    .collect())
            })
            .await;

            match scanned {
                Ok(Ok(players)) => Some(players),
                Ok(Err(e)) => {
                    warn!("Failed to list MPRIS players: {}", e);
                    None
                }
                Err(e) => {
                    warn!("MPRIS scan task failed: {}", e);
                    None
                }
            }
        }
    }

    /// Queue events for every difference between `current` and what was seen last
    fn diff(&mut self, current: Vec<(String, String)>) {
        let gone: Vec<String> = self
            .known
            .keys()
            .filter(|name| !current.iter().any(|(player, _)| player == *name))
            .cloned()
            .collect();

        for name in gone {
            self.known.remove(&name);
            debug!("Player {} went away", name);
            self.pending
                .push_back(NotificationEvent::Removed { key: name.into() });
        }

        for (name, fingerprint) in current {
            if self.known.get(&name) == Some(&fingerprint) {
                continue;
            }
            debug!("Player {} posted", name);
            self.known.insert(name.clone(), fingerprint);
            self.pending.push_back(NotificationEvent::Posted {
                key: name.clone().into(),
                handle: Some(MprisPlayer(name)),
                icon: None,
            });
        }
    }
}

#[async_trait]
impl NotificationSource for MprisNotificationSource {
    type Handle = MprisPlayer;

    async fn active_notifications(&mut self) -> Vec<ActiveNotification<MprisPlayer>> {
        let players = self.scan().await.unwrap_or_default();
        self.known = players.iter().cloned().collect();
        self.pending.clear();

        players
            .into_iter()
            .map(|(name, _)| ActiveNotification {
                key: name.clone().into(),
                handle: Some(MprisPlayer(name)),
                icon: None,
            })
            .collect()
    }

    async fn next_event(&mut self) -> Option<NotificationEvent<MprisPlayer>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            self.ticker.tick().await;
            if let Some(current) = self.scan().await {
                self.diff(current);
            }
        }
    }
}
