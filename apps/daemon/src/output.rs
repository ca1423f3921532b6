//! Host transport writing one JSON object per emitted event
use nowplaying_core::{HostTransport, TrackEvent, TrackSnapshot};
use std::io::Write;
use std::sync::Mutex;

pub struct JsonLinesTransport<W> {
    out: Mutex<W>,
}

impl JsonLinesTransport<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonLinesTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn write_line(&self, track: Option<&TrackSnapshot>) -> anyhow::Result<()> {
        let event = TrackEvent {
            track: track.cloned(),
        };
        let line = serde_json::to_string(&event)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("output lock poisoned"))?;
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap()
    }
}

impl<W: Write + Send> HostTransport for JsonLinesTransport<W> {
    fn emit_track(&self, track: Option<&TrackSnapshot>) {
        if let Err(e) = self.write_line(track) {
            tracing::warn!("Failed to write track event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowplaying_core::{PlaybackStateKind, TrackIdentity};

    #[test]
    fn test_writes_one_line_per_event() {
        let transport = JsonLinesTransport::new(Vec::new());
        let snapshot = TrackSnapshot {
            id: TrackIdentity::derive(Some("A"), Some("X"), Some("Z"), ""),
            source: "spotify".to_string(),
            state: PlaybackStateKind::Paused,
            album: Some("Z".to_string()),
            title: Some("A".to_string()),
            artist: Some("X".to_string()),
            genre: None,
            duration_millis: 0,
            position_millis: 0,
            artwork: None,
            source_icon: None,
        };

        transport.emit_track(Some(&snapshot));
        transport.emit_track(None);

        let written = String::from_utf8(transport.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["track"]["id"], "A:X:Z");
        assert_eq!(lines[0]["track"]["state"], "paused");
        assert!(lines[1]["track"].is_null());
    }
}
