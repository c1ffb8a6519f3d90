/// Drives a spawned session and renders its event feed as text
use crate::error::Result;
use sama_core::Playlist;
use sama_playback::{PlaybackFault, SessionEvent, SessionHandle, SessionSnapshot, SessionStatus};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Format milliseconds as `m:ss`
pub fn format_ms(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn describe_fault(fault: &PlaybackFault) -> String {
    match fault {
        PlaybackFault::LoadFailure {
            track_id,
            attempts,
            message,
        } => format!("could not load {track_id} after {attempts} attempts: {message}"),
        PlaybackFault::PlaybackControlFailure { operation, message } => {
            format!("{operation} failed: {message}")
        }
        PlaybackFault::ResourceUnusable { track_id, message } => {
            format!("{track_id} stopped playing: {message}")
        }
    }
}

/// One display line per event; `None` for events not worth printing
pub fn describe(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::StatusChanged { status, track_id } => Some(match track_id {
            Some(id) => format!("[{status}] {id}"),
            None => format!("[{status}]"),
        }),
        SessionEvent::TrackChanged { track_id, .. } => Some(format!("Loading {track_id}")),
        SessionEvent::Progress {
            position_ms,
            duration_ms,
            progress,
        } => Some(format!(
            "  {} / {} ({:.0}%)",
            format_ms(*position_ms),
            format_ms(*duration_ms),
            progress * 100.0
        )),
        SessionEvent::Buffering { is_buffering } => Some(if *is_buffering {
            "  buffering...".to_string()
        } else {
            "  buffering done".to_string()
        }),
        SessionEvent::LoadRetry {
            track_id,
            attempt,
            max_attempts,
            message,
        } => Some(format!(
            "  retrying {track_id} ({attempt}/{max_attempts} failed): {message}"
        )),
        SessionEvent::Fault { fault } => Some(format!("error: {}", describe_fault(fault))),
        SessionEvent::PlaylistChanged {
            length,
            current_index,
        } => Some(format!("Track {} of {}", current_index + 1, length)),
        SessionEvent::Seeked { .. } => None,
    }
}

/// Play `playlist` and report every event to `out` until the session
/// settles in Idle (playlist done) or Error (load gave up)
pub async fn play(
    handle: &SessionHandle,
    playlist: Playlist,
    mut out: impl FnMut(String),
) -> Result<SessionSnapshot> {
    let mut events = handle.subscribe();
    handle.play_playlist(playlist).await?;

    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(line) = describe(&event) {
                    out(line);
                }
                if let SessionEvent::StatusChanged {
                    status: SessionStatus::Idle | SessionStatus::Error,
                    ..
                } = event
                {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event feed lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }

    Ok(handle.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(0), "0:00");
        assert_eq!(format_ms(61_500), "1:01");
        assert_eq!(format_ms(600_000), "10:00");
    }

    #[test]
    fn test_describe_progress() {
        let line = describe(&SessionEvent::Progress {
            position_ms: 90_000,
            duration_ms: 180_000,
            progress: 0.5,
        });
        assert_eq!(line.as_deref(), Some("  1:30 / 3:00 (50%)"));
    }

    #[test]
    fn test_seeked_is_silent() {
        assert!(describe(&SessionEvent::Seeked { position_ms: 5 }).is_none());
    }

    #[test]
    fn test_describe_load_failure() {
        let line = describe(&SessionEvent::Fault {
            fault: PlaybackFault::LoadFailure {
                track_id: "t1".into(),
                attempts: 3,
                message: "404".into(),
            },
        })
        .unwrap();
        assert_eq!(line, "error: could not load t1 after 3 attempts: 404");
    }
}
