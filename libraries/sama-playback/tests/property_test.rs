//! Property-based tests for the playback session
//!
//! Runs random command sequences against a session on a paused clock and
//! checks the state invariants after every step.

use proptest::prelude::*;
use sama_core::{Playlist, TrackRef};
use sama_playback::{
    clamp_seek, LoadScript, PlaybackSession, SessionConfig, SessionStatus, SimulatedBackend,
};
use std::time::Duration;

// ===== Helpers =====

#[derive(Debug, Clone)]
enum Op {
    Load(usize),
    Playlist(usize),
    Play,
    Pause,
    Toggle,
    Seek(i64),
    SkipBy(i64),
    Next,
    Previous,
    Retry,
    Stop,
    Finish,
    Advance(u64),
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4).prop_map(Op::Load),
        (0usize..4).prop_map(Op::Playlist),
        Just(Op::Play),
        Just(Op::Pause),
        Just(Op::Toggle),
        (-50_000i64..250_000).prop_map(Op::Seek),
        (-50_000i64..50_000).prop_map(Op::SkipBy),
        Just(Op::Next),
        Just(Op::Previous),
        Just(Op::Retry),
        Just(Op::Stop),
        Just(Op::Finish),
        (0u64..5_000).prop_map(Op::Advance),
    ]
}

fn catalog() -> Vec<TrackRef> {
    (0..4)
        .map(|i| {
            TrackRef::new(format!("t{i}"), format!("sim://t{i}"))
                .with_known_duration_ms(20_000 + i as u64 * 10_000)
        })
        .collect()
}

fn backend() -> SimulatedBackend {
    let backend = SimulatedBackend::new().with_prepare_delay(Duration::from_millis(50));
    backend.script("sim://t1", LoadScript::FailTimes(1));
    backend.script("sim://t3", LoadScript::FailAlways);
    backend
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

// ===== Property Tests =====

proptest! {
    /// Property: Seek clamping never leaves [0, duration]
    #[test]
    fn seek_target_always_clamped(target in any::<i64>(), duration in 0u64..10_000_000) {
        let position = clamp_seek(target, duration);

        prop_assert!(position <= duration);
        if target >= 0 && (target as u64) <= duration {
            prop_assert_eq!(position, target as u64);
        }
    }

    /// Property: Session invariants hold after any command sequence
    #[test]
    fn session_invariants_hold(ops in prop::collection::vec(arbitrary_op(), 1..40)) {
        let rt = runtime();
        rt.block_on(async {
            let backend = backend();
            let tracks = catalog();
            let mut session =
                PlaybackSession::new(backend.clone(), SessionConfig::default()).unwrap();

            for op in ops {
                // Rejections are part of the property; only state matters
                match op {
                    Op::Load(i) => { let _ = session.load_track(tracks[i].clone()); }
                    Op::Playlist(start) => {
                        let playlist = Playlist::starting_at(tracks.clone(), start).unwrap();
                        let _ = session.play_playlist(playlist);
                    }
                    Op::Play => { let _ = session.play(); }
                    Op::Pause => { let _ = session.pause(); }
                    Op::Toggle => { let _ = session.toggle_playback(); }
                    Op::Seek(ms) => { let _ = session.seek(ms); }
                    Op::SkipBy(ms) => { let _ = session.skip_by(ms); }
                    Op::Next => { let _ = session.next(); }
                    Op::Previous => { let _ = session.previous(); }
                    Op::Retry => { let _ = session.retry(); }
                    Op::Stop => { let _ = session.stop(); }
                    Op::Finish => { backend.finish_active(); }
                    Op::Advance(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                }
                session.process_pending();

                let snapshot = session.snapshot();
                prop_assert_eq!(
                    snapshot.active_track.is_some(),
                    snapshot.status != SessionStatus::Idle
                );
                if snapshot.duration_ms > 0 {
                    prop_assert!(snapshot.position_ms <= snapshot.duration_ms);
                } else {
                    prop_assert_eq!(snapshot.position_ms, 0);
                }
                prop_assert!(snapshot.retry_count < 3);
                prop_assert!(backend.playing_resources() <= 1);
                if snapshot.status != SessionStatus::Playing {
                    prop_assert_eq!(backend.playing_resources(), 0);
                }
            }

            session.stop().unwrap();
            session.process_pending();
            tokio::time::sleep(Duration::from_secs(60)).await;
            session.process_pending();
            prop_assert_eq!(backend.live_resources(), 0);
            Ok(())
        })?;
    }
}
