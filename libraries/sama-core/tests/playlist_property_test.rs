//! Property-based tests for playlist navigation
//!
//! Uses proptest to verify the cursor invariant across random navigation.

use proptest::prelude::*;
use sama_core::{Playlist, TrackRef};

// ===== Helpers =====

fn tracks(len: usize) -> Vec<TrackRef> {
    (0..len)
        .map(|i| TrackRef::new(format!("t{}", i).as_str(), format!("https://cdn.example.com/{}.mp3", i)))
        .collect()
}

#[derive(Debug, Clone)]
enum Step {
    Next,
    Previous,
    Select(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Next),
        Just(Step::Previous),
        (0usize..64).prop_map(Step::Select),
    ]
}

// ===== Property Tests =====

proptest! {
    /// Property: the cursor always points at a valid item
    #[test]
    fn cursor_always_in_bounds(
        len in 1usize..40,
        start in 0usize..40,
        steps in prop::collection::vec(step(), 0..100)
    ) {
        let start = start % len;
        let mut playlist = Playlist::starting_at(tracks(len), start).unwrap();

        for s in steps {
            match s {
                Step::Next => { playlist.next(); }
                Step::Previous => { playlist.previous(); }
                Step::Select(i) => { let _ = playlist.select(i); }
            }
            prop_assert!(playlist.current_index() < playlist.len());
        }
    }

    /// Property: next/previous never wrap around
    #[test]
    fn navigation_never_wraps(len in 1usize..40) {
        let mut playlist = Playlist::new(tracks(len)).unwrap();
        prop_assert!(playlist.previous().is_none());
        prop_assert_eq!(playlist.current_index(), 0);

        let mut advanced = 0;
        while playlist.next().is_some() {
            advanced += 1;
        }
        prop_assert_eq!(advanced, len - 1);
        prop_assert_eq!(playlist.current_index(), len - 1);
        prop_assert!(playlist.next().is_none());
        prop_assert_eq!(playlist.current_index(), len - 1);
    }

    /// Property: a refused move leaves the cursor where it was
    #[test]
    fn out_of_range_select_is_a_no_op(len in 1usize..40, start in 0usize..40, extra in 0usize..10) {
        let start = start % len;
        let mut playlist = Playlist::starting_at(tracks(len), start).unwrap();

        prop_assert!(playlist.select(len + extra).is_err());
        prop_assert_eq!(playlist.current_index(), start);
    }
}
