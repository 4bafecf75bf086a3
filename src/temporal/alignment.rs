//! Timestamp alignment rules for the two-stream join.
//!
//! The join is driven by the input stream: each input frame is either paired
//! with one logo frame or discarded. Both streams are assumed to be
//! monotonic, which is what lets a head frame be dropped as soon as it falls
//! behind the other stream.

use super::timestamp::Timestamp;
use std::time::Duration;

/// Strategy for deciding whether two head frames belong together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentStrategy {
    /// Match frames with exactly equal timestamps.
    Exact,
    /// Match the input frame with the nearest logo frame within a window.
    ///
    /// Ties go to the earlier logo frame.
    Nearest(Duration),
}

impl Default for AlignmentStrategy {
    fn default() -> Self {
        AlignmentStrategy::Nearest(Duration::from_millis(20))
    }
}

/// What to do with the two queue heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Pop both heads as one aligned pair.
    Match,
    /// The input head can never be paired; discard it.
    DropInput,
    /// The logo head can never be paired; discard it.
    DropLogo,
    /// A better logo frame may still arrive.
    Wait,
}

/// The logo stream as seen from the input head.
#[derive(Debug, Clone, Copy)]
pub struct LogoHeads {
    /// Timestamp of the oldest queued logo frame.
    pub head: Timestamp,
    /// Timestamp of the frame after it, if already queued.
    pub next: Option<Timestamp>,
    /// Whether the logo stream has ended.
    pub ended: bool,
}

impl AlignmentStrategy {
    /// Decide how the input head relates to the logo heads.
    pub fn align(&self, input: Timestamp, logo: LogoHeads) -> Alignment {
        match *self {
            AlignmentStrategy::Exact => align_exact(input, logo.head),
            AlignmentStrategy::Nearest(window) => align_nearest(input, logo, window),
        }
    }
}

fn align_exact(input: Timestamp, logo: Timestamp) -> Alignment {
    if input == logo {
        Alignment::Match
    } else if input < logo {
        Alignment::DropInput
    } else {
        Alignment::DropLogo
    }
}

fn align_nearest(input: Timestamp, logo: LogoHeads, window: Duration) -> Alignment {
    if logo.head + window < input {
        return Alignment::DropLogo;
    }
    if input + window < logo.head {
        return Alignment::DropInput;
    }
    // Every later logo frame is at least as far away.
    if logo.head >= input {
        return Alignment::Match;
    }

    match logo.next {
        Some(next) => {
            let closer = next.abs_diff(&input) < logo.head.abs_diff(&input);
            if closer && next.within_tolerance(&input, window) {
                Alignment::DropLogo
            } else {
                Alignment::Match
            }
        }
        None if logo.ended => Alignment::Match,
        None => Alignment::Wait,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heads(head: i64, next: Option<i64>, ended: bool) -> LogoHeads {
        LogoHeads {
            head: Timestamp::from_millis(head),
            next: next.map(Timestamp::from_millis),
            ended,
        }
    }

    fn ms(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    #[test]
    fn test_default_strategy() {
        assert_eq!(
            AlignmentStrategy::default(),
            AlignmentStrategy::Nearest(Duration::from_millis(20))
        );
    }

    #[test]
    fn test_exact() {
        let exact = AlignmentStrategy::Exact;
        assert_eq!(exact.align(ms(40), heads(40, None, false)), Alignment::Match);
        assert_eq!(exact.align(ms(40), heads(41, None, false)), Alignment::DropInput);
        assert_eq!(exact.align(ms(40), heads(39, None, false)), Alignment::DropLogo);
    }

    #[test]
    fn test_nearest_outside_window() {
        let nearest = AlignmentStrategy::Nearest(Duration::from_millis(10));
        assert_eq!(nearest.align(ms(100), heads(80, None, false)), Alignment::DropLogo);
        assert_eq!(nearest.align(ms(100), heads(120, None, false)), Alignment::DropInput);
    }

    #[test]
    fn test_nearest_logo_ahead_matches_immediately() {
        let nearest = AlignmentStrategy::Nearest(Duration::from_millis(10));
        assert_eq!(nearest.align(ms(100), heads(105, None, false)), Alignment::Match);
        assert_eq!(nearest.align(ms(100), heads(100, None, false)), Alignment::Match);
    }

    #[test]
    fn test_nearest_logo_behind_waits_for_successor() {
        let nearest = AlignmentStrategy::Nearest(Duration::from_millis(10));
        assert_eq!(nearest.align(ms(100), heads(95, None, false)), Alignment::Wait);
        assert_eq!(nearest.align(ms(100), heads(95, None, true)), Alignment::Match);
    }

    #[test]
    fn test_nearest_prefers_closer_successor() {
        let nearest = AlignmentStrategy::Nearest(Duration::from_millis(10));
        assert_eq!(
            nearest.align(ms(100), heads(92, Some(99), false)),
            Alignment::DropLogo
        );
        assert_eq!(
            nearest.align(ms(100), heads(95, Some(108), false)),
            Alignment::Match
        );
    }

    #[test]
    fn test_nearest_tie_goes_to_earlier_logo() {
        let nearest = AlignmentStrategy::Nearest(Duration::from_millis(10));
        assert_eq!(
            nearest.align(ms(100), heads(95, Some(105), false)),
            Alignment::Match
        );
    }
}
