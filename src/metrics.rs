use serde::{Deserialize, Serialize};

/// Below this many minutes (~6ms) a recomputation keeps the previous figures.
pub const MIN_ELAPSED_MINUTES: f64 = 1e-4;

/// Characters per word used to normalise speeds.
pub const CHARS_PER_WORD: f64 = 5.0;

/// The live readout. Always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub wpm: u32,
    pub raw_wpm: u32,
    pub accuracy: u32,
}

impl Stats {
    pub const NEUTRAL: Stats = Stats {
        wpm: 0,
        raw_wpm: 0,
        accuracy: 100,
    };
}

impl Default for Stats {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Metrics {
    pub stats: Stats,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
}

/// Recompute the metrics for `input` typed against `target` over
/// `elapsed_minutes`. Under the epsilon guard the previous metrics are
/// returned unchanged.
pub fn compute(previous: Metrics, target: &str, input: &str, elapsed_minutes: f64) -> Metrics {
    if elapsed_minutes <= MIN_ELAPSED_MINUTES {
        return previous;
    }

    let total_chars = input.chars().count();
    let correct_chars = correct_chars(target, input);

    let raw_wpm = per_minute(total_chars, elapsed_minutes);
    let wpm = per_minute(correct_chars, elapsed_minutes);
    let accuracy = if total_chars > 0 {
        ((correct_chars as f64 / total_chars as f64) * 100.0).round() as u32
    } else {
        100
    };

    Metrics {
        stats: Stats {
            wpm,
            raw_wpm,
            accuracy,
        },
        correct_chars,
        incorrect_chars: total_chars - correct_chars,
    }
}

/// Positions of `input` that hold the same character as `target`.
pub fn correct_chars(target: &str, input: &str) -> usize {
    input
        .chars()
        .zip(target.chars())
        .filter(|(typed, expected)| typed == expected)
        .count()
}

fn per_minute(chars: usize, elapsed_minutes: f64) -> u32 {
    ((chars as f64 / CHARS_PER_WORD) / elapsed_minutes).round() as u32
}

/// How even the per-second pace was, 0..=100. Needs at least two samples
/// and some typing.
pub fn consistency(per_second: &[u32]) -> Option<f64> {
    if per_second.len() < 2 {
        return None;
    }
    let samples: Vec<f64> = per_second.iter().map(|&n| n as f64).collect();
    let mean = mean(&samples)?;
    if mean <= 0.0 {
        return None;
    }
    let variation = std_dev(&samples)? / mean;

    Some((100.0 * (1.0 - variation)).clamp(0.0, 100.0).round())
}

fn mean(data: &[f64]) -> Option<f64> {
    match data.len() {
        0 => None,
        count => Some(data.iter().sum::<f64>() / count as f64),
    }
}

fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIX_SECONDS: f64 = 0.1;

    #[test]
    fn test_perfect_run() {
        let m = compute(Metrics::default(), "hello world", "hello world", SIX_SECONDS);

        assert_eq!(m.correct_chars, 11);
        assert_eq!(m.incorrect_chars, 0);
        assert_eq!(
            m.stats,
            Stats {
                wpm: 22,
                raw_wpm: 22,
                accuracy: 100
            }
        );
    }

    #[test]
    fn test_one_mismatch() {
        let m = compute(Metrics::default(), "hello world", "hallo world", SIX_SECONDS);

        assert_eq!(m.correct_chars, 10);
        assert_eq!(m.incorrect_chars, 1);
        assert_eq!(m.stats.raw_wpm, 22);
        assert_eq!(m.stats.wpm, 20);
        assert_eq!(m.stats.accuracy, 91);
    }

    #[test]
    fn test_epsilon_guard_keeps_previous() {
        let previous = Metrics {
            stats: Stats {
                wpm: 40,
                raw_wpm: 45,
                accuracy: 90,
            },
            correct_chars: 9,
            incorrect_chars: 1,
        };

        assert_eq!(compute(previous, "abc", "", 0.0), previous);
        assert_eq!(compute(previous, "abc", "abc", MIN_ELAPSED_MINUTES), previous);
    }

    #[test]
    fn test_empty_input_is_fully_accurate() {
        let m = compute(Metrics::default(), "abc", "", 1.0);

        assert_eq!(m.stats, Stats::NEUTRAL);
    }

    #[test]
    fn test_input_longer_than_target() {
        let m = compute(Metrics::default(), "ab", "abc", 1.0);

        assert_eq!(m.correct_chars, 2);
        assert_eq!(m.incorrect_chars, 1);
        assert_eq!(m.stats.accuracy, 67);
    }

    #[test]
    fn test_wpm_never_exceeds_raw() {
        for (target, input, minutes) in [
            ("the quick brown fox", "teh quick", 0.05),
            ("abc", "xyz", 0.5),
            ("a b c", "a b c", 0.001),
            ("hello", "hellooooo", 2.0),
        ] {
            let m = compute(Metrics::default(), target, input, minutes);
            assert!(m.stats.wpm <= m.stats.raw_wpm, "{input} vs {target}");
            assert!(m.stats.accuracy <= 100);
        }
    }

    #[test]
    fn test_multibyte_characters_count_once() {
        assert_eq!(correct_chars("héllo", "héllo"), 5);
        let m = compute(Metrics::default(), "héllo", "héllo", 0.1);
        assert_eq!(m.stats.raw_wpm, 10);
    }

    #[test]
    fn test_consistency_even_pace() {
        assert_eq!(consistency(&[5, 5, 5, 5]), Some(100.0));
    }

    #[test]
    fn test_consistency_uneven_pace() {
        // mean 5, std dev 2
        assert_eq!(consistency(&[3, 7, 3, 7]), Some(60.0));
    }

    #[test]
    fn test_consistency_needs_samples() {
        assert_eq!(consistency(&[]), None);
        assert_eq!(consistency(&[4]), None);
        assert_eq!(consistency(&[0, 0, 0]), None);
    }

    #[test]
    fn test_consistency_floors_at_zero() {
        assert_eq!(consistency(&[0, 0, 0, 40]), Some(0.0));
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[100., 120., 90., 102., 94.]), Some(10.322790320451151));
        assert_eq!(std_dev(&[]), None);
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
    }
}
