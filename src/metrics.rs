use std::fmt;

use crate::session::Session;

const MS_PER_MINUTE: f64 = 60_000.0;

/// Number of whitespace separated words. Blank text has no words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Words per minute rounded to the nearest whole number. `None` when no time
/// has passed, since the rate is undefined.
pub fn words_per_minute(words: usize, elapsed_ms: f64) -> Option<u32> {
    if elapsed_ms <= 0.0 {
        return None;
    }
    let wpm = words as f64 / (elapsed_ms / MS_PER_MINUTE);
    Some(wpm.round() as u32)
}

/// Positions in `target` whose character differs from `input` at the same
/// position. A position with nothing typed counts as an error.
pub fn error_count(target: &str, input: &str) -> usize {
    let mut typed = input.chars();
    target
        .chars()
        .filter(|expected| typed.next() != Some(*expected))
        .count()
}

/// Share of correctly placed characters as a percentage.
pub fn accuracy(error_count: usize, target_len: usize) -> f64 {
    if target_len == 0 {
        return 100.0;
    }
    (1.0 - error_count as f64 / target_len as f64) * 100.0
}

/// Results of a completed session, ready for display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    pub elapsed_seconds: Option<f64>,
    pub wpm: Option<u32>,
    pub errors: usize,
    pub accuracy: f64,
}

impl Summary {
    pub fn from_session(session: &Session) -> Option<Self> {
        let errors = session.error_count()?;
        Some(Self {
            elapsed_seconds: session.elapsed_seconds(),
            wpm: session.words_per_minute(),
            errors,
            accuracy: accuracy(errors, session.target_len()),
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.wpm {
            Some(wpm) => write!(f, "{wpm} wpm")?,
            None => write!(f, "- wpm")?,
        }
        write!(f, " | {} errors | {:.1}% acc", self.errors, self.accuracy)?;
        if let Some(secs) = self.elapsed_seconds {
            write!(f, " | {secs:.2}s")?;
        }
        Ok(())
    }
}
