use std::str::Chars;
use std::time::SystemTime;

use tracing::{debug, info};

use crate::metrics;

/// Where a target character stands relative to what has been typed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharStatus {
    Untyped,
    Correct,
    Incorrect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifiedChar {
    pub char: char,
    pub status: CharStatus,
}

/// One attempt at typing a target text.
///
/// Sessions are values: every transition returns a new `Session` and the
/// caller replaces the old one wholesale. Metrics are only present once the
/// session has completed.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    target: String,
    input: String,
    started_at: Option<SystemTime>,
    completed: bool,
    error_count: Option<usize>,
    elapsed_seconds: Option<f64>,
    words_per_minute: Option<u32>,
}

impl Session {
    /// Fresh session for `target`: nothing typed, clock not started.
    pub fn initialize(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            input: String::new(),
            started_at: None,
            completed: false,
            error_count: None,
            elapsed_seconds: None,
            words_per_minute: None,
        }
    }

    /// Same target, fresh state.
    pub fn reset(&self) -> Self {
        debug!(target_len = self.target_len(), "session reset");
        Self::initialize(self.target.clone())
    }

    /// Session for a newly supplied target. Nothing from any previous
    /// session carries over.
    pub fn regenerate_target(new_target: impl Into<String>) -> Self {
        let session = Self::initialize(new_target);
        debug!(target_len = session.target_len(), "session regenerated");
        session
    }

    /// Replace the typed text with `new_input` as observed at `now`.
    ///
    /// A completed session is returned unchanged. Input longer than the
    /// target is clamped to the target length. The clock starts on the first
    /// call that actually changes the input, and completion fires when the
    /// input length reaches the target length, whatever the content.
    pub fn apply_input(&self, new_input: &str, now: SystemTime) -> Self {
        if self.completed {
            return self.clone();
        }

        let target_len = self.target_len();
        let input: String = new_input.chars().take(target_len).collect();

        if target_len == 0 {
            // nothing to type: complete without ever starting the clock
            return self.complete(input, None, now);
        }

        if input == self.input {
            return self.clone();
        }

        let started_at = self.started_at.unwrap_or(now);

        if input.chars().count() == target_len {
            self.complete(input, Some(started_at), now)
        } else {
            Self {
                input,
                started_at: Some(started_at),
                ..self.clone()
            }
        }
    }

    fn complete(&self, input: String, started_at: Option<SystemTime>, now: SystemTime) -> Self {
        let error_count = metrics::error_count(&self.target, &input);
        let elapsed_ms = started_at.map(|start| {
            now.duration_since(start).unwrap_or_default().as_secs_f64() * 1000.0
        });
        let elapsed_seconds = elapsed_ms.map(|ms| ms / 1000.0);
        let words_per_minute = elapsed_ms
            .and_then(|ms| metrics::words_per_minute(metrics::word_count(&input), ms));

        info!(
            errors = error_count,
            elapsed_seconds = ?elapsed_seconds,
            wpm = ?words_per_minute,
            "session completed"
        );

        Self {
            target: self.target.clone(),
            input,
            started_at,
            completed: true,
            error_count: Some(error_count),
            elapsed_seconds,
            words_per_minute,
        }
    }

    /// Per-character view of the target against the current input.
    /// Cheap to call again; clone the iterator to walk it twice.
    pub fn classify_characters(&self) -> Classified<'_> {
        Classified {
            target: self.target.chars(),
            input: self.input.chars(),
        }
    }

    /// Index of the most recently typed character while typing is in
    /// progress.
    pub fn current_index(&self) -> Option<usize> {
        if self.completed {
            return None;
        }
        self.input_len().checked_sub(1)
    }

    /// True for a session with nothing to type. Such a session completes on
    /// its first `apply_input`, with an empty input.
    pub fn is_vacuous(&self) -> bool {
        !self.completed && self.target.is_empty()
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.error_count
            .map(|errors| metrics::accuracy(errors, self.target_len()))
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn target_len(&self) -> usize {
        self.target.chars().count()
    }

    pub fn input_len(&self) -> usize {
        self.input.chars().count()
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn error_count(&self) -> Option<usize> {
        self.error_count
    }

    pub fn elapsed_seconds(&self) -> Option<f64> {
        self.elapsed_seconds
    }

    pub fn words_per_minute(&self) -> Option<u32> {
        self.words_per_minute
    }
}

/// Iterator returned by [`Session::classify_characters`].
#[derive(Clone, Debug)]
pub struct Classified<'a> {
    target: Chars<'a>,
    input: Chars<'a>,
}

impl Iterator for Classified<'_> {
    type Item = ClassifiedChar;

    fn next(&mut self) -> Option<Self::Item> {
        let expected = self.target.next()?;
        let status = match self.input.next() {
            None => CharStatus::Untyped,
            Some(typed) if typed == expected => CharStatus::Correct,
            Some(_) => CharStatus::Incorrect,
        };
        Some(ClassifiedChar {
            char: expected,
            status,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.target.size_hint()
    }
}
