use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

use crate::fetcher::QuoteFetcher;
use crate::quote::QuoteSource;
use crate::runtime::AppEvent;
use crate::session::Session;

/// Transient message shown under the target text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Loading,
    FetchFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Loading => write!(f, "Loading quote..."),
            Notice::FetchFailed => write!(f, "Failed to generate quote. Try again."),
        }
    }
}

/// Owns the live session and turns user actions into session transitions.
#[derive(Debug)]
pub struct App {
    session: Session,
    fetcher: QuoteFetcher,
    notice: Option<Notice>,
    should_quit: bool,
}

impl App {
    pub fn new(initial_target: impl Into<String>, source: Arc<dyn QuoteSource>) -> Self {
        let mut app = Self {
            session: Session::initialize(String::new()),
            fetcher: QuoteFetcher::new(source),
            notice: None,
            should_quit: false,
        };
        app.install(Session::initialize(initial_target));
        app
    }

    /// Swap in a new session. One with nothing to type is finished on the
    /// spot.
    fn install(&mut self, session: Session) {
        self.session = if session.is_vacuous() {
            session.apply_input("", SystemTime::now())
        } else {
            session
        };
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notice
    }

    pub fn is_loading(&self) -> bool {
        self.fetcher.is_loading()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Append `c` to the input. Ignored once the session is complete or the
    /// input already covers the whole target.
    pub fn type_char(&mut self, c: char, now: SystemTime) {
        if self.session.is_completed() || self.session.input_len() >= self.session.target_len() {
            return;
        }
        let mut next = self.session.input().to_string();
        next.push(c);
        self.session = self.session.apply_input(&next, now);
    }

    pub fn backspace(&mut self, now: SystemTime) {
        if self.session.is_completed() {
            return;
        }
        let mut next = self.session.input().to_string();
        if next.pop().is_some() {
            self.session = self.session.apply_input(&next, now);
        }
    }

    /// Retry the same target from scratch.
    pub fn retry(&mut self) {
        info!("retrying current target");
        let fresh = self.session.reset();
        self.install(fresh);
    }

    /// Ask the quote source for a new target. Refused while a previous
    /// request is still loading.
    pub fn request_new_quote(&mut self) -> bool {
        if !self.fetcher.request() {
            return false;
        }
        self.notice = Some(Notice::Loading);
        true
    }

    /// Pick up a finished quote fetch, if any. Returns true when something
    /// visible changed.
    pub fn poll_quote(&mut self) -> bool {
        match self.fetcher.poll() {
            Some(Ok(text)) => {
                info!(len = text.chars().count(), "new target installed");
                self.notice = None;
                self.install(Session::regenerate_target(text));
                true
            }
            Some(Err(err)) => {
                warn!(error = %err, source = self.fetcher.source_name(), "quote fetch failed");
                self.notice = Some(Notice::FetchFailed);
                true
            }
            None => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: SystemTime) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => self.quit(),
            KeyCode::Char('c') if ctrl => self.quit(),
            KeyCode::Char('r') if ctrl => self.retry(),
            KeyCode::Char('n') if ctrl => {
                self.request_new_quote();
            }
            KeyCode::Left => self.retry(),
            KeyCode::Right => {
                self.request_new_quote();
            }
            KeyCode::Char('r') if self.session.is_completed() => self.retry(),
            KeyCode::Char('n') if self.session.is_completed() => {
                self.request_new_quote();
            }
            KeyCode::Char(c) if !ctrl => self.type_char(c, now),
            KeyCode::Backspace => self.backspace(now),
            other => debug!(key = ?other, "ignored key"),
        }
    }

    /// Feed one runtime event through the app. Returns true when the screen
    /// should be redrawn.
    pub fn handle_event(&mut self, event: AppEvent, now: SystemTime) -> bool {
        match event {
            AppEvent::Key(key) => {
                self.handle_key(key, now);
                true
            }
            AppEvent::Resize => true,
            AppEvent::Tick => {
                let changed = self.poll_quote();
                // the live timer needs a redraw every tick while typing
                let timing = self.session.has_started() && !self.session.is_completed();
                changed || timing || self.is_loading()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{FixedQuote, QuoteError};
    use std::sync::mpsc::{self, Receiver};
    use std::sync::Mutex;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(ms: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(ms)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn app(target: &str) -> App {
        App::new(target, Arc::new(FixedQuote::new("fresh quote")))
    }

    /// Polls until the in-flight fetch lands.
    fn settle(app: &mut App) {
        for _ in 0..500 {
            if app.poll_quote() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("quote fetch never finished");
    }

    #[derive(Debug)]
    struct FailingSource;

    impl QuoteSource for FailingSource {
        fn fetch_quote(&self) -> Result<String, QuoteError> {
            Err(QuoteError::Empty)
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[derive(Debug)]
    struct GatedSource {
        gate: Mutex<Receiver<()>>,
    }

    impl QuoteSource for GatedSource {
        fn fetch_quote(&self) -> Result<String, QuoteError> {
            self.gate.lock().unwrap().recv().unwrap();
            Ok("gated quote".to_string())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    #[test]
    fn typing_completes_the_session() {
        let mut app = app("hi there");
        for (i, c) in "hi there".chars().enumerate() {
            app.type_char(c, at(i as u64 * 700));
        }
        let session = app.session();

        assert!(session.is_completed());
        assert_eq!(session.error_count(), Some(0));
        assert!((session.elapsed_seconds().unwrap() - 4.9).abs() < 1e-9);
    }

    #[test]
    fn keys_after_completion_are_ignored() {
        let mut app = app("ab");
        app.type_char('a', at(0));
        app.type_char('b', at(100));
        let done = app.session().clone();

        app.type_char('c', at(200));
        app.backspace(at(300));
        app.handle_key(key(KeyCode::Char('x')), at(400));

        assert_eq!(app.session(), &done);
    }

    #[test]
    fn backspace_edits_input_without_restarting_clock() {
        let mut app = app("cat");
        app.type_char('c', at(0));
        app.type_char('x', at(100));
        app.backspace(at(200));

        assert_eq!(app.session().input(), "c");
        assert_eq!(app.session().started_at(), Some(at(0)));

        app.type_char('a', at(300));
        app.type_char('t', at(400));
        assert_eq!(app.session().error_count(), Some(0));
    }

    #[test]
    fn backspace_on_empty_input_does_not_start_clock() {
        let mut app = app("cat");
        app.backspace(at(50));

        assert!(!app.session().has_started());
    }

    #[test]
    fn retry_keeps_target() {
        let mut app = app("hello");
        app.type_char('h', at(0));
        app.handle_key(ctrl('r'), at(100));

        assert_eq!(app.session(), &Session::initialize("hello"));
    }

    #[test]
    fn r_retries_only_after_completion() {
        let mut app = app("ro");
        app.handle_key(key(KeyCode::Char('r')), at(0));
        assert_eq!(app.session().input(), "r");

        app.handle_key(key(KeyCode::Char('x')), at(100));
        assert!(app.session().is_completed());

        app.handle_key(key(KeyCode::Char('r')), at(200));
        assert_eq!(app.session(), &Session::initialize("ro"));
    }

    #[test]
    fn new_quote_replaces_session() {
        let mut app = app("old");
        app.type_char('o', at(0));

        assert!(app.request_new_quote());
        assert_eq!(app.notice(), Some(Notice::Loading));
        settle(&mut app);

        assert_eq!(app.session(), &Session::initialize("fresh quote"));
        assert_eq!(app.notice(), None);
        assert!(!app.is_loading());
    }

    #[test]
    fn failed_fetch_leaves_session_untouched() {
        let mut app = App::new("keep me", Arc::new(FailingSource));
        app.type_char('k', at(0));
        let before = app.session().clone();

        app.handle_key(ctrl('n'), at(10));
        settle(&mut app);

        assert_eq!(app.session(), &before);
        assert_eq!(app.notice(), Some(Notice::FetchFailed));
        assert_eq!(
            app.notice().unwrap().to_string(),
            "Failed to generate quote. Try again."
        );
    }

    #[test]
    fn new_quote_refused_while_loading() {
        let (open, gate) = mpsc::channel();
        let mut app = App::new(
            "abc",
            Arc::new(GatedSource {
                gate: Mutex::new(gate),
            }),
        );

        assert!(app.request_new_quote());
        assert!(!app.request_new_quote());
        assert!(app.handle_event(AppEvent::Tick, at(0)));

        open.send(()).unwrap();
        settle(&mut app);
        assert_eq!(app.session().target(), "gated quote");
    }

    #[test]
    fn typing_continues_while_loading() {
        let (open, gate) = mpsc::channel();
        let mut app = App::new(
            "abc",
            Arc::new(GatedSource {
                gate: Mutex::new(gate),
            }),
        );

        app.handle_key(key(KeyCode::Right), at(0));
        app.type_char('a', at(10));
        assert_eq!(app.session().input(), "a");

        open.send(()).unwrap();
        settle(&mut app);
        assert_eq!(app.session().input(), "");
    }

    #[test]
    fn empty_target_is_finished_on_arrival() {
        let app = app("");

        assert!(app.session().is_completed());
        assert_eq!(app.session().error_count(), Some(0));
        assert_eq!(app.session().words_per_minute(), None);
    }

    #[test]
    fn input_never_exceeds_target() {
        let mut app = app("ab");
        app.type_char('a', at(0));
        app.type_char('x', at(10));
        app.type_char('y', at(20));

        assert_eq!(app.session().input(), "ax");
    }

    #[test]
    fn quit_keys() {
        let mut app = app("abc");
        app.handle_key(key(KeyCode::Esc), at(0));
        assert!(app.should_quit());

        let mut app = self::app("abc");
        app.handle_key(ctrl('c'), at(0));
        assert!(app.should_quit());
    }

    #[test]
    fn control_chars_are_not_typed() {
        let mut app = app("abc");
        app.handle_key(ctrl('a'), at(0));

        assert_eq!(app.session().input(), "");
    }

    #[test]
    fn tick_redraws_only_when_needed() {
        let mut app = app("abc");
        assert!(!app.handle_event(AppEvent::Tick, at(0)));

        app.type_char('a', at(0));
        assert!(app.handle_event(AppEvent::Tick, at(100)));
        assert!(app.handle_event(AppEvent::Resize, at(100)));
    }
}
