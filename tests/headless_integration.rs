use std::sync::{mpsc, Arc};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use typequote::app::{App, Notice};
use typequote::quote::{FixedQuote, QuoteError, QuoteSource};
use typequote::runtime::{AppEvent, Runner, TestEventSource};
use typequote::session::Session;

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn ctrl(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
}

/// Drives `app` with `runner` until `done` holds, stamping each event with
/// the clock returned by `clock`.
fn drive<F, C>(app: &mut App, runner: &Runner<TestEventSource>, mut clock: C, done: F)
where
    F: Fn(&App) -> bool,
    C: FnMut() -> SystemTime,
{
    for _ in 0..1_000u32 {
        let event = runner.step();
        app.handle_event(event, clock());
        if done(app) {
            return;
        }
    }
    panic!("app never reached the expected state");
}

// Headless integration using the runtime + App without a TTY
#[test]
fn headless_typing_flow_completes() {
    let mut app = App::new("hi there", Arc::new(FixedQuote::new("unused")));

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(5));
    for c in "hi there".chars() {
        tx.send(key(c)).unwrap();
    }

    // keystrokes 700ms apart on a fake clock; the 8th lands at 4900ms
    let mut ms = 0;
    drive(
        &mut app,
        &runner,
        || {
            let now = UNIX_EPOCH + Duration::from_millis(ms);
            ms += 700;
            now
        },
        |app| app.session().is_completed(),
    );

    let session = app.session();
    assert_eq!(session.error_count(), Some(0));
    assert_eq!(session.accuracy(), Some(100.0));
    // 2 words in 4.9s
    assert_eq!(session.words_per_minute(), Some(24));
}

#[test]
fn headless_retry_then_new_quote() {
    let mut app = App::new("abc", Arc::new(FixedQuote::new("next   quote")));

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(5));

    for c in "abx".chars() {
        tx.send(key(c)).unwrap();
    }
    drive(&mut app, &runner, SystemTime::now, |app| app.session().is_completed());
    assert_eq!(app.session().error_count(), Some(1));

    tx.send(key('r')).unwrap();
    drive(&mut app, &runner, SystemTime::now, |app| !app.session().is_completed());
    assert_eq!(app.session(), &Session::initialize("abc"));

    tx.send(ctrl('n')).unwrap();
    drive(&mut app, &runner, SystemTime::now, |app| {
        app.session().target() == "next quote"
    });
    assert_eq!(app.notice(), None);
    assert!(!app.session().has_started());
}

#[derive(Debug)]
struct Unreachable;

impl QuoteSource for Unreachable {
    fn fetch_quote(&self) -> Result<String, QuoteError> {
        std::thread::sleep(Duration::from_millis(20));
        Err(QuoteError::NoQuotes("unreachable".to_string()))
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

#[test]
fn headless_fetch_failure_keeps_progress() {
    let mut app = App::new("keep going", Arc::new(Unreachable));

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(5));

    tx.send(key('k')).unwrap();
    tx.send(key('e')).unwrap();
    tx.send(ctrl('n')).unwrap();
    drive(&mut app, &runner, SystemTime::now, |app| app.is_loading());
    assert_eq!(app.notice(), Some(Notice::Loading));

    drive(&mut app, &runner, SystemTime::now, |app| !app.is_loading());

    assert_eq!(app.notice(), Some(Notice::FetchFailed));
    assert_eq!(app.session().target(), "keep going");
    assert_eq!(app.session().input(), "ke");

    // typing carries on after the failure
    tx.send(key('e')).unwrap();
    drive(&mut app, &runner, SystemTime::now, |app| app.session().input() == "kee");
}
