use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use tracing::{debug, warn};

/// Everything the app loop reacts to.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source: a reader thread forwarding crossterm events.
/// Only key presses are forwarded so terminals that report releases do not
/// type every character twice.
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
                Ok(_) => continue,
                Err(err) => {
                    warn!(error = %err, "terminal event reader stopped");
                    break;
                }
            };
            if tx.send(forwarded).is_err() {
                debug!("event receiver dropped");
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed event source for headless runs and tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the app one event at a time, producing a `Tick` whenever the
/// tick interval passes without input.
pub struct Runner<E: EventSource> {
    event_source: E,
    tick_rate: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(event_source: E, tick_rate: Duration) -> Self {
        Self {
            event_source,
            tick_rate,
        }
    }

    pub fn tick_rate(&self) -> Duration {
        self.tick_rate
    }

    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.tick_rate) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => AppEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => {
                // keep ticking so pending quote fetches still get polled
                std::thread::sleep(self.tick_rate);
                AppEvent::Tick
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(1));

        assert!(matches!(runner.step(), AppEvent::Tick));
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::Resize).unwrap();
        tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE)))
            .unwrap();
        let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(10));

        assert!(matches!(runner.step(), AppEvent::Resize));
        match runner.step() {
            AppEvent::Key(key) => assert_eq!(key.code, KeyCode::Char('a')),
            other => panic!("expected key event, got {other:?}"),
        }
    }

    #[test]
    fn step_ticks_after_source_disconnects() {
        let (tx, rx) = mpsc::channel::<AppEvent>();
        drop(tx);
        let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(1));

        assert!(matches!(runner.step(), AppEvent::Tick));
        assert_eq!(runner.tick_rate(), Duration::from_millis(1));
    }
}
