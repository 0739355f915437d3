// Terminal frontend for the input hub
//
// A raw-mode crossterm session with bracketed paste. Key presses are stamped
// with the time they were read and forwarded to the InputHub on a dedicated
// std thread, since crossterm's reader blocks. If the terminal stops delivering
// events the thread signals shutdown, as Ctrl-C could no longer arrive.

use super::{InputHub, Key, KeyInput, PasteInput};
use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::{cursor, execute, terminal};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Raw mode + alternate screen, restored on drop
pub struct TerminalSession {
    _private: (),
}

impl TerminalSession {
    pub fn start() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        execute!(
            io::stdout(),
            terminal::EnterAlternateScreen,
            EnableBracketedPaste,
            cursor::Hide
        )
        .context("Failed to prepare terminal")?;

        tracing::debug!("Terminal session started");
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(
            io::stdout(),
            cursor::Show,
            DisableBracketedPaste,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
        tracing::debug!("Terminal session restored");
    }
}

/// Map a crossterm key event to a station key; releases and repeats are ignored
pub fn translate_key(event: &KeyEvent) -> Option<Key> {
    if event.kind != KeyEventKind::Press {
        return None;
    }

    let key = match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Key::Interrupt,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Left => Key::ArrowLeft,
        KeyCode::Right => Key::ArrowRight,
        KeyCode::Esc => Key::Escape,
        _ => Key::Other,
    };
    Some(key)
}

/// Wait up to `timeout` for the next terminal event
fn next_event(timeout: Duration) -> io::Result<Option<Event>> {
    if event::poll(timeout)? {
        event::read().map(Some)
    } else {
        Ok(None)
    }
}

/// Background thread reading terminal events into an [`InputHub`]
pub struct TerminalReader {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TerminalReader {
    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Start reading. `shutdown` is notified if the terminal fails.
    pub fn spawn(hub: InputHub, shutdown: Arc<Notify>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("spielviel-input".to_string())
            .spawn(move || Self::read_loop(&hub, &stop_flag, &shutdown, next_event))
            .context("Failed to spawn terminal input thread")?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    fn read_loop<F>(hub: &InputHub, stop: &AtomicBool, shutdown: &Notify, mut next: F)
    where
        F: FnMut(Duration) -> io::Result<Option<Event>>,
    {
        tracing::debug!("Terminal input thread started");

        while !stop.load(Ordering::Relaxed) {
            match next(Self::POLL_INTERVAL) {
                Ok(Some(Event::Key(key_event))) => {
                    if let Some(key) = translate_key(&key_event) {
                        hub.dispatch_key(KeyInput::new(key, Instant::now()));
                    }
                }
                Ok(Some(Event::Paste(text))) => {
                    hub.dispatch_paste(PasteInput::new(text, Instant::now()));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Terminal input failed, requesting shutdown: {}", e);
                    shutdown.notify_one();
                    break;
                }
            }
        }

        tracing::debug!("Terminal input thread stopped");
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Terminal input thread panicked");
            }
        }
    }
}

impl Drop for TerminalReader {
    fn drop(&mut self) {
        self.stop();
    }
}
