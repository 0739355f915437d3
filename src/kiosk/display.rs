use super::{Slide, SlideRotator, SlideTimer};
use crate::input::{InputSource, Key, KeyInput, Phase, Subscription};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

pub type RoundCompleteCallback = Box<dyn FnMut() + Send>;

/// Requests accepted by a running [`KioskDisplay`]
#[derive(Debug)]
pub enum KioskCommand {
    Next,
    Previous,
    GoTo(isize),
    /// New data arrived; restart from the first slide
    ReplaceSlides(Vec<Slide>),
    Shutdown,
}

/// What is on screen right now
#[derive(Debug, Clone)]
pub struct KioskView {
    pub slides: Arc<[Slide]>,
    pub index: usize,

    /// When the current slide became visible
    pub shown_at: Instant,

    pub rounds_completed: u64,
}

impl KioskView {
    pub fn current(&self) -> Option<&Slide> {
        self.slides.get(self.index)
    }

    /// Fraction of the current slide's time already spent, in `[0, 1]`
    pub fn progress(&self, now: Instant) -> f64 {
        match self.current() {
            Some(slide) if !slide.duration.is_zero() => {
                let elapsed = now.saturating_duration_since(self.shown_at);
                (elapsed.as_secs_f64() / slide.duration.as_secs_f64()).min(1.0)
            }
            _ => 0.0,
        }
    }
}

/// Task owning the slide index and the auto-advance timer.
///
/// The timer is re-armed with the current slide's duration after every index or
/// slide-list change, so exactly one timer is ever pending. Create with
/// [`KioskDisplay::new`], then drive with [`run`](Self::run).
pub struct KioskDisplay {
    rotator: SlideRotator,
    timer: SlideTimer,
    ticks: mpsc::UnboundedReceiver<u64>,
    commands: mpsc::UnboundedReceiver<KioskCommand>,
    view_tx: watch::Sender<KioskView>,
    rounds: Arc<AtomicU64>,
}

impl KioskDisplay {
    pub fn new(slides: Vec<Slide>) -> (Self, KioskHandle) {
        let rotator = SlideRotator::new(slides);
        let (timer, ticks) = SlideTimer::new();
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(KioskView {
            slides: rotator.slides(),
            index: 0,
            shown_at: Instant::now(),
            rounds_completed: 0,
        });

        let mut display = Self {
            rotator,
            timer,
            ticks,
            commands,
            view_tx,
            rounds: Arc::new(AtomicU64::new(0)),
        };
        display.on_round_complete(|| {});

        let handle = KioskHandle {
            commands: command_tx,
            view: view_rx,
        };
        (display, handle)
    }

    /// Called each time the rotation moves forward past its last slide
    pub fn on_round_complete<F>(&mut self, mut callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        let rounds = Arc::clone(&self.rounds);
        self.rotator.on_round_complete(move || {
            rounds.fetch_add(1, Ordering::SeqCst);
            callback();
        });
    }

    /// Run until [`KioskHandle::shutdown`] or every handle is dropped
    pub async fn run(mut self) {
        tracing::info!(slides = self.rotator.len(), "Kiosk display started");
        self.commit();

        loop {
            tokio::select! {
                Some(generation) = self.ticks.recv() => {
                    if self.timer.is_current(generation) {
                        self.rotator.next();
                        self.commit();
                    } else {
                        tracing::trace!(generation, "Ignoring stale slide timer");
                    }
                }
                command = self.commands.recv() => {
                    match command {
                        Some(KioskCommand::Next) => {
                            self.rotator.next();
                        }
                        Some(KioskCommand::Previous) => {
                            self.rotator.previous();
                        }
                        Some(KioskCommand::GoTo(target)) => {
                            self.rotator.go_to_slide(target);
                        }
                        Some(KioskCommand::ReplaceSlides(slides)) => {
                            self.rotator.replace_slides(slides);
                        }
                        Some(KioskCommand::Shutdown) | None => break,
                    }
                    self.commit();
                }
            }
        }

        self.timer.cancel();
        tracing::info!(
            rounds = self.rounds.load(Ordering::SeqCst),
            "Kiosk display stopped"
        );
    }

    /// Publish the current slide and re-arm the timer for it
    fn commit(&mut self) {
        match self.rotator.current() {
            Some(slide) => {
                tracing::debug!(index = self.rotator.index(), slide = %slide.id, "Showing slide");
                self.timer.schedule(slide.duration);
            }
            None => self.timer.cancel(),
        }

        let view = KioskView {
            slides: self.rotator.slides(),
            index: self.rotator.index(),
            shown_at: Instant::now(),
            rounds_completed: self.rounds.load(Ordering::SeqCst),
        };
        self.view_tx.send_replace(view);
    }
}

/// Control surface of a running [`KioskDisplay`]
#[derive(Clone)]
pub struct KioskHandle {
    commands: mpsc::UnboundedSender<KioskCommand>,
    view: watch::Receiver<KioskView>,
}

impl KioskHandle {
    pub fn send(&self, command: KioskCommand) -> bool {
        if self.commands.send(command).is_err() {
            tracing::debug!("Kiosk display is not running");
            return false;
        }
        true
    }

    pub fn next(&self) -> bool {
        self.send(KioskCommand::Next)
    }

    pub fn previous(&self) -> bool {
        self.send(KioskCommand::Previous)
    }

    pub fn go_to(&self, target: isize) -> bool {
        self.send(KioskCommand::GoTo(target))
    }

    pub fn replace_slides(&self, slides: Vec<Slide>) -> bool {
        self.send(KioskCommand::ReplaceSlides(slides))
    }

    pub fn shutdown(&self) -> bool {
        self.send(KioskCommand::Shutdown)
    }

    /// Latest view; `changed()` on the receiver wakes on every slide change
    pub fn view(&self) -> watch::Receiver<KioskView> {
        self.view.clone()
    }

    pub fn current_index(&self) -> usize {
        self.view.borrow().index
    }

    /// ArrowRight / ArrowLeft navigation, in the bubble phase
    pub fn bind_keys(&self, source: &dyn InputSource) -> Subscription {
        let handle = self.clone();
        source.on_key(
            Phase::Bubble,
            Arc::new(move |input: &KeyInput| match input.key {
                Key::ArrowRight => {
                    handle.next();
                }
                Key::ArrowLeft => {
                    handle.previous();
                }
                _ => {}
            }),
        )
    }
}
