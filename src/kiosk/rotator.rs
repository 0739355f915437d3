use super::{RoundCompleteCallback, Slide};
use std::sync::Arc;

/// Index state over a fixed slide list.
///
/// [`go_to_slide`](Self::go_to_slide) accepts any integer and always commits an
/// index in `[0, N)`. Moving forward past the last slide (`target >= N`) counts as
/// a completed round and fires the round-complete callback before the wrap is
/// committed. Moving backward past the first slide wraps to the last one without
/// firing it.
pub struct SlideRotator {
    slides: Arc<[Slide]>,
    index: usize,
    on_round_complete: Option<RoundCompleteCallback>,
}

impl SlideRotator {
    pub fn new(slides: Vec<Slide>) -> Self {
        Self {
            slides: slides.into(),
            index: 0,
            on_round_complete: None,
        }
    }

    pub fn on_round_complete<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_round_complete = Some(Box::new(callback));
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn slides(&self) -> Arc<[Slide]> {
        Arc::clone(&self.slides)
    }

    pub fn current(&self) -> Option<&Slide> {
        self.slides.get(self.index)
    }

    /// Swap in a new slide list; always starts again at the first slide
    pub fn replace_slides(&mut self, slides: Vec<Slide>) {
        tracing::debug!(count = slides.len(), "Slides replaced");
        self.slides = slides.into();
        self.index = 0;
    }

    /// Jump to `target` modulo the slide count and return the committed index
    pub fn go_to_slide(&mut self, target: isize) -> usize {
        let count = self.slides.len() as isize;
        if count == 0 {
            self.index = 0;
            return 0;
        }

        let next = target.rem_euclid(count) as usize;
        if target >= count {
            tracing::debug!("Slide round complete");
            if let Some(callback) = self.on_round_complete.as_mut() {
                callback();
            }
        }

        self.index = next;
        next
    }

    pub fn next(&mut self) -> usize {
        self.go_to_slide(self.index as isize + 1)
    }

    pub fn previous(&mut self) -> usize {
        self.go_to_slide(self.index as isize - 1)
    }
}
