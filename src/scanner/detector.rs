use crate::input::{InputSource, Key, KeyInput, PasteInput, Phase, Subscription};
use crate::metrics::Metrics;
use crate::models::ScannerSettings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// The single consumer of detected barcodes
pub type ScanCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Keystrokes accumulated since the last reset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanBuffer {
    chars: String,
    len: usize,
    started_at: Option<Instant>,
    last_key_at: Option<Instant>,
}

impl ScanBuffer {
    pub fn as_str(&self) -> &str {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push(&mut self, c: char, at: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(at);
        }
        self.chars.push(c);
        self.len += 1;
        self.last_key_at = Some(at);
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn gap_until(&self, at: Instant) -> Option<Duration> {
        self.last_key_at.map(|last| at.saturating_duration_since(last))
    }

    fn elapsed_until(&self, at: Instant) -> Duration {
        self.started_at
            .map(|start| at.saturating_duration_since(start))
            .unwrap_or_default()
    }
}

/// Why an Enter-terminated buffer was not a scan
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Idle too long before Enter
    Stale { gap: Duration },
    TooShort { len: usize },
    TooSlow { avg: Duration },
}

/// Tells hardware scanner bursts apart from human typing.
///
/// Scanners emulate a keyboard: characters arrive much faster and more evenly than
/// anyone types, then Enter. A gap of `max_key_interval` or more between two
/// keystrokes restarts the buffer. On Enter the buffer is accepted when it holds at
/// least `min_barcode_length` characters and the average time per character, from
/// the first key to Enter, stays below `max_key_interval`.
///
/// Exactly one consumer may be registered; a later [`set_on_scan`](Self::set_on_scan)
/// replaces the earlier one.
pub struct ScanDetector {
    max_key_interval: Duration,
    min_barcode_length: usize,
    enabled: AtomicBool,
    callback: Mutex<Option<ScanCallback>>,
    buffer: Mutex<ScanBuffer>,
    metrics: Option<Arc<Metrics>>,
}

impl ScanDetector {
    pub fn new(settings: &ScannerSettings) -> Self {
        Self {
            max_key_interval: settings.max_key_interval(),
            min_barcode_length: settings.min_barcode_length,
            enabled: AtomicBool::new(settings.enabled),
            callback: Mutex::new(None),
            buffer: Mutex::new(ScanBuffer::default()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn buffer(&self) -> MutexGuard<'_, ScanBuffer> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register the consumer of detected barcodes, replacing any previous one
    pub fn set_on_scan<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let mut slot = self
            .callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            tracing::debug!("Replacing scan consumer");
        }
        *slot = Some(Arc::new(callback));
    }

    pub fn clear_on_scan(&self) {
        *self
            .callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Turn scanning on or off. Disabling discards any partial buffer.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if !enabled {
            self.buffer().clear();
        }
        if was != enabled {
            tracing::info!(enabled, "Scanner toggled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Current partial buffer, for diagnostics
    pub fn pending(&self) -> ScanBuffer {
        self.buffer().clone()
    }

    /// Subscribe to `source`: keys in the capture phase, plus paste events
    pub fn attach(self: &Arc<Self>, source: &dyn InputSource) -> ScannerAttachment {
        let detector = Arc::clone(self);
        let keys = source.on_key(
            Phase::Capture,
            Arc::new(move |input: &KeyInput| {
                detector.handle_key(input);
            }),
        );

        let detector = Arc::clone(self);
        let paste = source.on_paste(Arc::new(move |input: &PasteInput| {
            detector.handle_paste(input);
        }));

        ScannerAttachment {
            _keys: keys,
            _paste: paste,
        }
    }

    /// Feed one key press. Returns the barcode if this press completed a scan.
    pub fn handle_key(&self, input: &KeyInput) -> Option<String> {
        if !self.is_enabled() || input.target.shields_from_scanner() {
            return None;
        }

        let detected = {
            let mut buffer = self.buffer();
            match input.key {
                Key::Enter => {
                    let verdict = self.classify(&buffer, input.at);
                    buffer.clear();
                    match verdict {
                        Some(Ok(code)) => Some(code),
                        Some(Err(rejection)) => {
                            tracing::debug!(?rejection, "Discarding keystroke buffer");
                            if let Some(metrics) = &self.metrics {
                                metrics.record_noise_rejected();
                            }
                            None
                        }
                        None => None,
                    }
                }
                Key::Char(c) if c.is_ascii_alphanumeric() => {
                    if buffer
                        .gap_until(input.at)
                        .is_some_and(|gap| gap >= self.max_key_interval)
                    {
                        buffer.clear();
                    }
                    buffer.push(c, input.at);
                    None
                }
                _ => None,
            }
        };

        if let Some(code) = &detected {
            self.emit(code.clone());
        }
        detected
    }

    /// Feed one paste. Long enough pastes are taken as scans without timing checks.
    pub fn handle_paste(&self, input: &PasteInput) -> Option<String> {
        if !self.is_enabled() || input.target.shields_from_scanner() {
            return None;
        }

        let text = input.text.trim();
        if text.chars().count() < self.min_barcode_length {
            tracing::debug!(len = text.len(), "Paste too short for a barcode");
            return None;
        }

        let code = text.to_string();
        self.emit(code.clone());
        Some(code)
    }

    /// `None` for a bare Enter on an empty buffer
    fn classify(&self, buffer: &ScanBuffer, at: Instant) -> Option<Result<String, Rejection>> {
        if buffer.is_empty() {
            return None;
        }

        if let Some(gap) = buffer.gap_until(at) {
            if gap >= self.max_key_interval {
                return Some(Err(Rejection::Stale { gap }));
            }
        }

        if buffer.len() < self.min_barcode_length {
            return Some(Err(Rejection::TooShort { len: buffer.len() }));
        }

        let avg = buffer.elapsed_until(at) / buffer.len() as u32;
        if avg >= self.max_key_interval {
            return Some(Err(Rejection::TooSlow { avg }));
        }

        Some(Ok(buffer.as_str().to_string()))
    }

    fn emit(&self, code: String) {
        if let Some(metrics) = &self.metrics {
            metrics.record_scan_detected();
        }

        let callback = self
            .callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        match callback {
            Some(callback) => {
                tracing::info!(barcode = %code, "Barcode detected");
                callback(code);
            }
            None => tracing::warn!(barcode = %code, "Barcode detected but no consumer registered"),
        }
    }
}

/// Keeps the detector subscribed to an input source
pub struct ScannerAttachment {
    _keys: Subscription,
    _paste: Subscription,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputTarget, TargetKind};

    fn detector() -> ScanDetector {
        ScanDetector::new(&ScannerSettings::default())
    }

    fn type_burst(detector: &ScanDetector, text: &str, start: Instant, step_ms: u64) -> Instant {
        let mut at = start;
        for c in text.chars() {
            detector.handle_key(&KeyInput::new(Key::Char(c), at));
            at += Duration::from_millis(step_ms);
        }
        at
    }

    #[test]
    fn test_fast_burst_is_detected() {
        let detector = detector();
        let t0 = Instant::now();

        let enter_at = type_burst(&detector, "12345678", t0, 10);
        let result = detector.handle_key(&KeyInput::new(Key::Enter, enter_at));

        assert_eq!(result.as_deref(), Some("12345678"));
        assert!(detector.pending().is_empty());
    }

    #[test]
    fn test_short_burst_is_ignored() {
        let detector = detector();
        let t0 = Instant::now();

        let enter_at = type_burst(&detector, "1234", t0, 5);
        assert_eq!(detector.handle_key(&KeyInput::new(Key::Enter, enter_at)), None);
    }

    #[test]
    fn test_gap_restarts_buffer() {
        let detector = detector();
        let t0 = Instant::now();

        let after_noise = type_burst(&detector, "xyz", t0, 10);
        // 200ms pause, then a real scan
        let scan_start = after_noise + Duration::from_millis(200);
        let enter_at = type_burst(&detector, "ABCD1234", scan_start, 10);

        let result = detector.handle_key(&KeyInput::new(Key::Enter, enter_at));
        assert_eq!(result.as_deref(), Some("ABCD1234"));
    }

    #[test]
    fn test_stale_enter_discards_buffer() {
        let detector = detector();
        let t0 = Instant::now();

        let last = type_burst(&detector, "12345678", t0, 10);
        let result =
            detector.handle_key(&KeyInput::new(Key::Enter, last + Duration::from_millis(500)));

        assert_eq!(result, None);
    }

    #[test]
    fn test_non_alphanumeric_keys_are_skipped() {
        let detector = detector();
        let t0 = Instant::now();

        let mut at = type_burst(&detector, "1234", t0, 5);
        detector.handle_key(&KeyInput::new(Key::Char('-'), at));
        detector.handle_key(&KeyInput::new(Key::Other, at));
        at = type_burst(&detector, "5678", at, 5);

        let result = detector.handle_key(&KeyInput::new(Key::Enter, at));
        assert_eq!(result.as_deref(), Some("12345678"));
    }

    #[test]
    fn test_text_fields_are_left_alone_unless_opted_in() {
        let detector = detector();
        let t0 = Instant::now();
        let field = InputTarget::editable(TargetKind::TextInput);

        for (i, c) in "12345678".chars().enumerate() {
            let at = t0 + Duration::from_millis(i as u64 * 5);
            detector.handle_key(&KeyInput::new(Key::Char(c), at).on(field));
        }
        assert!(detector.pending().is_empty());

        let scanner_field = InputTarget::scanner_field(TargetKind::TextInput);
        let paste = PasteInput::new("4002051694074", t0).on(scanner_field);
        assert_eq!(detector.handle_paste(&paste).as_deref(), Some("4002051694074"));
    }

    #[test]
    fn test_paste_is_trimmed_and_length_checked() {
        let detector = detector();
        let now = Instant::now();

        assert_eq!(
            detector.handle_paste(&PasteInput::new("  4002051694074\n", now)).as_deref(),
            Some("4002051694074")
        );
        assert_eq!(detector.handle_paste(&PasteInput::new("   1234   ", now)), None);
    }

    #[test]
    fn test_disabled_detector_drops_input() {
        let detector = detector();
        let t0 = Instant::now();

        type_burst(&detector, "1234", t0, 5);
        detector.set_enabled(false);
        assert!(detector.pending().is_empty());

        let enter_at = type_burst(&detector, "12345678", t0, 5);
        assert_eq!(detector.handle_key(&KeyInput::new(Key::Enter, enter_at)), None);
        assert_eq!(detector.handle_paste(&PasteInput::new("4002051694074", t0)), None);
    }

    #[test]
    fn test_last_registered_consumer_wins() {
        let detector = detector();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&first);
        detector.set_on_scan(move |code| sink.lock().unwrap().push(code));
        let sink = Arc::clone(&second);
        detector.set_on_scan(move |code| sink.lock().unwrap().push(code));

        detector.handle_paste(&PasteInput::new("4002051694074", Instant::now()));

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(*second.lock().unwrap(), vec!["4002051694074".to_string()]);
    }

    #[test]
    fn test_metrics_count_detections_and_noise() {
        let metrics = Arc::new(Metrics::new());
        let detector = detector().with_metrics(Arc::clone(&metrics));
        let t0 = Instant::now();

        let enter_at = type_burst(&detector, "123", t0, 5);
        detector.handle_key(&KeyInput::new(Key::Enter, enter_at));
        detector.handle_paste(&PasteInput::new("4002051694074", t0));

        assert_eq!(metrics.noise_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.scans_detected.load(Ordering::Relaxed), 1);
    }
}
