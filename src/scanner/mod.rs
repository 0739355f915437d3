//! Barcode scan pipeline.
//!
//! [`ScanDetector`] watches key and paste input and decides which bursts came from a
//! hardware scanner. Accepted barcodes go to its single registered callback, normally
//! [`ScanQueue::consumer`], which resolves them one at a time against the API.

pub mod detector;
pub mod queue;

pub use detector::{Rejection, ScanBuffer, ScanCallback, ScanDetector, ScannerAttachment};
pub use queue::{ScanOutcome, ScanProcessor, ScanQueue};
