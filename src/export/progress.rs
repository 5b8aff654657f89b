//! Progress tracking for export operations
//!
//! The tracker counts written documents, logs a checkpoint every `tell`
//! documents and a summary at the end. Callers that need the notifications
//! themselves register a listener. An optional spinner gives live feedback on
//! the terminal.

use std::num::NonZeroU64;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Notification emitted while exporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Another `tell` documents were written; carries the running total
    Checkpoint(u64),
    /// The run ended; carries the final total
    Finished { total: u64, cancelled: bool },
}

/// Receiver of [`ProgressEvent`]s
pub type ProgressListener = Box<dyn FnMut(ProgressEvent) + Send>;

/// Progress tracker for export operations
pub struct ProgressTracker {
    /// Checkpoint interval, `None` disables checkpoints
    tell: Option<NonZeroU64>,
    /// Number of documents processed so far
    processed: u64,
    checkpoints: u64,
    /// Start time of the operation
    start_time: Instant,
    /// Spinner (optional, can be disabled)
    bar: Option<ProgressBar>,
    listener: Option<ProgressListener>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `tell` - Emit a checkpoint every `tell` documents
    /// * `enable_bar` - Whether to display a spinner
    pub fn new(tell: Option<NonZeroU64>, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.green} {pos} documents {msg}")
            {
                bar.set_style(style);
            }
            bar
        });

        Self {
            tell,
            processed: 0,
            checkpoints: 0,
            start_time: Instant::now(),
            bar,
            listener: None,
        }
    }

    /// Tracker with no checkpoints and no spinner
    pub fn silent() -> Self {
        Self::new(None, false)
    }

    /// Forward every event to `listener`
    pub fn with_listener(mut self, listener: impl FnMut(ProgressEvent) + Send + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Update progress with new count
    ///
    /// # Arguments
    /// * `count` - Total number of documents processed so far
    ///
    /// # Returns
    /// * `bool` - Whether a checkpoint was emitted
    pub fn update(&mut self, count: u64) -> bool {
        self.processed = count;

        if let Some(ref bar) = self.bar {
            bar.set_position(count);
            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                bar.set_message(format!("({:.0} docs/sec)", count as f64 / elapsed));
            }
        }

        let Some(tell) = self.tell else {
            return false;
        };
        if count == 0 || count % tell.get() != 0 {
            return false;
        }

        self.checkpoints += 1;
        info!("{} documents exported", count);
        self.emit(ProgressEvent::Checkpoint(count));
        true
    }

    /// Clear the spinner and report the final total
    pub fn finish(&mut self, total: u64, cancelled: bool) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }

        let elapsed_ms = self.start_time.elapsed().as_millis();
        if cancelled {
            info!("Export cancelled: {} documents exported in {} ms", total, elapsed_ms);
        } else {
            info!("Export completed: {} documents exported in {} ms", total, elapsed_ms);
        }
        self.emit(ProgressEvent::Finished { total, cancelled });
    }

    /// Number of documents reported so far
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Number of checkpoints emitted so far
    pub fn checkpoints(&self) -> u64 {
        self.checkpoints
    }

    fn emit(&mut self, event: ProgressEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(tell: u64) -> (ProgressTracker, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let tracker = ProgressTracker::new(NonZeroU64::new(tell), false)
            .with_listener(move |event| sink.lock().unwrap().push(event));
        (tracker, events)
    }

    #[test]
    fn test_checkpoint_every_tell_documents() {
        let (mut tracker, events) = recording(2);
        for count in 1..=5 {
            tracker.update(count);
        }
        tracker.finish(5, false);

        assert_eq!(tracker.checkpoints(), 2);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                ProgressEvent::Checkpoint(2),
                ProgressEvent::Checkpoint(4),
                ProgressEvent::Finished {
                    total: 5,
                    cancelled: false
                },
            ]
        );
    }

    #[test]
    fn test_tell_of_one() {
        let (mut tracker, _) = recording(1);
        for count in 1..=3 {
            assert!(tracker.update(count));
        }
        assert_eq!(tracker.checkpoints(), 3);
    }

    #[test]
    fn test_no_tell_only_final_event() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut tracker =
            ProgressTracker::silent().with_listener(move |event| sink.lock().unwrap().push(event));

        for count in 1..=100 {
            assert!(!tracker.update(count));
        }
        tracker.finish(100, true);

        assert_eq!(tracker.processed(), 100);
        assert_eq!(
            *events.lock().unwrap(),
            vec![ProgressEvent::Finished {
                total: 100,
                cancelled: true
            }]
        );
    }

    #[test]
    fn test_progress_tracker_with_spinner() {
        let mut tracker = ProgressTracker::new(NonZeroU64::new(10), true);
        tracker.update(10);
        tracker.finish(10, false);
        assert_eq!(tracker.checkpoints(), 1);
    }
}
