//! Camera save throttling

use std::time::Duration;
use web_time::Instant;

use crate::camera::Camera;
use crate::schema::CameraDocument;

/// Rate-limits camera persistence to one write per `min_interval`
#[derive(Debug, Clone)]
pub struct CameraSaveThrottle {
    min_interval: Duration,
    last_write: Option<Instant>,
    pending: Option<CameraDocument>,
}

impl CameraSaveThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_write: None,
            pending: None,
        }
    }

    fn due(&self, now: Instant) -> bool {
        self.last_write
            .is_none_or(|last| now.saturating_duration_since(last) >= self.min_interval)
    }

    /// Offer the current camera; returns a document to write now, or keeps it pending
    pub fn offer(&mut self, camera: &Camera, now: Instant) -> Option<CameraDocument> {
        let doc = CameraDocument::from(camera);
        if self.due(now) {
            self.last_write = Some(now);
            self.pending = None;
            Some(doc)
        } else {
            self.pending = Some(doc);
            None
        }
    }

    /// Release the pending document once the interval has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<CameraDocument> {
        if self.pending.is_some() && self.due(now) {
            self.last_write = Some(now);
            return self.pending.take();
        }
        None
    }

    /// Pending document at teardown, regardless of the interval
    pub fn flush(&mut self) -> Option<CameraDocument> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
