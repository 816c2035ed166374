//! Rolling average of recent predictions, one window per live stream.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::classifier::PredictionVector;
use crate::error::{Error, Result};

/// Frames averaged per stream unless configured otherwise.
pub const DEFAULT_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Empty,
    Filling,
    Full,
}

/// Bounded FIFO of the last `capacity` prediction vectors of one stream.
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    capacity: usize,
    history: VecDeque<PredictionVector>,
}

impl SmoothingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn state(&self) -> WindowState {
        match self.history.len() {
            0 => WindowState::Empty,
            n if n < self.capacity => WindowState::Filling,
            _ => WindowState::Full,
        }
    }

    /// Append `vector`, drop the oldest if over capacity, and return the
    /// element-wise mean of everything held.
    pub fn push(&mut self, vector: PredictionVector) -> Result<PredictionVector> {
        if let Some(first) = self.history.front() {
            if first.len() != vector.len() {
                return Err(Error::ShapeMismatch {
                    expected: vec![first.len()],
                    actual: vec![vector.len()],
                });
            }
        }

        self.history.push_back(vector);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
        Ok(self.mean())
    }

    pub fn mean(&self) -> PredictionVector {
        let Some(first) = self.history.front() else {
            return PredictionVector::new(vec![]);
        };
        let mut sum = vec![0.0f32; first.len()];
        for vector in &self.history {
            for (acc, v) in sum.iter_mut().zip(vector.as_slice()) {
                *acc += v;
            }
        }
        let n = self.history.len() as f32;
        PredictionVector::new(sum.into_iter().map(|s| s / n).collect())
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

/// Keyed store of per-stream windows.
///
/// The map lock is only held to look up or create a window; pushes lock the
/// stream's own window, so distinct streams never wait on each other.
#[derive(Debug)]
pub struct TemporalSmoother {
    window_size: usize,
    streams: Mutex<HashMap<String, Arc<Mutex<SmoothingWindow>>>>,
}

impl Default for TemporalSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl TemporalSmoother {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            streams: Mutex::new(HashMap::new()),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    fn window(&self, stream_id: &str) -> Result<Arc<Mutex<SmoothingWindow>>> {
        let mut streams = self
            .streams
            .lock()
            .map_err(|_| Error::Poisoned("stream map"))?;
        let window = streams.entry(stream_id.to_string()).or_insert_with(|| {
            log::debug!("opening smoothing window for stream {}", stream_id);
            Arc::new(Mutex::new(SmoothingWindow::new(self.window_size)))
        });
        Ok(Arc::clone(window))
    }

    pub fn push(&self, stream_id: &str, vector: PredictionVector) -> Result<PredictionVector> {
        let window = self.window(stream_id)?;
        let mut window = window
            .lock()
            .map_err(|_| Error::Poisoned("smoothing window"))?;
        let smoothed = window.push(vector)?;
        log::trace!(
            "stream {}: {} frame(s) in window ({:?})",
            stream_id,
            window.len(),
            window.state()
        );
        Ok(smoothed)
    }

    /// Number of frames currently held for `stream_id`.
    pub fn len(&self, stream_id: &str) -> usize {
        let Ok(streams) = self.streams.lock() else {
            return 0;
        };
        streams
            .get(stream_id)
            .and_then(|w| w.lock().ok().map(|w| w.len()))
            .unwrap_or(0)
    }

    /// Drop the stream's history. Returns whether the stream existed.
    pub fn end_stream(&self, stream_id: &str) -> bool {
        match self.streams.lock() {
            Ok(mut streams) => {
                let existed = streams.remove(stream_id).is_some();
                if existed {
                    log::debug!("closed smoothing window for stream {}", stream_id);
                }
                existed
            }
            Err(_) => false,
        }
    }

    pub fn active_streams(&self) -> usize {
        self.streams.lock().map(|s| s.len()).unwrap_or(0)
    }
}
