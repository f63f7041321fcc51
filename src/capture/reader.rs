//! Image reader abstraction for the processing stream.
//!
//! The camera writes into a reader's surface; the owner pulls the newest
//! image when notified. This module provides the trait pair used by the
//! scanner plus an in-memory mock fed by tests and the demo binary.

use super::{Frame, ImageFormat};
use crate::camera::mock::MockSurface;
use crate::camera::{PlatformError, SurfaceRef};
use crate::dispatch::{EventSender, ScannerEvent};
use crate::geometry::Size;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Buffers an image reader may hand out at once.
pub const MAX_IMAGES_IN_READER: usize = 3;

/// A queue of images produced by the camera into [`surface`](Self::surface).
pub trait ImageReader: Send {
    /// Surface the camera streams into.
    fn surface(&self) -> SurfaceRef;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Newest queued image, discarding older ones.
    ///
    /// Returns `None` when nothing is queued or all buffers are checked out.
    fn acquire_latest_image(&mut self) -> Option<Frame>;

    /// Releases the reader and its surface.
    fn close(&mut self);
}

/// Creates image readers for a negotiated output size.
pub trait ImageReaderFactory: Send {
    fn create(
        &mut self,
        size: Size,
        format: ImageFormat,
        max_images: usize,
    ) -> Result<Box<dyn ImageReader>, PlatformError>;
}

#[derive(Default)]
struct FeedState {
    active_reader: Option<u64>,
    next_reader: u64,
    queue: VecDeque<Frame>,
    sequence: u64,
    acquired: usize,
    released: usize,
    outstanding: usize,
    readers_created: Vec<Size>,
    readers_closed: usize,
    responder: Option<EventSender>,
    format: ImageFormat,
    size: Size,
}

/// Shared handle used to push images into the active mock reader.
#[derive(Clone, Default)]
pub struct MockFrameFeed {
    state: Arc<Mutex<FeedState>>,
}

impl MockFrameFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// A feed that posts `ImageAvailable` for every pushed image.
    pub fn with_responder(sender: EventSender) -> Self {
        let feed = Self::new();
        feed.lock().responder = Some(sender);
        feed
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        lock(&self.state)
    }

    /// Factory producing readers attached to this feed.
    pub fn factory(&self) -> MockImageReaderFactory {
        MockImageReaderFactory { feed: self.clone() }
    }

    /// Queues a synthetic image sized for the active reader.
    ///
    /// Returns false when no reader is open.
    pub fn push_synthetic(&self) -> bool {
        let (len, sequence) = {
            let state = self.lock();
            if state.active_reader.is_none() {
                return false;
            }
            (
                state.format.buffer_len(state.size.width, state.size.height),
                state.sequence + 1,
            )
        };
        // Deterministic pattern mixed with sequence; test data only.
        let pixels: Vec<u8> = (0..len)
            .map(|i| ((i as u64 ^ sequence) % 256) as u8)
            .collect();
        self.push_pixels(pixels)
    }

    /// Queues an image with the given pixels for the active reader.
    pub fn push_pixels(&self, pixels: Vec<u8>) -> bool {
        let responder = {
            let mut state = self.lock();
            if state.active_reader.is_none() {
                return false;
            }
            state.sequence += 1;
            let frame = self.track(Frame::new(
                pixels,
                state.size.width,
                state.size.height,
                state.format,
                state.sequence,
            ));
            state.queue.push_back(frame);
            state.responder.clone()
        };
        if let Some(sender) = responder {
            sender.post(ScannerEvent::ImageAvailable);
        }
        true
    }

    fn track(&self, frame: Frame) -> Frame {
        let state = Arc::downgrade(&self.state);
        frame.on_release(move || {
            if let Some(state) = state.upgrade() {
                let mut state = lock(&state);
                state.released += 1;
                state.outstanding = state.outstanding.saturating_sub(1);
            }
        })
    }

    /// Images handed out by `acquire_latest_image`.
    pub fn acquired(&self) -> usize {
        self.lock().acquired
    }

    /// Images released, whether acquired or discarded while queued.
    pub fn released(&self) -> usize {
        self.lock().released
    }

    /// Acquired images not yet released.
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    /// Sizes of every reader created so far.
    pub fn readers_created(&self) -> Vec<Size> {
        self.lock().readers_created.clone()
    }

    pub fn readers_closed(&self) -> usize {
        self.lock().readers_closed
    }
}

fn lock(state: &Mutex<FeedState>) -> MutexGuard<'_, FeedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Creates [`MockImageReader`]s bound to a [`MockFrameFeed`].
pub struct MockImageReaderFactory {
    feed: MockFrameFeed,
}

impl ImageReaderFactory for MockImageReaderFactory {
    fn create(
        &mut self,
        size: Size,
        format: ImageFormat,
        max_images: usize,
    ) -> Result<Box<dyn ImageReader>, PlatformError> {
        if size.width == 0 || size.height == 0 || max_images == 0 {
            return Err(PlatformError::IllegalArgument(format!(
                "invalid reader size {size} with {max_images} images"
            )));
        }
        let mut state = self.feed.lock();
        let id = state.next_reader;
        state.next_reader += 1;
        // A newer reader replaces whatever the previous one had queued.
        let stale = std::mem::take(&mut state.queue);
        state.active_reader = Some(id);
        state.size = size;
        state.format = format;
        state.readers_created.push(size);
        drop(state);
        drop(stale);

        tracing::debug!(%size, max_images, "MockImageReader created");
        Ok(Box::new(MockImageReader {
            feed: self.feed.clone(),
            id,
            size,
            max_images,
            surface: Arc::new(MockSurface::new(1000 + id)),
            closed: false,
        }))
    }
}

/// In-memory reader; images arrive through its [`MockFrameFeed`].
pub struct MockImageReader {
    feed: MockFrameFeed,
    id: u64,
    size: Size,
    max_images: usize,
    surface: Arc<MockSurface>,
    closed: bool,
}

impl ImageReader for MockImageReader {
    fn surface(&self) -> SurfaceRef {
        self.surface.clone()
    }

    fn width(&self) -> u32 {
        self.size.width
    }

    fn height(&self) -> u32 {
        self.size.height
    }

    fn acquire_latest_image(&mut self) -> Option<Frame> {
        let mut state = self.feed.lock();
        if self.closed || state.active_reader != Some(self.id) {
            return None;
        }
        if state.outstanding >= self.max_images {
            tracing::warn!(
                outstanding = state.outstanding,
                "MockImageReader has no free buffers"
            );
            return None;
        }
        let latest = state.queue.pop_back()?;
        let older: Vec<Frame> = state.queue.drain(..).collect();
        state.acquired += 1;
        state.outstanding += 1;
        drop(state);
        drop(older);
        Some(latest)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.surface.invalidate();
        let mut state = self.feed.lock();
        state.readers_closed += 1;
        let pending = if state.active_reader == Some(self.id) {
            state.active_reader = None;
            std::mem::take(&mut state.queue)
        } else {
            VecDeque::new()
        };
        drop(state);
        drop(pending);
        tracing::debug!("MockImageReader closed");
    }
}

impl Drop for MockImageReader {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(feed: &MockFrameFeed) -> Box<dyn ImageReader> {
        feed.factory()
            .create(Size::new(4, 2), ImageFormat::Luma8, MAX_IMAGES_IN_READER)
            .unwrap()
    }

    #[test]
    fn test_mock_reader_lifecycle() {
        let feed = MockFrameFeed::new();
        assert!(!feed.push_synthetic());

        let mut reader = reader(&feed);
        assert_eq!((reader.width(), reader.height()), (4, 2));
        assert!(reader.acquire_latest_image().is_none());

        assert!(feed.push_synthetic());
        let frame = reader.acquire_latest_image().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);
        assert_eq!(feed.outstanding(), 1);

        drop(frame);
        assert_eq!(feed.released(), 1);
        assert_eq!(feed.outstanding(), 0);

        reader.close();
        assert!(!reader.surface().is_valid());
        assert!(!feed.push_synthetic());
    }

    #[test]
    fn test_latest_image_discards_older() {
        let feed = MockFrameFeed::new();
        let mut reader = reader(&feed);
        feed.push_synthetic();
        feed.push_synthetic();
        feed.push_synthetic();

        let frame = reader.acquire_latest_image().unwrap();
        assert_eq!(frame.sequence(), 3);
        assert_eq!(feed.released(), 2);
        assert_eq!(feed.acquired(), 1);
    }

    #[test]
    fn test_buffers_run_out_when_not_released() {
        let feed = MockFrameFeed::new();
        let mut reader = reader(&feed);
        let mut held = Vec::new();
        for _ in 0..MAX_IMAGES_IN_READER {
            feed.push_synthetic();
            held.push(reader.acquire_latest_image().unwrap());
        }
        feed.push_synthetic();
        assert!(reader.acquire_latest_image().is_none());

        held.clear();
        assert!(reader.acquire_latest_image().is_some());
    }

    #[test]
    fn test_close_releases_queued_images() {
        let feed = MockFrameFeed::new();
        let mut reader = reader(&feed);
        feed.push_synthetic();
        feed.push_synthetic();
        reader.close();
        assert_eq!(feed.released(), 2);
        assert_eq!(feed.readers_closed(), 1);
    }

    #[test]
    fn test_invalid_size_rejected() {
        let feed = MockFrameFeed::new();
        let result = feed
            .factory()
            .create(Size::new(0, 480), ImageFormat::Yuv420, MAX_IMAGES_IN_READER);
        assert!(matches!(result, Err(PlatformError::IllegalArgument(_))));
    }
}
