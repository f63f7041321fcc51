//! Frame type representing a captured image with metadata.

use crate::camera::LensFacing;
use crate::processor::DetectorImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Pixel layout of a captured image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Planar YUV 4:2:0; the first `width * height` bytes are luminance.
    #[default]
    Yuv420,
    /// Single 8-bit luminance plane.
    Luma8,
}

impl ImageFormat {
    /// Bytes needed for an image of the given dimensions.
    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        let luma = (width as usize) * (height as usize);
        match self {
            ImageFormat::Yuv420 => luma + luma / 2,
            ImageFormat::Luma8 => luma,
        }
    }
}

/// Per-frame context needed to interpret one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Rotation that brings the image upright, in degrees.
    pub rotation_degrees: u32,
    /// Facing of the camera that produced the frame.
    pub camera_facing: Option<LensFacing>,
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A single image acquired from an image reader.
///
/// The frame owns a slot in its reader's buffer queue. The slot is returned
/// when the frame is dropped, so every frame is released exactly once.
pub struct Frame {
    /// Raw pixel data laid out per `format`.
    pixels: Arc<[u8]>,
    width: u32,
    height: u32,
    format: ImageFormat,
    /// Acquisition timestamp.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
    release: Option<ReleaseHook>,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(
        pixels: impl Into<Arc<[u8]>>,
        width: u32,
        height: u32,
        format: ImageFormat,
        sequence: u64,
    ) -> Self {
        Self {
            pixels: pixels.into(),
            width,
            height,
            format,
            timestamp: Instant::now(),
            sequence,
            release: None,
        }
    }

    /// Runs `hook` when the frame is released.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Returns the acquisition timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() >= self.format.buffer_len(self.width, self.height)
    }

    /// Detector input sharing this frame's pixels, tagged with `rotation_degrees`.
    pub fn to_detector_image(&self, rotation_degrees: u32) -> DetectorImage {
        DetectorImage {
            data: Arc::clone(&self.pixels),
            width: self.width,
            height: self.height,
            rotation_degrees,
            format: self.format,
        }
    }

    /// Releases the frame now.
    pub fn close(self) {}
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_frame_creation() {
        let pixels = vec![0u8; 640 * 480];
        let frame = Frame::new(pixels, 640, 480, ImageFormat::Luma8, 1);

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence(), 1);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        let pixels = vec![0u8; 640 * 480]; // no chroma planes
        let frame = Frame::new(pixels, 640, 480, ImageFormat::Yuv420, 1);

        assert!(!frame.is_valid());
    }

    #[test]
    fn test_release_runs_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let frame = Frame::new(vec![0u8; 4], 2, 2, ImageFormat::Luma8, 1)
            .on_release(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let image = frame.to_detector_image(90);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        frame.close();
        assert_eq!(released.load(Ordering::SeqCst), 1);

        // Detector input outlives the frame without re-releasing it.
        assert_eq!(image.rotation_degrees, 90);
        assert_eq!(image.data.len(), 4);
        drop(image);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
