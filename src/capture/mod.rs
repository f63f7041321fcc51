//! Image capture for the processing stream.
//!
//! The camera streams into an [`ImageReader`]; each acquired image becomes
//! a [`Frame`] that owns its buffer until dropped.

mod frame;
mod reader;

pub use frame::{Frame, FrameMetadata, ImageFormat};
pub use reader::{
    ImageReader, ImageReaderFactory, MockFrameFeed, MockImageReader, MockImageReaderFactory,
    MAX_IMAGES_IN_READER,
};
