//! Image signal providers
//!
//! Capture itself belongs to the UI layer; these providers only read a frame
//! that has already been captured.

use crate::types::{ImageFrame, ProviderResult, SignalProvider};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Upper bound on accepted frame size (encoded bytes)
const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

fn check_frame(frame: ImageFrame) -> ProviderResult<ImageFrame> {
    if frame.is_empty() {
        ProviderResult::failure("captured frame is empty")
    } else if frame.len() > MAX_FRAME_BYTES {
        ProviderResult::failure(format!(
            "captured frame too large ({} bytes, max {})",
            frame.len(),
            MAX_FRAME_BYTES
        ))
    } else {
        ProviderResult::Success(frame)
    }
}

/// Frame handed over by the caller for a single request
pub struct FrameBufferProvider {
    frame: Option<ImageFrame>,
}

impl FrameBufferProvider {
    pub fn new(bytes: Option<Vec<u8>>) -> Self {
        Self {
            frame: bytes.map(ImageFrame::new),
        }
    }

    /// Provider with no frame (always reports failure)
    pub fn empty() -> Self {
        Self { frame: None }
    }
}

#[async_trait]
impl SignalProvider<ImageFrame> for FrameBufferProvider {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn fetch(&self) -> ProviderResult<ImageFrame> {
        match &self.frame {
            Some(frame) => check_frame(frame.clone()),
            None => ProviderResult::failure("no frame captured"),
        }
    }
}

/// Frame previously captured to disk
pub struct ImageFileProvider {
    path: PathBuf,
}

impl ImageFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SignalProvider<ImageFrame> for ImageFileProvider {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn fetch(&self) -> ProviderResult<ImageFrame> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                debug!(path = %self.path.display(), bytes = bytes.len(), "Read captured frame");
                check_frame(ImageFrame::new(bytes))
            }
            Err(e) => ProviderResult::failure(format!(
                "failed to read frame {}: {}",
                self.path.display(),
                e
            )),
        }
    }
}
