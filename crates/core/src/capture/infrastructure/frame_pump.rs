use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{select, Sender};

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::{FramePublisher, FrameSource};

/// Producer thread that samples a [`FrameSource`] on a fixed interval and
/// publishes each frame.
///
/// The source is opened before the thread starts so acquisition failures
/// reach the caller of [`FramePump::start`].
pub struct FramePump {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<usize>>,
}

impl FramePump {
    pub fn start(
        mut source: Box<dyn FrameSource>,
        publisher: Arc<dyn FramePublisher>,
        interval: Duration,
    ) -> Result<Self, CaptureError> {
        let metadata = source.open()?;
        log::info!(
            "Sampling {}x{} frames every {}ms",
            metadata.width,
            metadata.height,
            interval.as_millis()
        );

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let handle = std::thread::spawn(move || {
            let ticker = crossbeam_channel::tick(interval);
            let mut published = 0usize;
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        match source.next_frame() {
                            Ok(Some(frame)) => {
                                if !publisher.publish(frame) {
                                    break;
                                }
                                published += 1;
                            }
                            Ok(None) => break,
                            Err(e) => log::warn!("Skipping unreadable frame: {e}"),
                        }
                    }
                }
            }
            source.close();
            log::debug!("Frame pump finished after {published} frames");
            published
        });

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Block until the source is exhausted or the publisher shuts down.
    /// Returns the number of frames published.
    pub fn join(mut self) -> usize {
        self.wait()
    }

    fn wait(&mut self) -> usize {
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(published)) => published,
            Some(Err(_)) => {
                log::error!("Frame pump thread panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for FramePump {
    fn drop(&mut self) {
        self.stop_tx.take();
        self.wait();
    }
}
