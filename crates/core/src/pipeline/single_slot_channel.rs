use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::shared::frame::Frame;

/// Result of [`SingleSlotFrameChannel::publish`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The slot was empty.
    Stored,
    /// An unconsumed frame was discarded in favour of the new one.
    Replaced,
    /// The channel is shut down; the frame was dropped.
    Closed,
}

struct Slot {
    frame: Option<Frame>,
    closed: bool,
}

/// Keep-latest mailbox between the frame producer and the detection worker.
///
/// Holds at most one frame. Publishing never blocks and overwrites any
/// frame not yet taken; `take` blocks until a frame arrives or the channel
/// is shut down.
pub struct SingleSlotFrameChannel {
    slot: Mutex<Slot>,
    available: Condvar,
}

impl SingleSlotFrameChannel {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                frame: None,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    pub fn publish(&self, frame: Frame) -> PublishOutcome {
        let mut slot = self.lock();
        if slot.closed {
            return PublishOutcome::Closed;
        }
        let outcome = match slot.frame.replace(frame) {
            Some(old) => {
                log::debug!("Frame {} overwritten before detection", old.index());
                PublishOutcome::Replaced
            }
            None => PublishOutcome::Stored,
        };
        drop(slot);
        self.available.notify_one();
        outcome
    }

    /// Wait for the next frame. `None` once the channel is shut down.
    pub fn take(&self) -> Option<Frame> {
        let mut slot = self.lock();
        loop {
            if slot.closed {
                return None;
            }
            if let Some(frame) = slot.frame.take() {
                return Some(frame);
            }
            slot = self
                .available
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Close the channel, discard any pending frame and wake all waiters.
    pub fn shutdown(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        slot.frame = None;
        drop(slot);
        self.available.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SingleSlotFrameChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crate::shared::frame::FrameMetadata;

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 6], FrameMetadata::new(2, 2, 0), index)
    }

    #[test]
    fn test_take_returns_latest_of_several_publishes() {
        let channel = SingleSlotFrameChannel::new();
        assert_eq!(channel.publish(frame(1)), PublishOutcome::Stored);
        assert_eq!(channel.publish(frame(2)), PublishOutcome::Replaced);
        assert_eq!(channel.publish(frame(3)), PublishOutcome::Replaced);

        assert_eq!(channel.take().unwrap().index(), 3);
        assert_eq!(channel.publish(frame(4)), PublishOutcome::Stored);
    }

    #[test]
    fn test_frame_is_delivered_once() {
        let channel = Arc::new(SingleSlotFrameChannel::new());
        channel.publish(frame(7));
        assert_eq!(channel.take().unwrap().index(), 7);

        let waiter = {
            let channel = channel.clone();
            std::thread::spawn(move || channel.take().map(|f| f.index()))
        };
        std::thread::sleep(Duration::from_millis(20));
        channel.publish(frame(8));
        assert_eq!(waiter.join().unwrap(), Some(8));
    }

    #[test]
    fn test_take_blocks_until_publish() {
        let channel = Arc::new(SingleSlotFrameChannel::new());
        let waiter = {
            let channel = channel.clone();
            std::thread::spawn(move || channel.take().map(|f| f.index()))
        };
        std::thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        channel.publish(frame(1));
        assert_eq!(waiter.join().unwrap(), Some(1));
    }

    #[test]
    fn test_shutdown_wakes_waiter_promptly() {
        let channel = Arc::new(SingleSlotFrameChannel::new());
        let waiter = {
            let channel = channel.clone();
            std::thread::spawn(move || channel.take().is_none())
        };
        std::thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        channel.shutdown();
        assert!(waiter.join().unwrap());
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_publish_after_shutdown_is_dropped() {
        let channel = SingleSlotFrameChannel::new();
        channel.publish(frame(1));
        channel.shutdown();
        assert_eq!(channel.publish(frame(2)), PublishOutcome::Closed);
        assert!(channel.take().is_none());
        assert_eq!(channel.publish(frame(3)), PublishOutcome::Closed);
    }
}
