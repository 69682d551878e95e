// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Dedicated processing thread for the frame pipeline.
//!
//! Frames are handed to the worker through a rendezvous channel, so a frame is
//! accepted only when the worker is idle and waiting. Live sources use
//! [`FrameWorker::try_submit`] and drop whatever the worker cannot take; file
//! sources use the blocking [`FrameWorker::submit`]. Nothing is queued inside
//! the worker, and results come back in submission order.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::thread::{self, JoinHandle};

use crate::error::{OverlayError, Result};
use crate::frame::Frame;
use crate::pipeline::{FrameOutcome, FramePipeline, PipelineConfig};

enum Message {
    Frame(Frame),
    Reconfigure(Arc<PipelineConfig>),
}

/// A frame returned by the worker.
#[derive(Debug)]
pub struct Processed {
    /// Position in submission order, starting at 0.
    pub sequence: u64,
    /// The frame, with the overlay drawn if one was rendered.
    pub frame: Frame,
    /// What the pipeline did with it.
    pub outcome: FrameOutcome,
}

/// Owns a [`FramePipeline`] on its own thread.
pub struct FrameWorker {
    tx: Option<SyncSender<Message>>,
    rx: Option<Receiver<Processed>>,
    handle: Option<JoinHandle<()>>,
}

impl FrameWorker {
    /// Start the processing thread.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the thread cannot be spawned.
    pub fn spawn(mut pipeline: FramePipeline) -> Result<Self> {
        let (tx, frames) = mpsc::sync_channel::<Message>(0);
        // One slot so the worker can pick up the next frame while the last is displayed.
        let (done, rx) = mpsc::sync_channel::<Processed>(1);

        let handle = thread::Builder::new()
            .name("frame-worker".to_string())
            .spawn(move || {
                let mut sequence = 0;
                for message in frames {
                    match message {
                        Message::Reconfigure(config) => pipeline.reconfigure(config),
                        Message::Frame(mut frame) => {
                            let outcome = pipeline.process(&mut frame);
                            let processed = Processed {
                                sequence,
                                frame,
                                outcome,
                            };
                            sequence += 1;
                            if done.send(processed).is_err() {
                                break;
                            }
                        }
                    }
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            rx: Some(rx),
            handle: Some(handle),
        })
    }

    fn sender(&self) -> Result<&SyncSender<Message>> {
        self.tx
            .as_ref()
            .ok_or_else(|| OverlayError::ConfigError("frame worker is shut down".to_string()))
    }

    /// Hand a frame over if the worker is idle.
    ///
    /// # Errors
    ///
    /// Returns the frame unchanged when the worker is busy or gone; the caller
    /// drops it.
    pub fn try_submit(&self, frame: Frame) -> std::result::Result<(), Frame> {
        let Ok(tx) = self.sender() else {
            return Err(frame);
        };
        match tx.try_send(Message::Frame(frame)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(Message::Frame(frame)) | TrySendError::Disconnected(Message::Frame(frame))) => {
                Err(frame)
            }
            Err(_) => unreachable!("only frames are sent here"),
        }
    }

    /// Hand a frame over, waiting until the worker is idle.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the worker thread has exited.
    pub fn submit(&self, frame: Frame) -> Result<()> {
        self.sender()?
            .send(Message::Frame(frame))
            .map_err(|_| OverlayError::ConfigError("frame worker has exited".to_string()))
    }

    /// Replace the pipeline configuration before the next frame.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the worker thread has exited.
    pub fn reconfigure(&self, config: Arc<PipelineConfig>) -> Result<()> {
        self.sender()?
            .send(Message::Reconfigure(config))
            .map_err(|_| OverlayError::ConfigError("frame worker has exited".to_string()))
    }

    /// Take a processed frame if one is ready.
    #[must_use]
    pub fn try_recv(&self) -> Option<Processed> {
        match self.rx.as_ref()?.try_recv() {
            Ok(processed) => Some(processed),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next processed frame. `None` once the worker has exited.
    #[must_use]
    pub fn recv(&self) -> Option<Processed> {
        self.rx.as_ref()?.recv().ok()
    }

    /// Stop accepting frames and wait for the thread to finish.
    pub fn shutdown(&mut self) {
        self.tx.take();
        self.rx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FrameWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWorker")
            .field("running", &self.handle.is_some())
            .finish()
    }
}
