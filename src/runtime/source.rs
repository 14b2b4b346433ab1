use std::collections::VecDeque;
use std::sync::mpsc;

use crate::pipeline::Frame;

/// Where the ingest worker pulls frames from. `read` may block; returning
/// `None` means the stream has ended for good.
pub trait VideoSource: Send {
    fn read(&mut self) -> Option<Frame>;
}

/// Plays back a fixed list of frames, then ends.
pub struct FrameSequence {
    frames: VecDeque<Frame>,
}

impl FrameSequence {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl VideoSource for FrameSequence {
    fn read(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }
}

/// Receives frames pushed from another thread. Ends once every sender
/// has been dropped and the channel drained.
pub struct ChannelSource {
    receiver: mpsc::Receiver<Frame>,
}

impl ChannelSource {
    pub fn new() -> (mpsc::Sender<Frame>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, Self { receiver })
    }
}

impl VideoSource for ChannelSource {
    fn read(&mut self) -> Option<Frame> {
        self.receiver.recv().ok()
    }
}
