/*!
    Ordered effect chains.
*/

use media_types::{
    AudioFrame, AudioStreamInfo, DecodedFrame, Error, MediaKind, Result, VideoFrame,
    VideoStreamInfo,
};

use crate::{AudioEffect, VideoEffect};

/**
    Audio stages applied in order to planar `f32` copies of each frame.

    The chain hands back an `F32p` frame with the input's timing. An empty
    chain returns frames untouched.
*/
pub struct AudioChain {
    info: AudioStreamInfo,
    stages: Vec<Box<dyn AudioEffect>>,
    planes: Vec<Vec<f32>>,
}

impl AudioChain {
    pub fn new(info: AudioStreamInfo, stages: Vec<Box<dyn AudioEffect>>) -> Self {
        Self {
            info,
            stages,
            planes: Vec::new(),
        }
    }

    pub fn apply(&mut self, frame: AudioFrame) -> Result<AudioFrame> {
        if self.stages.is_empty() {
            return Ok(frame);
        }
        if frame.sample_rate != self.info.sample_rate || frame.channels != self.info.channels {
            return Err(Error::conversion(format!(
                "effect chain built for {} Hz with {} channels, got {} Hz with {}",
                self.info.sample_rate, self.info.channels, frame.sample_rate, frame.channels
            )));
        }

        frame
            .read_f32_planes(&mut self.planes)
            .map_err(|e| Error::conversion(e.to_string()))?;
        for stage in &mut self.stages {
            stage.process(&mut self.planes)?;
        }

        let mut out = AudioFrame::from_f32_planes(
            &self.planes,
            frame.sample_rate,
            frame.channel_layout,
            frame.time_base,
        );
        out.pts = frame.pts;
        out.best_effort_pts = frame.best_effort_pts;
        Ok(out)
    }

    pub fn reset(&mut self) {
        self.stages.iter_mut().for_each(|stage| stage.reset());
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/**
    Video stages applied in order, in place, on the decoder's pixel format.
*/
pub struct VideoChain {
    info: VideoStreamInfo,
    stages: Vec<Box<dyn VideoEffect>>,
}

impl VideoChain {
    pub fn new(info: VideoStreamInfo, stages: Vec<Box<dyn VideoEffect>>) -> Self {
        Self { info, stages }
    }

    pub fn apply(&mut self, mut frame: VideoFrame) -> Result<VideoFrame> {
        if self.stages.is_empty() {
            return Ok(frame);
        }
        let info = &self.info;
        let same_size = frame.width == info.width && frame.height == info.height;
        if !same_size || frame.format != info.pixel_format {
            return Err(Error::conversion(format!(
                "effect chain built for {} {}x{}, got {} {}x{}",
                info.pixel_format, info.width, info.height, frame.format, frame.width, frame.height
            )));
        }
        frame
            .validate()
            .map_err(|e| Error::conversion(e.to_string()))?;

        for stage in &mut self.stages {
            stage.process(&mut frame)?;
        }
        Ok(frame)
    }

    pub fn reset(&mut self) {
        self.stages.iter_mut().for_each(|stage| stage.reset());
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/**
    An effect chain for either kind of stream.

    Dropping the chain releases every stage it owns.
*/
pub enum EffectChain {
    Audio(AudioChain),
    Video(VideoChain),
}

impl EffectChain {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Audio(_) => MediaKind::Audio,
            Self::Video(_) => MediaKind::Video,
        }
    }

    /**
        Run a frame through every stage in order.

        A frame of the other kind is rejected with `InvalidState`.
    */
    pub fn apply(&mut self, frame: DecodedFrame) -> Result<DecodedFrame> {
        match (self, frame) {
            (Self::Audio(chain), DecodedFrame::Audio(frame)) => {
                chain.apply(frame).map(DecodedFrame::Audio)
            }
            (Self::Video(chain), DecodedFrame::Video(frame)) => {
                chain.apply(frame).map(DecodedFrame::Video)
            }
            (chain, frame) => Err(Error::invalid_state(format!(
                "{} effect chain cannot process a {} frame",
                chain.kind(),
                frame.kind()
            ))),
        }
    }

    /**
        Clear signal history in stateful stages.
    */
    pub fn reset(&mut self) {
        match self {
            Self::Audio(chain) => chain.reset(),
            Self::Video(chain) => chain.reset(),
        }
    }

    /**
        Stage names in application order.
    */
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Audio(chain) => chain.names(),
            Self::Video(chain) => chain.names(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Audio(chain) => chain.len(),
            Self::Video(chain) => chain.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("kind", &self.kind())
            .field("stages", &self.names())
            .finish()
    }
}

static_assertions::assert_impl_all!(EffectChain: Send);
