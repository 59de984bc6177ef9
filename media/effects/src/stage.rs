/*!
    Effect stage traits.
*/

use media_types::{Result, VideoFrame};

/**
    One audio processing stage.

    Audio stages work on planar `f32` buffers, one per channel, all the
    same length. Stages may keep signal history between calls (a delay
    line, filter state) but never the buffers themselves.
*/
pub trait AudioEffect: Send {
    fn name(&self) -> &str;

    fn process(&mut self, planes: &mut [Vec<f32>]) -> Result<()>;

    /**
        Forget signal history after a discontinuity.
    */
    fn reset(&mut self) {}
}

/**
    One video processing stage.

    Video stages modify the frame in place and must keep its pixel format
    and dimensions.
*/
pub trait VideoEffect: Send {
    fn name(&self) -> &str;

    fn process(&mut self, frame: &mut VideoFrame) -> Result<()>;

    fn reset(&mut self) {}
}
