/*!
    Built-in video effects.

    All built-ins work on 8-bit pixel formats in place, so the frame keeps
    its format and dimensions. Alpha is never touched.
*/

use media_types::{Error, PixelFormat, Result, VideoFrame, VideoStreamInfo};

use crate::{EffectDefinition, EffectOptions, VideoEffect};

const NO_OPTIONS: &[&[&str]] = &[];

fn require_8bit(definition: &EffectDefinition, info: &VideoStreamInfo) -> Result<()> {
    if info.pixel_format.is_8bit() {
        Ok(())
    } else {
        Err(Error::invalid_effect(
            &definition.name,
            format!("{} is not an 8-bit pixel format", info.pixel_format),
        ))
    }
}

#[inline]
fn clip(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/**
    `negate`: invert every color component.
*/
pub struct Negate;

impl Negate {
    pub fn build(
        definition: &EffectDefinition,
        info: &VideoStreamInfo,
    ) -> Result<Box<dyn VideoEffect>> {
        EffectOptions::parse(&definition.name, &definition.params, NO_OPTIONS)?;
        require_8bit(definition, info)?;
        Ok(Box::new(Self))
    }
}

impl VideoEffect for Negate {
    fn name(&self) -> &str {
        "negate"
    }

    fn process(&mut self, frame: &mut VideoFrame) -> Result<()> {
        let alpha = frame.format.rgb_offsets().and_then(|(_, _, _, a)| a);
        let pixel = frame.format.planes()[0].bytes_per_element as usize;
        for plane in 0..frame.planes.len() {
            for y in 0..frame.rows(plane) {
                for (i, value) in frame.row_mut(plane, y).iter_mut().enumerate() {
                    if alpha != Some(i % pixel) {
                        *value = 255 - *value;
                    }
                }
            }
        }
        Ok(())
    }
}

/**
    `hflip`: mirror horizontally.
*/
pub struct HFlip;

impl HFlip {
    pub fn build(
        definition: &EffectDefinition,
        info: &VideoStreamInfo,
    ) -> Result<Box<dyn VideoEffect>> {
        EffectOptions::parse(&definition.name, &definition.params, NO_OPTIONS)?;
        require_8bit(definition, info)?;
        Ok(Box::new(Self))
    }
}

impl VideoEffect for HFlip {
    fn name(&self) -> &str {
        "hflip"
    }

    fn process(&mut self, frame: &mut VideoFrame) -> Result<()> {
        let layouts = frame.format.planes();
        for (plane, layout) in layouts.iter().enumerate() {
            let size = layout.bytes_per_element as usize;
            for y in 0..frame.rows(plane) {
                let row = frame.row_mut(plane, y);
                let n = row.len() / size;
                for i in 0..n / 2 {
                    let j = n - 1 - i;
                    for b in 0..size {
                        row.swap(i * size + b, j * size + b);
                    }
                }
            }
        }
        Ok(())
    }
}

/**
    `vflip`: mirror vertically.
*/
pub struct VFlip;

impl VFlip {
    pub fn build(
        definition: &EffectDefinition,
        info: &VideoStreamInfo,
    ) -> Result<Box<dyn VideoEffect>> {
        EffectOptions::parse(&definition.name, &definition.params, NO_OPTIONS)?;
        require_8bit(definition, info)?;
        Ok(Box::new(Self))
    }
}

impl VideoEffect for VFlip {
    fn name(&self) -> &str {
        "vflip"
    }

    fn process(&mut self, frame: &mut VideoFrame) -> Result<()> {
        let width = frame.width;
        let layouts = frame.format.planes();
        for (plane, layout) in layouts.iter().enumerate() {
            let rows = frame.rows(plane);
            let row_bytes = layout.row_bytes(width);
            let Some(data) = frame.planes.get_mut(plane) else {
                continue;
            };
            let stride = data.stride;
            for y in 0..rows / 2 {
                let top = y * stride;
                let bottom = (rows - 1 - y) * stride;
                let (head, tail) = data.data.split_at_mut(bottom);
                head[top..top + row_bytes].swap_with_slice(&mut tail[..row_bytes]);
            }
        }
        Ok(())
    }
}

/**
    Rotate and scale the chroma of every pixel.

    `cos` and `sin` already include the saturation factor; chroma values
    are centred on zero when passed through the matrix.
*/
fn transform_chroma(frame: &mut VideoFrame, cos: f32, sin: f32) {
    let rotate = |u: f32, v: f32| (cos * u - sin * v, sin * u + cos * v);

    match frame.format {
        PixelFormat::Yuv420p | PixelFormat::Yuv422p | PixelFormat::Yuv444p => {
            let layout = frame.format.planes()[1];
            let rows = layout.height(frame.height);
            let row_bytes = layout.row_bytes(frame.width);
            let [_, u_plane, v_plane] = &mut frame.planes[..] else {
                return;
            };
            for y in 0..rows {
                let u_row = &mut u_plane.data[y * u_plane.stride..][..row_bytes];
                let v_row = &mut v_plane.data[y * v_plane.stride..][..row_bytes];
                for (u, v) in u_row.iter_mut().zip(v_row.iter_mut()) {
                    let (nu, nv) = rotate(*u as f32 - 128.0, *v as f32 - 128.0);
                    *u = clip(nu + 128.0);
                    *v = clip(nv + 128.0);
                }
            }
        }
        PixelFormat::Nv12 | PixelFormat::Nv21 => {
            let (iu, iv) = if frame.format == PixelFormat::Nv12 { (0, 1) } else { (1, 0) };
            for y in 0..frame.rows(1) {
                for pair in frame.row_mut(1, y).chunks_exact_mut(2) {
                    let (nu, nv) = rotate(pair[iu] as f32 - 128.0, pair[iv] as f32 - 128.0);
                    pair[iu] = clip(nu + 128.0);
                    pair[iv] = clip(nv + 128.0);
                }
            }
        }
        format => {
            let Some((r, g, b, _)) = format.rgb_offsets() else {
                return;
            };
            let size = format.planes()[0].bytes_per_element as usize;
            for y in 0..frame.rows(0) {
                for px in frame.row_mut(0, y).chunks_exact_mut(size) {
                    let (rf, gf, bf) = (px[r] as f32, px[g] as f32, px[b] as f32);
                    let luma = 0.299 * rf + 0.587 * gf + 0.114 * bf;
                    let (cb, cr) = rotate((bf - luma) * 0.564, (rf - luma) * 0.713);
                    px[r] = clip(luma + 1.403 * cr);
                    px[g] = clip(luma - 0.344 * cb - 0.714 * cr);
                    px[b] = clip(luma + 1.773 * cb);
                }
            }
        }
    }
}

/**
    `eq`: contrast, brightness and saturation.

    Contrast and brightness act on luma for YUV formats and on every color
    component for RGB formats.
*/
pub struct Equalizer {
    contrast: f32,
    brightness: f32,
    saturation: f32,
    lut: [u8; 256],
}

const EQ: &[&[&str]] = &[&["contrast"], &["brightness"], &["saturation"]];

impl Equalizer {
    pub fn build(
        definition: &EffectDefinition,
        info: &VideoStreamInfo,
    ) -> Result<Box<dyn VideoEffect>> {
        let options = EffectOptions::parse(&definition.name, &definition.params, EQ)?;
        require_8bit(definition, info)?;
        let contrast = options.number("contrast", 1.0, -1000.0, 1000.0)? as f32;
        let brightness = options.number("brightness", 0.0, -1.0, 1.0)? as f32;
        let saturation = options.number("saturation", 1.0, 0.0, 3.0)? as f32;

        let mut lut = [0u8; 256];
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = clip(contrast * (i as f32 - 128.0) + 128.0 + brightness * 256.0);
        }

        Ok(Box::new(Self {
            contrast,
            brightness,
            saturation,
            lut,
        }))
    }

    fn is_neutral(&self) -> bool {
        self.contrast == 1.0 && self.brightness == 0.0
    }
}

impl VideoEffect for Equalizer {
    fn name(&self) -> &str {
        "eq"
    }

    fn process(&mut self, frame: &mut VideoFrame) -> Result<()> {
        if !self.is_neutral() {
            let alpha = frame.format.rgb_offsets().and_then(|(_, _, _, a)| a);
            let pixel = frame.format.planes()[0].bytes_per_element as usize;
            for y in 0..frame.rows(0) {
                for (i, value) in frame.row_mut(0, y).iter_mut().enumerate() {
                    if alpha != Some(i % pixel) {
                        *value = self.lut[*value as usize];
                    }
                }
            }
        }
        if self.saturation != 1.0 {
            transform_chroma(frame, self.saturation, 0.0);
        }
        Ok(())
    }
}

/**
    `hue`: rotate hue by `h` degrees and scale saturation by `s`.
*/
pub struct Hue {
    cos: f32,
    sin: f32,
}

const HUE: &[&[&str]] = &[&["h"], &["s"]];

impl Hue {
    pub fn build(
        definition: &EffectDefinition,
        info: &VideoStreamInfo,
    ) -> Result<Box<dyn VideoEffect>> {
        let options = EffectOptions::parse(&definition.name, &definition.params, HUE)?;
        require_8bit(definition, info)?;
        let hue = options.number("h", 0.0, -360.0, 360.0)?.to_radians();
        let saturation = options.number("s", 1.0, -10.0, 10.0)?;
        Ok(Box::new(Self {
            cos: (hue.cos() * saturation) as f32,
            sin: (hue.sin() * saturation) as f32,
        }))
    }
}

impl VideoEffect for Hue {
    fn name(&self) -> &str {
        "hue"
    }

    fn process(&mut self, frame: &mut VideoFrame) -> Result<()> {
        transform_chroma(frame, self.cos, self.sin);
        Ok(())
    }
}

/**
    Box-blur mask for one kind of component: `src + amount * (src - blur)`.
*/
#[derive(Clone, Copy, Debug, PartialEq)]
struct Mask {
    half_x: usize,
    half_y: usize,
    amount: f32,
}

impl Mask {
    /**
        Read a mask from the `x`, `y` and `amount` options. A zero amount
        disables the mask.
    */
    fn parse(
        options: &EffectOptions,
        [x, y, amount]: [&str; 3],
        default: f64,
    ) -> Result<Option<Self>> {
        let half = |name: &str| -> Result<usize> {
            let size = options.number(name, 5.0, 3.0, 23.0)?;
            if size.fract() != 0.0 || size as usize % 2 == 0 {
                return Err(Error::invalid_effect(
                    options.effect(),
                    format!("{name} must be an odd integer, got {size}"),
                ));
            }
            Ok(size as usize / 2)
        };
        let half_x = half(x)?;
        let half_y = half(y)?;
        let amount = options.number(amount, default, -2.0, 5.0)? as f32;
        Ok((amount != 0.0).then_some(Self {
            half_x,
            half_y,
            amount,
        }))
    }
}

/**
    Where one color component lives: its plane, the byte offset within a
    pixel and the distance in bytes between pixels.
*/
#[derive(Clone, Copy, Debug)]
struct Component {
    plane: usize,
    offset: usize,
    step: usize,
    width: usize,
    height: usize,
}

#[derive(Default)]
struct UnsharpScratch {
    pixels: Vec<u8>,
    sums: Vec<u32>,
}

/**
    `unsharp`: sharpen or blur luma and chroma separately.

    Options follow FFmpeg: `luma_msize_x`, `luma_msize_y` and
    `luma_amount` (`lx`, `ly`, `la`), and the same for chroma (`cx`,
    `cy`, `ca`). Sizes are odd, 3 to 23; amounts are -2 to 5 and blur
    when negative. RGB formats use the luma settings for every color
    component.
*/
pub struct Unsharp {
    luma: Option<Mask>,
    chroma: Option<Mask>,
    scratch: UnsharpScratch,
}

const UNSHARP: &[&[&str]] = &[
    &["luma_msize_x", "lx"],
    &["luma_msize_y", "ly"],
    &["luma_amount", "la"],
    &["chroma_msize_x", "cx"],
    &["chroma_msize_y", "cy"],
    &["chroma_amount", "ca"],
];

impl Unsharp {
    pub fn build(
        definition: &EffectDefinition,
        info: &VideoStreamInfo,
    ) -> Result<Box<dyn VideoEffect>> {
        let options = EffectOptions::parse(&definition.name, &definition.params, UNSHARP)?;
        require_8bit(definition, info)?;
        let luma = Mask::parse(&options, ["luma_msize_x", "luma_msize_y", "luma_amount"], 1.0)?;
        let chroma =
            Mask::parse(&options, ["chroma_msize_x", "chroma_msize_y", "chroma_amount"], 0.0)?;
        Ok(Box::new(Self {
            luma,
            chroma,
            scratch: UnsharpScratch::default(),
        }))
    }

    fn apply(&mut self, frame: &mut VideoFrame, part: Component, mask: Mask) {
        let Component {
            plane,
            offset,
            step,
            width,
            height,
        } = part;
        let Some(data) = frame.planes.get_mut(plane) else {
            return;
        };
        if width == 0 || height == 0 {
            return;
        }
        let stride = data.stride;
        let UnsharpScratch { pixels, sums } = &mut self.scratch;

        pixels.clear();
        for y in 0..height {
            let row = &data.data[y * stride..];
            pixels.extend((0..width).map(|x| row[offset + x * step]));
        }

        // Horizontal window sums; the border pixel repeats past the edges
        sums.clear();
        for row in pixels.chunks_exact(width) {
            sums.extend((0..width).map(|x| {
                window(x, mask.half_x, width)
                    .map(|i| u32::from(row[i]))
                    .sum::<u32>()
            }));
        }

        let area = ((2 * mask.half_x + 1) * (2 * mask.half_y + 1)) as f32;
        for y in 0..height {
            let row = &mut data.data[y * stride..];
            for x in 0..width {
                let total: u32 = window(y, mask.half_y, height)
                    .map(|j| sums[j * width + x])
                    .sum();
                let source = f32::from(pixels[y * width + x]);
                let blurred = total as f32 / area;
                row[offset + x * step] = clip(source + mask.amount * (source - blurred));
            }
        }
    }
}

/**
    Indices of a `2 * half + 1` window centred on `center`, clamped to
    `0..len`.
*/
fn window(center: usize, half: usize, len: usize) -> impl Iterator<Item = usize> {
    (0..=2 * half).map(move |k| (center + k).saturating_sub(half).min(len - 1))
}

impl VideoEffect for Unsharp {
    fn name(&self) -> &str {
        "unsharp"
    }

    fn process(&mut self, frame: &mut VideoFrame) -> Result<()> {
        let (format, width, height) = (frame.format, frame.width, frame.height);
        let layouts = format.planes();
        let part = |plane: usize, offset: usize, step: usize| Component {
            plane,
            offset,
            step,
            width: layouts[plane].row_bytes(width) / step,
            height: layouts[plane].height(height),
        };

        match format {
            PixelFormat::Yuv420p
            | PixelFormat::Yuv422p
            | PixelFormat::Yuv444p
            | PixelFormat::Nv12
            | PixelFormat::Nv21
            | PixelFormat::Gray8 => {
                let luma = part(0, 0, 1);
                let chroma = match format {
                    PixelFormat::Gray8 => [None, None],
                    PixelFormat::Nv12 | PixelFormat::Nv21 => {
                        [Some(part(1, 0, 2)), Some(part(1, 1, 2))]
                    }
                    _ => [Some(part(1, 0, 1)), Some(part(2, 0, 1))],
                };
                if let Some(mask) = self.luma {
                    self.apply(frame, luma, mask);
                }
                if let Some(mask) = self.chroma {
                    for component in chroma.into_iter().flatten() {
                        self.apply(frame, component, mask);
                    }
                }
            }
            format => {
                let (Some(mask), Some((r, g, b, _))) = (self.luma, format.rgb_offsets()) else {
                    return Ok(());
                };
                let step = layouts[0].bytes_per_element as usize;
                for offset in [r, g, b] {
                    self.apply(frame, part(0, offset, step), mask);
                }
            }
        }
        Ok(())
    }
}
