//! A headless, CPU-side display surface.
//!
//! [`ImageSurface`] keeps a tightly packed copy of the last uploaded planes
//! (its "texture") and, on every present, converts that texture into an RGB
//! render target. It can write every Nth presented picture to disk as a PNG,
//! which is how the `unspool` binary shows what it played without a window.
//!
//! # Example
//!
//! ```no_run
//! use unspool::{ImageSurface, MediaSource, Pipeline, PipelineOptions};
//!
//! let source = MediaSource::open("input.mp4")?;
//! let surface = ImageSurface::new(source.video_format())?.with_snapshots("frames", 30);
//! let pipeline = Pipeline::start(source, surface, PipelineOptions::new())?;
//! pipeline.join()?;
//! # Ok::<(), unspool::UnspoolError>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::RgbImage;

use crate::{
    error::UnspoolError,
    frame::{PixelFormat, PlaneLayout, VideoFormat},
    present::{Plane, Surface},
};

#[derive(Debug, Clone)]
struct SnapshotSettings {
    directory: PathBuf,
    every: u64,
}

/// A surface that renders into an in-memory [`RgbImage`].
#[derive(Debug)]
pub struct ImageSurface {
    format: VideoFormat,
    layouts: Vec<PlaneLayout>,
    texture: Vec<Vec<u8>>,
    render_target: RgbImage,
    frames_presented: u64,
    snapshots: Option<SnapshotSettings>,
}

impl ImageSurface {
    /// Allocate a surface for `format`.
    ///
    /// # Errors
    ///
    /// [`UnspoolError::Surface`] if either dimension is zero or the pixel
    /// format is [`PixelFormat::Unknown`].
    pub fn new(format: VideoFormat) -> Result<Self, UnspoolError> {
        if format.width == 0 || format.height == 0 {
            return Err(UnspoolError::Surface(format!(
                "cannot allocate a {}x{} surface",
                format.width, format.height
            )));
        }
        if format.pixel_format == PixelFormat::Unknown {
            return Err(UnspoolError::Surface(
                "cannot allocate a surface for an unknown pixel format".to_string(),
            ));
        }

        let layouts = format.plane_layouts();
        let texture = layouts
            .iter()
            .map(|layout| vec![0u8; layout.packed_len()])
            .collect();

        log::debug!("Allocated image surface for {format}");

        Ok(Self {
            format,
            layouts,
            texture,
            render_target: RgbImage::new(format.width, format.height),
            frames_presented: 0,
            snapshots: None,
        })
    }

    /// Write every `every`-th presented picture (starting with the first) to
    /// `directory` as `frame_NNNNNN.png`. The directory is created on first
    /// write. `every` is clamped to a minimum of 1.
    #[must_use]
    pub fn with_snapshots<P: AsRef<Path>>(mut self, directory: P, every: u64) -> Self {
        self.snapshots = Some(SnapshotSettings {
            directory: directory.as_ref().to_path_buf(),
            every: every.max(1),
        });
        self
    }

    /// Number of successful presents so far.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// The RGB image produced by the most recent present.
    pub fn render_target(&self) -> &RgbImage {
        &self.render_target
    }

    /// Packed bytes of texture plane `index`, as last uploaded.
    pub fn texture_plane(&self, index: usize) -> Option<&[u8]> {
        self.texture.get(index).map(Vec::as_slice)
    }

    /// Save the current render target. The format follows the extension.
    ///
    /// # Errors
    ///
    /// [`UnspoolError::ImageError`] if encoding or writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), UnspoolError> {
        self.render_target.save(path)?;
        Ok(())
    }

    fn write_snapshot(&self, index: u64) -> Result<(), UnspoolError> {
        let Some(settings) = &self.snapshots else {
            return Ok(());
        };
        if index % settings.every != 0 {
            return Ok(());
        }

        fs::create_dir_all(&settings.directory)?;
        let path = settings.directory.join(format!("frame_{index:06}.png"));
        log::debug!("Writing snapshot {}", path.display());
        self.save(path)
    }

    fn convert(&mut self) {
        let width = self.format.width as usize;
        let target: &mut [u8] = &mut self.render_target;

        match self.format.pixel_format {
            PixelFormat::Yuv420p | PixelFormat::Yuvj420p => {
                let to_rgb: fn(u8, u8, u8) -> [u8; 3] =
                    if self.format.pixel_format == PixelFormat::Yuvj420p {
                        full_range_yuv_to_rgb
                    } else {
                        yuv_to_rgb
                    };
                let (luma, u, v) = (&self.texture[0], &self.texture[1], &self.texture[2]);
                let chroma_width = self.layouts[1].row_bytes;
                for (index, rgb) in target.chunks_exact_mut(3).enumerate() {
                    let (x, y) = (index % width, index / width);
                    let chroma = (y / 2) * chroma_width + x / 2;
                    rgb.copy_from_slice(&to_rgb(luma[index], u[chroma], v[chroma]));
                }
            }
            PixelFormat::Nv12 => {
                let (luma, uv) = (&self.texture[0], &self.texture[1]);
                let uv_row = self.layouts[1].row_bytes;
                for (index, rgb) in target.chunks_exact_mut(3).enumerate() {
                    let (x, y) = (index % width, index / width);
                    let chroma = (y / 2) * uv_row + (x / 2) * 2;
                    rgb.copy_from_slice(&yuv_to_rgb(luma[index], uv[chroma], uv[chroma + 1]));
                }
            }
            PixelFormat::Rgb24 => target.copy_from_slice(&self.texture[0]),
            PixelFormat::Rgba => {
                for (rgb, rgba) in target
                    .chunks_exact_mut(3)
                    .zip(self.texture[0].chunks_exact(4))
                {
                    rgb.copy_from_slice(&rgba[..3]);
                }
            }
            PixelFormat::Gray8 => {
                for (rgb, &luma) in target.chunks_exact_mut(3).zip(&self.texture[0]) {
                    rgb.fill(luma);
                }
            }
            PixelFormat::Unknown => {}
        }
    }
}

impl Surface for ImageSurface {
    fn format(&self) -> VideoFormat {
        self.format
    }

    fn update_planes(&mut self, planes: &[Plane<'_>]) -> Result<(), UnspoolError> {
        if planes.len() != self.layouts.len() {
            return Err(UnspoolError::Surface(format!(
                "{} needs {} plane(s), got {}",
                self.format.pixel_format,
                self.layouts.len(),
                planes.len()
            )));
        }

        for (index, (plane, layout)) in planes.iter().zip(&self.layouts).enumerate() {
            if plane.layout != *layout {
                return Err(UnspoolError::InvalidPlane {
                    plane: index,
                    reason: format!(
                        "layout {}x{} does not match texture {}x{}",
                        plane.layout.row_bytes, plane.layout.rows, layout.row_bytes, layout.rows
                    ),
                });
            }

            let texture = &mut self.texture[index];
            let mut copied = 0;
            for (source, destination) in plane
                .rows()
                .zip(texture.chunks_exact_mut(layout.row_bytes))
            {
                destination.copy_from_slice(source);
                copied += 1;
            }

            if copied != layout.rows {
                return Err(UnspoolError::InvalidPlane {
                    plane: index,
                    reason: format!("only {copied} of {} rows available", layout.rows),
                });
            }
        }

        Ok(())
    }

    fn present(&mut self) -> Result<(), UnspoolError> {
        self.convert();
        let index = self.frames_presented;
        self.frames_presented += 1;
        self.write_snapshot(index)
    }
}

/// BT.601 limited-range YCbCr to RGB, in 8.8 fixed point.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    [clamp_channel(r), clamp_channel(g), clamp_channel(b)]
}

/// BT.601 full-range (JPEG) YCbCr to RGB, in 8.8 fixed point.
fn full_range_yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = i32::from(y) << 8;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;

    let r = (c + 359 * e + 128) >> 8;
    let g = (c - 88 * d - 183 * e + 128) >> 8;
    let b = (c + 454 * d + 128) >> 8;

    [clamp_channel(r), clamp_channel(g), clamp_channel(b)]
}

fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
