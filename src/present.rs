//! Frame presentation.
//!
//! [`FramePresenter`] owns a display [`Surface`] and pushes decoded pictures
//! onto it. The surface is allocated once for a fixed [`VideoFormat`]; every
//! frame is checked against that format and its plane buffers are checked
//! against the format's [`PlaneLayout`]s before anything is copied.

use crate::error::UnspoolError;
use crate::frame::{PictureFrame, PlaneLayout, VideoFormat};

/// One plane of a picture, borrowed for the duration of an upload.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    /// Plane bytes, including stride padding.
    pub data: &'a [u8],
    /// Byte distance between consecutive row starts.
    pub stride: usize,
    /// Meaningful bytes per row and row count.
    pub layout: PlaneLayout,
}

impl<'a> Plane<'a> {
    /// Iterate over the rows of this plane with stride padding removed.
    ///
    /// Yields fewer than `layout.rows` rows if `data` is too short.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let data = self.data;
        let stride = self.stride;
        let row_bytes = self.layout.row_bytes;
        (0..self.layout.rows).map_while(move |row| {
            let start = row * stride;
            data.get(start..start + row_bytes)
        })
    }

    fn validate(&self, index: usize) -> Result<(), UnspoolError> {
        if self.stride < self.layout.row_bytes {
            return Err(UnspoolError::InvalidPlane {
                plane: index,
                reason: format!(
                    "stride {} is shorter than a {}-byte row",
                    self.stride, self.layout.row_bytes
                ),
            });
        }

        let required = self.layout.required_len(self.stride);
        if self.data.len() < required {
            return Err(UnspoolError::InvalidPlane {
                plane: index,
                reason: format!("need {required} bytes, have {}", self.data.len()),
            });
        }

        Ok(())
    }
}

/// A display surface with a fixed, negotiated format.
///
/// Surfaces are moved onto the decode thread when playback starts and are
/// only ever touched from there.
pub trait Surface: Send {
    /// The format the surface's texture was allocated for.
    fn format(&self) -> VideoFormat;

    /// Copy plane data into the surface's texture, honouring each plane's
    /// stride. `planes` follows [`VideoFormat::plane_layouts`] order.
    fn update_planes(&mut self, planes: &[Plane<'_>]) -> Result<(), UnspoolError>;

    /// Copy the texture to the render target and show it.
    fn present(&mut self) -> Result<(), UnspoolError>;
}

/// Uploads decoded frames to a surface and presents them.
pub struct FramePresenter<S: Surface> {
    surface: S,
    expected: VideoFormat,
    layouts: Vec<PlaneLayout>,
}

impl<S: Surface> FramePresenter<S> {
    /// Wrap a surface. Its current format becomes the negotiated contract.
    pub fn new(surface: S) -> Self {
        let expected = surface.format();
        Self {
            surface,
            expected,
            layouts: expected.plane_layouts(),
        }
    }

    /// The negotiated format every frame must match.
    pub fn expected_format(&self) -> VideoFormat {
        self.expected
    }

    /// Give the surface back.
    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Upload `frame`'s planes and present them.
    ///
    /// The presenter copies what it needs and keeps no reference to the
    /// frame, so the caller may drop it as soon as this returns.
    ///
    /// # Errors
    ///
    /// - [`UnspoolError::FrameFormatMismatch`] if the frame's dimensions or
    ///   pixel format differ from the surface's.
    /// - [`UnspoolError::InvalidPlane`] if a plane is missing or its buffer
    ///   cannot hold the negotiated layout at its stride.
    /// - Whatever the surface reports from its upload or present.
    pub fn present<F: PictureFrame>(&mut self, frame: &F) -> Result<(), UnspoolError> {
        let actual = frame.format();
        if actual != self.expected {
            return Err(UnspoolError::FrameFormatMismatch {
                expected: self.expected,
                actual,
            });
        }

        let available = frame.plane_count();
        if available < self.layouts.len() {
            return Err(UnspoolError::InvalidPlane {
                plane: available,
                reason: format!(
                    "frame carries {available} plane(s), {} needs {}",
                    self.expected.pixel_format,
                    self.layouts.len()
                ),
            });
        }

        let planes: Vec<Plane<'_>> = self
            .layouts
            .iter()
            .enumerate()
            .map(|(index, &layout)| Plane {
                data: frame.plane_data(index),
                stride: frame.stride(index),
                layout,
            })
            .collect();

        for (index, plane) in planes.iter().enumerate() {
            plane.validate(index)?;
        }

        self.surface.update_planes(&planes)?;
        self.surface.present()
    }
}
