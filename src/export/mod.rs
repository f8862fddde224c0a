//! Turns the live diagram into downloadable artifacts.
//!
//! Every format except markdown works on a padded clone of the drawn content:
//! the tight bounding box grown by the configured padding on all sides, with the
//! on-screen pan/zoom left out.

pub mod pdf;
pub mod raster;

use crate::config::{ExportConfig, RasterEncoding};
use crate::diagram::DiagramHandle;
use crate::document::Document;
use crate::layout::Bounds;
use crate::render::svg_document;
use log::{debug, info};
use std::fmt;

pub use pdf::{Orientation, PagePlacement, place_on_page};
pub use raster::RasterError;

pub const FALLBACK_FILENAME: &str = "mindmap";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Markdown,
    Svg,
    Raster,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Markdown,
        ExportFormat::Svg,
        ExportFormat::Raster,
        ExportFormat::Pdf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Svg => "svg",
            ExportFormat::Raster => "raster-image",
            ExportFormat::Pdf => "paginated-document",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub filename: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("cannot export {format}: there is no mind map to export")]
    NothingToExport { format: ExportFormat },
    #[error("cannot export {format}: failed to decode the diagram: {message}")]
    Decode { format: ExportFormat, message: String },
    #[error("cannot export {format}: failed to allocate a {width}x{height} image")]
    PixmapAlloc {
        format: ExportFormat,
        width: u32,
        height: u32,
    },
    #[error("cannot export {format}: failed to encode image: {message}")]
    Encode { format: ExportFormat, message: String },
    #[error("cannot export {format}: failed to write PDF: {message}")]
    Pdf { format: ExportFormat, message: String },
}

impl ExportError {
    pub fn format(&self) -> ExportFormat {
        match self {
            ExportError::NothingToExport { format }
            | ExportError::Decode { format, .. }
            | ExportError::PixmapAlloc { format, .. }
            | ExportError::Encode { format, .. }
            | ExportError::Pdf { format, .. } => *format,
        }
    }

    fn from_raster(format: ExportFormat, err: RasterError) -> Self {
        match err {
            RasterError::SvgParse(message) => ExportError::Decode { format, message },
            RasterError::PixmapAlloc { width, height } => ExportError::PixmapAlloc {
                format,
                width,
                height,
            },
            err @ (RasterError::Background(_)
            | RasterError::PngEncode(_)
            | RasterError::JpegEncode(_)) => ExportError::Encode {
                format,
                message: err.to_string(),
            },
        }
    }
}

/// Size and view window of the padded export clone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportGeometry {
    pub view_box: Bounds,
    pub width: f32,
    pub height: f32,
}

pub fn export_geometry(bbox: Bounds, padding: f32) -> ExportGeometry {
    let width = bbox.width + padding * 2.0;
    let height = bbox.height + padding * 2.0;
    ExportGeometry {
        view_box: Bounds::new(bbox.x - padding, bbox.y - padding, width, height),
        width,
        height,
    }
}

/// Topic as a file stem: path-hostile characters replaced, `mindmap` when blank.
pub fn file_stem(topic: &str) -> String {
    let stem: String = topic
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if stem.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        stem.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportPipeline {
    config: ExportConfig,
}

impl ExportPipeline {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Builds a fresh artifact from the current document and diagram. Nothing is cached.
    pub fn export(
        &self,
        format: ExportFormat,
        document: Option<&Document>,
        handle: Option<&DiagramHandle>,
    ) -> Result<ExportArtifact, ExportError> {
        let topic = document.map(|doc| doc.topic.as_str()).unwrap_or_default();
        let stem = file_stem(topic);

        let artifact = match format {
            ExportFormat::Markdown => {
                let document = document
                    .filter(|doc| doc.has_content())
                    .ok_or(ExportError::NothingToExport { format })?;
                ExportArtifact {
                    bytes: document.markdown.clone().into_bytes(),
                    mime: "text/markdown",
                    filename: format!("{stem}.md"),
                }
            }
            ExportFormat::Svg => {
                let (svg, _) = self.padded_svg(format, handle)?;
                ExportArtifact {
                    bytes: svg.into_bytes(),
                    mime: "image/svg+xml",
                    filename: format!("{stem}.svg"),
                }
            }
            ExportFormat::Raster => {
                let (svg, _) = self.padded_svg(format, handle)?;
                let encoding = self.config.raster_encoding;
                let pixmap =
                    raster::svg_to_pixmap(&svg, self.config.raster_scale, &self.config.background)
                        .map_err(|err| ExportError::from_raster(format, err))?;
                let bytes = match encoding {
                    RasterEncoding::Jpeg => raster::encode_jpeg(&pixmap, self.config.jpeg_quality),
                    RasterEncoding::Png => raster::encode_png(&pixmap),
                }
                .map_err(|err| ExportError::from_raster(format, err))?;
                ExportArtifact {
                    bytes,
                    mime: encoding.mime(),
                    filename: format!("{stem}.{}", encoding.extension()),
                }
            }
            ExportFormat::Pdf => {
                let (svg, geometry) = self.padded_svg(format, handle)?;
                let jpeg =
                    raster::svg_to_pixmap(&svg, self.config.pdf_scale, &self.config.background)
                        .and_then(|pixmap| raster::encode_jpeg(&pixmap, self.config.jpeg_quality))
                        .map_err(|err| ExportError::from_raster(format, err))?;
                let placement = place_on_page(geometry.width, geometry.height, self.config.page);
                debug!("placing {format} image on page: {placement:?}");
                let bytes = pdf::svg_to_pdf(&pdf::page_svg(&jpeg, &placement))
                    .map_err(|message| ExportError::Pdf { format, message })?;
                ExportArtifact {
                    bytes,
                    mime: "application/pdf",
                    filename: format!("{stem}.pdf"),
                }
            }
        };
        info!(
            "exported {format} as {} ({} bytes)",
            artifact.filename,
            artifact.bytes.len()
        );
        Ok(artifact)
    }

    /// Serializes the padded clone of the drawn content.
    pub fn padded_svg(
        &self,
        format: ExportFormat,
        handle: Option<&DiagramHandle>,
    ) -> Result<(String, ExportGeometry), ExportError> {
        let handle = handle
            .filter(|handle| handle.has_content())
            .ok_or(ExportError::NothingToExport { format })?;
        let geometry = export_geometry(handle.bbox(), self.config.padding);
        let svg = svg_document(
            handle.content_svg(),
            geometry.width,
            geometry.height,
            geometry.view_box,
            None,
        );
        Ok((svg, geometry))
    }
}
