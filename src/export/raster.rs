use log::debug;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to parse SVG: {0}")]
    SvgParse(String),
    #[error("failed to allocate {width}x{height} pixmap")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("invalid background color {0:?}")]
    Background(String),
    #[error("failed to encode PNG: {0}")]
    PngEncode(String),
    #[error("failed to encode JPG: {0}")]
    JpegEncode(String),
}

pub type Result<T> = std::result::Result<T, RasterError>;

pub(crate) fn usvg_options() -> usvg::Options<'static> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = "Arial".to_string();
    opt
}

/// Renders `svg` at `scale` onto an opaque `background`.
///
/// The pixel size is the root `width`/`height` times `scale`, rounded up.
pub fn svg_to_pixmap(svg: &str, scale: f32, background: &str) -> Result<tiny_skia::Pixmap> {
    let tree = parse_tree(svg)?;
    let size = tree.size();
    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;
    paint(
        &tree,
        width,
        height,
        tiny_skia::Transform::from_scale(scale, scale),
        background,
    )
}

/// Renders `svg` stretched onto a pixmap of exactly `width` x `height` pixels.
pub fn svg_to_pixmap_exact(
    svg: &str,
    width: u32,
    height: u32,
    background: &str,
) -> Result<tiny_skia::Pixmap> {
    let tree = parse_tree(svg)?;
    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    paint(&tree, width, height, transform, background)
}

fn parse_tree(svg: &str) -> Result<usvg::Tree> {
    usvg::Tree::from_str(svg, &usvg_options()).map_err(|err| RasterError::SvgParse(err.to_string()))
}

fn paint(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
    transform: tiny_skia::Transform,
    background: &str,
) -> Result<tiny_skia::Pixmap> {
    let color =
        parse_color(background).ok_or_else(|| RasterError::Background(background.to_string()))?;
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RasterError::PixmapAlloc { width, height })?;
    pixmap.fill(color);
    resvg::render(tree, transform, &mut pixmap.as_mut());
    debug!("rasterized SVG to {width}x{height}");
    Ok(pixmap)
}

pub fn encode_png(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>> {
    pixmap
        .encode_png()
        .map_err(|err| RasterError::PngEncode(err.to_string()))
}

pub fn encode_jpeg(pixmap: &tiny_skia::Pixmap, quality: u8) -> Result<Vec<u8>> {
    let (w, h) = (pixmap.width(), pixmap.height());
    // The pixmap was filled with an opaque color first, so alpha is always 255.
    let mut rgb = vec![0u8; (w as usize) * (h as usize) * 3];
    for (src, dst) in pixmap.data().chunks_exact(4).zip(rgb.chunks_exact_mut(3)) {
        dst.copy_from_slice(&src[..3]);
    }

    let mut out = Vec::new();
    let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    enc.encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
        .map_err(|err| RasterError::JpegEncode(err.to_string()))?;
    Ok(out)
}

fn parse_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "white" => return Some(tiny_skia::Color::WHITE),
        "black" => return Some(tiny_skia::Color::BLACK),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|v| v as u8))
        .collect::<Option<_>>()?;
    let (r, g, b) = match digits.as_slice() {
        [r, g, b] => (r * 17, g * 17, b * 17),
        [r1, r2, g1, g2, b1, b2] => (r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2),
        _ => return None,
    };
    Some(tiny_skia::Color::from_rgba8(r, g, b, 255))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="5" viewBox="0 0 10 5"><rect width="5" height="5" fill="black"/></svg>"#;

    #[test]
    fn pixmap_is_scaled_and_filled() {
        let pixmap = svg_to_pixmap(SQUARE, 2.0, "#ffffff").unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (20, 10));
        let last = pixmap.pixel(19, 9).unwrap();
        assert_eq!((last.red(), last.green(), last.blue(), last.alpha()), (255, 255, 255, 255));
        let first = pixmap.pixel(0, 0).unwrap();
        assert_eq!((first.red(), first.alpha()), (0, 255));
    }

    #[test]
    fn exact_pixmap_has_requested_size() {
        let pixmap = svg_to_pixmap_exact(SQUARE, 128, 128, "#ffffff").unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (128, 128));
    }

    #[test]
    fn encoders_produce_signatures() {
        let pixmap = svg_to_pixmap(SQUARE, 1.0, "white").unwrap();
        assert!(encode_png(&pixmap).unwrap().starts_with(b"\x89PNG\r\n\x1a\n"));
        assert!(encode_jpeg(&pixmap, 100).unwrap().starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(svg_to_pixmap("<svg", 1.0, "white"), Err(RasterError::SvgParse(_))));
        assert!(matches!(
            svg_to_pixmap(SQUARE, 1.0, "transparent-ish"),
            Err(RasterError::Background(_))
        ));
        assert_eq!(parse_color("#abc"), parse_color("#aabbcc"));
    }
}
