use crate::config::PageSize;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Where the raster image lands on the page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub orientation: Orientation,
    pub page_width: f32,
    pub page_height: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Centers an image of `width` x `height` on `page`, landscape when the image is
/// wider than tall, shrinking it to fit but never enlarging it.
pub fn place_on_page(width: f32, height: f32, page: PageSize) -> PagePlacement {
    let orientation = if width > height {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    };
    let (short, long) = (page.width.min(page.height), page.width.max(page.height));
    let (page_width, page_height) = match orientation {
        Orientation::Landscape => (long, short),
        Orientation::Portrait => (short, long),
    };

    let width = width.max(1.0);
    let height = height.max(1.0);
    let scale = (page_width / width).min(page_height / height).min(1.0);
    let (final_w, final_h) = (width * scale, height * scale);

    PagePlacement {
        orientation,
        page_width,
        page_height,
        x: (page_width - final_w) / 2.0,
        y: (page_height - final_h) / 2.0,
        width: final_w,
        height: final_h,
    }
}

/// One-page SVG embedding `jpeg` at `placement`, ready for PDF conversion.
pub(crate) fn page_svg(jpeg: &[u8], placement: &PagePlacement) -> String {
    format!(
        concat!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" ",
            "width=\"{pw}\" height=\"{ph}\" viewBox=\"0 0 {pw} {ph}\">",
            "<rect width=\"{pw}\" height=\"{ph}\" fill=\"#ffffff\"/>",
            "<image x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" preserveAspectRatio=\"none\" ",
            "xlink:href=\"data:image/jpeg;base64,{data}\"/>",
            "</svg>"
        ),
        pw = placement.page_width,
        ph = placement.page_height,
        x = placement.x,
        y = placement.y,
        w = placement.width,
        h = placement.height,
        data = STANDARD.encode(jpeg),
    )
}

pub(crate) fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, String> {
    let mut opt = svg2pdf::usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let tree = svg2pdf::usvg::Tree::from_str(svg, &opt).map_err(|err| err.to_string())?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|err| err.to_string())
}
