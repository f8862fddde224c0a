use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SECTION_LINE_COLORS: [&str; 10] = [
    "#1F77B4", "#FF7F0E", "#2CA02C", "#D62728", "#9467BD", "#8C564B", "#E377C2", "#7F7F7F",
    "#BCBD22", "#17BECF",
];

const SECTION_FILL_COLORS: [&str; 10] = [
    "#DCEBF7", "#FFE8D4", "#DDF2DD", "#F9DCDC", "#ECE3F4", "#EDE3E0", "#FAE6F3", "#EBEBEB",
    "#F3F3D6", "#D6F3F6",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindmapConfig {
    pub padding_x: f32,
    pub padding_y: f32,
    pub max_node_width: f32,
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub node_spacing_multiplier: f32,
    pub rank_spacing_multiplier: f32,
    pub corner_radius: f32,
    pub edge_depth_base_width: f32,
    pub edge_depth_step: f32,
    pub edge_min_width: f32,
    pub section_fills: Vec<String>,
    pub section_lines: Vec<String>,
}

impl Default for MindmapConfig {
    fn default() -> Self {
        Self {
            padding_x: 14.0,
            padding_y: 8.0,
            max_node_width: 500.0,
            node_spacing: 18.0,
            rank_spacing: 60.0,
            node_spacing_multiplier: 1.0,
            rank_spacing_multiplier: 1.0,
            corner_radius: 8.0,
            edge_depth_base_width: 5.0,
            edge_depth_step: -1.0,
            edge_min_width: 1.5,
            section_fills: SECTION_FILL_COLORS.iter().map(|c| c.to_string()).collect(),
            section_lines: SECTION_LINE_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub label_line_height: f32,
    pub mindmap: MindmapConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            label_line_height: 1.4,
            mindmap: MindmapConfig::default(),
        }
    }
}

/// Drawing surface and view behaviour of the live diagram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
    pub fit_padding: f32,
    pub max_fit_scale: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
            fit_padding: 20.0,
            max_fit_scale: 2.0,
            min_zoom: 0.1,
            max_zoom: 8.0,
            zoom_step: 1.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterEncoding {
    Jpeg,
    Png,
}

impl RasterEncoding {
    pub fn extension(self) -> &'static str {
        match self {
            RasterEncoding::Jpeg => "jpg",
            RasterEncoding::Png => "png",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            RasterEncoding::Jpeg => "image/jpeg",
            RasterEncoding::Png => "image/png",
        }
    }
}

/// Physical page size in points (1/72 inch), portrait orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub padding: f32,
    pub raster_scale: f32,
    pub pdf_scale: f32,
    pub raster_encoding: RasterEncoding,
    pub jpeg_quality: u8,
    pub page: PageSize,
    pub background: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            padding: 30.0,
            raster_scale: 2.0,
            pdf_scale: 1.8,
            raster_encoding: RasterEncoding::Jpeg,
            jpeg_quality: 100,
            page: PageSize::LETTER,
            background: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub generate_url: String,
    pub share_url: String,
    pub rating_url: String,
    pub origin: String,
    pub view_path: String,
    pub rating_source: String,
    pub qr_size: u32,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            generate_url: "https://generate.mindmapwizard.com".to_string(),
            share_url: "https://share.mindmapwizard.com/".to_string(),
            rating_url: "https://post.mindmapwizard.com".to_string(),
            origin: "https://mindmapwizard.com".to_string(),
            view_path: "/view.html".to_string(),
            rating_source: "Mind Map Wizard - Rate us".to_string(),
            qr_size: 128,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub export: ExportConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    root_font_size: Option<f32>,
    text_color: Option<String>,
    root_fill: Option<String>,
    root_text_color: Option<String>,
    line_color: Option<String>,
    background: Option<String>,
    error_color: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MindmapConfigFile {
    padding_x: Option<f32>,
    padding_y: Option<f32>,
    max_node_width: Option<f32>,
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    corner_radius: Option<f32>,
    section_fills: Option<Vec<String>>,
    section_lines: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
    fit_padding: Option<f32>,
    max_fit_scale: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ExportConfigFile {
    padding: Option<f32>,
    raster_scale: Option<f32>,
    pdf_scale: Option<f32>,
    raster_format: Option<RasterEncoding>,
    jpeg_quality: Option<u8>,
    page_size: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ServiceConfigFile {
    generate_url: Option<String>,
    share_url: Option<String>,
    rating_url: Option<String>,
    origin: Option<String>,
    view_path: Option<String>,
    qr_size: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    mindmap: Option<MindmapConfigFile>,
    render: Option<RenderConfigFile>,
    export: Option<ExportConfigFile>,
    service: Option<ServiceConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Parses config text: strict JSON first, JSON5 (comments, trailing commas) as fallback.
pub fn parse_config(contents: &str) -> Result<Config, String> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents).map_err(|_| json_err.to_string())?,
    };
    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::by_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => log::warn!("unknown theme {theme_name:?}, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.root_font_size {
            config.theme.root_font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.root_fill {
            config.theme.root_fill = v;
        }
        if let Some(v) = vars.root_text_color {
            config.theme.root_text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.error_color {
            config.theme.error_color = v;
        }
    }

    if let Some(mindmap) = parsed.mindmap {
        let target = &mut config.layout.mindmap;
        if let Some(v) = mindmap.padding_x {
            target.padding_x = v;
        }
        if let Some(v) = mindmap.padding_y {
            target.padding_y = v;
        }
        if let Some(v) = mindmap.max_node_width {
            target.max_node_width = v;
        }
        if let Some(v) = mindmap.node_spacing {
            target.node_spacing = v;
        }
        if let Some(v) = mindmap.rank_spacing {
            target.rank_spacing = v;
        }
        if let Some(v) = mindmap.corner_radius {
            target.corner_radius = v;
        }
        if let Some(v) = mindmap.section_fills.filter(|v| !v.is_empty()) {
            target.section_fills = v;
        }
        if let Some(v) = mindmap.section_lines.filter(|v| !v.is_empty()) {
            target.section_lines = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
        if let Some(v) = render.fit_padding {
            config.render.fit_padding = v;
        }
        if let Some(v) = render.max_fit_scale {
            config.render.max_fit_scale = v;
        }
    }

    if let Some(export) = parsed.export {
        if let Some(v) = export.padding {
            config.export.padding = v.max(0.0);
        }
        if let Some(v) = export.raster_scale.filter(|v| *v > 0.0) {
            config.export.raster_scale = v;
        }
        if let Some(v) = export.pdf_scale.filter(|v| *v > 0.0) {
            config.export.pdf_scale = v;
        }
        if let Some(v) = export.raster_format {
            config.export.raster_encoding = v;
        }
        if let Some(v) = export.jpeg_quality {
            config.export.jpeg_quality = v.clamp(1, 100);
        }
        if let Some(name) = export.page_size.as_deref() {
            config.export.page = match name.to_ascii_lowercase().as_str() {
                "a4" => PageSize::A4,
                "letter" => PageSize::LETTER,
                other => return Err(format!("unsupported page size {other:?}")),
            };
        }
    }

    if let Some(service) = parsed.service {
        let target = &mut config.service;
        if let Some(v) = service.generate_url {
            target.generate_url = v;
        }
        if let Some(v) = service.share_url {
            target.share_url = v;
        }
        if let Some(v) = service.rating_url {
            target.rating_url = v;
        }
        if let Some(v) = service.origin {
            target.origin = v;
        }
        if let Some(v) = service.view_path {
            target.view_path = v;
        }
        if let Some(v) = service.qr_size.filter(|v| *v > 0) {
            target.qr_size = v;
        }
        if let Some(v) = service.timeout_secs {
            target.timeout_secs = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.export.padding, 30.0);
        assert_eq!(config.export.page, PageSize::LETTER);
        assert_eq!(config.service.qr_size, 128);
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let config = parse_config(
            r#"{"theme":"modern","export":{"padding":12,"rasterFormat":"png","pageSize":"A4"},"service":{"origin":"http://localhost:3002"}}"#,
        )
        .unwrap();
        assert_eq!(config.theme.font_size, Theme::modern().font_size);
        assert_eq!(config.export.padding, 12.0);
        assert_eq!(config.export.raster_encoding, RasterEncoding::Png);
        assert_eq!(config.export.page, PageSize::A4);
        assert_eq!(config.export.raster_scale, 2.0);
        assert_eq!(config.service.origin, "http://localhost:3002");
        assert_eq!(config.service.view_path, "/view.html");
    }

    #[test]
    fn json5_fallback_accepts_comments() {
        let config = parse_config("{\n  // wider surface\n  render: { width: 1600, },\n}").unwrap();
        assert_eq!(config.render.width, 1600.0);
    }

    #[test]
    fn unknown_page_size_is_rejected() {
        let err = parse_config(r#"{"export":{"pageSize":"tabloid"}}"#).unwrap_err();
        assert!(err.contains("tabloid"));
    }
}
