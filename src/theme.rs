use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub root_font_size: f32,
    pub text_color: String,
    pub root_fill: String,
    pub root_text_color: String,
    pub line_color: String,
    pub background: String,
    pub error_color: String,
}

impl Theme {
    /// Palette used by the hosted mind map page.
    pub fn wizard() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 14.0,
            root_font_size: 18.0,
            text_color: "#1E293B".to_string(),
            root_fill: "#1E293B".to_string(),
            root_text_color: "#FFFFFF".to_string(),
            line_color: "#94A3B8".to_string(),
            background: "#FFFFFF".to_string(),
            error_color: "#FF5350".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            root_font_size: 16.0,
            text_color: "#1C2430".to_string(),
            root_fill: "#F8FAFF".to_string(),
            root_text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            background: "#FFFFFF".to_string(),
            error_color: "#D64545".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "wizard" | "default" => Some(Self::wizard()),
            "modern" => Some(Self::modern()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::wizard()
    }
}
