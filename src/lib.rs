#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod diagram;
pub mod document;
pub mod export;
pub mod generate;
pub mod http;
pub mod ir;
pub mod layout;
pub mod normalize;
pub mod rating;
pub mod render;
pub mod session;
pub mod share;
pub mod theme;
pub mod transform;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use diagram::{DiagramHandle, DiagramRenderer};
pub use document::Document;
pub use export::{ExportArtifact, ExportError, ExportFormat, ExportPipeline};
pub use normalize::{RawResponse, normalize};
pub use session::{Command, Effect, RenderState, Session};
pub use theme::Theme;
