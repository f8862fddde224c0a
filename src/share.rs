//! Publishing a mind map and building its viewer link and QR code.

use crate::config::ServiceConfig;
use crate::document::Document;
use crate::export::raster;
use crate::http::{Transport, TransportError};
use log::{error, info};
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use serde_json::Value;
use url::Url;

pub const NOTHING_TO_SHARE: &str = "nothing to share: no mind map content available";

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("{NOTHING_TO_SHARE}")]
    NothingToShare,
    #[error("{message}")]
    Service { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected reply from the sharing service: {0}")]
    MalformedReply(String),
    #[error("invalid viewer link: {0}")]
    Link(#[from] url::ParseError),
    #[error("failed to draw QR code: {0}")]
    Qr(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareLink {
    pub id: String,
    pub url: Url,
    /// PNG of the link's QR code.
    pub qr_png: Vec<u8>,
}

/// What the share dialog currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ShareDialog {
    #[default]
    Closed,
    Loading,
    Ready(ShareLink),
    Failed(String),
}

#[derive(Debug)]
pub enum ShareAttempt {
    /// A dialog was already open; nothing happened.
    Ignored,
    Shared(ShareLink),
    Failed(ShareError),
}

pub struct ShareClient<T> {
    transport: T,
    share_url: String,
    origin: String,
    view_path: String,
    qr_size: u32,
    dialog: ShareDialog,
    pending: Option<Document>,
}

impl<T: Transport> ShareClient<T> {
    pub fn new(transport: T, config: &ServiceConfig) -> Self {
        Self {
            transport,
            share_url: config.share_url.clone(),
            origin: config.origin.clone(),
            view_path: config.view_path.clone(),
            qr_size: config.qr_size,
            dialog: ShareDialog::Closed,
            pending: None,
        }
    }

    pub fn dialog(&self) -> &ShareDialog {
        &self.dialog
    }

    pub fn is_open(&self) -> bool {
        self.dialog != ShareDialog::Closed
    }

    /// Opens the dialog and publishes a snapshot of `document`.
    pub fn share(&mut self, document: &Document) -> ShareAttempt {
        if self.is_open() {
            return ShareAttempt::Ignored;
        }
        self.run(document.clone())
    }

    /// Runs the last attempt again; only valid while the dialog shows a failure.
    pub fn retry(&mut self) -> ShareAttempt {
        if !matches!(self.dialog, ShareDialog::Failed(_)) {
            return ShareAttempt::Ignored;
        }
        match self.pending.take() {
            Some(document) => self.run(document),
            None => ShareAttempt::Ignored,
        }
    }

    pub fn close(&mut self) {
        self.dialog = ShareDialog::Closed;
        self.pending = None;
    }

    fn run(&mut self, document: Document) -> ShareAttempt {
        self.dialog = ShareDialog::Loading;
        let result = self.publish(&document);
        self.pending = Some(document);
        match result {
            Ok(link) => {
                info!("shared mind map as {}", link.url);
                self.dialog = ShareDialog::Ready(link.clone());
                ShareAttempt::Shared(link)
            }
            Err(err) => {
                error!("error sharing mind map: {err}");
                self.dialog = ShareDialog::Failed(err.to_string());
                ShareAttempt::Failed(err)
            }
        }
    }

    fn publish(&self, document: &Document) -> Result<ShareLink, ShareError> {
        if !document.has_content() {
            return Err(ShareError::NothingToShare);
        }
        let reply = self
            .transport
            .post_json(&self.share_url, &document.share_payload())?;
        let data = reply.json().ok();

        if !reply.is_success() {
            let message = data
                .as_ref()
                .and_then(|data| data.get("message"))
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Failed to share mindmap. Status: {}", reply.status));
            return Err(ShareError::Service {
                status: reply.status,
                message,
            });
        }

        let id = match data.as_ref().and_then(|data| data.get("id")) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                let body = String::from_utf8_lossy(&reply.body);
                return Err(ShareError::MalformedReply(format!("missing id in {body:?}")));
            }
        };
        let url = view_url(&self.origin, &self.view_path, &id)?;
        let qr_png = qr_png(url.as_str(), self.qr_size)?;
        Ok(ShareLink { id, url, qr_png })
    }
}

/// `<origin><view_path>?id=<id>`, with the id query-encoded.
pub fn view_url(origin: &str, view_path: &str, id: &str) -> Result<Url, ShareError> {
    let mut url = Url::parse(origin)?.join(view_path)?;
    url.query_pairs_mut().clear().append_pair("id", id);
    Ok(url)
}

/// Square PNG of `size` pixels encoding `text` at error-correction level H.
pub fn qr_png(text: &str, size: u32) -> Result<Vec<u8>, ShareError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H)
        .map_err(|err| ShareError::Qr(err.to_string()))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(size, size)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    raster::svg_to_pixmap_exact(&image, size, size, "#ffffff")
        .and_then(|pixmap| raster::encode_png(&pixmap))
        .map_err(|err| ShareError::Qr(err.to_string()))
}
