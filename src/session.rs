//! The interactive session: one document, one diagram, and the transitions between
//! generating, viewing and editing it.
//!
//! Generation is split in two. [`Session::dispatch`] with [`Command::Generate`]
//! hands back a [`GenerationTicket`]; the caller performs the request and feeds the
//! reply to [`Session::resolve`]. Replies whose ticket is no longer expected are
//! dropped, so at most one generation is ever applied per request.

use crate::config::Config;
use crate::diagram::DiagramRenderer;
use crate::document::Document;
use crate::export::{ExportArtifact, ExportFormat, ExportPipeline};
use crate::generate::GenerationError;
use crate::http::Transport;
use crate::layout::{LayoutCapability, MarkmapLayout};
use crate::normalize::{RawResponse, ensure_leading_heading, normalize};
use crate::share::{ShareAttempt, ShareClient, ShareDialog};
use log::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Loading,
    Rendered,
    Editing,
}

/// Proof of an issued generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    token: u64,
    topic: String,
}

impl GenerationTicket {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Generate(String),
    Regenerate,
    Edit,
    CancelEdit,
    SaveEdit,
    OpenDownloads,
    CloseDownloads,
    Download(ExportFormat),
    Share,
    RetryShare,
    CloseShare,
    Fit,
    ZoomIn,
    ZoomOut,
    DismissError,
}

/// What the caller has to act on after a transition.
#[derive(Debug)]
pub enum Effect {
    /// Ignored, or nothing visible changed.
    None,
    /// Perform this generation and pass the reply to [`Session::resolve`].
    Request(GenerationTicket),
    /// The diagram was redrawn or its view changed.
    Redrawn,
    Download(ExportArtifact),
    Share(ShareAttempt),
    /// The error overlay is now showing this message.
    Error(String),
}

pub struct Session<T, L: LayoutCapability = MarkmapLayout> {
    state: RenderState,
    resume_state: RenderState,
    document: Option<Document>,
    title: Option<String>,
    edit_buffer: Option<String>,
    error: Option<String>,
    downloads_open: bool,
    expected_token: Option<u64>,
    next_token: u64,
    renderer: DiagramRenderer<L>,
    exporter: ExportPipeline,
    share: ShareClient<T>,
}

impl<T: Transport> Session<T, MarkmapLayout> {
    pub fn new(config: &Config, transport: T) -> Self {
        Self::with_renderer(config, DiagramRenderer::new(config), transport)
    }
}

impl<T: Transport, L: LayoutCapability> Session<T, L> {
    pub fn with_renderer(config: &Config, renderer: DiagramRenderer<L>, transport: T) -> Self {
        Self {
            state: RenderState::Idle,
            resume_state: RenderState::Idle,
            document: None,
            title: None,
            edit_buffer: None,
            error: None,
            downloads_open: false,
            expected_token: None,
            next_token: 1,
            renderer,
            exporter: ExportPipeline::new(config.export.clone()),
            share: ShareClient::new(transport, &config.service),
        }
    }

    /// Starts a generation for the page's `q` parameter, if it has one.
    pub fn start(&mut self, page_url: &str) -> Effect {
        match initial_topic(page_url) {
            Some(topic) => self.generate(&topic),
            None => Effect::None,
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn edit_buffer(&self) -> Option<&str> {
        self.edit_buffer.as_deref()
    }

    /// Replaces the edit buffer's text; ignored outside of editing.
    pub fn set_edit_buffer(&mut self, text: impl Into<String>) {
        if let Some(buffer) = self.edit_buffer.as_mut() {
            *buffer = text.into();
        }
    }

    pub fn downloads_open(&self) -> bool {
        self.downloads_open
    }

    pub fn share_dialog(&self) -> &ShareDialog {
        self.share.dialog()
    }

    pub fn renderer(&self) -> &DiagramRenderer<L> {
        &self.renderer
    }

    pub fn dispatch(&mut self, command: Command) -> Effect {
        debug!("dispatching {command:?} in state {:?}", self.state);
        match command {
            Command::Generate(topic) => self.generate(&topic),
            Command::Regenerate => self.regenerate(),
            Command::Edit => self.edit(),
            Command::CancelEdit => self.cancel_edit(),
            Command::SaveEdit => self.save_edit(),
            Command::OpenDownloads => self.open_downloads(),
            Command::CloseDownloads => {
                self.downloads_open = false;
                Effect::None
            }
            Command::Download(format) => self.download(format),
            Command::Share => self.share(),
            Command::RetryShare => Effect::Share(self.share.retry()),
            Command::CloseShare => {
                self.share.close();
                Effect::None
            }
            Command::Fit => self.view(|renderer| renderer.refit()),
            Command::ZoomIn => self.view(|renderer| renderer.zoom_in()),
            Command::ZoomOut => self.view(|renderer| renderer.zoom_out()),
            Command::DismissError => {
                self.error = None;
                Effect::None
            }
        }
    }

    /// Maps a key press to its command; only active over a rendered, non-empty diagram.
    pub fn shortcut(&self, key: char, in_text_field: bool) -> Option<Command> {
        let has_markdown = self.document.as_ref().is_some_and(Document::has_content);
        if self.state != RenderState::Rendered || in_text_field || !has_markdown {
            return None;
        }
        match key.to_ascii_lowercase() {
            'e' => Some(Command::Edit),
            'd' => Some(Command::OpenDownloads),
            'g' => Some(Command::Regenerate),
            's' => Some(Command::Share),
            'f' => Some(Command::Fit),
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: char, in_text_field: bool) -> Effect {
        match self.shortcut(key, in_text_field) {
            Some(command) => self.dispatch(command),
            None => Effect::None,
        }
    }

    /// Applies a generation reply. Replies for tickets that are no longer expected are dropped.
    pub fn resolve(
        &mut self,
        ticket: GenerationTicket,
        result: Result<RawResponse, GenerationError>,
    ) -> Effect {
        if self.expected_token != Some(ticket.token) {
            warn!("dropping stale generation reply for {:?}", ticket.topic);
            return Effect::None;
        }
        self.expected_token = None;

        match result {
            Ok(raw) => {
                let mut document = normalize(&raw);
                if document.topic.trim().is_empty() {
                    document.topic = ticket.topic.clone();
                }
                let mount_id = self.renderer.render(&document.markdown).mount_id();
                info!("generated mind map {:?} (diagram {mount_id})", document.topic);
                self.title = Some(document.topic.clone());
                self.document = Some(document);
                self.state = RenderState::Rendered;
                Effect::Redrawn
            }
            Err(err) => {
                warn!("generation for {:?} failed: {err}", ticket.topic);
                self.state = self.resume_state;
                self.show_error(err.to_string())
            }
        }
    }

    /// Forgets the in-flight request, if any, and returns to where it started.
    pub fn abandon(&mut self) {
        if self.state == RenderState::Loading {
            debug!("abandoning generation request");
            self.expected_token = None;
            self.state = self.resume_state;
        }
    }

    /// Releases everything the session holds.
    pub fn teardown(&mut self) {
        self.abandon();
        self.renderer.clear();
        self.share.close();
        self.document = None;
        self.title = None;
        self.edit_buffer = None;
        self.error = None;
        self.downloads_open = false;
        self.state = RenderState::Idle;
        self.resume_state = RenderState::Idle;
    }

    fn generate(&mut self, topic: &str) -> Effect {
        let topic = topic.trim();
        if topic.is_empty() {
            return Effect::None;
        }
        if self.state == RenderState::Loading {
            debug!("ignoring duplicate generation for {topic:?}");
            return Effect::None;
        }
        if self.state == RenderState::Editing {
            self.edit_buffer = None;
            self.renderer.show();
        }
        self.resume_state = match self.state {
            RenderState::Editing => RenderState::Rendered,
            state => state,
        };
        self.state = RenderState::Loading;
        self.error = None;

        let token = self.next_token;
        self.next_token += 1;
        self.expected_token = Some(token);
        Effect::Request(GenerationTicket {
            token,
            topic: topic.to_string(),
        })
    }

    fn regenerate(&mut self) -> Effect {
        if self.state != RenderState::Rendered {
            return Effect::None;
        }
        match self.title.clone() {
            Some(title) => self.generate(&title),
            None => Effect::None,
        }
    }

    fn edit(&mut self) -> Effect {
        if self.state != RenderState::Rendered {
            return Effect::None;
        }
        let Some(document) = self.document.as_ref() else {
            return Effect::None;
        };
        self.edit_buffer = Some(document.markdown.clone());
        self.renderer.hide();
        self.state = RenderState::Editing;
        Effect::None
    }

    fn cancel_edit(&mut self) -> Effect {
        if self.state != RenderState::Editing {
            return Effect::None;
        }
        self.edit_buffer = None;
        self.renderer.show();
        self.state = RenderState::Rendered;
        Effect::None
    }

    fn save_edit(&mut self) -> Effect {
        if self.state != RenderState::Editing {
            return Effect::None;
        }
        let buffer = self.edit_buffer.take().unwrap_or_default();
        if self.document.is_some() && buffer.trim().is_empty() {
            self.edit_buffer = Some(buffer);
            return self.show_error("A mind map cannot be empty".to_string());
        }
        self.state = RenderState::Rendered;
        let Some(document) = self.document.as_mut() else {
            self.renderer.show();
            return Effect::None;
        };
        let markdown = ensure_leading_heading(buffer.trim());
        if markdown == document.markdown {
            self.renderer.show();
            return Effect::None;
        }
        document.markdown = markdown;
        self.renderer.render(&document.markdown);
        debug!("re-rendered edited mind map");
        Effect::Redrawn
    }

    fn open_downloads(&mut self) -> Effect {
        if self.document.is_some() {
            self.downloads_open = true;
        }
        Effect::None
    }

    fn download(&mut self, format: ExportFormat) -> Effect {
        match self
            .exporter
            .export(format, self.document.as_ref(), self.renderer.handle())
        {
            Ok(artifact) => {
                self.downloads_open = false;
                Effect::Download(artifact)
            }
            Err(err) => self.show_error(err.to_string()),
        }
    }

    fn share(&mut self) -> Effect {
        let snapshot = self
            .document
            .clone()
            .unwrap_or_else(|| Document::new("", ""));
        Effect::Share(self.share.share(&snapshot))
    }

    fn view(&mut self, change: impl FnOnce(&mut DiagramRenderer<L>)) -> Effect {
        if self.renderer.handle().is_none() {
            return Effect::None;
        }
        change(&mut self.renderer);
        Effect::Redrawn
    }

    fn show_error(&mut self, message: String) -> Effect {
        self.error = Some(message.clone());
        Effect::Error(message)
    }
}

/// The `q` query parameter of a page URL, trimmed; `None` when absent or blank.
pub fn initial_topic(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.trim().to_string())
        .filter(|topic| !topic.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::http::fake::FakeTransport;
    use crate::layout::{Layout, RenderError};
    use crate::theme::Theme;

    struct Rejecting;

    impl LayoutCapability for Rejecting {
        fn layout(&self, _: &str, _: &Theme, _: &LayoutConfig) -> Result<Layout, RenderError> {
            Err(RenderError::NoNodes)
        }
    }

    const CATS: &str = "#Cats\n## Breeds\n### Siamese\n## Care";

    fn session(transport: &FakeTransport) -> Session<&FakeTransport> {
        Session::new(&Config::default(), transport)
    }

    fn ticket(effect: Effect) -> GenerationTicket {
        match effect {
            Effect::Request(ticket) => ticket,
            other => panic!("expected a request, got {other:?}"),
        }
    }

    fn rendered(transport: &FakeTransport) -> Session<&FakeTransport> {
        let mut session = session(transport);
        let ticket = ticket(session.dispatch(Command::Generate("Cats".into())));
        session.resolve(ticket, Ok(RawResponse::from(CATS)));
        session
    }

    #[test]
    fn generation_renders_the_normalized_document() {
        let transport = FakeTransport::default();
        let session = rendered(&transport);
        assert_eq!(session.state(), RenderState::Rendered);
        assert_eq!(session.title(), Some("Cats"));
        let doc = session.document().unwrap();
        assert!(doc.markdown.contains("# Cats\n\n## Breeds"));
        assert!(session.renderer().handle().unwrap().has_content());
    }

    #[test]
    fn blank_topics_and_missing_titles_are_ignored() {
        let transport = FakeTransport::default();
        let mut session = session(&transport);
        assert!(matches!(session.dispatch(Command::Generate("   ".into())), Effect::None));
        assert!(matches!(session.dispatch(Command::Regenerate), Effect::None));
        assert_eq!(session.state(), RenderState::Idle);
    }

    #[test]
    fn duplicate_generate_renders_once() {
        let transport = FakeTransport::default();
        let mut session = session(&transport);
        let first = ticket(session.dispatch(Command::Generate("X".into())));
        assert!(matches!(session.dispatch(Command::Generate("X".into())), Effect::None));
        assert!(matches!(session.resolve(first, Ok(RawResponse::from("# X"))), Effect::Redrawn));
        assert_eq!(session.renderer().handle().unwrap().mount_id(), 1);
    }

    #[test]
    fn stale_replies_are_dropped() {
        let transport = FakeTransport::default();
        let mut session = session(&transport);
        let stale = ticket(session.dispatch(Command::Generate("Old".into())));
        session.abandon();
        assert_eq!(session.state(), RenderState::Idle);

        let current = ticket(session.dispatch(Command::Generate("New".into())));
        assert!(matches!(session.resolve(stale, Ok(RawResponse::from("# Old"))), Effect::None));
        assert_eq!(session.state(), RenderState::Loading);
        session.resolve(current, Ok(RawResponse::from("# New")));
        assert_eq!(session.title(), Some("New"));
    }

    #[test]
    fn failures_restore_the_prior_state() {
        let transport = FakeTransport::default();
        let mut session = session(&transport);
        let first = ticket(session.dispatch(Command::Generate("Cats".into())));
        let effect = session.resolve(first, Err(GenerationError::Service("Rate limit".into())));
        assert!(matches!(effect, Effect::Error(ref message) if message == "Rate limit"));
        assert_eq!(session.state(), RenderState::Idle);
        assert_eq!(session.error(), Some("Rate limit"));

        let mut session = rendered(&transport);
        let retry = ticket(session.dispatch(Command::Regenerate));
        assert_eq!(retry.topic(), "Cats");
        session.resolve(retry, Err(GenerationError::Failed));
        assert_eq!(session.state(), RenderState::Rendered);
        assert!(session.document().is_some());
        session.dispatch(Command::DismissError);
        assert_eq!(session.error(), None);
    }

    #[test]
    fn edit_cancel_and_save() {
        let transport = FakeTransport::default();
        let mut session = rendered(&transport);
        let original = session.document().unwrap().markdown.clone();

        session.dispatch(Command::Edit);
        assert_eq!(session.state(), RenderState::Editing);
        assert!(!session.renderer().is_visible());
        session.set_edit_buffer("# Dogs");
        session.dispatch(Command::CancelEdit);
        assert_eq!(session.document().unwrap().markdown, original);
        assert!(session.renderer().is_visible());

        session.dispatch(Command::Edit);
        assert!(matches!(session.dispatch(Command::SaveEdit), Effect::None));
        assert_eq!(session.renderer().handle().unwrap().mount_id(), 1);

        session.dispatch(Command::Edit);
        session.set_edit_buffer("# Dogs\n\n## Breeds");
        assert!(matches!(session.dispatch(Command::SaveEdit), Effect::Redrawn));
        assert_eq!(session.state(), RenderState::Rendered);
        assert_eq!(session.document().unwrap().markdown, "# Dogs\n\n## Breeds");
        assert_eq!(session.renderer().handle().unwrap().mount_id(), 2);
    }

    #[test]
    fn saved_edits_keep_a_leading_heading() {
        let transport = FakeTransport::default();
        let mut session = rendered(&transport);
        let original = session.document().unwrap().markdown.clone();

        session.dispatch(Command::Edit);
        session.set_edit_buffer("  \n ");
        assert!(matches!(session.dispatch(Command::SaveEdit), Effect::Error(_)));
        assert_eq!(session.state(), RenderState::Editing);
        assert_eq!(session.document().unwrap().markdown, original);
        session.dispatch(Command::DismissError);

        session.set_edit_buffer("Dogs\n## Breeds\n");
        assert!(matches!(session.dispatch(Command::SaveEdit), Effect::Redrawn));
        assert_eq!(session.state(), RenderState::Rendered);
        assert_eq!(session.document().unwrap().markdown, "# Dogs\n## Breeds");
        assert!(matches!(
            session.dispatch(Command::Download(ExportFormat::Markdown)),
            Effect::Download(_)
        ));
    }

    #[test]
    fn download_menu_closes_only_on_success() {
        let transport = FakeTransport::default();
        let mut session = rendered(&transport);
        session.dispatch(Command::OpenDownloads);
        assert!(session.downloads_open());

        let config = Config::default();
        let renderer = DiagramRenderer::with_capability(Rejecting, &config);
        let mut failing = Session::with_renderer(&config, renderer, &transport);
        let first = ticket(failing.dispatch(Command::Generate("Bad".into())));
        failing.resolve(first, Ok(RawResponse::from("# Bad")));
        assert!(failing.renderer().handle().unwrap().is_error());
        failing.dispatch(Command::OpenDownloads);
        assert!(matches!(failing.dispatch(Command::Download(ExportFormat::Svg)), Effect::Error(_)));
        assert!(failing.downloads_open());

        let Effect::Download(artifact) = session.dispatch(Command::Download(ExportFormat::Markdown))
        else {
            panic!("markdown export should succeed");
        };
        assert_eq!(artifact.filename, "Cats.md");
        assert!(!session.downloads_open());
    }

    #[test]
    fn shortcuts_require_a_rendered_diagram() {
        let transport = FakeTransport::default();
        let mut session = session(&transport);
        assert_eq!(session.shortcut('e', false), None);

        let first = ticket(session.dispatch(Command::Generate("Cats".into())));
        session.resolve(first, Ok(RawResponse::from(CATS)));
        assert_eq!(session.shortcut('e', true), None);
        assert_eq!(session.shortcut('E', false), Some(Command::Edit));
        assert_eq!(session.shortcut('g', false), Some(Command::Regenerate));
        assert_eq!(session.shortcut('x', false), None);

        session.handle_key('d', false);
        assert!(session.downloads_open());
    }

    #[test]
    fn share_without_document_makes_no_request() {
        let transport = FakeTransport::default();
        let mut session = session(&transport);
        let effect = session.dispatch(Command::Share);
        assert!(matches!(effect, Effect::Share(ShareAttempt::Failed(_))));
        assert_eq!(transport.request_count(), 0);
        session.dispatch(Command::CloseShare);
        assert_eq!(session.share_dialog(), &ShareDialog::Closed);
    }

    #[test]
    fn teardown_releases_everything() {
        let transport = FakeTransport::default();
        let mut session = rendered(&transport);
        session.dispatch(Command::Regenerate);
        session.teardown();
        assert_eq!(session.state(), RenderState::Idle);
        assert!(session.document().is_none());
        assert!(session.renderer().handle().is_none());
        assert!(matches!(session.dispatch(Command::Fit), Effect::None));
    }

    #[test]
    fn initial_topic_reads_q_parameter() {
        assert_eq!(
            initial_topic("https://mindmapwizard.com/?q=Black%20Holes").as_deref(),
            Some("Black Holes")
        );
        assert_eq!(initial_topic("https://mindmapwizard.com/?q=+"), None);
        assert_eq!(initial_topic("not a url"), None);

        let transport = FakeTransport::default();
        let mut session = session(&transport);
        let started = ticket(session.start("https://mindmapwizard.com/?q=Cats"));
        assert_eq!(started.topic(), "Cats");
    }
}
