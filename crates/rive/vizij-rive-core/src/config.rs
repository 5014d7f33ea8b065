//! Options for constructing, loading, and resetting a [`Player`].

use std::fmt;
use std::sync::Arc;

use crate::events::{Event, EventKind, Handler};
use crate::fetch::{Fetch, FileFetcher};
use crate::layout::Layout;
use crate::loader::RuntimeLoader;
use crate::player::Player;
use crate::surface::Surface;
use crate::{Result, RiveError};

/// Where file bytes come from.
#[derive(Clone, PartialEq, Eq)]
pub enum Source {
    /// Fetched through the player's [`Fetch`] implementation
    Url(String),
    /// Already in memory
    Buffer(Arc<[u8]>),
}

impl Source {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn buffer(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Buffer(bytes.into())
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
        }
    }
}

/// Everything a player needs at construction.
///
/// Exactly one of `src` or `buffer` must be set. The remaining fields default as follows:
///
/// | field        | default                                              |
/// |--------------|------------------------------------------------------|
/// | `autoplay`   | `false`                                              |
/// | `artboard`   | the file's default artboard                          |
/// | `animations` | the artboard's first animation                       |
/// | `layout`     | `Layout::default()`, bounds taken from the surface   |
/// | `loader`     | [`RuntimeLoader::global`]                            |
/// | `fetcher`    | [`FileFetcher`]                                      |
pub struct ConstructOptions {
    pub surface: Arc<dyn Surface>,
    pub src: Option<String>,
    pub buffer: Option<Arc<[u8]>>,
    pub autoplay: bool,
    pub artboard: Option<String>,
    pub animations: Vec<String>,
    pub layout: Layout,
    pub loader: Option<RuntimeLoader>,
    pub fetcher: Option<Arc<dyn Fetch>>,
    pub(crate) handlers: Vec<(EventKind, Handler<Player>)>,
}

impl fmt::Debug for ConstructOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: Vec<&str> = self.handlers.iter().map(|(kind, _)| kind.name()).collect();
        f.debug_struct("ConstructOptions")
            .field("src", &self.src)
            .field("buffer", &self.buffer.as_ref().map(|b| b.len()))
            .field("autoplay", &self.autoplay)
            .field("artboard", &self.artboard)
            .field("animations", &self.animations)
            .field("layout", &self.layout)
            .field("handlers", &handlers)
            .finish()
    }
}

impl ConstructOptions {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self {
            surface,
            src: None,
            buffer: None,
            autoplay: false,
            artboard: None,
            animations: Vec::new(),
            layout: Layout::default(),
            loader: None,
            fetcher: None,
            handlers: Vec::new(),
        }
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn with_buffer(mut self, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.buffer = Some(bytes.into());
        self
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_artboard(mut self, artboard: impl Into<String>) -> Self {
        self.artboard = Some(artboard.into());
        self
    }

    pub fn with_animations<I, S>(mut self, animations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.animations = animations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_loader(mut self, loader: RuntimeLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Register the handler for `kind`. A later registration for the same kind wins.
    pub fn on<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(&Player, &Event) + Send + Sync + 'static,
    {
        self.handlers.push((kind, Arc::new(handler)));
        self
    }

    pub fn on_load<F>(self, handler: F) -> Self
    where
        F: Fn(&Player, &Event) + Send + Sync + 'static,
    {
        self.on(EventKind::Load, handler)
    }

    pub fn on_load_error<F>(self, handler: F) -> Self
    where
        F: Fn(&Player, &Event) + Send + Sync + 'static,
    {
        self.on(EventKind::LoadError, handler)
    }

    pub fn on_play<F>(self, handler: F) -> Self
    where
        F: Fn(&Player, &Event) + Send + Sync + 'static,
    {
        self.on(EventKind::Play, handler)
    }

    pub fn on_pause<F>(self, handler: F) -> Self
    where
        F: Fn(&Player, &Event) + Send + Sync + 'static,
    {
        self.on(EventKind::Pause, handler)
    }

    pub fn on_stop<F>(self, handler: F) -> Self
    where
        F: Fn(&Player, &Event) + Send + Sync + 'static,
    {
        self.on(EventKind::Stop, handler)
    }

    pub fn on_loop<F>(self, handler: F) -> Self
    where
        F: Fn(&Player, &Event) + Send + Sync + 'static,
    {
        self.on(EventKind::Loop, handler)
    }

    /// The single configured source.
    pub fn source(&self) -> Result<Source> {
        match (&self.src, &self.buffer) {
            (None, None) => Err(RiveError::MissingSource),
            (Some(_), Some(_)) => Err(RiveError::AmbiguousSource),
            (Some(url), None) => Ok(Source::Url(url.clone())),
            (None, Some(bytes)) => Ok(Source::Buffer(Arc::clone(bytes))),
        }
    }

    pub(crate) fn fetcher_or_default(&self) -> Arc<dyn Fetch> {
        self.fetcher
            .clone()
            .unwrap_or_else(|| Arc::new(FileFetcher))
    }

    pub(crate) fn load_options(&self, source: Source) -> LoadOptions {
        LoadOptions {
            source,
            autoplay: self.autoplay,
            artboard: self.artboard.clone(),
            animations: self.animations.clone(),
            layout: Some(self.layout),
        }
    }
}

/// Options for [`Player::load`].
///
/// `layout: None` keeps the layout the player already has; bounds are re-resolved
/// against the surface either way unless explicit.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOptions {
    pub source: Source,
    pub autoplay: bool,
    pub artboard: Option<String>,
    pub animations: Vec<String>,
    pub layout: Option<Layout>,
}

impl LoadOptions {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            autoplay: false,
            artboard: None,
            animations: Vec::new(),
            layout: None,
        }
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_artboard(mut self, artboard: impl Into<String>) -> Self {
        self.artboard = Some(artboard.into());
        self
    }

    pub fn with_animations<I, S>(mut self, animations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.animations = animations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }
}

/// Options for [`Player::reset`]. Defaults: no autoplay, the active artboard, the
/// animations it was already running.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetOptions {
    pub autoplay: bool,
    pub artboard: Option<String>,
    pub animations: Vec<String>,
}

impl ResetOptions {
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_artboard(mut self, artboard: impl Into<String>) -> Self {
        self.artboard = Some(artboard.into());
        self
    }

    pub fn with_animations<I, S>(mut self, animations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.animations = animations.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Canvas;

    fn canvas() -> Arc<dyn Surface> {
        Arc::new(Canvas::new(400, 300))
    }

    #[test]
    fn source_requires_exactly_one_input() {
        let none = ConstructOptions::new(canvas());
        assert_eq!(none.source(), Err(RiveError::MissingSource));

        let both = ConstructOptions::new(canvas())
            .with_src("file:///a.riv")
            .with_buffer(vec![1u8, 2, 3]);
        assert_eq!(both.source(), Err(RiveError::AmbiguousSource));

        let url = ConstructOptions::new(canvas()).with_src("file:///a.riv");
        assert_eq!(url.source(), Ok(Source::url("file:///a.riv")));
    }

    #[test]
    fn construct_defaults_carry_into_first_load() {
        let opts = ConstructOptions::new(canvas())
            .with_buffer(vec![0u8; 4])
            .with_artboard("Artboard2")
            .with_animations(["spin"])
            .on_load(|_, _| {})
            .on_loop(|_, _| {});
        assert!(!opts.autoplay);
        assert_eq!(opts.handlers.len(), 2);

        let source = opts.source().unwrap();
        let load = opts.load_options(source);
        assert_eq!(load.artboard.as_deref(), Some("Artboard2"));
        assert_eq!(load.animations, vec!["spin".to_string()]);
        assert_eq!(load.layout, Some(Layout::default()));
    }

    #[test]
    fn reset_defaults_are_inert() {
        let reset = ResetOptions::default();
        assert!(!reset.autoplay);
        assert!(reset.artboard.is_none());
        assert!(reset.animations.is_empty());
        assert!(ResetOptions::default().with_autoplay(true).autoplay);
    }

    #[test]
    fn buffer_debug_hides_bytes() {
        let src = Source::buffer(vec![7u8; 16]);
        assert_eq!(format!("{src:?}"), "Buffer(16 bytes)");
    }
}
