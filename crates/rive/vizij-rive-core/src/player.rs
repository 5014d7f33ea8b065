//! Playback instance: file lifecycle, the play/pause/stop state machine, and event
//! emission.
//!
//! A [`Player`] is a cheap handle; clones share one instance. All mutation happens
//! under a single lock and events are dispatched only after it is released, so any
//! handler may call back into the player (including [`Player::load`]).
//!
//! Loads are asynchronous. Each [`Player::load`] bumps a generation counter and tears
//! the current file down immediately; a completion that arrives for an older generation
//! is discarded without side effects.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use crate::config::{ConstructOptions, LoadOptions, ResetOptions, Source};
use crate::contents::{Contents, FileHandle};
use crate::error::CORRUPT_FILE_MESSAGE;
use crate::events::{Event, EventDispatcher, EventKind};
use crate::fetch::Fetch;
use crate::layout::Layout;
use crate::loader::RuntimeLoader;
use crate::playback::PlaybackState;
use crate::runtime::ArtboardInstance;
use crate::surface::Surface;
use crate::{Result, RiveError};

/// Playback commands issued while a load is in flight, replayed after `Load`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Action {
    Play,
    Pause,
    Stop,
}

struct PlayerState {
    generation: u64,
    /// Bumped whenever the artboard instance is replaced, rewound, or dropped.
    epoch: u64,
    loading: bool,
    file: Option<FileHandle>,
    instance: Option<Box<dyn ArtboardInstance>>,
    active_artboard: String,
    playback: PlaybackState,
    layout_template: Layout,
    layout: Layout,
    deferred: Vec<Action>,
}

impl PlayerState {
    fn teardown(&mut self) {
        self.epoch += 1;
        self.instance = None;
        self.file = None;
        self.active_artboard.clear();
        self.playback = PlaybackState::Stopped;
    }

    fn animations(&self) -> Vec<String> {
        self.instance
            .as_ref()
            .map(|i| i.animations())
            .unwrap_or_default()
    }
}

struct Shared {
    surface: Arc<dyn Surface>,
    loader: RuntimeLoader,
    fetcher: Arc<dyn Fetch>,
    runtime: Handle,
    events: EventDispatcher<Player>,
    state: Mutex<PlayerState>,
}

/// Long-lived playback instance bound to one surface.
#[derive(Clone)]
pub struct Player {
    shared: Arc<Shared>,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.shared.state.lock();
        f.debug_struct("Player")
            .field("generation", &st.generation)
            .field("loading", &st.loading)
            .field("active_artboard", &st.active_artboard)
            .field("playback", &st.playback)
            .field("layout", &st.layout)
            .finish()
    }
}

type Opened = (FileHandle, Box<dyn ArtboardInstance>);

impl Player {
    /// Validate `opts`, register its handlers, and start the initial load.
    ///
    /// Fails synchronously when no source (or both sources) are supplied, or when
    /// called outside of a tokio runtime. Every other failure is reported later
    /// through [`EventKind::LoadError`].
    pub fn new(opts: ConstructOptions) -> Result<Player> {
        let source = opts.source()?;
        let runtime = Handle::try_current().map_err(|_| RiveError::NoAsyncRuntime)?;

        let load = opts.load_options(source);
        let fetcher = opts.fetcher_or_default();
        let ConstructOptions {
            surface,
            loader,
            handlers,
            layout,
            ..
        } = opts;

        let events = EventDispatcher::new();
        for (kind, handler) in handlers {
            events.set(kind, handler);
        }

        let player = Player {
            shared: Arc::new(Shared {
                surface,
                loader: loader.unwrap_or_else(RuntimeLoader::global),
                fetcher,
                runtime,
                events,
                state: Mutex::new(PlayerState {
                    generation: 0,
                    epoch: 0,
                    loading: false,
                    file: None,
                    instance: None,
                    active_artboard: String::new(),
                    playback: PlaybackState::Stopped,
                    layout_template: layout,
                    layout,
                    deferred: Vec::new(),
                }),
            }),
        };
        player.load(load);
        Ok(player)
    }

    /// Replace the current file.
    ///
    /// The current file is released synchronously (no `Stop` is emitted) and the
    /// player sits in Stopped with no active artboard until the new file resolves to
    /// `Load` or `LoadError`. Pending deferred commands from a previous load are dropped.
    pub fn load(&self, opts: LoadOptions) {
        let generation = {
            let mut st = self.shared.state.lock();
            st.generation += 1;
            st.teardown();
            st.loading = true;
            st.deferred.clear();
            if let Some(layout) = opts.layout {
                st.layout_template = layout;
            }
            st.generation
        };
        debug!(generation, source = ?opts.source, "load requested");

        let weak = Arc::downgrade(&self.shared);
        let loader = self.shared.loader.clone();
        let fetcher = Arc::clone(&self.shared.fetcher);
        self.shared.runtime.spawn(async move {
            let result = open(&loader, fetcher.as_ref(), &opts).await;
            if let Some(player) = Player::upgrade(&weak) {
                player.finish_load(generation, opts.autoplay, result);
            }
        });
    }

    fn upgrade(weak: &Weak<Shared>) -> Option<Player> {
        weak.upgrade().map(|shared| Player { shared })
    }

    fn finish_load(&self, generation: u64, autoplay: bool, result: Result<Opened>) {
        let outcome = {
            let mut guard = self.shared.state.lock();
            let st = &mut *guard;
            if st.generation != generation {
                debug!(
                    generation,
                    current = st.generation,
                    "discarding superseded load"
                );
                return;
            }
            st.loading = false;
            match result {
                Ok((file, instance)) => {
                    st.epoch += 1;
                    st.active_artboard = instance.artboard().to_string();
                    st.instance = Some(instance);
                    st.file = Some(file);
                    st.playback = PlaybackState::Stopped;
                    st.layout = st.layout_template.resolve(self.shared.surface.as_ref());
                    Ok(std::mem::take(&mut st.deferred))
                }
                Err(err) => {
                    if err.is_parse_error() {
                        warn!(error = %err, "{}", CORRUPT_FILE_MESSAGE);
                    }
                    st.teardown();
                    st.deferred.clear();
                    Err(err)
                }
            }
        };

        match outcome {
            Ok(deferred) => {
                debug!(generation, artboard = %self.active_artboard(), "file loaded");
                self.dispatch(Event::load());
                if autoplay && self.is_current(generation) {
                    self.play();
                }
                for action in deferred {
                    if !self.is_current(generation) {
                        break;
                    }
                    self.apply(action);
                }
            }
            Err(err) => {
                if err.is_parse_error() {
                    error!(error = %err, "{}", CORRUPT_FILE_MESSAGE);
                } else {
                    error!(error = %err, category = err.category(), "failed to load file");
                }
                self.dispatch(Event::load_error(err));
            }
        }
    }

    fn apply(&self, action: Action) {
        match action {
            Action::Play => self.play(),
            Action::Pause => self.pause(),
            Action::Stop => self.stop(),
        }
    }

    /// Queue `action` when a load is in flight. Returns true if queued.
    fn defer(st: &mut PlayerState, action: Action) -> bool {
        if st.instance.is_none() && st.loading {
            debug!(?action, "deferring until load completes");
            st.deferred.push(action);
            return true;
        }
        false
    }

    /// Stopped/Paused → Playing, emitting `Play`.
    pub fn play(&self) {
        let event = {
            let mut st = self.shared.state.lock();
            if Self::defer(&mut st, Action::Play)
                || st.instance.is_none()
                || !st.playback.can_play()
            {
                return;
            }
            st.playback = PlaybackState::Playing;
            Event::play(st.animations())
        };
        self.dispatch(event);
    }

    /// Playing → Paused, emitting `Pause`.
    pub fn pause(&self) {
        let event = {
            let mut st = self.shared.state.lock();
            if Self::defer(&mut st, Action::Pause)
                || st.instance.is_none()
                || !st.playback.can_pause()
            {
                return;
            }
            st.playback = PlaybackState::Paused;
            Event::pause(st.animations())
        };
        self.dispatch(event);
    }

    /// Playing/Paused → Stopped, emitting `Stop`. The artboard rewinds to its
    /// starting frame.
    pub fn stop(&self) {
        let event = {
            let mut st = self.shared.state.lock();
            if Self::defer(&mut st, Action::Stop) || !st.playback.can_stop() {
                return;
            }
            let Some(instance) = st.instance.as_mut() else {
                return;
            };
            instance.reset();
            st.epoch += 1;
            st.playback = PlaybackState::Stopped;
            Event::stop(st.animations())
        };
        self.dispatch(event);
    }

    /// Advance the active artboard by `elapsed` while Playing.
    ///
    /// Emits one `Loop` per boundary crossed, in crossing order. Delivery stops as soon
    /// as a handler leaves Playing or replaces, rewinds, or releases the instance that
    /// was advanced. A one-shot selection that runs to completion rewinds and stops
    /// with `Stop`.
    pub fn advance(&self, elapsed: Duration) {
        let (epoch, report) = {
            let mut st = self.shared.state.lock();
            if !st.playback.is_playing() {
                return;
            }
            let Some(instance) = st.instance.as_mut() else {
                return;
            };
            let report = instance.advance(elapsed.as_secs_f32());
            (st.epoch, report)
        };

        for looped in report.loops {
            if !self.is_live(epoch) {
                debug!(epoch, "dropping loop events for a superseded instance");
                return;
            }
            self.dispatch(Event::looped(looped));
        }

        if report.finished {
            let event = {
                let mut st = self.shared.state.lock();
                if st.epoch != epoch || !st.playback.is_playing() {
                    return;
                }
                let Some(instance) = st.instance.as_mut() else {
                    return;
                };
                instance.reset();
                st.epoch += 1;
                st.playback = PlaybackState::Stopped;
                Event::stop(st.animations())
            };
            self.dispatch(event);
        }
    }

    /// Drive [`Player::advance`] from a tokio interval ticking every `period`.
    ///
    /// The loop holds only a weak reference and ends when the last player handle is
    /// dropped or the returned [`FrameLoop`] is dropped.
    pub fn start_frame_loop(&self, period: Duration) -> FrameLoop {
        let period = period.max(Duration::from_millis(1));
        let weak = Arc::downgrade(&self.shared);
        let task = self.shared.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = ticker.tick().await;
            loop {
                let now = ticker.tick().await;
                let Some(player) = Player::upgrade(&weak) else {
                    break;
                };
                player.advance(now - last);
                last = now;
            }
        });
        FrameLoop { task }
    }

    /// Re-instantiate the active (or named) artboard at its starting frame, keeping
    /// the loaded file. With `autoplay` the player ends Playing and emits `Play`;
    /// otherwise it ends Stopped and emits `Stop` only if it was not already stopped.
    /// Never emits `Load`. A no-op when nothing is loaded.
    pub fn reset(&self, opts: ResetOptions) -> Result<()> {
        let event = {
            let mut guard = self.shared.state.lock();
            let st = &mut *guard;
            let Some(file) = st.file.as_ref() else {
                return Ok(());
            };
            let artboard = opts
                .artboard
                .clone()
                .unwrap_or_else(|| st.active_artboard.clone());
            let animations = if !opts.animations.is_empty() {
                opts.animations
            } else if artboard == st.active_artboard {
                st.animations()
            } else {
                Vec::new()
            };
            let instance = file.instantiate(Some(&artboard), &animations)?;

            st.epoch += 1;
            st.active_artboard = instance.artboard().to_string();
            st.instance = Some(instance);
            let was = st.playback;
            if opts.autoplay {
                st.playback = PlaybackState::Playing;
                Some(Event::play(st.animations()))
            } else {
                st.playback = PlaybackState::Stopped;
                (!was.is_stopped()).then(|| Event::stop(st.animations()))
            }
        };
        debug!(artboard = %self.active_artboard(), "reset");
        if let Some(event) = event {
            self.dispatch(event);
        }
        Ok(())
    }

    /// Release the artboard instance and the file. Safe to call repeatedly and before
    /// any load completes; an in-flight load is not cancelled.
    pub fn cleanup(&self) {
        let mut st = self.shared.state.lock();
        if st.file.is_none() {
            return;
        }
        st.teardown();
        st.deferred.clear();
        debug!("cleaned up");
    }

    /// Replace the layout. Bounds are resolved against the surface right away.
    pub fn set_layout(&self, layout: Layout) {
        let mut st = self.shared.state.lock();
        st.layout_template = layout;
        st.layout = layout.resolve(self.shared.surface.as_ref());
    }

    /// Re-resolve bounds after the surface changed size. Explicit bounds are kept.
    pub fn resize_to_surface(&self) {
        let mut st = self.shared.state.lock();
        st.layout = st.layout_template.resolve(self.shared.surface.as_ref());
    }

    /// Register the handler for `kind`, replacing any existing one.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Player, &Event) + Send + Sync + 'static,
    {
        self.shared.events.on(kind, handler);
    }

    pub fn off(&self, kind: EventKind) -> bool {
        self.shared.events.off(kind)
    }

    pub fn is_playing(&self) -> bool {
        self.playback_state().is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.playback_state().is_paused()
    }

    pub fn is_stopped(&self) -> bool {
        self.playback_state().is_stopped()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.shared.state.lock().playback
    }

    /// Name of the instantiated artboard, `""` when nothing is loaded.
    pub fn active_artboard(&self) -> String {
        self.shared.state.lock().active_artboard.clone()
    }

    /// Snapshot of the loaded file's contents.
    pub fn contents(&self) -> Option<Contents> {
        self.shared
            .state
            .lock()
            .file
            .as_ref()
            .map(|f| f.contents().clone())
    }

    pub fn layout(&self) -> Layout {
        self.shared.state.lock().layout
    }

    /// Animations currently advancing; empty unless Playing.
    pub fn playing_animations(&self) -> Vec<String> {
        let st = self.shared.state.lock();
        if st.playback.is_playing() {
            st.animations()
        } else {
            Vec::new()
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.state.lock().file.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.lock().loading
    }

    pub fn surface(&self) -> &Arc<dyn Surface> {
        &self.shared.surface
    }

    fn is_current(&self, generation: u64) -> bool {
        self.shared.state.lock().generation == generation
    }

    /// Still Playing the instance that was current at `epoch`.
    fn is_live(&self, epoch: u64) -> bool {
        let st = self.shared.state.lock();
        st.epoch == epoch && st.playback.is_playing()
    }

    fn dispatch(&self, event: Event) {
        self.shared.events.dispatch(self, &event);
    }
}

async fn open(loader: &RuntimeLoader, fetcher: &dyn Fetch, opts: &LoadOptions) -> Result<Opened> {
    let runtime = loader.acquire().await?;
    let bytes: Arc<[u8]> = match &opts.source {
        Source::Buffer(bytes) => Arc::clone(bytes),
        Source::Url(url) => fetcher.fetch(url).await?.into(),
    };
    let file = FileHandle::parse(runtime.as_ref(), &bytes)?;
    let instance = file.instantiate(opts.artboard.as_deref(), &opts.animations)?;
    Ok((file, instance))
}

/// Running frame loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct FrameLoop {
    task: JoinHandle<()>,
}

impl FrameLoop {
    pub fn stop(self) {}

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Canvas;

    const DOC: &str = r#"{"artboards":[{"name":"A","animations":[
        {"name":"spin","duration":1000,"loop":"loop"},
        {"name":"intro","duration":250,"loop":"oneShot"}
    ]},{"name":"B","animations":[{"name":"wave","duration":500,"loop":"loop"}]}]}"#;

    fn options() -> ConstructOptions {
        ConstructOptions::new(Arc::new(Canvas::new(400, 300)))
            .with_buffer(DOC.as_bytes().to_vec())
            .with_loader(RuntimeLoader::scene())
    }

    async fn loaded(opts: ConstructOptions) -> Player {
        let player = Player::new(opts).unwrap();
        for _ in 0..100 {
            if !player.is_loading() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(player.is_loaded(), "load did not complete");
        player
    }

    #[test]
    fn construction_outside_runtime_fails() {
        let err = Player::new(options()).unwrap_err();
        assert_eq!(err, RiveError::NoAsyncRuntime);
    }

    #[tokio::test]
    async fn play_pause_stop_cycle() {
        let player = loaded(options()).await;
        assert!(player.is_stopped());

        player.play();
        assert!(player.is_playing());
        assert_eq!(player.playing_animations(), vec!["spin".to_string()]);
        player.pause();
        assert!(player.is_paused());
        assert!(player.playing_animations().is_empty());
        player.pause();
        assert!(player.is_paused());
        player.stop();
        assert!(player.is_stopped());
    }

    #[tokio::test]
    async fn one_shot_completion_stops() {
        let player = loaded(options().with_animations(["intro"]).with_autoplay(true)).await;
        assert!(player.is_playing());
        player.advance(Duration::from_millis(300));
        assert!(player.is_stopped());
    }

    #[tokio::test]
    async fn reset_can_switch_artboards() {
        let player = loaded(options()).await;
        player
            .reset(ResetOptions::default().with_artboard("B"))
            .unwrap();
        assert_eq!(player.active_artboard(), "B");
        player.play();
        assert_eq!(player.playing_animations(), vec!["wave".to_string()]);

        let err = player
            .reset(ResetOptions::default().with_artboard("Nope"))
            .unwrap_err();
        assert!(matches!(err, RiveError::ArtboardNotFound { .. }));
        assert_eq!(player.active_artboard(), "B");
    }

    #[tokio::test]
    async fn layout_follows_surface_resize() {
        let canvas = Arc::new(Canvas::new(400, 300));
        let opts = ConstructOptions::new(canvas.clone())
            .with_buffer(DOC.as_bytes().to_vec())
            .with_loader(RuntimeLoader::scene());
        let player = loaded(opts).await;
        assert_eq!(player.layout().bounds.map(|b| b.max_x), Some(400.0));

        canvas.resize(800, 600);
        player.resize_to_surface();
        assert_eq!(player.layout().bounds.map(|b| b.max_y), Some(600.0));
    }
}
