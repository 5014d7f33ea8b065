//! Init-once acquisition of the shared runtime.
//!
//! Every caller receives the same [`RuntimeHandle`]. The first request starts
//! initialization; requests arriving while it is in flight join a single FIFO
//! queue (callbacks and awaiters alike) and are answered in registration order
//! when it completes. A failed initialization is delivered to every queued caller
//! and the loader returns to idle, so the next request retries.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::events::panic_message;
use crate::runtime::RuntimeHandle;
use crate::scene::SceneRuntime;
use crate::{Result, RiveError};

type InitFuture = Pin<Box<dyn Future<Output = Result<RuntimeHandle>> + Send>>;
type InitFn = dyn Fn() -> InitFuture + Send + Sync;
type Callback = Box<dyn FnOnce(Result<RuntimeHandle>) + Send>;

static GLOBAL: OnceLock<RuntimeLoader> = OnceLock::new();

enum Waiter {
    Callback(Callback),
    Future(oneshot::Sender<Result<RuntimeHandle>>),
}

impl Waiter {
    fn resolve(self, result: Result<RuntimeHandle>) {
        match self {
            Waiter::Callback(callback) => {
                let outcome =
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(result)));
                if let Err(payload) = outcome {
                    error!(
                        panic = %panic_message(payload),
                        "runtime callback panicked"
                    );
                }
            }
            Waiter::Future(tx) => {
                // Receiver may have been dropped by a cancelled await.
                let _ = tx.send(result);
            }
        }
    }

    /// Answer a request that arrived after the runtime became ready. Inside a tokio
    /// runtime callbacks are deferred to the next scheduler tick, never run inside the
    /// registering call; outside one they run inline.
    fn resolve_ready(self, handle: RuntimeHandle) {
        let runtime = match &self {
            Waiter::Callback(_) => Handle::try_current().ok(),
            Waiter::Future(_) => None,
        };
        match runtime {
            Some(runtime) => {
                runtime.spawn(async move { self.resolve(Ok(handle)) });
            }
            None => self.resolve(Ok(handle)),
        }
    }
}

enum LoadState {
    Idle,
    Loading,
    Ready(RuntimeHandle),
}

struct Slot {
    load: LoadState,
    waiters: VecDeque<Waiter>,
}

struct Inner {
    init: Box<InitFn>,
    slot: Mutex<Slot>,
}

impl Inner {
    fn complete(&self, result: Result<RuntimeHandle>) {
        let waiters = {
            let mut slot = self.slot.lock();
            slot.load = match &result {
                Ok(handle) => LoadState::Ready(Arc::clone(handle)),
                Err(_) => LoadState::Idle,
            };
            std::mem::take(&mut slot.waiters)
        };

        match &result {
            Ok(handle) => info!(
                runtime = handle.name(),
                waiters = waiters.len(),
                "runtime ready"
            ),
            Err(err) => warn!(error = %err, waiters = waiters.len(), "runtime failed to initialize"),
        }

        for waiter in waiters {
            waiter.resolve(result.clone());
        }
    }
}

/// Cheap-to-clone handle onto one init-once runtime slot.
#[derive(Clone)]
pub struct RuntimeLoader {
    inner: Arc<Inner>,
}

impl fmt::Debug for RuntimeLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.slot.lock().load {
            LoadState::Idle => "idle",
            LoadState::Loading => "loading",
            LoadState::Ready(_) => "ready",
        };
        f.debug_struct("RuntimeLoader").field("state", &state).finish()
    }
}

impl RuntimeLoader {
    /// Create a loader that runs `init` the first time the runtime is requested.
    pub fn new<F, Fut>(init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RuntimeHandle>> + Send + 'static,
    {
        let init: Box<InitFn> = Box::new(move || Box::pin(init()));
        Self {
            inner: Arc::new(Inner {
                init,
                slot: Mutex::new(Slot {
                    load: LoadState::Idle,
                    waiters: VecDeque::new(),
                }),
            }),
        }
    }

    /// Loader for the bundled JSON scene runtime.
    pub fn scene() -> Self {
        Self::new(|| async { Ok(Arc::new(SceneRuntime::new()) as RuntimeHandle) })
    }

    /// Process-wide loader. Defaults to [`RuntimeLoader::scene`] unless
    /// [`RuntimeLoader::set_global`] ran first.
    pub fn global() -> RuntimeLoader {
        GLOBAL.get_or_init(RuntimeLoader::scene).clone()
    }

    /// Install the process-wide loader. Fails (returning `loader`) once the global
    /// slot has been initialized.
    pub fn set_global(loader: RuntimeLoader) -> std::result::Result<(), RuntimeLoader> {
        GLOBAL.set(loader)
    }

    /// The runtime, if initialization already completed.
    pub fn try_get(&self) -> Option<RuntimeHandle> {
        match &self.inner.slot.lock().load {
            LoadState::Ready(handle) => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.inner.slot.lock().load, LoadState::Loading)
    }

    /// Register `callback` to receive the runtime exactly once.
    ///
    /// Starting initialization needs a tokio runtime. Without one the callback
    /// receives [`RiveError::RuntimeUnavailable`] and the loader stays idle.
    pub fn get_instance<F>(&self, callback: F)
    where
        F: FnOnce(Result<RuntimeHandle>) + Send + 'static,
    {
        self.register(Waiter::Callback(Box::new(callback)));
    }

    /// Resolve to the shared runtime, starting initialization if needed.
    pub async fn acquire(&self) -> Result<RuntimeHandle> {
        if let Some(handle) = self.try_get() {
            return Ok(handle);
        }
        let (tx, rx) = oneshot::channel();
        self.register(Waiter::Future(tx));
        rx.await.map_err(|_| RiveError::RuntimeUnavailable {
            reason: "runtime loader dropped the request".into(),
        })?
    }

    fn register(&self, waiter: Waiter) {
        let mut slot = self.inner.slot.lock();
        if let LoadState::Ready(handle) = &slot.load {
            let handle = Arc::clone(handle);
            drop(slot);
            waiter.resolve_ready(handle);
            return;
        }

        if matches!(slot.load, LoadState::Loading) {
            slot.waiters.push_back(waiter);
            debug!(queued = slot.waiters.len(), "runtime request queued");
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            drop(slot);
            warn!("runtime requested outside of a tokio runtime");
            waiter.resolve(Err(RiveError::RuntimeUnavailable {
                reason: "no tokio runtime to initialize on".into(),
            }));
            return;
        };
        slot.load = LoadState::Loading;
        slot.waiters.push_back(waiter);
        drop(slot);
        self.start(&runtime);
    }

    fn start(&self, runtime: &Handle) {
        debug!("starting runtime initialization");
        let inner = Arc::clone(&self.inner);
        let init =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (self.inner.init)()));
        let init = match init {
            Ok(future) => runtime.spawn(future),
            Err(payload) => {
                let reason = panic_message(payload);
                runtime.spawn(async move {
                    inner.complete(Err(RiveError::RuntimeInit { reason }));
                });
                return;
            }
        };
        runtime.spawn(async move {
            let result = match init.await {
                Ok(result) => result,
                Err(err) => Err(RiveError::RuntimeInit {
                    reason: err.to_string(),
                }),
            };
            inner.complete(result);
        });
    }
}
