use std::fmt;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt};

use crate::error::{HookError, LifecycleError};

/// A one-shot async callback run by the host at startup or shutdown.
pub type HookFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), HookError>> + Send>;

/// A named pair of optional start/stop callbacks.
pub struct Hook {
    name: String,
    on_start: Option<HookFn>,
    on_stop: Option<HookFn>,
}

impl Hook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_start: None,
            on_stop: None,
        }
    }

    pub fn on_start<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.on_start = Some(Box::new(move || f().boxed()));
        self
    }

    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.on_stop = Some(Box::new(move || f().boxed()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

/// The registry interface handed to component constructors.
///
/// Components only append; when and in which order the hooks run is up to the
/// implementation the host provides.
pub trait Lifecycle {
    fn append(&mut self, hook: Hook);
}

/// The host-side hook container.
///
/// Start hooks run in registration order (dependencies first); stop hooks run
/// in the reverse order. Every hook runs at most once: both [`Hooks::start`]
/// and [`Hooks::stop`] consume the callbacks they invoke.
#[derive(Debug, Default)]
pub struct Hooks {
    hooks: Vec<Hook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs the start hooks in order.
    ///
    /// If one fails, the components started before it are stopped again in
    /// reverse order and the registry is emptied, so a later [`Hooks::stop`]
    /// is a no-op.
    pub async fn start(&mut self) -> Result<(), LifecycleError> {
        for idx in 0..self.hooks.len() {
            let Some(on_start) = self.hooks[idx].on_start.take() else {
                continue;
            };
            let name = self.hooks[idx].name.clone();
            tracing::debug!(hook = %name, "running start hook");

            if let Err(source) = on_start().await {
                tracing::error!(hook = %name, error = %source, "start hook failed, unwinding");
                let started: Vec<Hook> = self.hooks.drain(..idx).collect();
                self.hooks.clear();
                for failure in run_stop_hooks(started).await {
                    tracing::error!(hook = %failure.0, error = %failure.1, "stop hook failed during unwind");
                }
                return Err(LifecycleError::Start { name, source });
            }
        }
        Ok(())
    }

    /// Runs every stop hook once, newest first.
    ///
    /// A failing hook does not prevent the remaining ones from running; all
    /// failures are returned together.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        let hooks = std::mem::take(&mut self.hooks);
        let failures = run_stop_hooks(hooks).await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::Stop(failures))
        }
    }
}

impl Lifecycle for Hooks {
    fn append(&mut self, hook: Hook) {
        tracing::debug!(hook = %hook.name, "lifecycle hook registered");
        self.hooks.push(hook);
    }
}

async fn run_stop_hooks(hooks: Vec<Hook>) -> Vec<(String, HookError)> {
    let mut failures = Vec::new();
    for hook in hooks.into_iter().rev() {
        let Some(on_stop) = hook.on_stop else {
            continue;
        };
        tracing::debug!(hook = %hook.name, "running stop hook");
        if let Err(err) = on_stop().await {
            failures.push((hook.name, err));
        }
    }
    failures
}
