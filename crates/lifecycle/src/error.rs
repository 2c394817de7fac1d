use thiserror::Error;

/// The error type hook closures return.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("start hook '{name}' failed: {source}")]
    Start { name: String, source: HookError },

    #[error("{} stop hook(s) failed: {}", .0.len(), summarize(.0))]
    Stop(Vec<(String, HookError)>),
}

fn summarize(failures: &[(String, HookError)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}
