use derivative::Derivative;

use parking_lot::RwLock;

use std::sync::Arc;

type Hook = Arc<dyn Fn() + Send + Sync>;

#[derive(Derivative, Default)]
#[derivative(Debug)]
struct HookSet {
    #[derivative(Debug = "ignore")]
    on_pause: Option<Hook>,
    #[derivative(Debug = "ignore")]
    on_resume: Option<Hook>,
    #[derivative(Debug = "ignore")]
    on_process: Option<Hook>,
}

/// Lifecycle hooks shared by a client, its call scheduler and its callback registry.
///
/// Hooks are cloned out of the lock before being called, so a hook may freely use the client that
/// owns it.
#[derive(Debug, Clone, Default)]
pub(crate) struct Hooks(Arc<RwLock<HookSet>>);

impl Hooks {
    pub fn set_on_pause(&self, hook: Option<Hook>) {
        self.0.write().on_pause = hook;
    }

    pub fn set_on_resume(&self, hook: Option<Hook>) {
        self.0.write().on_resume = hook;
    }

    pub fn set_on_process(&self, hook: Option<Hook>) {
        self.0.write().on_process = hook;
    }

    /// The call quota was just exhausted.
    pub fn pause(&self) {
        tracing::info!("call quota exhausted, queueing requests");

        let hook = self.0.read().on_pause.clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// The quota window reset after having been exhausted.
    pub fn resume(&self) {
        tracing::info!("call quota window reset, resuming");

        let hook = self.0.read().on_resume.clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// A response was handed to its handler.
    pub fn process(&self) {
        let hook = self.0.read().on_process.clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_assigned_hooks_only() {
        let hooks = Hooks::default();
        let paused = Arc::new(AtomicUsize::new(0));

        // nothing assigned yet
        hooks.pause();
        hooks.resume();
        hooks.process();

        let counter = paused.clone();
        hooks.set_on_pause(Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        hooks.pause();
        hooks.resume();
        assert_eq!(paused.load(Ordering::SeqCst), 1);

        hooks.set_on_pause(None);
        hooks.pause();
        assert_eq!(paused.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hook_may_reassign_hooks() {
        let hooks = Hooks::default();
        let inner = hooks.clone();

        hooks.set_on_process(Some(Arc::new(move || inner.set_on_process(None))));

        hooks.process();
        hooks.process();
    }
}
