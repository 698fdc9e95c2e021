//! Counts log events per level while a closure runs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Debug, Clone, Default)]
pub struct LevelCounter {
    debugs: Arc<AtomicUsize>,
    warnings: Arc<AtomicUsize>,
    errors: Arc<AtomicUsize>,
}

impl LevelCounter {
    pub fn debugs(&self) -> usize {
        self.debugs.load(Ordering::SeqCst)
    }

    pub fn warnings(&self) -> usize {
        self.warnings.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for LevelCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        match *event.metadata().level() {
            Level::DEBUG => {
                self.debugs.fetch_add(1, Ordering::SeqCst);
            }
            Level::WARN => {
                self.warnings.fetch_add(1, Ordering::SeqCst);
            }
            Level::ERROR => {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }
}

/// Run `f` with a thread-local subscriber and return the counts it produced
pub fn capture_levels<R>(f: impl FnOnce() -> R) -> (R, LevelCounter) {
    let counter = LevelCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, counter)
}
