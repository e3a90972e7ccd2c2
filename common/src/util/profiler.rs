use std::borrow::Cow;
use std::time::{Duration, Instant};

/// Logs how long the enclosing scope took when dropped.
pub struct ScopedTimer {
    name: Cow<'static, str>,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::info!("{} took {:?}", self.name, self.start.elapsed());
    }
}
