// SPDX-License-Identifier: MIT

//! Liveness/readiness state (§7: "Liveness endpoint always returns healthy
//! once the process is up; readiness flips to healthy only after both the
//! cluster session and the platform session are established.").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Health(Arc<AtomicBool>);

impl Health {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set_ready(&self, ready: bool) {
        self.0.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_ready() {
        assert!(!Health::new().is_ready());
    }

    #[test]
    fn flips_ready() {
        let health = Health::new();
        health.set_ready(true);
        assert!(health.is_ready());
    }
}
