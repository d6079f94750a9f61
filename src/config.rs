//! Configuration inputs for device creation.
//!
//! The device core re-reads configuration at every creation and re-creation
//! point, so changes take effect on the next rebuild without restarting.

use std::sync::atomic::{AtomicBool, Ordering};

/// Source of configuration values consulted during device (re)creation.
pub trait ConfigSource: Send + Sync {
    /// Whether a software rasterizer device may be created when no viable
    /// hardware adapter is found.
    fn allow_software_device(&self) -> bool;
}

/// A fixed configuration, settable at any time.
#[derive(Debug, Default)]
pub struct StaticConfig {
    allow_software_device: AtomicBool,
}

impl StaticConfig {
    /// Create a configuration with the given software-device allowance.
    pub fn new(allow_software_device: bool) -> Self {
        Self {
            allow_software_device: AtomicBool::new(allow_software_device),
        }
    }

    /// Change the software-device allowance. Takes effect on the next
    /// device creation or rebuild.
    pub fn set_allow_software_device(&self, allow: bool) {
        self.allow_software_device.store(allow, Ordering::Relaxed);
    }
}

impl ConfigSource for StaticConfig {
    fn allow_software_device(&self) -> bool {
        self.allow_software_device.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_config_toggle() {
        let config = StaticConfig::new(false);
        assert!(!config.allow_software_device());
        config.set_allow_software_device(true);
        assert!(config.allow_software_device());
    }
}
