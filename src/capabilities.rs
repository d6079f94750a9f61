//! Device capability probing and reporting.
//!
//! Probing is diagnostics-first: individual query failures are logged and
//! leave that capability at its default, they never fail device creation.
//! The one policy consumer is the mandatory-format check, and even that only
//! warns.

use crate::driver::NativeDevice;
use crate::error::report_native_error;
use crate::types::{ArchitectureInfo, FeatureLevel, FormatSupport, PixelFormat, ThreadingSupport};

/// The formats the engine depends on, in report order.
pub const PROBED_FORMATS: [PixelFormat; 5] = [
    PixelFormat::Rgba8Unorm,
    PixelFormat::Rgba8UnormSrgb,
    PixelFormat::Bgra8Unorm,
    PixelFormat::Bgra8UnormSrgb,
    PixelFormat::Depth24Stencil8,
];

/// Support the working texture format must have for the renderer to function.
pub const MANDATORY_BGRA_SUPPORT: FormatSupport = FormatSupport::TEXTURE_2D
    .union(FormatSupport::VERTEX_BUFFER)
    .union(FormatSupport::MIP)
    .union(FormatSupport::RENDER_TARGET)
    .union(FormatSupport::BLENDABLE)
    .union(FormatSupport::DISPLAY);

/// Snapshot of a device's probed capabilities.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Per-format support bits, indexed like [`PROBED_FORMATS`].
    pub format_support: [FormatSupport; PROBED_FORMATS.len()],
    /// Multithreading capabilities.
    pub threading: ThreadingSupport,
    /// Rendering architecture.
    pub architecture: ArchitectureInfo,
    /// Feature level of the probed device.
    pub feature_level: FeatureLevel,
    /// Maximum 2D texture dimension implied by the feature level.
    pub max_texture_dimension: u32,
}

impl DeviceCapabilities {
    /// Probe all capabilities from a live device.
    pub fn probe(device: &dyn NativeDevice) -> Self {
        let feature_level = device.feature_level();
        let mut capabilities = Self {
            feature_level,
            max_texture_dimension: feature_level.max_texture_dimension(),
            ..Self::default()
        };

        for (index, format) in PROBED_FORMATS.iter().enumerate() {
            match device.format_support(*format) {
                Ok(support) => capabilities.format_support[index] = support,
                Err(e) => report_native_error("NativeDevice::format_support", &e),
            }
        }
        match device.threading_support() {
            Ok(threading) => capabilities.threading = threading,
            Err(e) => report_native_error("NativeDevice::threading_support", &e),
        }
        match device.architecture_info() {
            Ok(architecture) => capabilities.architecture = architecture,
            Err(e) => report_native_error("NativeDevice::architecture_info", &e),
        }

        capabilities
    }

    /// Support bits for one probed format.
    pub fn support_for(&self, format: PixelFormat) -> FormatSupport {
        PROBED_FORMATS
            .iter()
            .position(|f| *f == format)
            .map(|index| self.format_support[index])
            .unwrap_or_default()
    }

    /// Whether the working texture format carries everything the renderer
    /// needs. Insufficient support is reported by [`Self::log_report`] but
    /// does not block device creation.
    pub fn mandatory_format_ok(&self) -> bool {
        self.support_for(PixelFormat::Bgra8Unorm)
            .contains(MANDATORY_BGRA_SUPPORT)
    }

    /// Write the full capability report to the log.
    pub fn log_report(&self) {
        log::info!(
            "device capabilities: feature level {}, max texture dimension {}",
            self.feature_level.as_str(),
            self.max_texture_dimension
        );
        log::info!("    architecture: {}", self.architecture.renderer_str());
        log::info!(
            "    unified memory: {}",
            if self.architecture.unified_memory {
                "yes"
            } else {
                "no"
            }
        );
        log::info!("    multithreading: {}", self.threading.describe());
        for (index, format) in PROBED_FORMATS.iter().enumerate() {
            log::info!(
                "    format {}: {:?}",
                format.as_str(),
                self.format_support[index]
            );
        }
        if !self.mandatory_format_ok() {
            log::warn!(
                "format {} is missing mandatory support {:?}, rendering may fail",
                PixelFormat::Bgra8Unorm.as_str(),
                MANDATORY_BGRA_SUPPORT
                    .difference(self.support_for(PixelFormat::Bgra8Unorm))
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::dummy::DummyDriver;
    use crate::driver::NativeDriver;
    use crate::types::VendorFilter;

    fn probe_dummy() -> DeviceCapabilities {
        let driver = DummyDriver::single_adapter();
        let factory = driver.create_factory(VendorFilter::NONE).unwrap();
        let bundle = factory.enumerate_adapters()[0].create_device().unwrap();
        DeviceCapabilities::probe(bundle.device.as_ref())
    }

    #[test]
    fn test_probe_covers_all_formats() {
        let capabilities = probe_dummy();
        assert!(capabilities
            .support_for(PixelFormat::Bgra8Unorm)
            .contains(FormatSupport::TEXTURE_2D));
        assert!(capabilities
            .support_for(PixelFormat::Depth24Stencil8)
            .contains(FormatSupport::DEPTH_STENCIL));
        assert!(capabilities.mandatory_format_ok());
    }

    #[test]
    fn test_max_texture_dimension_follows_feature_level() {
        let capabilities = probe_dummy();
        assert_eq!(
            capabilities.max_texture_dimension,
            capabilities.feature_level.max_texture_dimension()
        );
    }
}
