//! Graphics device lifecycle management.
//!
//! This crate owns the volatile part of a GPU stack: adapter enumeration
//! and selection, device creation with capability probing, device-loss
//! recovery, and GPU resources that transparently survive a device rebuild.
//!
//! The native substrate sits behind the trait seam in [`driver`]; the
//! [`driver::dummy`] module provides a fully scriptable in-process
//! implementation used for tests and headless operation.
//!
//! ```
//! use std::sync::Arc;
//! use vermilion_graphics::config::StaticConfig;
//! use vermilion_graphics::driver::dummy::DummyDriver;
//! use vermilion_graphics::{DeviceManager, Extent2d};
//!
//! let driver = DummyDriver::single_adapter();
//! let config = Arc::new(StaticConfig::new(false));
//! let device = DeviceManager::create(driver, config, "").unwrap();
//!
//! let target = device.create_render_target(Extent2d::new(640, 480)).unwrap();
//!
//! // Simulated device loss: the render target rebuilds automatically.
//! device.recreate().unwrap();
//! assert!(!target.native_view_handle().is_null());
//! ```

pub mod adapter;
pub mod capabilities;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod events;
pub mod resources;
pub mod types;

pub use adapter::{resolve_vendor_filter, select_adapter, AdapterSelection};
pub use capabilities::DeviceCapabilities;
pub use config::{ConfigSource, StaticConfig};
pub use device::DeviceManager;
pub use error::{GraphicsError, GraphicsResult};
pub use events::{DeviceEvent, DeviceEventListener, EventDispatcher, ListenerId};
pub use resources::{DepthStencilBuffer, RenderTarget, SamplerState, Texture2D};
pub use types::{
    AdapterDesc, Extent2d, FeatureLevel, FormatSupport, MemoryUsageStatistics, OutputDesc,
    PixelFormat, Region, SamplerDescriptor, VendorFilter,
};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
