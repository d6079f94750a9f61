//! Device core: lifecycle state machine, resource factory entry points, and
//! the query surface.
//!
//! The manager owns one device session at a time. Short-lived state (the
//! enumeration factory, the adapter, the logical device and context, the 2D
//! drawing device) is destroyed and recreated as a unit; the imaging and
//! text factories are long-lived and survive every rebuild.

use std::ffi::c_void;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::adapter::{resolve_vendor_filter, select_adapter};
use crate::capabilities::DeviceCapabilities;
use crate::config::ConfigSource;
use crate::driver::{
    DrawingDevice, ImagingFactory, NativeAdapter, NativeContext, NativeDevice, NativeDriver,
    NativeFactory, TextFactory,
};
use crate::error::{report_native_error, GraphicsError, GraphicsResult};
use crate::events::{DeviceEvent, EventDispatcher};
use crate::resources::{DepthStencilBuffer, RenderTarget, SamplerState, Texture2D};
use crate::types::{
    Extent2d, FeatureLevel, MemorySegment, MemoryUsageStatistics, SamplerDescriptor, VendorFilter,
};

/// Short-lived state tied to one logical device.
struct DeviceSession {
    filter: VendorFilter,
    factory: Arc<dyn NativeFactory>,
    // None for software rasterizer devices.
    adapter: Option<Arc<dyn NativeAdapter>>,
    device: Arc<dyn NativeDevice>,
    context: Arc<dyn NativeContext>,
    feature_level: FeatureLevel,
    tearing: bool,
    adapter_name: String,
    adapter_names: Vec<String>,
    capabilities: DeviceCapabilities,
}

/// Owner of the graphics device lifecycle.
///
/// Created with [`DeviceManager::create`]; handles device loss with
/// [`DeviceManager::handle_device_lost`] and hands out GPU resources that
/// automatically survive rebuilds.
pub struct DeviceManager {
    driver: Arc<dyn NativeDriver>,
    config: Arc<dyn ConfigSource>,
    preferred_adapter: String,
    session: RwLock<Option<DeviceSession>>,
    drawing: RwLock<Option<Arc<dyn DrawingDevice>>>,
    imaging: Arc<dyn ImagingFactory>,
    text: Arc<dyn TextFactory>,
    events: EventDispatcher,
}

impl DeviceManager {
    /// Create the manager and bring up the first device session.
    ///
    /// Creation order: vendor filter resolution, enumeration factory,
    /// adapter selection (or software fallback when configuration allows),
    /// logical device with capability probe, imaging factory, drawing
    /// device, text factory. Any required step failing aborts the whole
    /// construction; partially created subsystems are dropped in reverse
    /// order.
    pub fn create(
        driver: Arc<dyn NativeDriver>,
        config: Arc<dyn ConfigSource>,
        preferred_adapter: &str,
    ) -> GraphicsResult<Arc<Self>> {
        log::info!(
            "creating graphics device (driver '{}', preferred adapter '{}')",
            driver.name(),
            preferred_adapter
        );
        let session = Self::create_session(driver.as_ref(), config.as_ref(), preferred_adapter)?;
        let imaging = driver.create_imaging_factory()?;
        let drawing = session.device.create_drawing_device()?;
        let text = driver.create_text_factory()?;

        Ok(Arc::new(Self {
            driver,
            config,
            preferred_adapter: preferred_adapter.to_string(),
            session: RwLock::new(Some(session)),
            drawing: RwLock::new(Some(drawing)),
            imaging,
            text,
            events: EventDispatcher::new(),
        }))
    }

    fn create_session(
        driver: &dyn NativeDriver,
        config: &dyn ConfigSource,
        preferred_adapter: &str,
    ) -> GraphicsResult<DeviceSession> {
        let filter = resolve_vendor_filter(driver, preferred_adapter);
        let factory = driver.create_factory(filter)?;

        // Tearing probe failure is recoverable; presentation falls back to
        // vsync.
        let tearing = match factory.supports_tearing() {
            Ok(supported) => supported,
            Err(e) => {
                report_native_error("NativeFactory::supports_tearing", &e);
                false
            }
        };
        log::info!(
            "tearing (vsync-off presentation): {}",
            if tearing { "supported" } else { "not supported" }
        );

        let session = match select_adapter(factory.as_ref(), preferred_adapter) {
            Ok(selection) => {
                let bundle = selection.adapter.create_device()?;
                let capabilities = DeviceCapabilities::probe(bundle.device.as_ref());
                capabilities.log_report();
                DeviceSession {
                    filter,
                    factory,
                    adapter: Some(selection.adapter),
                    device: bundle.device,
                    context: bundle.context,
                    feature_level: bundle.feature_level,
                    tearing,
                    adapter_name: selection.desc.name,
                    adapter_names: selection.candidate_names,
                    capabilities,
                }
            }
            Err(GraphicsError::NoAdapterAvailable) if config.allow_software_device() => {
                let (bundle, kind) = driver.create_software_device()?;
                log::warn!("no hardware adapter, using {}", kind.as_str());
                let capabilities = DeviceCapabilities::probe(bundle.device.as_ref());
                capabilities.log_report();
                DeviceSession {
                    filter,
                    factory,
                    adapter: None,
                    device: bundle.device,
                    context: bundle.context,
                    feature_level: bundle.feature_level,
                    tearing,
                    adapter_name: kind.as_str().to_string(),
                    adapter_names: Vec::new(),
                    capabilities,
                }
            }
            Err(e) => return Err(e),
        };

        log::info!(
            "device session ready: '{}' at feature level {}",
            session.adapter_name,
            session.feature_level.as_str()
        );
        Ok(session)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Handle device loss: capture the removal reason from the dead device,
    /// then run the destroy/create cycle.
    pub fn handle_device_lost(&self) -> GraphicsResult<()> {
        // The reason must be read before the dead device is dropped.
        let reason = self
            .session
            .read()
            .as_ref()
            .and_then(|s| s.device.removed_reason());
        match &reason {
            Some(reason) => log::error!("device lost: {}", reason),
            None => log::error!("device lost: no removal reason reported"),
        }
        self.recreate()
    }

    /// Destroy the current session and build a fresh one.
    ///
    /// Dispatches [`DeviceEvent::Destroy`], drops all short-lived state,
    /// re-resolves the vendor filter, recreates the session in initial
    /// order, then dispatches [`DeviceEvent::Create`]. Per-resource rebuild
    /// failures during the create dispatch are non-fatal; a failing core
    /// step returns the error and leaves the manager without a session.
    pub fn recreate(&self) -> GraphicsResult<()> {
        log::info!("device rebuild started");
        self.events.dispatch(DeviceEvent::Destroy);
        *self.drawing.write() = None;
        *self.session.write() = None;

        let session =
            Self::create_session(self.driver.as_ref(), self.config.as_ref(), &self.preferred_adapter)?;
        let drawing = session.device.create_drawing_device()?;
        *self.session.write() = Some(session);
        *self.drawing.write() = Some(drawing);

        self.events.dispatch(DeviceEvent::Create);
        log::info!("device rebuild complete");
        Ok(())
    }

    /// Replace a stale enumeration factory without a device rebuild.
    ///
    /// When the factory no longer reflects the system's adapter set, a new
    /// factory is created under the same resolved filter and the adapter is
    /// re-resolved from the live device. No-op when the factory is current.
    pub fn validate_factory(&self) -> GraphicsResult<()> {
        let mut guard = self.session.write();
        let session = guard
            .as_mut()
            .ok_or_else(|| GraphicsError::InvalidOperation("no live device session".to_string()))?;
        if session.factory.is_current() {
            return Ok(());
        }

        log::info!("enumeration factory is stale, replacing");
        let factory = self.driver.create_factory(session.filter)?;
        if session.adapter.is_some() {
            session.adapter = Some(session.device.adapter()?);
        }
        session.factory = factory;
        Ok(())
    }

    /// Whether a device session is currently live.
    pub fn is_live(&self) -> bool {
        self.session.read().is_some()
    }

    // ========================================================================
    // Resource factory
    // ========================================================================

    /// Load a texture from an image file through the codec chain.
    pub fn create_texture_from_file(
        self: &Arc<Self>,
        path: impl AsRef<Path>,
        mipmap: bool,
    ) -> GraphicsResult<Arc<Texture2D>> {
        Texture2D::from_file(self, path.as_ref(), mipmap)
    }

    /// Create a dynamic texture the CPU can upload into.
    pub fn create_texture(self: &Arc<Self>, size: Extent2d) -> GraphicsResult<Arc<Texture2D>> {
        Texture2D::new_dynamic(self, size)
    }

    /// Create a render target with its backing texture.
    pub fn create_render_target(
        self: &Arc<Self>,
        size: Extent2d,
    ) -> GraphicsResult<Arc<RenderTarget>> {
        RenderTarget::new(self, size)
    }

    /// Create a depth/stencil buffer.
    pub fn create_depth_stencil_buffer(
        self: &Arc<Self>,
        size: Extent2d,
    ) -> GraphicsResult<Arc<DepthStencilBuffer>> {
        DepthStencilBuffer::new(self, size)
    }

    /// Create a sampler state from its configuration.
    pub fn create_sampler_state(
        self: &Arc<Self>,
        desc: SamplerDescriptor,
    ) -> GraphicsResult<Arc<SamplerState>> {
        SamplerState::new(self, desc)
    }

    // ========================================================================
    // Query surface
    // ========================================================================

    /// Name of the active adapter, or the software device kind when running
    /// on the fallback rasterizer.
    pub fn adapter_name(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.adapter_name.clone())
    }

    /// Names of every hardware candidate seen during the last selection.
    pub fn adapter_names(&self) -> Vec<String> {
        self.session
            .read()
            .as_ref()
            .map(|s| s.adapter_names.clone())
            .unwrap_or_default()
    }

    /// Feature level of the live device.
    pub fn feature_level(&self) -> Option<FeatureLevel> {
        self.session.read().as_ref().map(|s| s.feature_level)
    }

    /// Whether tearing (vsync-off presentation) is supported.
    pub fn supports_tearing(&self) -> bool {
        self.session.read().as_ref().map_or(false, |s| s.tearing)
    }

    /// Capability snapshot of the live device.
    pub fn capabilities(&self) -> Option<DeviceCapabilities> {
        self.session.read().as_ref().map(|s| s.capabilities.clone())
    }

    /// Current video memory usage of the active adapter.
    ///
    /// Fails on the software fallback, which has no adapter to query.
    pub fn memory_usage_statistics(&self) -> GraphicsResult<MemoryUsageStatistics> {
        let guard = self.session.read();
        let session = guard
            .as_ref()
            .ok_or_else(|| GraphicsError::InvalidOperation("no live device session".to_string()))?;
        let adapter = session.adapter.as_ref().ok_or_else(|| {
            GraphicsError::InvalidOperation("software device has no adapter to query".to_string())
        })?;
        Ok(MemoryUsageStatistics {
            local: adapter.query_video_memory(MemorySegment::Local)?,
            non_local: adapter.query_video_memory(MemorySegment::NonLocal)?,
        })
    }

    /// Untyped native device handle for interop. Null without a session.
    pub fn native_device_handle(&self) -> *mut c_void {
        self.session
            .read()
            .as_ref()
            .map_or(std::ptr::null_mut(), |s| s.device.native_handle())
    }

    /// Untyped native context handle for interop. Null without a session.
    pub fn native_context_handle(&self) -> *mut c_void {
        self.session
            .read()
            .as_ref()
            .map_or(std::ptr::null_mut(), |s| s.context.native_handle())
    }

    /// The long-lived imaging factory.
    pub fn imaging_factory(&self) -> Arc<dyn ImagingFactory> {
        Arc::clone(&self.imaging)
    }

    /// The long-lived text factory.
    pub fn text_factory(&self) -> Arc<dyn TextFactory> {
        Arc::clone(&self.text)
    }

    /// The device event dispatcher.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    // ========================================================================
    // Internal accessors for resources
    // ========================================================================

    pub(crate) fn native_device(&self) -> GraphicsResult<Arc<dyn NativeDevice>> {
        self.session
            .read()
            .as_ref()
            .map(|s| Arc::clone(&s.device))
            .ok_or_else(|| GraphicsError::InvalidOperation("no live device session".to_string()))
    }

    pub(crate) fn native_context(&self) -> GraphicsResult<Arc<dyn NativeContext>> {
        self.session
            .read()
            .as_ref()
            .map(|s| Arc::clone(&s.context))
            .ok_or_else(|| GraphicsError::InvalidOperation("no live device session".to_string()))
    }

    pub(crate) fn drawing_device(&self) -> GraphicsResult<Arc<dyn DrawingDevice>> {
        self.drawing
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| GraphicsError::InvalidOperation("no live drawing device".to_string()))
    }
}

static_assertions::assert_impl_all!(DeviceManager: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConfig;
    use crate::driver::dummy::{DummyAdapterConfig, DummyDriver};
    use crate::types::SoftwareDeviceKind;

    fn manager_with(driver: Arc<DummyDriver>) -> Arc<DeviceManager> {
        DeviceManager::create(driver, Arc::new(StaticConfig::new(false)), "").unwrap()
    }

    #[test]
    fn test_create_picks_only_adapter() {
        let manager = manager_with(DummyDriver::single_adapter());
        assert!(manager.is_live());
        assert_eq!(manager.adapter_name().as_deref(), Some("Dummy Adapter"));
        assert_eq!(manager.adapter_names(), ["Dummy Adapter"]);
        assert!(manager.supports_tearing());
        assert!(!manager.native_device_handle().is_null());
    }

    #[test]
    fn test_software_fallback_requires_allowance() {
        let driver = DummyDriver::builder()
            .adapter(DummyAdapterConfig::software("Rasterizer"))
            .software_kind(SoftwareDeviceKind::HighPerformance)
            .build();

        let denied = DeviceManager::create(
            driver.clone(),
            Arc::new(StaticConfig::new(false)),
            "",
        );
        assert!(matches!(denied, Err(GraphicsError::NoAdapterAvailable)));

        let allowed = DeviceManager::create(driver, Arc::new(StaticConfig::new(true)), "")
            .unwrap();
        assert_eq!(
            allowed.adapter_name().as_deref(),
            Some("high-performance software rasterizer")
        );
        assert!(allowed.memory_usage_statistics().is_err());
    }

    #[test]
    fn test_validate_factory_swaps_stale_factory() {
        let driver = DummyDriver::single_adapter();
        let manager = manager_with(driver.clone());

        // Current factory: no-op.
        manager.validate_factory().unwrap();
        let handle_before = manager.native_device_handle();

        driver.invalidate_factories();
        manager.validate_factory().unwrap();
        // Factory swap must not touch the device.
        assert_eq!(manager.native_device_handle(), handle_before);
    }

    #[test]
    fn test_recreate_builds_new_device() {
        let manager = manager_with(DummyDriver::single_adapter());
        let handle_before = manager.native_device_handle();
        manager.recreate().unwrap();
        assert!(manager.is_live());
        assert_ne!(manager.native_device_handle(), handle_before);
    }

    #[test]
    fn test_memory_statistics_report_budgets() {
        let manager = manager_with(DummyDriver::single_adapter());
        let stats = manager.memory_usage_statistics().unwrap();
        assert!(stats.local.budget > 0);
        assert!(stats.non_local.budget > 0);
    }
}
