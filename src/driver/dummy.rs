//! In-process scriptable substrate.
//!
//! Implements the full driver seam without any real hardware: adapter
//! topology, enumeration orderings per vendor filter, failure injection,
//! device-loss triggering, and live-object counters are all scriptable.
//! Used by the test suite and for headless operation.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::imaging::CodecImagingFactory;
use crate::driver::{
    DeviceBundle, DrawingBitmap, DrawingDevice, ImagingFactory, NativeAdapter, NativeContext,
    NativeDepthStencil, NativeDevice, NativeDriver, NativeFactory, NativeRenderTargetView,
    NativeSampler, NativeTexture, TextFactory, TextureDesc,
};
use crate::error::{GraphicsError, GraphicsResult};
use crate::types::{
    AdapterDesc, ArchitectureInfo, Extent2d, FeatureLevel, FormatSupport, MemorySegment,
    MemorySegmentUsage, OutputDesc, OutputRotation, PixelFormat, Region, SamplerDescriptor,
    SoftwareDeviceKind, ThreadingSupport, VendorFilter,
};

// ============================================================================
// Topology configuration
// ============================================================================

/// Configuration of one simulated adapter.
#[derive(Debug, Clone)]
pub struct DummyAdapterConfig {
    /// Adapter name.
    pub name: String,
    /// PCI vendor identifier.
    pub vendor_id: u32,
    /// PCI device identifier.
    pub device_id: u32,
    /// Locally-unique identifier.
    pub luid: u64,
    /// Dedicated video memory in bytes.
    pub dedicated_video_memory: u64,
    /// Shared system memory in bytes.
    pub shared_system_memory: u64,
    /// Whether this is a software rasterizer.
    pub software: bool,
    /// Whether this is a remote adapter.
    pub remote: bool,
    /// Whether a minimal device can be created on this adapter.
    pub viable: bool,
    /// Feature level reported when viable.
    pub feature_level: FeatureLevel,
    /// Attached display outputs.
    pub outputs: Vec<OutputDesc>,
}

impl DummyAdapterConfig {
    /// A viable hardware adapter with one attached 1920x1080 output.
    pub fn hardware(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vendor_id: 0x10DE,
            device_id: 0x2684,
            luid: 0,
            dedicated_video_memory: 8 << 30,
            shared_system_memory: 16 << 30,
            software: false,
            remote: false,
            viable: true,
            feature_level: FeatureLevel::Level11_1,
            outputs: vec![OutputDesc {
                name: format!("{} output 0", name),
                attached_to_desktop: true,
                position: (0, 0),
                size: Extent2d::new(1920, 1080),
                rotation: OutputRotation::Identity,
                hardware_composition: Default::default(),
            }],
        }
    }

    /// A software rasterizer adapter.
    pub fn software(name: &str) -> Self {
        Self {
            software: true,
            viable: true,
            outputs: Vec::new(),
            dedicated_video_memory: 0,
            ..Self::hardware(name)
        }
    }

    /// Set the vendor identifier.
    pub fn with_vendor_id(mut self, vendor_id: u32) -> Self {
        self.vendor_id = vendor_id;
        self
    }

    /// Mark the adapter remote.
    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    /// Set whether a minimal device can be created.
    pub fn with_viable(mut self, viable: bool) -> Self {
        self.viable = viable;
        self
    }

    /// Set the reported feature level.
    pub fn with_feature_level(mut self, level: FeatureLevel) -> Self {
        self.feature_level = level;
        self
    }

    /// Remove all attached outputs.
    pub fn without_outputs(mut self) -> Self {
        self.outputs.clear();
        self
    }
}

// ============================================================================
// Shared driver state
// ============================================================================

#[derive(Default)]
struct FailureInjection {
    device_create: AtomicUsize,
    texture_create: AtomicUsize,
    render_target_view_create: AtomicUsize,
    depth_stencil_create: AtomicUsize,
    sampler_create: AtomicUsize,
    drawing_device_create: AtomicUsize,
}

impl FailureInjection {
    // Consumes one pending failure if armed.
    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Live device-side object counters, for leak assertions in tests.
#[derive(Default)]
pub struct LiveCounters {
    textures: AtomicUsize,
    render_target_views: AtomicUsize,
    depth_stencils: AtomicUsize,
    samplers: AtomicUsize,
    drawing_bitmaps: AtomicUsize,
}

impl LiveCounters {
    /// Number of live texture handles.
    pub fn textures(&self) -> usize {
        self.textures.load(Ordering::SeqCst)
    }

    /// Number of live render target view handles.
    pub fn render_target_views(&self) -> usize {
        self.render_target_views.load(Ordering::SeqCst)
    }

    /// Number of live depth/stencil handles.
    pub fn depth_stencils(&self) -> usize {
        self.depth_stencils.load(Ordering::SeqCst)
    }

    /// Number of live sampler handles.
    pub fn samplers(&self) -> usize {
        self.samplers.load(Ordering::SeqCst)
    }

    /// Number of live drawing bitmap handles.
    pub fn drawing_bitmaps(&self) -> usize {
        self.drawing_bitmaps.load(Ordering::SeqCst)
    }
}

struct DriverState {
    adapters: Vec<DummyAdapterConfig>,
    // Enumeration order per vendor filter; identity order when absent.
    orderings: Mutex<HashMap<VendorFilter, Vec<usize>>>,
    tearing: bool,
    software_kind: SoftwareDeviceKind,
    factory_epoch: AtomicU64,
    device_generation: AtomicU64,
    // Latest lost device generation and the driver's stated reason.
    lost: Mutex<Option<(u64, String)>>,
    failures: FailureInjection,
    live: LiveCounters,
    handle_serial: AtomicU64,
}

impl DriverState {
    fn next_handle(&self) -> *mut c_void {
        self.handle_serial.fetch_add(1, Ordering::SeqCst) as *mut c_void
    }

    fn order_for(&self, filter: VendorFilter) -> Vec<usize> {
        self.orderings
            .lock()
            .get(&filter)
            .cloned()
            .unwrap_or_else(|| (0..self.adapters.len()).collect())
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Builder for a [`DummyDriver`].
pub struct DummyDriverBuilder {
    adapters: Vec<DummyAdapterConfig>,
    orderings: HashMap<VendorFilter, Vec<usize>>,
    tearing: bool,
    software_kind: SoftwareDeviceKind,
}

impl Default for DummyDriverBuilder {
    fn default() -> Self {
        Self {
            adapters: Vec::new(),
            orderings: HashMap::new(),
            tearing: true,
            software_kind: SoftwareDeviceKind::HighPerformance,
        }
    }
}

impl DummyDriverBuilder {
    /// Add an adapter to the topology.
    pub fn adapter(mut self, config: DummyAdapterConfig) -> Self {
        self.adapters.push(config);
        self
    }

    /// Set the enumeration order used under a vendor filter.
    ///
    /// Entries are indices into the adapter list in insertion order.
    pub fn ordering(mut self, filter: VendorFilter, order: Vec<usize>) -> Self {
        self.orderings.insert(filter, order);
        self
    }

    /// Set tearing support.
    pub fn tearing(mut self, supported: bool) -> Self {
        self.tearing = supported;
        self
    }

    /// Set the kind of software device the fallback path creates.
    pub fn software_kind(mut self, kind: SoftwareDeviceKind) -> Self {
        self.software_kind = kind;
        self
    }

    /// Build the driver.
    pub fn build(self) -> Arc<DummyDriver> {
        Arc::new(DummyDriver {
            state: Arc::new(DriverState {
                adapters: self.adapters,
                orderings: Mutex::new(self.orderings),
                tearing: self.tearing,
                software_kind: self.software_kind,
                factory_epoch: AtomicU64::new(1),
                device_generation: AtomicU64::new(0),
                lost: Mutex::new(None),
                failures: FailureInjection::default(),
                live: LiveCounters::default(),
                handle_serial: AtomicU64::new(1),
            }),
        })
    }
}

/// Scriptable in-process driver.
pub struct DummyDriver {
    state: Arc<DriverState>,
}

impl DummyDriver {
    /// Start building a driver topology.
    pub fn builder() -> DummyDriverBuilder {
        DummyDriverBuilder::default()
    }

    /// A single viable hardware adapter named "Dummy Adapter".
    pub fn single_adapter() -> Arc<Self> {
        Self::builder()
            .adapter(DummyAdapterConfig::hardware("Dummy Adapter"))
            .build()
    }

    /// Mark the most recently created device as removed.
    ///
    /// The device's `removed_reason` reports the given reason until the next
    /// device is created.
    pub fn trigger_device_loss(&self, reason: &str) {
        let generation = self.state.device_generation.load(Ordering::SeqCst);
        *self.state.lost.lock() = Some((generation, reason.to_string()));
    }

    /// Make every outstanding factory stale.
    pub fn invalidate_factories(&self) {
        self.state.factory_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Replace the enumeration order used under a vendor filter.
    pub fn set_ordering(&self, filter: VendorFilter, order: Vec<usize>) {
        self.state.orderings.lock().insert(filter, order);
    }

    /// Fail the next `n` device creations.
    pub fn fail_next_device_creates(&self, n: usize) {
        self.state.failures.device_create.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` texture creations.
    pub fn fail_next_texture_creates(&self, n: usize) {
        self.state
            .failures
            .texture_create
            .store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` render target view creations.
    pub fn fail_next_render_target_view_creates(&self, n: usize) {
        self.state
            .failures
            .render_target_view_create
            .store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` depth/stencil creations.
    pub fn fail_next_depth_stencil_creates(&self, n: usize) {
        self.state
            .failures
            .depth_stencil_create
            .store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` sampler creations.
    pub fn fail_next_sampler_creates(&self, n: usize) {
        self.state
            .failures
            .sampler_create
            .store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` drawing device creations.
    pub fn fail_next_drawing_device_creates(&self, n: usize) {
        self.state
            .failures
            .drawing_device_create
            .store(n, Ordering::SeqCst);
    }

    /// Live device-side object counters.
    pub fn live_counters(&self) -> &LiveCounters {
        &self.state.live
    }

    fn make_device(
        &self,
        adapter_index: Option<usize>,
        feature_level: FeatureLevel,
    ) -> GraphicsResult<DeviceBundle> {
        if FailureInjection::take(&self.state.failures.device_create) {
            return Err(GraphicsError::native(
                "DummyDriver::create_device",
                "injected failure",
            ));
        }
        let generation = self.state.device_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let device = Arc::new(DummyDevice {
            state: Arc::clone(&self.state),
            generation,
            feature_level,
            adapter_index,
            handle: self.state.next_handle(),
        });
        let context = Arc::new(DummyContext {
            handle: self.state.next_handle(),
        });
        Ok(DeviceBundle {
            device,
            context,
            feature_level,
        })
    }
}

impl NativeDriver for DummyDriver {
    fn name(&self) -> &str {
        "dummy"
    }

    fn create_factory(&self, filter: VendorFilter) -> GraphicsResult<Arc<dyn NativeFactory>> {
        Ok(Arc::new(DummyFactory {
            state: Arc::clone(&self.state),
            epoch: self.state.factory_epoch.load(Ordering::SeqCst),
            filter,
        }))
    }

    fn create_software_device(&self) -> GraphicsResult<(DeviceBundle, SoftwareDeviceKind)> {
        let bundle = self.make_device(None, FeatureLevel::Level11_0)?;
        Ok((bundle, self.state.software_kind))
    }

    fn create_imaging_factory(&self) -> GraphicsResult<Arc<dyn ImagingFactory>> {
        Ok(Arc::new(CodecImagingFactory::new()))
    }

    fn create_text_factory(&self) -> GraphicsResult<Arc<dyn TextFactory>> {
        Ok(Arc::new(DummyTextFactory {
            handle: self.state.next_handle(),
        }))
    }
}

// ============================================================================
// Factory and adapter
// ============================================================================

struct DummyFactory {
    state: Arc<DriverState>,
    epoch: u64,
    filter: VendorFilter,
}

impl NativeFactory for DummyFactory {
    fn is_current(&self) -> bool {
        self.epoch == self.state.factory_epoch.load(Ordering::SeqCst)
    }

    fn supports_tearing(&self) -> GraphicsResult<bool> {
        Ok(self.state.tearing)
    }

    fn enumerate_adapters(&self) -> Vec<Arc<dyn NativeAdapter>> {
        self.state
            .order_for(self.filter)
            .into_iter()
            .filter(|&index| index < self.state.adapters.len())
            .map(|index| {
                Arc::new(DummyAdapter {
                    state: Arc::clone(&self.state),
                    index,
                }) as Arc<dyn NativeAdapter>
            })
            .collect()
    }
}

struct DummyAdapter {
    state: Arc<DriverState>,
    index: usize,
}

impl DummyAdapter {
    fn config(&self) -> &DummyAdapterConfig {
        &self.state.adapters[self.index]
    }
}

impl NativeAdapter for DummyAdapter {
    fn describe(&self) -> GraphicsResult<AdapterDesc> {
        let config = self.config();
        Ok(AdapterDesc {
            name: config.name.clone(),
            vendor_id: config.vendor_id,
            device_id: config.device_id,
            subsystem_id: 0,
            revision: 1,
            luid: config.luid,
            dedicated_video_memory: config.dedicated_video_memory,
            dedicated_system_memory: 0,
            shared_system_memory: config.shared_system_memory,
            software: config.software,
            remote: config.remote,
        })
    }

    fn enumerate_outputs(&self) -> GraphicsResult<Vec<OutputDesc>> {
        Ok(self.config().outputs.clone())
    }

    fn probe_feature_level(&self) -> GraphicsResult<FeatureLevel> {
        let config = self.config();
        if !config.viable {
            return Err(GraphicsError::native(
                "DummyAdapter::probe_feature_level",
                "device creation not supported on this adapter",
            ));
        }
        Ok(config.feature_level)
    }

    fn create_device(&self) -> GraphicsResult<DeviceBundle> {
        let config = self.config();
        if !config.viable {
            return Err(GraphicsError::native(
                "DummyAdapter::create_device",
                "device creation not supported on this adapter",
            ));
        }
        let level = config.feature_level;
        let driver = DummyDriver {
            state: Arc::clone(&self.state),
        };
        driver.make_device(Some(self.index), level)
    }

    fn query_video_memory(&self, segment: MemorySegment) -> GraphicsResult<MemorySegmentUsage> {
        let config = self.config();
        let budget = match segment {
            MemorySegment::Local => config.dedicated_video_memory,
            MemorySegment::NonLocal => config.shared_system_memory,
        };
        Ok(MemorySegmentUsage {
            budget,
            current_usage: budget / 8,
            available_for_reservation: budget / 2,
            current_reservation: 0,
        })
    }
}

// ============================================================================
// Device and context
// ============================================================================

struct DummyDevice {
    state: Arc<DriverState>,
    generation: u64,
    feature_level: FeatureLevel,
    adapter_index: Option<usize>,
    handle: *mut c_void,
}

// Raw handle is an opaque serial, not a real pointer.
unsafe impl Send for DummyDevice {}
unsafe impl Sync for DummyDevice {}

impl DummyDevice {
    fn check_live(&self, call: &str) -> GraphicsResult<()> {
        if let Some((generation, reason)) = self.state.lost.lock().as_ref() {
            if *generation == self.generation {
                return Err(GraphicsError::native(call, format!("device lost: {}", reason)));
            }
        }
        Ok(())
    }
}

impl NativeDevice for DummyDevice {
    fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    fn removed_reason(&self) -> Option<String> {
        let lost = self.state.lost.lock();
        match lost.as_ref() {
            Some((generation, reason)) if *generation == self.generation => Some(reason.clone()),
            _ => None,
        }
    }

    fn format_support(&self, format: PixelFormat) -> GraphicsResult<FormatSupport> {
        let support = if format.is_depth_stencil() {
            FormatSupport::TEXTURE_2D | FormatSupport::DEPTH_STENCIL
        } else {
            FormatSupport::VERTEX_BUFFER
                | FormatSupport::TEXTURE_2D
                | FormatSupport::TEXTURE_CUBE
                | FormatSupport::SHADER_SAMPLE
                | FormatSupport::MIP
                | FormatSupport::MIP_AUTOGEN
                | FormatSupport::RENDER_TARGET
                | FormatSupport::BLENDABLE
                | FormatSupport::DISPLAY
                | FormatSupport::MULTISAMPLE_RENDER_TARGET
                | FormatSupport::MULTISAMPLE_RESOLVE
        };
        Ok(support)
    }

    fn threading_support(&self) -> GraphicsResult<ThreadingSupport> {
        Ok(ThreadingSupport {
            concurrent_creates: true,
            command_lists: true,
        })
    }

    fn architecture_info(&self) -> GraphicsResult<ArchitectureInfo> {
        Ok(ArchitectureInfo {
            tile_based: false,
            unified_memory: self.adapter_index.is_none(),
        })
    }

    fn adapter(&self) -> GraphicsResult<Arc<dyn NativeAdapter>> {
        match self.adapter_index {
            Some(index) => Ok(Arc::new(DummyAdapter {
                state: Arc::clone(&self.state),
                index,
            })),
            None => Err(GraphicsError::native(
                "DummyDevice::adapter",
                "software device has no adapter",
            )),
        }
    }

    fn create_texture(
        &self,
        desc: &TextureDesc,
        initial_data: Option<&[u8]>,
    ) -> GraphicsResult<Arc<dyn NativeTexture>> {
        self.check_live("DummyDevice::create_texture")?;
        if FailureInjection::take(&self.state.failures.texture_create) {
            return Err(GraphicsError::native(
                "DummyDevice::create_texture",
                "injected failure",
            ));
        }
        if desc.size.is_empty() {
            return Err(GraphicsError::native(
                "DummyDevice::create_texture",
                "zero-sized texture",
            ));
        }
        let expected =
            desc.size.width as usize * desc.size.height as usize * desc.format.bytes_per_pixel() as usize;
        if let Some(data) = initial_data {
            if data.len() < expected {
                return Err(GraphicsError::native(
                    "DummyDevice::create_texture",
                    format!("initial data too short: {} < {}", data.len(), expected),
                ));
            }
        }
        self.state.live.textures.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(DummyTexture {
            state: Arc::clone(&self.state),
            size: desc.size,
            format: desc.format,
            handle: self.state.next_handle(),
        }))
    }

    fn create_render_target_view(
        &self,
        _texture: &dyn NativeTexture,
    ) -> GraphicsResult<Arc<dyn NativeRenderTargetView>> {
        self.check_live("DummyDevice::create_render_target_view")?;
        if FailureInjection::take(&self.state.failures.render_target_view_create) {
            return Err(GraphicsError::native(
                "DummyDevice::create_render_target_view",
                "injected failure",
            ));
        }
        self.state
            .live
            .render_target_views
            .fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(DummyRenderTargetView {
            state: Arc::clone(&self.state),
            handle: self.state.next_handle(),
        }))
    }

    fn create_depth_stencil(
        &self,
        size: Extent2d,
    ) -> GraphicsResult<Arc<dyn NativeDepthStencil>> {
        self.check_live("DummyDevice::create_depth_stencil")?;
        if FailureInjection::take(&self.state.failures.depth_stencil_create) {
            return Err(GraphicsError::native(
                "DummyDevice::create_depth_stencil",
                "injected failure",
            ));
        }
        if size.is_empty() {
            return Err(GraphicsError::native(
                "DummyDevice::create_depth_stencil",
                "zero-sized surface",
            ));
        }
        self.state.live.depth_stencils.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(DummyDepthStencil {
            state: Arc::clone(&self.state),
            size,
            handle: self.state.next_handle(),
        }))
    }

    fn create_sampler(&self, _desc: &SamplerDescriptor) -> GraphicsResult<Arc<dyn NativeSampler>> {
        self.check_live("DummyDevice::create_sampler")?;
        if FailureInjection::take(&self.state.failures.sampler_create) {
            return Err(GraphicsError::native(
                "DummyDevice::create_sampler",
                "injected failure",
            ));
        }
        self.state.live.samplers.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(DummySampler {
            state: Arc::clone(&self.state),
            handle: self.state.next_handle(),
        }))
    }

    fn create_drawing_device(&self) -> GraphicsResult<Arc<dyn DrawingDevice>> {
        self.check_live("DummyDevice::create_drawing_device")?;
        if FailureInjection::take(&self.state.failures.drawing_device_create) {
            return Err(GraphicsError::native(
                "DummyDevice::create_drawing_device",
                "injected failure",
            ));
        }
        Ok(Arc::new(DummyDrawingDevice {
            state: Arc::clone(&self.state),
            handle: self.state.next_handle(),
        }))
    }

    fn native_handle(&self) -> *mut c_void {
        self.handle
    }
}

struct DummyContext {
    handle: *mut c_void,
}

unsafe impl Send for DummyContext {}
unsafe impl Sync for DummyContext {}

impl NativeContext for DummyContext {
    fn upload_region(
        &self,
        texture: &dyn NativeTexture,
        region: Region,
        data: &[u8],
        row_pitch: u32,
    ) -> GraphicsResult<()> {
        if !region.fits_within(texture.size()) {
            return Err(GraphicsError::native(
                "DummyContext::upload_region",
                "region exceeds texture bounds",
            ));
        }
        let needed = row_pitch as usize * region.height as usize;
        if data.len() < needed {
            return Err(GraphicsError::native(
                "DummyContext::upload_region",
                format!("data too short: {} < {}", data.len(), needed),
            ));
        }
        Ok(())
    }

    fn native_handle(&self) -> *mut c_void {
        self.handle
    }
}

// ============================================================================
// Resource handles
// ============================================================================

macro_rules! dummy_handle {
    ($name:ident, $counter:ident) => {
        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}

        impl Drop for $name {
            fn drop(&mut self) {
                self.state.live.$counter.fetch_sub(1, Ordering::SeqCst);
            }
        }
    };
}

struct DummyTexture {
    state: Arc<DriverState>,
    size: Extent2d,
    format: PixelFormat,
    handle: *mut c_void,
}

dummy_handle!(DummyTexture, textures);

impl NativeTexture for DummyTexture {
    fn size(&self) -> Extent2d {
        self.size
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn native_handle(&self) -> *mut c_void {
        self.handle
    }
}

struct DummyRenderTargetView {
    state: Arc<DriverState>,
    handle: *mut c_void,
}

dummy_handle!(DummyRenderTargetView, render_target_views);

impl NativeRenderTargetView for DummyRenderTargetView {
    fn native_handle(&self) -> *mut c_void {
        self.handle
    }
}

struct DummyDepthStencil {
    state: Arc<DriverState>,
    size: Extent2d,
    handle: *mut c_void,
}

dummy_handle!(DummyDepthStencil, depth_stencils);

impl NativeDepthStencil for DummyDepthStencil {
    fn size(&self) -> Extent2d {
        self.size
    }

    fn native_handle(&self) -> *mut c_void {
        self.handle
    }
}

struct DummySampler {
    state: Arc<DriverState>,
    handle: *mut c_void,
}

dummy_handle!(DummySampler, samplers);

impl NativeSampler for DummySampler {
    fn native_handle(&self) -> *mut c_void {
        self.handle
    }
}

// ============================================================================
// Drawing and text subsystems
// ============================================================================

struct DummyDrawingDevice {
    state: Arc<DriverState>,
    handle: *mut c_void,
}

unsafe impl Send for DummyDrawingDevice {}
unsafe impl Sync for DummyDrawingDevice {}

impl DrawingDevice for DummyDrawingDevice {
    fn create_bitmap(
        &self,
        _texture: &dyn NativeTexture,
    ) -> GraphicsResult<Arc<dyn DrawingBitmap>> {
        self.state.live.drawing_bitmaps.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(DummyDrawingBitmap {
            state: Arc::clone(&self.state),
            handle: self.state.next_handle(),
        }))
    }

    fn native_handle(&self) -> *mut c_void {
        self.handle
    }
}

struct DummyDrawingBitmap {
    state: Arc<DriverState>,
    handle: *mut c_void,
}

dummy_handle!(DummyDrawingBitmap, drawing_bitmaps);

impl DrawingBitmap for DummyDrawingBitmap {
    fn native_handle(&self) -> *mut c_void {
        self.handle
    }
}

struct DummyTextFactory {
    handle: *mut c_void,
}

unsafe impl Send for DummyTextFactory {}
unsafe impl Sync for DummyTextFactory {}

impl TextFactory for DummyTextFactory {
    fn native_handle(&self) -> *mut c_void {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_staleness() {
        let driver = DummyDriver::single_adapter();
        let factory = driver.create_factory(VendorFilter::NONE).unwrap();
        assert!(factory.is_current());
        driver.invalidate_factories();
        assert!(!factory.is_current());
        let fresh = driver.create_factory(VendorFilter::NONE).unwrap();
        assert!(fresh.is_current());
    }

    #[test]
    fn test_ordering_controls_enumeration() {
        let driver = DummyDriver::builder()
            .adapter(DummyAdapterConfig::hardware("A"))
            .adapter(DummyAdapterConfig::hardware("B"))
            .ordering(VendorFilter::NVIDIA, vec![1, 0])
            .build();

        let plain = driver.create_factory(VendorFilter::NONE).unwrap();
        let names: Vec<String> = plain
            .enumerate_adapters()
            .iter()
            .map(|a| a.describe().unwrap().name)
            .collect();
        assert_eq!(names, ["A", "B"]);

        let filtered = driver.create_factory(VendorFilter::NVIDIA).unwrap();
        let names: Vec<String> = filtered
            .enumerate_adapters()
            .iter()
            .map(|a| a.describe().unwrap().name)
            .collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn test_device_loss_is_per_generation() {
        let driver = DummyDriver::single_adapter();
        let factory = driver.create_factory(VendorFilter::NONE).unwrap();
        let adapter = &factory.enumerate_adapters()[0];

        let first = adapter.create_device().unwrap();
        driver.trigger_device_loss("simulated hang");
        assert_eq!(first.device.removed_reason().as_deref(), Some("simulated hang"));

        let second = adapter.create_device().unwrap();
        assert_eq!(second.device.removed_reason(), None);
    }

    #[test]
    fn test_live_counters_track_drops() {
        let driver = DummyDriver::single_adapter();
        let factory = driver.create_factory(VendorFilter::NONE).unwrap();
        let bundle = factory.enumerate_adapters()[0].create_device().unwrap();

        let desc = TextureDesc {
            size: Extent2d::new(4, 4),
            format: PixelFormat::Bgra8Unorm,
            mip_levels: 1,
            render_target: false,
            dynamic: false,
            label: None,
        };
        let texture = bundle.device.create_texture(&desc, None).unwrap();
        assert_eq!(driver.live_counters().textures(), 1);
        drop(texture);
        assert_eq!(driver.live_counters().textures(), 0);
    }

    #[test]
    fn test_failure_injection_consumed_once() {
        let driver = DummyDriver::single_adapter();
        driver.fail_next_device_creates(1);
        let factory = driver.create_factory(VendorFilter::NONE).unwrap();
        let adapter = &factory.enumerate_adapters()[0];
        assert!(adapter.create_device().is_err());
        assert!(adapter.create_device().is_ok());
    }

    #[test]
    fn test_upload_region_bounds() {
        let driver = DummyDriver::single_adapter();
        let factory = driver.create_factory(VendorFilter::NONE).unwrap();
        let bundle = factory.enumerate_adapters()[0].create_device().unwrap();
        let desc = TextureDesc {
            size: Extent2d::new(8, 8),
            format: PixelFormat::Bgra8Unorm,
            mip_levels: 1,
            render_target: false,
            dynamic: true,
            label: None,
        };
        let texture = bundle.device.create_texture(&desc, None).unwrap();
        let data = vec![0u8; 4 * 4 * 4];
        assert!(bundle
            .context
            .upload_region(texture.as_ref(), Region::new(0, 0, 4, 4), &data, 16)
            .is_ok());
        assert!(bundle
            .context
            .upload_region(texture.as_ref(), Region::new(6, 6, 4, 4), &data, 16)
            .is_err());
    }
}
