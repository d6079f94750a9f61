//! Native substrate seam.
//!
//! The volatile hardware/driver substrate is expressed as a family of
//! object-safe traits. The device core and the resources never touch a
//! native API directly; everything flows through these traits, which keeps
//! the whole lifecycle testable against the in-process [`dummy`] substrate.
//!
//! All calls are synchronous and may block.

pub mod dummy;
pub mod imaging;

use std::ffi::c_void;
use std::sync::Arc;

use crate::error::GraphicsResult;
use crate::types::{
    AdapterDesc, ArchitectureInfo, Extent2d, FeatureLevel, FormatSupport, MemorySegment,
    MemorySegmentUsage, OutputDesc, PixelFormat, Region, SamplerDescriptor, SoftwareDeviceKind,
    ThreadingSupport, VendorFilter,
};

// ============================================================================
// Driver entry point
// ============================================================================

/// Entry point into a native graphics substrate.
///
/// The driver creates enumeration factories and the long-lived subsystem
/// factories. The vendor filter is explicit state threaded through every
/// factory creation; it never lives in ambient global state.
pub trait NativeDriver: Send + Sync {
    /// Substrate name for diagnostics.
    fn name(&self) -> &str;

    /// Create an enumeration factory under the given vendor filter.
    fn create_factory(&self, filter: VendorFilter) -> GraphicsResult<Arc<dyn NativeFactory>>;

    /// Create a software rasterizer device, reporting which kind was used.
    fn create_software_device(&self) -> GraphicsResult<(DeviceBundle, SoftwareDeviceKind)>;

    /// Create the long-lived imaging factory (image decode subsystem).
    fn create_imaging_factory(&self) -> GraphicsResult<Arc<dyn ImagingFactory>>;

    /// Create the long-lived text factory (text layout subsystem).
    fn create_text_factory(&self) -> GraphicsResult<Arc<dyn TextFactory>>;
}

/// A logical device together with its immediate context and feature level.
pub struct DeviceBundle {
    /// The logical device.
    pub device: Arc<dyn NativeDevice>,
    /// The device's immediate context.
    pub context: Arc<dyn NativeContext>,
    /// Feature level the device was created at.
    pub feature_level: FeatureLevel,
}

// ============================================================================
// Factory and adapter
// ============================================================================

/// An adapter enumeration factory.
///
/// Factories can go stale when the system's adapter set changes; a stale
/// factory must be replaced before its enumeration results can be trusted.
pub trait NativeFactory: Send + Sync {
    /// Whether this factory still reflects the current adapter set.
    fn is_current(&self) -> bool;

    /// Whether tearing (vsync-off presentation) is supported.
    fn supports_tearing(&self) -> GraphicsResult<bool>;

    /// Enumerate all adapters visible under this factory's vendor filter.
    fn enumerate_adapters(&self) -> Vec<Arc<dyn NativeAdapter>>;
}

/// A physical (or software) adapter.
pub trait NativeAdapter: Send + Sync {
    /// Identity and memory description of this adapter.
    fn describe(&self) -> GraphicsResult<AdapterDesc>;

    /// Display outputs attached to this adapter. Best-effort; callers treat
    /// failure as "no output information".
    fn enumerate_outputs(&self) -> GraphicsResult<Vec<OutputDesc>>;

    /// Probe whether a minimal device can be created on this adapter, and at
    /// which feature level.
    fn probe_feature_level(&self) -> GraphicsResult<FeatureLevel>;

    /// Create a full logical device on this adapter.
    fn create_device(&self) -> GraphicsResult<DeviceBundle>;

    /// Query current video memory usage for one segment group.
    fn query_video_memory(&self, segment: MemorySegment) -> GraphicsResult<MemorySegmentUsage>;
}

// ============================================================================
// Device and context
// ============================================================================

/// Descriptive parameters for device-side texture creation.
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Texture dimensions.
    pub size: Extent2d,
    /// Pixel format.
    pub format: PixelFormat,
    /// Number of mip levels; 1 for no mipmapping.
    pub mip_levels: u32,
    /// Whether the texture must be bindable as a render target.
    pub render_target: bool,
    /// Whether the CPU will write to the texture after creation.
    pub dynamic: bool,
    /// Debug label.
    pub label: Option<String>,
}

/// A logical graphics device.
pub trait NativeDevice: Send + Sync {
    /// Feature level this device was created at.
    fn feature_level(&self) -> FeatureLevel;

    /// If the device has been removed, the driver's stated reason.
    fn removed_reason(&self) -> Option<String>;

    /// Per-format feature support bits.
    fn format_support(&self, format: PixelFormat) -> GraphicsResult<FormatSupport>;

    /// Multithreading capabilities.
    fn threading_support(&self) -> GraphicsResult<ThreadingSupport>;

    /// Rendering architecture information.
    fn architecture_info(&self) -> GraphicsResult<ArchitectureInfo>;

    /// The adapter this device was created on. Used to re-resolve the
    /// adapter after a factory swap.
    fn adapter(&self) -> GraphicsResult<Arc<dyn NativeAdapter>>;

    /// Create a texture, optionally with initial pixel data.
    fn create_texture(
        &self,
        desc: &TextureDesc,
        initial_data: Option<&[u8]>,
    ) -> GraphicsResult<Arc<dyn NativeTexture>>;

    /// Create a render target view over a texture.
    fn create_render_target_view(
        &self,
        texture: &dyn NativeTexture,
    ) -> GraphicsResult<Arc<dyn NativeRenderTargetView>>;

    /// Create a depth/stencil surface and view of the given size.
    fn create_depth_stencil(&self, size: Extent2d)
        -> GraphicsResult<Arc<dyn NativeDepthStencil>>;

    /// Create a sampler state object from its configuration.
    fn create_sampler(&self, desc: &SamplerDescriptor) -> GraphicsResult<Arc<dyn NativeSampler>>;

    /// Create the short-lived 2D drawing subsystem device bound to this
    /// device.
    fn create_drawing_device(&self) -> GraphicsResult<Arc<dyn DrawingDevice>>;

    /// Untyped native handle for interop.
    fn native_handle(&self) -> *mut c_void;
}

/// A device's immediate context.
pub trait NativeContext: Send + Sync {
    /// Upload pixel data into a sub-region of a texture.
    fn upload_region(
        &self,
        texture: &dyn NativeTexture,
        region: Region,
        data: &[u8],
        row_pitch: u32,
    ) -> GraphicsResult<()>;

    /// Untyped native handle for interop.
    fn native_handle(&self) -> *mut c_void;
}

// ============================================================================
// Resource handles
// ============================================================================
//
// Handles are opaque and valid only while the device session that created
// them lives. Resources drop and rebuild them across the destroy/create
// cycle.

/// Device-side texture handle.
pub trait NativeTexture: Send + Sync {
    /// Texture dimensions.
    fn size(&self) -> Extent2d;

    /// Pixel format.
    fn format(&self) -> PixelFormat;

    /// Untyped native handle for interop.
    fn native_handle(&self) -> *mut c_void;
}

/// Device-side render target view handle.
pub trait NativeRenderTargetView: Send + Sync {
    /// Untyped native handle for interop.
    fn native_handle(&self) -> *mut c_void;
}

/// Device-side depth/stencil surface handle.
pub trait NativeDepthStencil: Send + Sync {
    /// Surface dimensions.
    fn size(&self) -> Extent2d;

    /// Untyped native handle for interop.
    fn native_handle(&self) -> *mut c_void;
}

/// Device-side sampler state handle.
pub trait NativeSampler: Send + Sync {
    /// Untyped native handle for interop.
    fn native_handle(&self) -> *mut c_void;
}

// ============================================================================
// Drawing, imaging, text subsystems
// ============================================================================

/// Short-lived 2D drawing subsystem device.
///
/// Recreated together with the logical device on every rebuild.
pub trait DrawingDevice: Send + Sync {
    /// Create a drawing bitmap sharing storage with a render target texture.
    fn create_bitmap(&self, texture: &dyn NativeTexture) -> GraphicsResult<Arc<dyn DrawingBitmap>>;

    /// Untyped native handle for interop.
    fn native_handle(&self) -> *mut c_void;
}

/// A drawing bitmap bound to a render target texture.
pub trait DrawingBitmap: Send + Sync {
    /// Untyped native handle for interop.
    fn native_handle(&self) -> *mut c_void;
}

/// A decoded image in the engine's working layout (BGRA8, tightly packed).
#[derive(Debug)]
pub struct DecodedImage {
    /// Image dimensions.
    pub size: Extent2d,
    /// BGRA8 pixel data, `size.width * size.height * 4` bytes.
    pub pixels: Vec<u8>,
    /// Whether the alpha is premultiplied, when the codec can tell.
    pub premultiplied: Option<bool>,
}

/// Long-lived image decoding subsystem.
///
/// Survives device rebuilds; decoding has no device dependency.
pub trait ImagingFactory: Send + Sync {
    /// Decode container-format image bytes (block-compressed texture
    /// containers). Tried first because the generic decoder mishandles them.
    fn decode_container(&self, bytes: &[u8]) -> GraphicsResult<DecodedImage>;

    /// Decode common image formats, guessing the format from the bytes.
    fn decode_generic(&self, bytes: &[u8]) -> GraphicsResult<DecodedImage>;

    /// Decode the compact lossless interchange format.
    fn decode_compact(&self, bytes: &[u8]) -> GraphicsResult<DecodedImage>;
}

/// Long-lived text layout subsystem.
///
/// Survives device rebuilds. The lifecycle manager only owns the handle;
/// text shaping itself lives elsewhere.
pub trait TextFactory: Send + Sync {
    /// Untyped native handle for interop.
    fn native_handle(&self) -> *mut c_void;
}

/// Decode image bytes through the full codec chain.
///
/// Codecs are tried in fixed order: container format first, generic second,
/// compact third. Individual failures are collected; only when every codec
/// fails is a single combined error produced.
pub fn decode_image_bytes(
    imaging: &dyn ImagingFactory,
    bytes: &[u8],
) -> GraphicsResult<DecodedImage> {
    let mut failures: Vec<String> = Vec::with_capacity(3);

    match imaging.decode_container(bytes) {
        Ok(image) => return Ok(image),
        Err(e) => failures.push(format!("container: {}", e)),
    }
    match imaging.decode_generic(bytes) {
        Ok(image) => return Ok(image),
        Err(e) => failures.push(format!("generic: {}", e)),
    }
    match imaging.decode_compact(bytes) {
        Ok(image) => return Ok(image),
        Err(e) => failures.push(format!("compact: {}", e)),
    }

    Err(crate::error::GraphicsError::DecodeFailed(failures.join("; ")))
}
