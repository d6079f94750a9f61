//! Common value types shared across the graphics device lifecycle.

pub mod sampler;

pub use sampler::{AddressMode, BorderColor, Filter, SamplerDescriptor};

use bitflags::bitflags;

// ============================================================================
// Extent2d / Region
// ============================================================================

/// 2D extent for textures and buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2d {
    /// Create a new extent.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A rectangular sub-region of a texture, used for partial pixel uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    /// X coordinate of the top-left corner.
    pub x: u32,
    /// Y coordinate of the top-left corner.
    pub y: u32,
    /// Region width in pixels.
    pub width: u32,
    /// Region height in pixels.
    pub height: u32,
}

impl Region {
    /// Create a new region.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a region covering a full extent, with origin at (0, 0).
    pub fn from_extent(extent: Extent2d) -> Self {
        Self::new(0, 0, extent.width, extent.height)
    }

    /// Whether this region fits entirely inside `extent`.
    pub fn fits_within(&self, extent: Extent2d) -> bool {
        self.x.checked_add(self.width).is_some_and(|r| r <= extent.width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= extent.height)
    }
}

// ============================================================================
// Pixel formats
// ============================================================================

/// Pixel formats the engine depends on.
///
/// The set is deliberately small: a standard 32-bit color format and its sRGB
/// variant in both channel orders, plus the combined depth/stencil format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit RGBA, unsigned normalized.
    Rgba8Unorm,
    /// 8-bit RGBA, unsigned normalized, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, unsigned normalized. The engine's working texture format.
    Bgra8Unorm,
    /// 8-bit BGRA, unsigned normalized, sRGB.
    Bgra8UnormSrgb,
    /// 24-bit depth with 8-bit stencil.
    Depth24Stencil8,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> u32 {
        // Every format in the set is 32 bits per pixel.
        4
    }

    /// Whether this is a depth/stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(self, Self::Depth24Stencil8)
    }

    /// Human-readable name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rgba8Unorm => "RGBA8",
            Self::Rgba8UnormSrgb => "RGBA8 sRGB",
            Self::Bgra8Unorm => "BGRA8",
            Self::Bgra8UnormSrgb => "BGRA8 sRGB",
            Self::Depth24Stencil8 => "D24 S8",
        }
    }
}

// ============================================================================
// Feature levels
// ============================================================================

/// Versioned capability tier of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureLevel {
    /// Feature level 9.1.
    Level9_1,
    /// Feature level 9.2.
    Level9_2,
    /// Feature level 9.3.
    Level9_3,
    /// Feature level 10.0. The minimum level the engine requires.
    Level10_0,
    /// Feature level 10.1.
    Level10_1,
    /// Feature level 11.0.
    Level11_0,
    /// Feature level 11.1.
    Level11_1,
    /// Feature level 12.0.
    Level12_0,
    /// Feature level 12.1.
    Level12_1,
    /// Feature level 12.2.
    Level12_2,
}

impl Default for FeatureLevel {
    fn default() -> Self {
        Self::MINIMUM
    }
}

impl FeatureLevel {
    /// The minimum feature level required for device viability probing.
    pub const MINIMUM: Self = Self::Level10_0;

    /// Human-readable version string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Level9_1 => "9.1",
            Self::Level9_2 => "9.2",
            Self::Level9_3 => "9.3",
            Self::Level10_0 => "10.0",
            Self::Level10_1 => "10.1",
            Self::Level11_0 => "11.0",
            Self::Level11_1 => "11.1",
            Self::Level12_0 => "12.0",
            Self::Level12_1 => "12.1",
            Self::Level12_2 => "12.2",
        }
    }

    /// Maximum 2D texture dimension implied by this feature level.
    pub fn max_texture_dimension(&self) -> u32 {
        match self {
            Self::Level9_1 | Self::Level9_2 => 2048,
            Self::Level9_3 => 4096,
            Self::Level10_0 | Self::Level10_1 => 8192,
            _ => 16384,
        }
    }
}

// ============================================================================
// Format support flags
// ============================================================================

bitflags! {
    /// Per-format feature bits reported by the capability prober.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FormatSupport: u32 {
        /// Usable as a vertex buffer element format.
        const VERTEX_BUFFER = 1 << 0;
        /// 2D textures can be created in this format.
        const TEXTURE_2D = 1 << 1;
        /// Cube textures can be created in this format.
        const TEXTURE_CUBE = 1 << 2;
        /// Shaders can sample this format.
        const SHADER_SAMPLE = 1 << 3;
        /// Mipmapped textures can be created.
        const MIP = 1 << 4;
        /// Mip chains can be auto-generated.
        const MIP_AUTOGEN = 1 << 5;
        /// Bindable as a render target.
        const RENDER_TARGET = 1 << 6;
        /// Supports blend operations when bound as a render target.
        const BLENDABLE = 1 << 7;
        /// Bindable as a depth/stencil buffer.
        const DEPTH_STENCIL = 1 << 8;
        /// Lockable and readable by the CPU.
        const CPU_LOCKABLE = 1 << 9;
        /// Multisample resolve is supported.
        const MULTISAMPLE_RESOLVE = 1 << 10;
        /// Usable for display output.
        const DISPLAY = 1 << 11;
        /// Multisampled render targets can be created.
        const MULTISAMPLE_RENDER_TARGET = 1 << 12;
        /// Output-merger logic ops are supported.
        const OUTPUT_MERGER_LOGIC_OP = 1 << 13;
        /// Resources can be tiled.
        const TILED = 1 << 14;
        /// Resources can be shared across devices.
        const SHAREABLE = 1 << 15;
        /// Multi-plane overlay presentation is supported.
        const MULTIPLANE_OVERLAY = 1 << 16;
    }
}

// ============================================================================
// Adapter and output descriptions
// ============================================================================

/// Identity and capability summary of an enumerated adapter.
///
/// Built once per enumeration pass; only the chosen adapter's identity and
/// the flat candidate name list survive selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDesc {
    /// Adapter name as reported by the driver.
    pub name: String,
    /// PCI vendor identifier.
    pub vendor_id: u32,
    /// PCI device identifier.
    pub device_id: u32,
    /// PCI subsystem identifier.
    pub subsystem_id: u32,
    /// PCI revision number.
    pub revision: u32,
    /// Locally-unique identifier for this adapter instance.
    pub luid: u64,
    /// Dedicated video memory in bytes.
    pub dedicated_video_memory: u64,
    /// Dedicated system memory in bytes.
    pub dedicated_system_memory: u64,
    /// Shared system memory in bytes.
    pub shared_system_memory: u64,
    /// Whether this is a software rasterizer.
    pub software: bool,
    /// Whether this is a remote (indirect display) adapter.
    pub remote: bool,
}

impl AdapterDesc {
    /// Whether this adapter is excluded from hardware candidacy.
    pub fn is_software_or_remote(&self) -> bool {
        self.software || self.remote
    }

    /// Adapter type string for diagnostics.
    pub fn kind_str(&self) -> &'static str {
        match (self.software, self.remote) {
            (false, false) => "hardware",
            (true, false) => "software",
            (false, true) => "hardware (remote)",
            (true, true) => "software (remote)",
        }
    }
}

/// Display rotation of an attached output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputRotation {
    /// Rotation not reported.
    #[default]
    Unspecified,
    /// No rotation.
    Identity,
    /// Rotated 90 degrees.
    Rotate90,
    /// Rotated 180 degrees.
    Rotate180,
    /// Rotated 270 degrees.
    Rotate270,
}

impl OutputRotation {
    /// Human-readable rotation string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unknown",
            Self::Identity => "none",
            Self::Rotate90 => "90 degrees",
            Self::Rotate180 => "180 degrees",
            Self::Rotate270 => "270 degrees",
        }
    }
}

bitflags! {
    /// Hardware composition capabilities of an output.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HardwareComposition: u32 {
        /// Composition supported in fullscreen.
        const FULLSCREEN = 1 << 0;
        /// Composition supported in windowed mode.
        const WINDOWED = 1 << 1;
        /// Cursor can be stretched by the compositor.
        const CURSOR_STRETCHED = 1 << 2;
    }
}

/// Description of a display output attached to an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDesc {
    /// Output device name.
    pub name: String,
    /// Whether the output is attached to the desktop.
    pub attached_to_desktop: bool,
    /// Desktop coordinates: left, top.
    pub position: (i32, i32),
    /// Desktop size in pixels.
    pub size: Extent2d,
    /// Display rotation.
    pub rotation: OutputRotation,
    /// Hardware composition support.
    pub hardware_composition: HardwareComposition,
}

// ============================================================================
// Vendor filter
// ============================================================================

/// Explicit vendor-filtering state applied to adapter enumeration.
///
/// Some enumeration backends apply vendor-specific filtering that hides or
/// reorders adapters. This is threaded explicitly through every factory
/// creation rather than living in ambient global state, so the selection
/// algorithm stays composable and testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VendorFilter {
    /// Apply the NVIDIA enumeration policy.
    pub nvidia: bool,
    /// Apply the AMD enumeration policy.
    pub amd: bool,
}

impl VendorFilter {
    /// No vendor filtering.
    pub const NONE: Self = Self {
        nvidia: false,
        amd: false,
    };

    /// All vendor policies applied.
    pub const ALL: Self = Self {
        nvidia: true,
        amd: true,
    };

    /// Only the NVIDIA policy applied.
    pub const NVIDIA: Self = Self {
        nvidia: true,
        amd: false,
    };

    /// Only the AMD policy applied.
    pub const AMD: Self = Self {
        nvidia: false,
        amd: true,
    };
}

impl std::fmt::Display for VendorFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.nvidia, self.amd) {
            (false, false) => write!(f, "none"),
            (true, true) => write!(f, "all vendors"),
            (true, false) => write!(f, "NVIDIA"),
            (false, true) => write!(f, "AMD"),
        }
    }
}

// ============================================================================
// Memory statistics
// ============================================================================

/// Memory segment group of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemorySegment {
    /// Memory local to the adapter (dedicated video memory).
    Local,
    /// Memory not local to the adapter (shared system memory).
    NonLocal,
}

/// Usage statistics for one memory segment group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySegmentUsage {
    /// OS-provided budget in bytes.
    pub budget: u64,
    /// Current usage in bytes.
    pub current_usage: u64,
    /// Bytes available for reservation.
    pub available_for_reservation: u64,
    /// Currently reserved bytes.
    pub current_reservation: u64,
}

/// Memory usage statistics for both segment groups of the active adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryUsageStatistics {
    /// Local (dedicated) segment group.
    pub local: MemorySegmentUsage,
    /// Non-local (shared) segment group.
    pub non_local: MemorySegmentUsage,
}

// ============================================================================
// Device feature queries
// ============================================================================

/// Multithreading capabilities of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadingSupport {
    /// Driver supports concurrent resource creation.
    pub concurrent_creates: bool,
    /// Driver supports command lists.
    pub command_lists: bool,
}

impl ThreadingSupport {
    /// Human-readable description for diagnostics.
    pub fn describe(&self) -> &'static str {
        match (self.concurrent_creates, self.command_lists) {
            (true, true) => "concurrent resource creation, command lists",
            (true, false) => "concurrent resource creation",
            (false, true) => "command lists",
            (false, false) => "not supported",
        }
    }
}

/// Rendering architecture of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchitectureInfo {
    /// Tile-based deferred renderer rather than immediate mode.
    pub tile_based: bool,
    /// Unified memory architecture.
    pub unified_memory: bool,
}

impl ArchitectureInfo {
    /// Renderer architecture string for diagnostics.
    pub fn renderer_str(&self) -> &'static str {
        if self.tile_based {
            "tile-based deferred rendering (TBDR)"
        } else {
            "immediate mode rendering (IMR)"
        }
    }
}

/// Kind of software rasterizer device created by the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoftwareDeviceKind {
    /// Reference rasterizer.
    Reference,
    /// Basic software rasterizer.
    Software,
    /// High-performance software rasterization platform.
    HighPerformance,
}

impl SoftwareDeviceKind {
    /// Human-readable kind string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reference => "reference rasterizer",
            Self::Software => "software rasterizer",
            Self::HighPerformance => "high-performance software rasterizer",
        }
    }
}

// ============================================================================
// Formatting helpers
// ============================================================================

/// Format a byte count as a human-readable string.
pub fn format_byte_size(size: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    if size < KIB {
        format!("{} B", size)
    } else if size < MIB {
        format!("{:.2} KiB", size as f64 / KIB as f64)
    } else if size < GIB {
        format!("{:.2} MiB", size as f64 / MIB as f64)
    } else {
        format!("{:.2} GiB", size as f64 / GIB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_bounds() {
        let extent = Extent2d::new(256, 128);
        assert!(Region::new(0, 0, 256, 128).fits_within(extent));
        assert!(Region::new(128, 64, 128, 64).fits_within(extent));
        assert!(!Region::new(129, 0, 128, 64).fits_within(extent));
        assert!(!Region::new(0, 65, 128, 64).fits_within(extent));
    }

    #[test]
    fn test_feature_level_texture_dimension() {
        assert_eq!(FeatureLevel::Level9_1.max_texture_dimension(), 2048);
        assert_eq!(FeatureLevel::Level9_3.max_texture_dimension(), 4096);
        assert_eq!(FeatureLevel::Level10_1.max_texture_dimension(), 8192);
        assert_eq!(FeatureLevel::Level11_0.max_texture_dimension(), 16384);
        assert_eq!(FeatureLevel::Level12_2.max_texture_dimension(), 16384);
    }

    #[test]
    fn test_feature_level_ordering() {
        assert!(FeatureLevel::Level9_3 < FeatureLevel::MINIMUM);
        assert!(FeatureLevel::Level11_1 > FeatureLevel::Level10_0);
    }

    #[test]
    fn test_byte_size_formatting() {
        assert_eq!(format_byte_size(512), "512 B");
        assert_eq!(format_byte_size(2048), "2.00 KiB");
        assert_eq!(format_byte_size(3 * 1024 * 1024), "3.00 MiB");
        assert_eq!(format_byte_size(5 * 1024 * 1024 * 1024), "5.00 GiB");
    }

    #[test]
    fn test_adapter_kind_str() {
        let mut desc = AdapterDesc {
            name: "Test".to_string(),
            vendor_id: 0,
            device_id: 0,
            subsystem_id: 0,
            revision: 0,
            luid: 0,
            dedicated_video_memory: 0,
            dedicated_system_memory: 0,
            shared_system_memory: 0,
            software: false,
            remote: false,
        };
        assert_eq!(desc.kind_str(), "hardware");
        desc.software = true;
        assert_eq!(desc.kind_str(), "software");
        assert!(desc.is_software_or_remote());
    }
}
