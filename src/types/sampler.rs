//! Sampler configuration types.
//!
//! A sampler's device-side object is a pure function of its
//! [`SamplerDescriptor`]; the descriptor is immutable once the sampler state
//! resource is constructed.

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    /// Point sampling for minification, magnification, and mip selection.
    Point,
    /// Linear minification, point magnification and mip selection.
    PointMinLinear,
    /// Point minification and mip selection, linear magnification.
    PointMagLinear,
    /// Point minification and magnification, linear mip selection.
    PointMipLinear,
    /// Point minification, linear magnification and mip selection.
    LinearMinPoint,
    /// Linear minification, point magnification, linear mip selection.
    LinearMagPoint,
    /// Linear minification and magnification, point mip selection.
    LinearMipPoint,
    /// Linear sampling for all operations.
    #[default]
    Linear,
    /// Anisotropic filtering.
    Anisotropic,
}

/// Texture coordinate addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Repeat the texture.
    Wrap,
    /// Mirror the texture at every integer boundary.
    Mirror,
    /// Clamp coordinates to the edge.
    #[default]
    Clamp,
    /// Use the border color outside [0, 1].
    Border,
    /// Mirror once around zero, then clamp.
    MirrorOnce,
}

/// Border color used by [`AddressMode::Border`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderColor {
    /// Fully transparent black.
    #[default]
    TransparentBlack,
    /// Opaque black.
    OpaqueBlack,
    /// Fully transparent white.
    TransparentWhite,
    /// Opaque white.
    OpaqueWhite,
}

impl BorderColor {
    /// RGBA components of this border color.
    pub fn to_rgba(self) -> [f32; 4] {
        match self {
            Self::TransparentBlack => [0.0, 0.0, 0.0, 0.0],
            Self::OpaqueBlack => [0.0, 0.0, 0.0, 1.0],
            Self::TransparentWhite => [1.0, 1.0, 1.0, 0.0],
            Self::OpaqueWhite => [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Immutable configuration for a sampler state.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    /// Filtering mode.
    pub filter: Filter,
    /// Address mode for the U coordinate.
    pub address_u: AddressMode,
    /// Address mode for the V coordinate.
    pub address_v: AddressMode,
    /// Address mode for the W coordinate.
    pub address_w: AddressMode,
    /// Mip LOD bias.
    pub mip_lod_bias: f32,
    /// Maximum anisotropy, only meaningful with [`Filter::Anisotropic`].
    pub max_anisotropy: u32,
    /// Minimum LOD clamp.
    pub min_lod: f32,
    /// Maximum LOD clamp.
    pub max_lod: f32,
    /// Border color used by [`AddressMode::Border`].
    pub border_color: BorderColor,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            filter: Filter::Linear,
            address_u: AddressMode::Clamp,
            address_v: AddressMode::Clamp,
            address_w: AddressMode::Clamp,
            mip_lod_bias: 0.0,
            max_anisotropy: 1,
            min_lod: 0.0,
            max_lod: f32::MAX,
            border_color: BorderColor::TransparentBlack,
        }
    }
}

impl SamplerDescriptor {
    /// Create a descriptor with default settings (linear filter, clamp).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a linear filtering descriptor.
    pub fn linear() -> Self {
        Self {
            filter: Filter::Linear,
            ..Self::default()
        }
    }

    /// Create a point filtering descriptor.
    pub fn point() -> Self {
        Self {
            filter: Filter::Point,
            ..Self::default()
        }
    }

    /// Set the filter mode.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the address mode for all coordinates.
    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_u = mode;
        self.address_v = mode;
        self.address_w = mode;
        self
    }

    /// Set the anisotropy level and switch to anisotropic filtering.
    pub fn with_anisotropy(mut self, level: u32) -> Self {
        self.filter = Filter::Anisotropic;
        self.max_anisotropy = level;
        self
    }

    /// Set the border color.
    pub fn with_border_color(mut self, color: BorderColor) -> Self {
        self.border_color = color;
        self
    }

    /// Set the LOD clamp range.
    pub fn with_lod_range(mut self, min: f32, max: f32) -> Self {
        self.min_lod = min;
        self.max_lod = max;
        self
    }
}
