//! GPU resource variants.
//!
//! Every resource splits into descriptive state, which is device
//! independent and survives rebuilds, and device-side handles, which are
//! valid only while the creating session lives. Resources register with the
//! device event dispatcher at construction and rebuild their handles from
//! descriptive state whenever the device is recreated.

mod depth_stencil;
mod render_target;
mod sampler;
mod texture;

pub use depth_stencil::DepthStencilBuffer;
pub use render_target::RenderTarget;
pub use sampler::SamplerState;
pub use texture::Texture2D;
