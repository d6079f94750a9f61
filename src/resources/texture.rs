//! 2D textures.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::device::DeviceManager;
use crate::driver::{decode_image_bytes, NativeTexture, TextureDesc};
use crate::error::{GraphicsError, GraphicsResult};
use crate::events::{DeviceEventListener, ListenerId};
use crate::resources::SamplerState;
use crate::types::{Extent2d, PixelFormat, Region};

/// Number of mip levels for a full chain over the given extent.
fn full_mip_count(size: Extent2d) -> u32 {
    let largest = size.width.max(size.height).max(1);
    32 - largest.leading_zeros()
}

/// How a texture's content is reconstructed after a device rebuild.
enum TextureSource {
    /// Re-read and re-decode the file.
    File(PathBuf),
    /// Recreate blank at the current size; content is CPU-uploaded.
    Dynamic,
    /// Recreate blank at the current size with render target binding.
    RenderTargetBacking,
}

/// A 2D texture in the engine's working format (BGRA8).
///
/// The descriptive state (source, size, flags) never changes across device
/// rebuilds; only the device-side handle does. File-backed textures are
/// static: their pixel content comes from the file on every rebuild and
/// they reject resizing.
pub struct Texture2D {
    device: Arc<DeviceManager>,
    source: TextureSource,
    mipmap: bool,
    size: RwLock<Extent2d>,
    premultiplied: RwLock<bool>,
    sampler: RwLock<Option<Arc<SamplerState>>>,
    handle: RwLock<Option<Arc<dyn NativeTexture>>>,
    listener: Mutex<Option<ListenerId>>,
}

impl Texture2D {
    /// Load a texture from an image file.
    ///
    /// The file's bytes go through the codec chain; all codecs failing, or
    /// the file being unreadable, fails construction.
    pub(crate) fn from_file(
        device: &Arc<DeviceManager>,
        path: &Path,
        mipmap: bool,
    ) -> GraphicsResult<Arc<Self>> {
        if path.as_os_str().is_empty() {
            return Err(GraphicsError::InvalidOperation(
                "texture file path is empty".to_string(),
            ));
        }
        let texture = Arc::new(Self {
            device: Arc::clone(device),
            source: TextureSource::File(path.to_path_buf()),
            mipmap,
            size: RwLock::new(Extent2d::default()),
            premultiplied: RwLock::new(false),
            sampler: RwLock::new(None),
            handle: RwLock::new(None),
            listener: Mutex::new(None),
        });
        texture.create_resource()?;
        texture.register();
        Ok(texture)
    }

    /// Create a dynamic texture for CPU uploads.
    pub(crate) fn new_dynamic(
        device: &Arc<DeviceManager>,
        size: Extent2d,
    ) -> GraphicsResult<Arc<Self>> {
        if size.is_empty() {
            return Err(GraphicsError::InvalidOperation(
                "texture size must be non-zero".to_string(),
            ));
        }
        let texture = Arc::new(Self {
            device: Arc::clone(device),
            source: TextureSource::Dynamic,
            mipmap: false,
            size: RwLock::new(size),
            premultiplied: RwLock::new(false),
            sampler: RwLock::new(None),
            handle: RwLock::new(None),
            listener: Mutex::new(None),
        });
        texture.create_resource()?;
        texture.register();
        Ok(texture)
    }

    /// Create the backing texture of a render target.
    ///
    /// Deliberately not registered with the dispatcher: the owning render
    /// target drives its rebuild so the texture, view, and drawing bitmap
    /// are always recreated together and in order.
    pub(crate) fn new_render_target_backing(
        device: &Arc<DeviceManager>,
        size: Extent2d,
    ) -> GraphicsResult<Arc<Self>> {
        if size.is_empty() {
            return Err(GraphicsError::InvalidOperation(
                "render target size must be non-zero".to_string(),
            ));
        }
        let texture = Arc::new(Self {
            device: Arc::clone(device),
            source: TextureSource::RenderTargetBacking,
            mipmap: false,
            size: RwLock::new(size),
            // Render output is premultiplied by the blend state.
            premultiplied: RwLock::new(true),
            sampler: RwLock::new(None),
            handle: RwLock::new(None),
            listener: Mutex::new(None),
        });
        texture.create_resource()?;
        Ok(texture)
    }

    fn register(self: &Arc<Self>) {
        let id = self
            .device
            .events()
            .add_listener(Arc::downgrade(self) as Weak<dyn DeviceEventListener>);
        *self.listener.lock() = Some(id);
    }

    /// Rebuild the device-side texture from descriptive state.
    ///
    /// Always releases the previous handle first, so repeated calls never
    /// leak and a failure leaves no stale handle behind.
    pub(crate) fn create_resource(&self) -> GraphicsResult<()> {
        *self.handle.write() = None;
        let device = self.device.native_device()?;

        let handle = match &self.source {
            TextureSource::File(path) => {
                let bytes = std::fs::read(path).map_err(|source| GraphicsError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                let imaging = self.device.imaging_factory();
                let decoded = decode_image_bytes(imaging.as_ref(), &bytes)?;
                if let Some(premultiplied) = decoded.premultiplied {
                    *self.premultiplied.write() = premultiplied;
                }
                *self.size.write() = decoded.size;
                let desc = TextureDesc {
                    size: decoded.size,
                    format: PixelFormat::Bgra8Unorm,
                    mip_levels: if self.mipmap {
                        full_mip_count(decoded.size)
                    } else {
                        1
                    },
                    render_target: false,
                    dynamic: false,
                    label: Some(path.display().to_string()),
                };
                device.create_texture(&desc, Some(&decoded.pixels))?
            }
            TextureSource::Dynamic => {
                let size = *self.size.read();
                let desc = TextureDesc {
                    size,
                    format: PixelFormat::Bgra8Unorm,
                    mip_levels: 1,
                    render_target: false,
                    dynamic: true,
                    label: None,
                };
                device.create_texture(&desc, None)?
            }
            TextureSource::RenderTargetBacking => {
                let size = *self.size.read();
                let desc = TextureDesc {
                    size,
                    format: PixelFormat::Bgra8Unorm,
                    mip_levels: 1,
                    render_target: true,
                    dynamic: false,
                    label: None,
                };
                device.create_texture(&desc, None)?
            }
        };

        *self.handle.write() = Some(handle);
        Ok(())
    }

    /// Release the device-side handle and rebuild at a new size.
    ///
    /// Used by the owning render target; skips the dynamic-only check.
    pub(crate) fn rebuild_with_size(&self, size: Extent2d) -> GraphicsResult<()> {
        *self.handle.write() = None;
        *self.size.write() = size;
        self.create_resource()
    }

    /// Texture dimensions.
    pub fn size(&self) -> Extent2d {
        *self.size.read()
    }

    /// Whether the CPU can upload into this texture.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, TextureSource::Dynamic)
    }

    /// Whether the pixel data carries premultiplied alpha.
    pub fn is_premultiplied_alpha(&self) -> bool {
        *self.premultiplied.read()
    }

    /// Override the premultiplied-alpha flag.
    pub fn set_premultiplied_alpha(&self, premultiplied: bool) {
        *self.premultiplied.write() = premultiplied;
    }

    /// The sampler associated with this texture, if any.
    pub fn sampler_state(&self) -> Option<Arc<SamplerState>> {
        self.sampler.read().clone()
    }

    /// Associate a sampler with this texture.
    pub fn set_sampler_state(&self, sampler: Option<Arc<SamplerState>>) {
        *self.sampler.write() = sampler;
    }

    /// Resize a dynamic texture, discarding its content.
    ///
    /// Static textures reject resizing; the existing handle is left
    /// untouched in that case.
    pub fn set_size(&self, size: Extent2d) -> GraphicsResult<()> {
        if !self.is_dynamic() {
            return Err(GraphicsError::InvalidOperation(
                "cannot resize a static texture".to_string(),
            ));
        }
        if size.is_empty() {
            return Err(GraphicsError::InvalidOperation(
                "texture size must be non-zero".to_string(),
            ));
        }
        self.rebuild_with_size(size)
    }

    /// Upload BGRA8 pixel data into a sub-region of a dynamic texture.
    pub fn upload(&self, region: Region, data: &[u8], row_pitch: u32) -> GraphicsResult<()> {
        if !self.is_dynamic() {
            return Err(GraphicsError::InvalidOperation(
                "cannot upload into a static texture".to_string(),
            ));
        }
        let guard = self.handle.read();
        let handle = guard.as_ref().ok_or_else(|| {
            GraphicsError::InvalidOperation("texture has no device-side handle".to_string())
        })?;
        if !region.fits_within(handle.size()) {
            return Err(GraphicsError::InvalidOperation(
                "upload region exceeds texture bounds".to_string(),
            ));
        }
        let context = self.device.native_context()?;
        context.upload_region(handle.as_ref(), region, data, row_pitch)
    }

    /// The current device-side handle, if the device session is live.
    pub(crate) fn handle(&self) -> Option<Arc<dyn NativeTexture>> {
        self.handle.read().clone()
    }

    /// Untyped native texture handle for interop. Null while the device is
    /// down.
    pub fn native_handle(&self) -> *mut c_void {
        self.handle
            .read()
            .as_ref()
            .map_or(std::ptr::null_mut(), |h| h.native_handle())
    }
}

impl DeviceEventListener for Texture2D {
    fn on_device_destroy(&self) {
        *self.handle.write() = None;
    }

    fn on_device_create(&self) {
        if let Err(e) = self.create_resource() {
            log::error!("texture rebuild failed: {}", e);
        }
    }
}

impl Drop for Texture2D {
    fn drop(&mut self) {
        if let Some(id) = self.listener.lock().take() {
            self.device.events().remove_listener(id);
        }
    }
}

static_assertions::assert_impl_all!(Texture2D: Send, Sync);
