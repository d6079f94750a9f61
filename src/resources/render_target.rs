//! Render targets.

use std::ffi::c_void;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::device::DeviceManager;
use crate::driver::{DrawingBitmap, NativeRenderTargetView};
use crate::error::{GraphicsError, GraphicsResult};
use crate::events::{DeviceEventListener, ListenerId};
use crate::resources::Texture2D;
use crate::types::Extent2d;

/// A render target and its exclusively owned backing texture.
///
/// The backing texture is not registered with the event dispatcher; this
/// render target drives its lifecycle so that across a rebuild the texture
/// is always recreated first, then the render target view, then the drawing
/// bitmap.
pub struct RenderTarget {
    device: Arc<DeviceManager>,
    texture: Arc<Texture2D>,
    view: RwLock<Option<Arc<dyn NativeRenderTargetView>>>,
    bitmap: RwLock<Option<Arc<dyn DrawingBitmap>>>,
    listener: Mutex<Option<ListenerId>>,
}

impl RenderTarget {
    pub(crate) fn new(device: &Arc<DeviceManager>, size: Extent2d) -> GraphicsResult<Arc<Self>> {
        let texture = Texture2D::new_render_target_backing(device, size)?;
        let target = Arc::new(Self {
            device: Arc::clone(device),
            texture,
            view: RwLock::new(None),
            bitmap: RwLock::new(None),
            listener: Mutex::new(None),
        });
        target.create_views()?;

        let id = target
            .device
            .events()
            .add_listener(Arc::downgrade(&target) as Weak<dyn DeviceEventListener>);
        *target.listener.lock() = Some(id);
        Ok(target)
    }

    // Derives the view and drawing bitmap from the current backing texture.
    // Releases prior ones first.
    fn create_views(&self) -> GraphicsResult<()> {
        *self.bitmap.write() = None;
        *self.view.write() = None;

        let handle = self.texture.handle().ok_or_else(|| {
            GraphicsError::InvalidOperation("backing texture has no device-side handle".to_string())
        })?;
        let device = self.device.native_device()?;
        let view = device.create_render_target_view(handle.as_ref())?;
        let bitmap = self
            .device
            .drawing_device()?
            .create_bitmap(handle.as_ref())?;

        *self.view.write() = Some(view);
        *self.bitmap.write() = Some(bitmap);
        Ok(())
    }

    /// Rebuild the whole triple from descriptive state.
    pub(crate) fn create_resource(&self) -> GraphicsResult<()> {
        self.texture.create_resource()?;
        self.create_views()
    }

    /// The backing texture.
    pub fn texture(&self) -> &Arc<Texture2D> {
        &self.texture
    }

    /// Render target dimensions.
    pub fn size(&self) -> Extent2d {
        self.texture.size()
    }

    /// Resize, recreating the texture, view, and bitmap together.
    pub fn set_size(&self, size: Extent2d) -> GraphicsResult<()> {
        if size.is_empty() {
            return Err(GraphicsError::InvalidOperation(
                "render target size must be non-zero".to_string(),
            ));
        }
        *self.bitmap.write() = None;
        *self.view.write() = None;
        self.texture.rebuild_with_size(size)?;
        self.create_views()
    }

    /// Untyped render target view handle for interop. Null while the device
    /// is down.
    pub fn native_view_handle(&self) -> *mut c_void {
        self.view
            .read()
            .as_ref()
            .map_or(std::ptr::null_mut(), |v| v.native_handle())
    }

    /// Untyped drawing bitmap handle for interop. Null while the device is
    /// down.
    pub fn native_bitmap_handle(&self) -> *mut c_void {
        self.bitmap
            .read()
            .as_ref()
            .map_or(std::ptr::null_mut(), |b| b.native_handle())
    }
}

impl DeviceEventListener for RenderTarget {
    fn on_device_destroy(&self) {
        *self.bitmap.write() = None;
        *self.view.write() = None;
        self.texture.on_device_destroy();
    }

    fn on_device_create(&self) {
        if let Err(e) = self.create_resource() {
            log::error!("render target rebuild failed: {}", e);
        }
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        if let Some(id) = self.listener.lock().take() {
            self.device.events().remove_listener(id);
        }
    }
}

static_assertions::assert_impl_all!(RenderTarget: Send, Sync);
