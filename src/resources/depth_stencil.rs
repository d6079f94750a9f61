//! Depth/stencil buffers.

use std::ffi::c_void;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::device::DeviceManager;
use crate::driver::NativeDepthStencil;
use crate::error::{GraphicsError, GraphicsResult};
use crate::events::{DeviceEventListener, ListenerId};
use crate::types::Extent2d;

/// A combined depth/stencil buffer.
///
/// Descriptive state is just the dimensions; resizing is a full recreation.
pub struct DepthStencilBuffer {
    device: Arc<DeviceManager>,
    size: RwLock<Extent2d>,
    handle: RwLock<Option<Arc<dyn NativeDepthStencil>>>,
    listener: Mutex<Option<ListenerId>>,
}

impl DepthStencilBuffer {
    pub(crate) fn new(device: &Arc<DeviceManager>, size: Extent2d) -> GraphicsResult<Arc<Self>> {
        if size.is_empty() {
            return Err(GraphicsError::InvalidOperation(
                "depth/stencil size must be non-zero".to_string(),
            ));
        }
        let buffer = Arc::new(Self {
            device: Arc::clone(device),
            size: RwLock::new(size),
            handle: RwLock::new(None),
            listener: Mutex::new(None),
        });
        buffer.create_resource()?;

        let id = buffer
            .device
            .events()
            .add_listener(Arc::downgrade(&buffer) as Weak<dyn DeviceEventListener>);
        *buffer.listener.lock() = Some(id);
        Ok(buffer)
    }

    fn create_resource(&self) -> GraphicsResult<()> {
        *self.handle.write() = None;
        let device = self.device.native_device()?;
        let handle = device.create_depth_stencil(*self.size.read())?;
        *self.handle.write() = Some(handle);
        Ok(())
    }

    /// Buffer dimensions.
    pub fn size(&self) -> Extent2d {
        *self.size.read()
    }

    /// Resize by full recreation.
    pub fn set_size(&self, size: Extent2d) -> GraphicsResult<()> {
        if size.is_empty() {
            return Err(GraphicsError::InvalidOperation(
                "depth/stencil size must be non-zero".to_string(),
            ));
        }
        *self.size.write() = size;
        self.create_resource()
    }

    /// Untyped native handle for interop. Null while the device is down.
    pub fn native_handle(&self) -> *mut c_void {
        self.handle
            .read()
            .as_ref()
            .map_or(std::ptr::null_mut(), |h| h.native_handle())
    }
}

impl DeviceEventListener for DepthStencilBuffer {
    fn on_device_destroy(&self) {
        *self.handle.write() = None;
    }

    fn on_device_create(&self) {
        if let Err(e) = self.create_resource() {
            log::error!("depth/stencil rebuild failed: {}", e);
        }
    }
}

impl Drop for DepthStencilBuffer {
    fn drop(&mut self) {
        if let Some(id) = self.listener.lock().take() {
            self.device.events().remove_listener(id);
        }
    }
}

static_assertions::assert_impl_all!(DepthStencilBuffer: Send, Sync);
