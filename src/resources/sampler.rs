//! Sampler states.

use std::ffi::c_void;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::device::DeviceManager;
use crate::driver::NativeSampler;
use crate::error::GraphicsResult;
use crate::events::{DeviceEventListener, ListenerId};
use crate::types::SamplerDescriptor;

/// A sampler state.
///
/// The configuration is immutable; the device-side object is a pure
/// function of it, so a rebuild reproduces it exactly.
pub struct SamplerState {
    device: Arc<DeviceManager>,
    desc: SamplerDescriptor,
    handle: RwLock<Option<Arc<dyn NativeSampler>>>,
    listener: Mutex<Option<ListenerId>>,
}

impl SamplerState {
    pub(crate) fn new(
        device: &Arc<DeviceManager>,
        desc: SamplerDescriptor,
    ) -> GraphicsResult<Arc<Self>> {
        let sampler = Arc::new(Self {
            device: Arc::clone(device),
            desc,
            handle: RwLock::new(None),
            listener: Mutex::new(None),
        });
        sampler.create_resource()?;

        let id = sampler
            .device
            .events()
            .add_listener(Arc::downgrade(&sampler) as Weak<dyn DeviceEventListener>);
        *sampler.listener.lock() = Some(id);
        Ok(sampler)
    }

    fn create_resource(&self) -> GraphicsResult<()> {
        *self.handle.write() = None;
        let device = self.device.native_device()?;
        let handle = device.create_sampler(&self.desc)?;
        *self.handle.write() = Some(handle);
        Ok(())
    }

    /// The sampler configuration.
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.desc
    }

    /// Untyped native handle for interop. Null while the device is down.
    pub fn native_handle(&self) -> *mut c_void {
        self.handle
            .read()
            .as_ref()
            .map_or(std::ptr::null_mut(), |h| h.native_handle())
    }
}

impl DeviceEventListener for SamplerState {
    fn on_device_destroy(&self) {
        *self.handle.write() = None;
    }

    fn on_device_create(&self) {
        if let Err(e) = self.create_resource() {
            log::error!("sampler rebuild failed: {}", e);
        }
    }
}

impl Drop for SamplerState {
    fn drop(&mut self) {
        if let Some(id) = self.listener.lock().take() {
            self.device.events().remove_listener(id);
        }
    }
}

static_assertions::assert_impl_all!(SamplerState: Send, Sync);
