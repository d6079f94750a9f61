//! End-to-end device lifecycle scenarios against the in-process substrate.

use std::path::PathBuf;
use std::sync::Arc;

use rstest::rstest;

use vermilion_graphics::config::StaticConfig;
use vermilion_graphics::driver::dummy::{DummyAdapterConfig, DummyDriver};
use vermilion_graphics::types::{Region, SoftwareDeviceKind};
use vermilion_graphics::{
    DeviceManager, Extent2d, GraphicsError, SamplerDescriptor, VendorFilter,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn manager(driver: Arc<DummyDriver>, preferred: &str) -> Arc<DeviceManager> {
    DeviceManager::create(driver, Arc::new(StaticConfig::new(false)), preferred).unwrap()
}

// Minimal valid QOI stream: a single RGBA pixel.
fn qoi_1x1(r: u8, g: u8, b: u8, a: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"qoif");
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.push(4);
    bytes.push(0);
    bytes.push(0xFF);
    bytes.extend_from_slice(&[r, g, b, a]);
    bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1]);
    bytes
}

fn write_temp_image(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("vermilion-{}-{}.qoi", name, std::process::id()));
    std::fs::write(&path, qoi_1x1(255, 0, 0, 255)).unwrap();
    path
}

#[test]
fn preferred_adapter_wins_over_enumeration_order() {
    init_logging();
    let driver = DummyDriver::builder()
        .adapter(DummyAdapterConfig::hardware("Integrated"))
        .adapter(DummyAdapterConfig::hardware("Discrete"))
        .build();

    let device = manager(driver, "Discrete");
    assert_eq!(device.adapter_name().as_deref(), Some("Discrete"));
    assert_eq!(device.adapter_names(), ["Integrated", "Discrete"]);
}

#[test]
fn vendor_filter_probe_applies_to_selection() {
    init_logging();
    // Unfiltered enumeration hides the preferred adapter behind index 1;
    // only the NVIDIA policy surfaces it first.
    let driver = DummyDriver::builder()
        .adapter(DummyAdapterConfig::hardware("Integrated"))
        .adapter(DummyAdapterConfig::hardware("Discrete").with_vendor_id(0x10DE))
        .ordering(VendorFilter::NVIDIA, vec![1, 0])
        .build();

    let device = manager(driver, "Discrete");
    assert_eq!(device.adapter_name().as_deref(), Some("Discrete"));
    assert_eq!(device.adapter_names(), ["Discrete", "Integrated"]);
}

#[test]
fn empty_preference_picks_first_adapter_and_reports_tearing() {
    init_logging();
    let driver = DummyDriver::builder()
        .adapter(DummyAdapterConfig::hardware("Only"))
        .tearing(false)
        .build();

    let device = manager(driver, "");
    assert_eq!(device.adapter_name().as_deref(), Some("Only"));
    assert!(!device.supports_tearing());
    assert!(device.feature_level().is_some());
}

#[rstest]
#[case(SoftwareDeviceKind::Reference, "reference rasterizer")]
#[case(SoftwareDeviceKind::Software, "software rasterizer")]
#[case(
    SoftwareDeviceKind::HighPerformance,
    "high-performance software rasterizer"
)]
fn software_fallback_reports_kind(#[case] kind: SoftwareDeviceKind, #[case] name: &str) {
    init_logging();
    let driver = DummyDriver::builder()
        .adapter(DummyAdapterConfig::software("Rasterizer"))
        .software_kind(kind)
        .build();

    let device =
        DeviceManager::create(driver, Arc::new(StaticConfig::new(true)), "").unwrap();
    assert_eq!(device.adapter_name().as_deref(), Some(name));
}

#[test]
fn software_fallback_denied_without_allowance() {
    init_logging();
    let driver = DummyDriver::builder()
        .adapter(DummyAdapterConfig::software("Rasterizer"))
        .build();

    let result = DeviceManager::create(driver, Arc::new(StaticConfig::new(false)), "");
    assert!(matches!(result, Err(GraphicsError::NoAdapterAvailable)));
}

#[test]
fn resources_survive_repeated_rebuilds_without_leaks() {
    init_logging();
    let driver = DummyDriver::single_adapter();
    let device = manager(driver.clone(), "");

    let texture = device.create_texture(Extent2d::new(64, 64)).unwrap();
    let target = device.create_render_target(Extent2d::new(320, 240)).unwrap();
    let depth = device.create_depth_stencil_buffer(Extent2d::new(320, 240)).unwrap();
    let sampler = device.create_sampler_state(SamplerDescriptor::linear()).unwrap();

    let counters = driver.live_counters();
    // One dynamic texture plus the render target's backing texture.
    assert_eq!(counters.textures(), 2);
    assert_eq!(counters.render_target_views(), 1);
    assert_eq!(counters.depth_stencils(), 1);
    assert_eq!(counters.samplers(), 1);
    assert_eq!(counters.drawing_bitmaps(), 1);

    for _ in 0..5 {
        device.recreate().unwrap();

        // Descriptive state is unchanged and handles are live again.
        assert_eq!(texture.size(), Extent2d::new(64, 64));
        assert_eq!(target.size(), Extent2d::new(320, 240));
        assert_eq!(depth.size(), Extent2d::new(320, 240));
        assert!(!texture.native_handle().is_null());
        assert!(!target.native_view_handle().is_null());
        assert!(!target.native_bitmap_handle().is_null());
        assert!(!depth.native_handle().is_null());
        assert!(!sampler.native_handle().is_null());

        // Rebuilds are idempotent: nothing accumulates.
        assert_eq!(counters.textures(), 2);
        assert_eq!(counters.render_target_views(), 1);
        assert_eq!(counters.depth_stencils(), 1);
        assert_eq!(counters.samplers(), 1);
        assert_eq!(counters.drawing_bitmaps(), 1);
    }

    drop(texture);
    drop(target);
    drop(depth);
    drop(sampler);
    assert_eq!(counters.textures(), 0);
    assert_eq!(counters.render_target_views(), 0);
    assert_eq!(counters.depth_stencils(), 0);
    assert_eq!(counters.samplers(), 0);
    assert_eq!(counters.drawing_bitmaps(), 0);
}

#[test]
fn device_loss_recovery_revalidates_handles() {
    init_logging();
    let driver = DummyDriver::single_adapter();
    let device = manager(driver.clone(), "");

    let texture = device.create_texture(Extent2d::new(32, 32)).unwrap();
    let data = vec![0xFFu8; 32 * 32 * 4];
    texture.upload(Region::new(0, 0, 32, 32), &data, 32 * 4).unwrap();

    let device_handle = device.native_device_handle();
    let texture_handle = texture.native_handle();

    driver.trigger_device_loss("simulated driver reset");
    device.handle_device_lost().unwrap();

    assert!(device.is_live());
    assert_ne!(device.native_device_handle(), device_handle);
    // The texture was rebuilt on the new device.
    let rebuilt = texture.native_handle();
    assert!(!rebuilt.is_null());
    assert_ne!(rebuilt, texture_handle);
    // And accepts uploads again.
    texture.upload(Region::new(0, 0, 32, 32), &data, 32 * 4).unwrap();
}

#[test]
fn file_texture_round_trips_through_codec_chain() {
    init_logging();
    let path = write_temp_image("file-texture");
    let device = manager(DummyDriver::single_adapter(), "");

    let texture = device.create_texture_from_file(&path, false).unwrap();
    assert_eq!(texture.size(), Extent2d::new(1, 1));
    assert!(!texture.is_dynamic());
    assert!(!texture.native_handle().is_null());

    // Rebuild re-reads the file; descriptive state is unchanged.
    device.recreate().unwrap();
    assert_eq!(texture.size(), Extent2d::new(1, 1));
    assert!(!texture.native_handle().is_null());

    std::fs::remove_file(&path).ok();
}

#[test]
fn missing_file_fails_texture_construction() {
    init_logging();
    let device = manager(DummyDriver::single_adapter(), "");
    let result = device.create_texture_from_file("/nonexistent/missing.png", false);
    assert!(matches!(result, Err(GraphicsError::Io { .. })));
}

#[test]
fn undecodable_file_reports_combined_codec_error() {
    init_logging();
    let path = std::env::temp_dir().join(format!("vermilion-garbage-{}.bin", std::process::id()));
    std::fs::write(&path, b"definitely not an image").unwrap();

    let device = manager(DummyDriver::single_adapter(), "");
    let err = match device.create_texture_from_file(&path, false) {
        Err(err) => err,
        Ok(_) => panic!("garbage bytes must not decode"),
    };
    let message = err.to_string();
    assert!(matches!(err, GraphicsError::DecodeFailed(_)));
    assert!(message.contains("container:"));
    assert!(message.contains("generic:"));
    assert!(message.contains("compact:"));

    std::fs::remove_file(&path).ok();
}

#[test]
fn static_texture_rejects_resize_and_keeps_handle() {
    init_logging();
    let path = write_temp_image("static-resize");
    let device = manager(DummyDriver::single_adapter(), "");

    let texture = device.create_texture_from_file(&path, false).unwrap();
    let handle = texture.native_handle();

    let result = texture.set_size(Extent2d::new(128, 128));
    assert!(matches!(result, Err(GraphicsError::InvalidOperation(_))));
    // The rejection happens before any handle is touched.
    assert_eq!(texture.native_handle(), handle);
    assert_eq!(texture.size(), Extent2d::new(1, 1));

    std::fs::remove_file(&path).ok();
}

#[test]
fn dynamic_texture_resizes_and_uploads() {
    init_logging();
    let driver = DummyDriver::single_adapter();
    let device = manager(driver.clone(), "");

    let texture = device.create_texture(Extent2d::new(16, 16)).unwrap();
    texture.set_size(Extent2d::new(64, 64)).unwrap();
    assert_eq!(texture.size(), Extent2d::new(64, 64));
    assert_eq!(driver.live_counters().textures(), 1);

    let data = vec![0u8; 8 * 8 * 4];
    texture.upload(Region::new(0, 0, 8, 8), &data, 8 * 4).unwrap();
    // Out-of-bounds regions are rejected.
    assert!(texture
        .upload(Region::new(60, 60, 8, 8), &data, 8 * 4)
        .is_err());
}

#[test]
fn render_target_resize_recreates_backing_texture() {
    init_logging();
    let driver = DummyDriver::single_adapter();
    let device = manager(driver.clone(), "");

    let target = device.create_render_target(Extent2d::new(640, 480)).unwrap();
    assert!(target.texture().is_premultiplied_alpha());
    let view = target.native_view_handle();

    target.set_size(Extent2d::new(1280, 720)).unwrap();
    assert_eq!(target.size(), Extent2d::new(1280, 720));
    assert_ne!(target.native_view_handle(), view);
    assert_eq!(driver.live_counters().textures(), 1);
    assert_eq!(driver.live_counters().render_target_views(), 1);
    assert_eq!(driver.live_counters().drawing_bitmaps(), 1);
}

#[test]
fn dropping_resources_during_dispatch_is_safe() {
    init_logging();
    let device = manager(DummyDriver::single_adapter(), "");

    // A listener that drops another registered resource mid-dispatch, which
    // re-enters the dispatcher's removal path.
    struct DropOnDestroy {
        victim: parking_lot::Mutex<Option<Arc<vermilion_graphics::Texture2D>>>,
    }
    impl vermilion_graphics::DeviceEventListener for DropOnDestroy {
        fn on_device_destroy(&self) {
            self.victim.lock().take();
        }
        fn on_device_create(&self) {}
    }

    let victim = device.create_texture(Extent2d::new(8, 8)).unwrap();
    let survivor = device.create_texture(Extent2d::new(8, 8)).unwrap();
    let dropper = Arc::new(DropOnDestroy {
        victim: parking_lot::Mutex::new(Some(victim)),
    });
    device.events().add_listener(
        Arc::downgrade(&dropper) as std::sync::Weak<dyn vermilion_graphics::DeviceEventListener>
    );

    device.recreate().unwrap();
    assert!(dropper.victim.lock().is_none());
    assert!(!survivor.native_handle().is_null());
}

#[test]
fn factory_validation_keeps_resources_intact() {
    init_logging();
    let driver = DummyDriver::single_adapter();
    let device = manager(driver.clone(), "");
    let texture = device.create_texture(Extent2d::new(8, 8)).unwrap();
    let handle = texture.native_handle();

    driver.invalidate_factories();
    device.validate_factory().unwrap();

    // Factory replacement is not a rebuild; nothing was recreated.
    assert_eq!(texture.native_handle(), handle);
}

#[test]
fn failed_recreate_leaves_manager_without_session() {
    init_logging();
    let driver = DummyDriver::single_adapter();
    let device = manager(driver.clone(), "");
    let texture = device.create_texture(Extent2d::new(16, 16)).unwrap();

    driver.fail_next_device_creates(1);
    assert!(device.recreate().is_err());

    // The old session was torn down and no new one came up.
    assert!(!device.is_live());
    assert!(device.adapter_name().is_none());
    assert!(device.native_device_handle().is_null());
    assert!(texture.native_handle().is_null());

    // A later attempt recovers fully, resources included.
    device.recreate().unwrap();
    assert!(device.is_live());
    assert!(!texture.native_handle().is_null());
}

#[test]
fn resource_creation_failure_is_local() {
    init_logging();
    let driver = DummyDriver::single_adapter();
    let device = manager(driver.clone(), "");

    driver.fail_next_texture_creates(1);
    assert!(device.create_texture(Extent2d::new(8, 8)).is_err());
    // The manager is unaffected and the next creation succeeds.
    assert!(device.is_live());
    assert!(device.create_texture(Extent2d::new(8, 8)).is_ok());
}
