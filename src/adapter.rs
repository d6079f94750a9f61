//! Adapter enumeration, selection, and vendor-filter policy probing.

use std::sync::Arc;

use crate::driver::{NativeAdapter, NativeDriver, NativeFactory};
use crate::error::{report_native_error, GraphicsError, GraphicsResult};
use crate::types::{format_byte_size, AdapterDesc, FeatureLevel, VendorFilter};

/// Result of a successful adapter selection pass.
pub struct AdapterSelection {
    /// The chosen adapter.
    pub adapter: Arc<dyn NativeAdapter>,
    /// The chosen adapter's description.
    pub desc: AdapterDesc,
    /// Feature level the chosen adapter probed at.
    pub feature_level: FeatureLevel,
    /// Names of every candidate adapter seen during this pass, in
    /// enumeration order. Retained for diagnostics and UI.
    pub candidate_names: Vec<String>,
}

struct Candidate {
    adapter: Arc<dyn NativeAdapter>,
    desc: AdapterDesc,
    feature_level: FeatureLevel,
    has_output: bool,
}

/// Select a hardware adapter from the factory's enumeration.
///
/// Every enumerated adapter is probed for minimal device viability and fully
/// described in the log. A candidate is an adapter that is viable, not a
/// software rasterizer, and not remote. The adapter whose name exactly
/// matches `preferred_name` wins; otherwise the first candidate does. With
/// no candidates at all, returns [`GraphicsError::NoAdapterAvailable`].
pub fn select_adapter(
    factory: &dyn NativeFactory,
    preferred_name: &str,
) -> GraphicsResult<AdapterSelection> {
    let mut candidates: Vec<Candidate> = Vec::new();

    for (index, adapter) in factory.enumerate_adapters().into_iter().enumerate() {
        let feature_level = match adapter.probe_feature_level() {
            Ok(level) => Some(level),
            Err(e) => {
                log::info!("adapter [{}]: minimal device creation failed: {}", index, e);
                None
            }
        };

        let desc = match adapter.describe() {
            Ok(desc) => desc,
            Err(e) => {
                report_native_error("NativeAdapter::describe", &e);
                continue;
            }
        };

        log::info!(
            "adapter [{}] {} ({}{})",
            index,
            desc.name,
            desc.kind_str(),
            match feature_level {
                Some(level) => format!(", feature level {}", level.as_str()),
                None => ", not viable".to_string(),
            }
        );
        log::info!(
            "    video memory: {} dedicated, {} shared",
            format_byte_size(desc.dedicated_video_memory),
            format_byte_size(desc.shared_system_memory)
        );
        log::info!(
            "    vendor 0x{:04X} device 0x{:04X} subsystem 0x{:04X} revision {} LUID 0x{:016X}",
            desc.vendor_id,
            desc.device_id,
            desc.subsystem_id,
            desc.revision,
            desc.luid
        );

        // Output enumeration is best-effort; failure degrades reporting only.
        let has_output = match adapter.enumerate_outputs() {
            Ok(outputs) => {
                for (output_index, output) in outputs.iter().enumerate() {
                    log::info!(
                        "    output [{}] {} at ({}, {}) size {}x{} rotation {}{}",
                        output_index,
                        output.name,
                        output.position.0,
                        output.position.1,
                        output.size.width,
                        output.size.height,
                        output.rotation.as_str(),
                        if output.attached_to_desktop {
                            ""
                        } else {
                            " (detached)"
                        }
                    );
                }
                !outputs.is_empty()
            }
            Err(e) => {
                log::info!("    output enumeration failed: {}", e);
                false
            }
        };

        let Some(feature_level) = feature_level else {
            continue;
        };
        if desc.is_software_or_remote() {
            continue;
        }
        candidates.push(Candidate {
            adapter,
            desc,
            feature_level,
            has_output,
        });
    }

    if candidates.is_empty() {
        log::error!("no compatible hardware adapter found");
        return Err(GraphicsError::NoAdapterAvailable);
    }

    let candidate_names: Vec<String> = candidates.iter().map(|c| c.desc.name.clone()).collect();

    let position = if preferred_name.is_empty() {
        0
    } else {
        match candidates.iter().position(|c| c.desc.name == preferred_name) {
            Some(position) => position,
            None => {
                log::warn!(
                    "preferred adapter '{}' not found, falling back to '{}'",
                    preferred_name,
                    candidates[0].desc.name
                );
                0
            }
        }
    };
    let chosen = candidates.swap_remove(position);

    if !chosen.has_output {
        log::warn!(
            "adapter '{}' has no attached display output, presentation may be degraded",
            chosen.desc.name
        );
    }
    log::info!("selected adapter '{}'", chosen.desc.name);

    Ok(AdapterSelection {
        adapter: chosen.adapter,
        desc: chosen.desc,
        feature_level: chosen.feature_level,
        candidate_names,
    })
}

/// Resolve the vendor filter to use for the next enumeration pass.
///
/// Some enumeration backends apply vendor-specific policies that reorder or
/// hide adapters. This probes filter combinations in a fixed order and keeps
/// the first one under which the preferred adapter comes up first; if none
/// does, filtering stays disabled. An empty preference skips the probe
/// entirely.
///
/// Runs before every enumeration, initial creation and rebuilds alike, so a
/// changed system adapter set re-resolves the policy.
pub fn resolve_vendor_filter(driver: &dyn NativeDriver, preferred_name: &str) -> VendorFilter {
    if preferred_name.is_empty() {
        return VendorFilter::NONE;
    }

    const STAGES: [VendorFilter; 4] = [
        VendorFilter::NONE,
        VendorFilter::ALL,
        VendorFilter::NVIDIA,
        VendorFilter::AMD,
    ];

    for filter in STAGES {
        match first_adapter_name(driver, filter) {
            Ok(Some(name)) if name == preferred_name => {
                log::info!(
                    "vendor filter '{}' puts preferred adapter '{}' first",
                    filter,
                    preferred_name
                );
                return filter;
            }
            Ok(_) => {}
            Err(e) => {
                report_native_error("NativeDriver::create_factory", &e);
            }
        }
    }

    log::info!(
        "no vendor filter puts preferred adapter '{}' first, filtering disabled",
        preferred_name
    );
    VendorFilter::NONE
}

fn first_adapter_name(
    driver: &dyn NativeDriver,
    filter: VendorFilter,
) -> GraphicsResult<Option<String>> {
    let factory = driver.create_factory(filter)?;
    let adapters = factory.enumerate_adapters();
    match adapters.first() {
        Some(adapter) => Ok(Some(adapter.describe()?.name)),
        None => Ok(None),
    }
}
