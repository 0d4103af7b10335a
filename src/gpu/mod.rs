//! GPU device discovery and the double-buffered per-device pipeline
//! (spec §4.6, §9 open question 2: pool-based dispatcher).
//!
//! Grounded on `examples/original_source/src/gpu.cpp`'s
//! `gpu_context_t`/`gpu_t`/`gpu_pool_t` (one `cl_context` per platform
//! holding all of that platform's GPU devices, one queue per device, a
//! `gpu_pool_t::execute()` that spawns exactly one thread per device)
//! and on the teacher's own use of the `ocl` crate
//! (`src/miner.rs`'s `ProQue`/`Kernel`/`Buffer` builder idiom,
//! `unsafe { cmd.enq()? }` around kernel dispatch) generalized here from
//! a single fixed device to however many GPUs the host exposes.

pub mod kernel;
pub mod pool;

pub use pool::{DevicePool, DevicePoolConfig};

use crate::error::{FinderError, Result};
use ocl::{Context, Device, DeviceType, Platform, Queue};

/// One OpenCL device paired with the command queue the pool dispatches
/// on. Devices discovered under the same platform share a `Context`
/// (spec §4.6 "Discovery": "one context per platform, one command
/// queue per device"), but each `DeviceHandle` only needs its own
/// queue plus a clone of that shared context.
pub struct DeviceHandle {
    pub context: Context,
    pub queue: Queue,
    pub device: Device,
    pub name: String,
}

/// Enumerate every OpenCL platform, keep the GPU devices under it, and
/// build one context per platform and one command queue per device
/// (spec §4.6). Fails if zero GPU devices are found anywhere.
pub fn discover_devices() -> Result<Vec<DeviceHandle>> {
    let platforms = Platform::list();
    let mut handles = Vec::new();

    for platform in platforms {
        let devices = match Device::list(platform, Some(DeviceType::GPU)) {
            Ok(devices) if !devices.is_empty() => devices,
            Ok(_) => continue,
            Err(_) => continue, // platform advertises no GPU device support at all
        };

        let context = Context::builder()
            .platform(platform)
            .devices(devices.as_slice())
            .build()?;

        for device in devices {
            let queue = Queue::new(&context, device, None)?;
            let name = device.name().unwrap_or_else(|_| "<unknown device>".to_string());
            handles.push(DeviceHandle {
                context: context.clone(),
                queue,
                device,
                name,
            });
        }
    }

    if handles.is_empty() {
        return Err(FinderError::NoDevices(
            "GPU mode requested but no OpenCL GPU devices were found".to_string(),
        ));
    }

    Ok(handles)
}
