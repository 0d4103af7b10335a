//! The double-buffered producer/consumer pipeline itself (spec §4.6
//! "Pipeline": drain → prepare → dispatch → advance, repeated per
//! device until the host enumerator is exhausted, then one final drain
//! pass over every slot).
//!
//! Grounded on `examples/original_source/src/gpu.cpp`'s
//! `gpu_pool_t::execute()` (one thread per device, `check_results` then
//! `prepare_batch` then `execute_batch`, `current_buffer_index` cycling
//! through `num_buffers_per_device`) translated into the teacher's
//! `ocl` crate idiom (`src/miner.rs`'s builder-style `Kernel`/`Buffer`
//! construction, `unsafe { cmd.enq()? }` for kernel dispatch) instead of
//! raw `CL_*` FFI calls.

use std::sync::Mutex;

use ocl::{Buffer, Event, EventList, Kernel, MemFlags, Program};

use super::kernel;
use super::DeviceHandle;
use crate::enumerator::{self, Step};
use crate::error::{FinderError, Result};
use crate::pattern::Pattern;
use crate::progress::Progress;
use crate::sink::{Match, MatchSink};
use crate::target_index::{GpuBucketTable, TargetIndex};

/// Tunables carried in from the CLI (`-w`, `-m`) plus the slot count
/// (`K` in spec §4.6, hardcoded to 2 there but kept configurable here).
#[derive(Debug, Clone, Copy)]
pub struct DevicePoolConfig {
    pub work_size: usize,
    pub max_results: u32,
    pub num_slots: usize,
}

impl Default for DevicePoolConfig {
    fn default() -> Self {
        DevicePoolConfig {
            work_size: 1usize << 31,
            max_results: 1024,
            num_slots: 2,
        }
    }
}

/// The host-side enumerator state, mutex-guarded and shared by every
/// device worker thread (spec §4.6 "Mutex discipline": "the only
/// shared mutable state between device workers is the host
/// enumerator").
struct EnumState {
    counts: Vec<usize>,
    exhausted: bool,
}

/// Seed the next batch and advance the shared counter past it by
/// `work_size` (spec §4.3 "GPU striping"). Returns `None` once a prior
/// call has already walked the enumerator past its last combination —
/// there is nothing left for this device to dispatch.
fn prepare_batch(state: &Mutex<EnumState>, alphabet_len: usize, work_size: usize) -> Option<Vec<usize>> {
    let mut guard = state.lock().unwrap();
    if guard.exhausted {
        return None;
    }
    let initial_counts = guard.counts.clone();
    if enumerator::next(&mut guard.counts, work_size, alphabet_len) == Step::Exhausted {
        guard.exhausted = true;
    }
    Some(initial_counts)
}

/// One of a device's `K` rotating buffer sets (spec §3 "Slot",
/// "Batch Descriptor"). Buffers are allocated once and reused for
/// every batch cycled through this slot; only their contents change.
struct Slot {
    initial_counts_buf: Buffer<u64>,
    num_results_buf: Buffer<u32>,
    results_buf: Buffer<u64>,
    num_results_host: Vec<u32>,
    results_host: Vec<u64>,
    pending_reads: Option<EventList>,
    batch_initial_counts: Vec<usize>,
    batch_work_size: usize,
}

impl Slot {
    fn new(queue: &ocl::Queue, width: usize, max_results: usize) -> Result<Self> {
        let initial_counts_buf = Buffer::<u64>::builder()
            .queue(queue.clone())
            .flags(MemFlags::READ_ONLY)
            .len(width.max(1))
            .build()?;
        let num_results_buf = Buffer::<u32>::builder()
            .queue(queue.clone())
            .flags(MemFlags::READ_WRITE)
            .len(1)
            .build()?;
        let results_buf = Buffer::<u64>::builder()
            .queue(queue.clone())
            .flags(MemFlags::WRITE_ONLY)
            .len(max_results.max(1))
            .build()?;

        Ok(Slot {
            initial_counts_buf,
            num_results_buf,
            results_buf,
            num_results_host: vec![0u32; 1],
            results_host: vec![0u64; max_results.max(1)],
            pending_reads: None,
            batch_initial_counts: Vec::new(),
            batch_work_size: 0,
        })
    }
}

/// Prepare phase + dispatch phase (spec §4.6 steps 2–3): write this
/// batch's `initial_counts` and zeroed `num_results`, bind the slot's
/// buffers plus the shared bucket buffer as kernel args, enqueue the
/// kernel, then enqueue the asynchronous reads chained on kernel
/// completion.
fn dispatch(kernel: &mut Kernel, slot: &mut Slot, initial_counts: &[usize], work_size: usize) -> Result<()> {
    let counts_u64: Vec<u64> = initial_counts.iter().map(|&c| c as u64).collect();
    let zero_results = [0u32; 1];

    let mut write_counts_event = Event::empty();
    slot.initial_counts_buf
        .cmd()
        .write(&counts_u64)
        .block(false)
        .enew(&mut write_counts_event)
        .enq()?;

    let mut write_zero_event = Event::empty();
    slot.num_results_buf
        .cmd()
        .write(&zero_results[..])
        .block(false)
        .enew(&mut write_zero_event)
        .enq()?;

    let mut write_events = EventList::new();
    write_events.push(write_counts_event);
    write_events.push(write_zero_event);

    kernel.set_arg("initial_counts", &slot.initial_counts_buf)?;
    kernel.set_arg("num_results", &slot.num_results_buf)?;
    kernel.set_arg("results", &slot.results_buf)?;

    let mut kernel_event = Event::empty();
    unsafe {
        kernel
            .cmd()
            .global_work_size(work_size)
            .ewait(&write_events)
            .enew(&mut kernel_event)
            .enq()?;
    }

    let mut num_results_event = Event::empty();
    slot.num_results_buf
        .cmd()
        .read(&mut slot.num_results_host[..])
        .block(false)
        .ewait(&kernel_event)
        .enew(&mut num_results_event)
        .enq()?;

    let mut results_event = Event::empty();
    slot.results_buf
        .cmd()
        .read(&mut slot.results_host[..])
        .block(false)
        .ewait(&kernel_event)
        .enew(&mut results_event)
        .enq()?;

    let mut pending = EventList::new();
    pending.push(num_results_event);
    pending.push(results_event);
    slot.pending_reads = Some(pending);
    slot.batch_initial_counts = initial_counts.to_vec();
    slot.batch_work_size = work_size;

    Ok(())
}

/// Drain phase (spec §4.6 step 1): wait on a slot's pending reads (a
/// no-op the first time a slot is used), then turn every reported
/// work-item index back into a candidate, re-hash it on the CPU as a
/// safety check (spec §4.6 "Kernel contract", last paragraph), and
/// forward genuine matches to the sink.
fn drain(
    slot: &mut Slot,
    pattern: &Pattern,
    targets: &TargetIndex,
    progress: &Progress,
    sink: &dyn MatchSink,
    max_results: u32,
) -> Result<()> {
    let Some(pending) = slot.pending_reads.take() else {
        return Ok(());
    };
    pending.wait_for()?;

    let num_results = slot.num_results_host[0];
    if num_results >= max_results {
        log::warn!(
            "GPU batch hit its capacity of {max_results} results; some matches in this batch may be missing"
        );
    }
    let reported = (num_results as usize).min(slot.results_host.len());

    let mut candidate = pattern.hash_string.clone();
    for &g in &slot.results_host[..reported] {
        let mut counts = slot.batch_initial_counts.clone();
        if enumerator::next(&mut counts, g as usize, pattern.alphabet.len()) == Step::Exhausted {
            log::error!("GPU reported match index {g} that lies outside its batch range");
            continue;
        }
        enumerator::apply(
            &mut candidate,
            &counts,
            &pattern.alphabet,
            &pattern.primary_indices,
            &pattern.secondary_indices,
        );
        let digest = crate::hash::hash_full(&candidate);
        if targets.contains(digest) {
            sink.report(Match {
                digest,
                text: pattern.render_match(&candidate),
                label: targets.label_for_output(digest),
            });
        } else {
            log::error!(
                "GPU/CPU consistency mismatch: work-item {g} re-hashed to {digest:#x} on the \
                 CPU, which is not among the targets the device reported a bucket hit for"
            );
        }
    }

    progress.add(slot.batch_work_size as u64);
    Ok(())
}

/// One device's worker thread body: build its program and kernel for
/// this pattern, then run the drain/prepare/dispatch/advance cycle
/// until the shared enumerator is exhausted (spec §4.6 "Pipeline").
fn run_device(
    handle: &DeviceHandle,
    source: &str,
    bucket_table: &GpuBucketTable,
    state: &Mutex<EnumState>,
    pattern: &Pattern,
    targets: &TargetIndex,
    progress: &Progress,
    sink: &dyn MatchSink,
    config: &DevicePoolConfig,
) -> Result<()> {
    let width = pattern.wildcard_width();
    let alphabet_len = pattern.alphabet.len();

    let program = Program::builder()
        .devices(handle.device)
        .src(source)
        .build(&handle.context)
        .map_err(|e| FinderError::KernelBuild(e.to_string()))?;

    let mut kernel = Kernel::builder()
        .program(&program)
        .name(kernel::KERNEL_NAME)
        .queue(handle.queue.clone())
        .global_work_size(config.work_size)
        .arg_named("initial_counts", None::<&Buffer<u64>>)
        .arg_named("num_results", None::<&Buffer<u32>>)
        .arg_named("results", None::<&Buffer<u64>>)
        .arg_named("bucket_hashes", None::<&Buffer<u64>>)
        .build()?;

    let bucket_buf = Buffer::<u64>::builder()
        .queue(handle.queue.clone())
        .flags(MemFlags::READ_ONLY)
        .len(bucket_table.as_slice().len())
        .copy_host_slice(bucket_table.as_slice())
        .build()?;
    kernel.set_arg("bucket_hashes", &bucket_buf)?;

    let num_slots = config.num_slots.max(1);
    let mut slots = Vec::with_capacity(num_slots);
    for _ in 0..num_slots {
        slots.push(Slot::new(&handle.queue, width, config.max_results as usize)?);
    }

    let mut current = 0usize;
    loop {
        drain(&mut slots[current], pattern, targets, progress, sink, config.max_results)?;

        let Some(initial_counts) = prepare_batch(state, alphabet_len, config.work_size) else {
            break;
        };
        dispatch(&mut kernel, &mut slots[current], &initial_counts, config.work_size)?;

        current = (current + 1) % num_slots;
    }

    for slot in slots.iter_mut() {
        drain(slot, pattern, targets, progress, sink, config.max_results)?;
    }

    log::debug!("device '{}' finished its share of the search", handle.name);
    Ok(())
}

/// The GPU device pool: one worker thread per discovered device, all
/// sharing a single host-side enumerator (spec §4.6).
pub struct DevicePool {
    devices: Vec<DeviceHandle>,
}

impl DevicePool {
    pub fn discover() -> Result<Self> {
        Ok(DevicePool {
            devices: super::discover_devices()?,
        })
    }

    pub fn device_names(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.name.as_str()).collect()
    }

    /// Run the full GPU search for `pattern`, reporting matches against
    /// `targets` to `sink`. Blocks until every device has drained its
    /// last batch.
    pub fn search(
        &self,
        pattern: &Pattern,
        targets: &TargetIndex,
        progress: &Progress,
        sink: &dyn MatchSink,
        config: &DevicePoolConfig,
    ) -> Result<()> {
        if !pattern.has_wildcards() {
            // No wildcards: nothing to dispatch a kernel for.
            let digest = crate::hash::hash_full(&pattern.hash_string);
            progress.add(1);
            if targets.contains(digest) {
                sink.report(Match {
                    digest,
                    text: pattern.render_match(&pattern.hash_string),
                    label: targets.label_for_output(digest),
                });
            }
            return Ok(());
        }

        let bucket_table = targets.build_gpu_buckets();
        let source = kernel::generate_source(pattern, bucket_table.bucket_size(), config.max_results);
        let state = Mutex::new(EnumState {
            counts: vec![0usize; pattern.wildcard_width()],
            exhausted: false,
        });

        let outcomes: Vec<Result<()>> = std::thread::scope(|scope| {
            let joins: Vec<_> = self
                .devices
                .iter()
                .map(|device| {
                    scope.spawn(|| run_device(device, &source, &bucket_table, &state, pattern, targets, progress, sink, config))
                })
                .collect();
            joins.into_iter().map(|j| j.join().expect("GPU device worker thread panicked")).collect()
        });

        for outcome in outcomes {
            outcome?;
        }
        Ok(())
    }
}
