//! wgpu compute engine.
//!
//! One lane per cell of the output matrix. The dataset is uploaded once per
//! call as a flat row-major `f64` buffer, the output lives only in device
//! memory until it is copied into a staging buffer and read back.

use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;
use std::time::{Duration, Instant};

use bytemuck::{Pod, Zeroable};
use log::{debug, error, info};
use wgpu::util::DeviceExt;

use crate::dataset::VectorSet;
use crate::engine::DistanceEngine;
use crate::error::{Error, Result};
use crate::matrix::DistanceMatrix;

const WORKGROUP_SIZE: u32 = 256;

const SHADER_SOURCE: &str = include_str!("../shaders/cosine_distance.wgsl");

/// Uniform block read by the shader. Layout matches `Params` in the WGSL.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Params {
    n: u32,
    dim: u32,
    lanes_per_row: u32,
    _pad: u32,
}

#[derive(Debug, Clone)]
pub struct GpuOptions {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// A device buffer that is destroyed when dropped.
///
/// Every allocation made by [`GpuEngine::compute`] goes through this guard,
/// so buffers acquired before a failure are released on the early return.
struct DeviceBuffer(wgpu::Buffer);

impl Deref for DeviceBuffer {
    type Target = wgpu::Buffer;

    fn deref(&self) -> &wgpu::Buffer {
        &self.0
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        self.0.destroy();
    }
}

/// Workgroup counts for a dispatch of `lanes` lanes.
///
/// Counts above the per-dimension limit spill into the y dimension; the
/// shader rebuilds the flat index as `gid.y * lanes_per_row + gid.x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DispatchGrid {
    x: u32,
    y: u32,
}

impl DispatchGrid {
    fn new(lanes: u32, max_per_dimension: u32) -> Self {
        let groups = lanes.div_ceil(WORKGROUP_SIZE).max(1);
        let x = groups.min(max_per_dimension);
        let y = groups.div_ceil(x);
        Self { x, y }
    }

    fn lanes_per_row(self) -> u32 {
        self.x * WORKGROUP_SIZE
    }
}

pub struct GpuEngine {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    setup: Duration,
    name: String,
}

impl GpuEngine {
    /// Acquires an f64-capable adapter and compiles the compute pipeline.
    pub async fn new(options: GpuOptions) -> Result<Self> {
        let start = Instant::now();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: options.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(Error::NoAdapter)?;

        let info = adapter.get_info();
        if !adapter.features().contains(wgpu::Features::SHADER_F64) {
            return Err(Error::UnsupportedDevice(format!(
                "{} ({:?}) has no 64-bit float shader support",
                info.name, info.backend
            )));
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Cosine Distance Device"),
                    required_features: wgpu::Features::SHADER_F64,
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;
        info!("using adapter {} ({:?}, {:?})", info.name, info.backend, info.device_type);

        // Errors outside an error scope would otherwise panic inside wgpu.
        device.on_uncaptured_error(Box::new(|err: wgpu::Error| error!("uncaptured wgpu error: {err}")));

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cosine Distance Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SHADER_SOURCE)),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Cosine Distance Bind Group Layout"),
            entries: &[
                storage_entry(0, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(2, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cosine Distance Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Cosine Distance Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
            cache: None,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        if let Some(err) = device.pop_error_scope().await {
            return Err(Error::UnsupportedDevice(format!(
                "failed to build compute pipeline: {err}"
            )));
        }

        let setup = start.elapsed();
        debug!("gpu: device and pipeline ready in {setup:?}");

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            setup,
            name: format!("GPU ({})", info.name),
        })
    }

    /// Computes the full distance matrix on the device.
    pub async fn compute(&self, set: &VectorSet) -> Result<DistanceMatrix> {
        let n = set.len();
        if n == 0 {
            return Ok(DistanceMatrix::zeros(0));
        }

        let cells = n
            .checked_mul(n)
            .and_then(|cells| u32::try_from(cells).ok())
            .ok_or_else(|| {
                Error::ResourceAcquisition(format!("{n} vectors exceed the lane index range"))
            })?;

        let input_size = byte_size(set.as_flat().len());
        let output_size = byte_size(cells as usize);
        let limits = self.device.limits();
        for (label, size) in [("input", input_size), ("output", output_size)] {
            if size > u64::from(limits.max_storage_buffer_binding_size)
                || size > limits.max_buffer_size
            {
                return Err(Error::ResourceAcquisition(format!(
                    "{label} buffer of {size} bytes exceeds device limits"
                )));
            }
        }

        let grid = DispatchGrid::new(cells, limits.max_compute_workgroups_per_dimension);
        let params = Params {
            n: n as u32,
            dim: set.dim() as u32,
            lanes_per_row: grid.lanes_per_row(),
            _pad: 0,
        };
        debug!(
            "gpu: {} lanes, grid {}x{} workgroups, {} input bytes, {} output bytes",
            cells, grid.x, grid.y, input_size, output_size
        );

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        // Host -> device.
        let input_buffer = DeviceBuffer(self.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Vector Buffer"),
                contents: bytemuck::cast_slice(set.as_flat()),
                usage: wgpu::BufferUsages::STORAGE,
            },
        ));

        let params_buffer = DeviceBuffer(self.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Params Buffer"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            },
        ));

        // Allocate directly on the device.
        let output_buffer = DeviceBuffer(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Distance Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        }));

        let staging_buffer = DeviceBuffer(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cosine Distance Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Cosine Distance Command Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Cosine Distance Compute Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(grid.x, grid.y, 1);
        }

        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, output_size);
        self.queue.submit(Some(encoder.finish()));

        let validation = self.device.pop_error_scope().await;
        let out_of_memory = self.device.pop_error_scope().await;
        if let Some(err) = out_of_memory.or(validation) {
            return Err(Error::ResourceAcquisition(err.to_string()));
        }

        // Device -> host.
        let slice = staging_buffer.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match receiver.receive().await {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                return Err(Error::ResourceAcquisition(format!(
                    "failed to map staging buffer: {err}"
                )))
            }
            None => {
                return Err(Error::ResourceAcquisition(
                    "staging buffer mapping was dropped".into(),
                ))
            }
        }

        let distances = {
            let data = slice.get_mapped_range();
            let values: &[f64] = bytemuck::try_cast_slice(&data).map_err(|err| {
                Error::ResourceAcquisition(format!("unreadable staging buffer: {err}"))
            })?;
            values.to_vec()
        };
        staging_buffer.unmap();

        // Release device memory before handing the host copy back.
        drop(bind_group);
        drop((input_buffer, params_buffer, output_buffer, staging_buffer));

        DistanceMatrix::from_vec(n, distances)
    }
}

impl DistanceEngine for GpuEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, set: &VectorSet) -> Result<DistanceMatrix> {
        pollster::block_on(self.compute(set))
    }

    fn setup_time(&self) -> Duration {
        self.setup
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn byte_size(elements: usize) -> u64 {
    (elements * std::mem::size_of::<f64>()) as u64
}

/// One adapter as reported by [`list_adapters`].
#[derive(Debug, Clone)]
pub struct AdapterSummary {
    pub info: wgpu::AdapterInfo,
    pub shader_f64: bool,
}

impl fmt::Display for AdapterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:?}, {:?}] vendor {:#06x} device {:#06x}, driver {} {}, f64 {}",
            self.info.name,
            self.info.backend,
            self.info.device_type,
            self.info.vendor,
            self.info.device,
            self.info.driver,
            self.info.driver_info,
            if self.shader_f64 { "yes" } else { "no" }
        )
    }
}

/// Enumerates every adapter visible through `backends`.
pub fn list_adapters(backends: wgpu::Backends) -> Vec<AdapterSummary> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    });
    instance
        .enumerate_adapters(backends)
        .into_iter()
        .map(|adapter| AdapterSummary {
            info: adapter.get_info(),
            shader_f64: adapter.features().contains(wgpu::Features::SHADER_F64),
        })
        .collect()
}
