//! Batched cross-domain query dispatch.
//!
//! Protocol: upload a point array, dispatch the `scene_distance` kernel,
//! copy the results to a staging buffer, and complete through a channel
//! when the map-async callback fires. One batch may be outstanding at a
//! time; a second submission is rejected with `QueryError::BatchInFlight`
//! rather than silently dropped or raced. Dropping a pending batch before
//! completion has no effect on the volume.

use std::sync::Arc;

use bytemuck::{cast_slice, Zeroable};
use log::debug;
use wgpu::util::DeviceExt;
use wgpu::{BindGroupLayout, Buffer, ComputePipeline, Device, Queue};

use glam::Vec3;

use super::params::{GeometryParams, SceneParams};
use crate::config::TerrainConfig;
use crate::query::QueryError;
use crate::strata::LayerStack;
use crate::volume::DistanceVolume;

const WORKGROUP_SIZE: u32 = 64;
const BAKE_WORKGROUP: u32 = 4;

struct PendingBatch {
    staging: Buffer,
    point_count: usize,
    completion: flume::Receiver<Result<(), wgpu::BufferAsyncError>>,
}

/// Single-occupancy slot for the outstanding batch. At most one batch may
/// be in flight; occupying a full slot is an error, never a silent
/// replacement.
struct BatchSlot<T> {
    pending: Option<T>,
}

impl<T> Default for BatchSlot<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> BatchSlot<T> {
    fn occupy(&mut self, batch: T) -> Result<(), QueryError> {
        if self.pending.is_some() {
            return Err(QueryError::BatchInFlight);
        }
        self.pending = Some(batch);
        Ok(())
    }

    fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    fn put_back(&mut self, batch: T) {
        self.pending = Some(batch);
    }

    fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    fn clear(&mut self) {
        self.pending = None;
    }
}

/// GPU-side scene evaluator: owns the volume's device copy, the packed
/// layer stack, and the compute pipelines for baking and batched queries.
pub struct GpuQueryDispatch {
    device: Arc<Device>,
    queue: Arc<Queue>,
    bake_pipeline: ComputePipeline,
    query_pipeline: ComputePipeline,
    bind_group_layout: BindGroupLayout,
    scene_buffer: Buffer,
    layer_buffer: Buffer,
    volume_buffer: Buffer,
    /// Bound in bake dispatches where no point/result buffers exist.
    spare_buffer: Buffer,
    config: TerrainConfig,
    layer_count: u32,
    pending: BatchSlot<PendingBatch>,
}

impl GpuQueryDispatch {
    /// Acquire a compute-capable device and queue for callers that do not
    /// already own one (headless tools, the demo binary).
    pub fn request_device() -> Result<(Arc<Device>, Arc<Queue>), QueryError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or_else(|| QueryError::Dispatch("no compute adapter available".into()))?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Query Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| QueryError::Dispatch(format!("device request failed: {}", e)))?;
        Ok((Arc::new(device), Arc::new(queue)))
    }

    /// Build pipelines and upload the packed layer stack. The volume
    /// buffer starts empty; fill it with [`Self::upload_volume`] or a
    /// [`Self::dispatch_bake`].
    pub fn new(
        device: Arc<Device>,
        queue: Arc<Queue>,
        config: &TerrainConfig,
        stack: &LayerStack,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Distance Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene_distance.wgsl").into()),
        });

        let bind_group_layout = create_bind_group_layout(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Distance Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let bake_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Bake Layers Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "bake_layers",
        });
        let query_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Scene Distance Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "scene_distance",
        });

        // Packed layers; storage buffers cannot be empty, so an empty
        // stack uploads one zeroed entry with layer_count = 0.
        let mut packed: Vec<GeometryParams> = stack
            .placed()
            .iter()
            .map(|layer| GeometryParams::from(&layer.geometry))
            .collect();
        let layer_count = packed.len() as u32;
        if packed.is_empty() {
            packed.push(GeometryParams::zeroed());
        }
        let layer_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Layer Params"),
            contents: cast_slice(&packed),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Params"),
            size: std::mem::size_of::<SceneParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let resolution = config.resolution();
        let voxel_count = (resolution.x * resolution.y * resolution.z) as u64;
        let volume_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Distance Volume"),
            size: voxel_count * std::mem::size_of::<f32>() as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let spare_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Spare Binding"),
            size: 16,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            bake_pipeline,
            query_pipeline,
            bind_group_layout,
            scene_buffer,
            layer_buffer,
            volume_buffer,
            spare_buffer,
            config: config.clone(),
            layer_count,
            pending: BatchSlot::default(),
        }
    }

    /// Copy the CPU volume's level 0 into the device buffer.
    pub fn upload_volume(&self, volume: &DistanceVolume) {
        self.queue
            .write_buffer(&self.volume_buffer, 0, cast_slice(volume.level0()));
    }

    /// Bake the layer stack on the GPU, one thread per voxel. The device
    /// buffer afterwards holds the same scene SDF the CPU bake produces.
    pub fn dispatch_bake(&self) {
        self.write_scene_params(0);
        let bind_group = self.create_bind_group(&self.spare_buffer, &self.spare_buffer);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Bake Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Bake Layers Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.bake_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let res = self.config.resolution();
            pass.dispatch_workgroups(
                res.x.div_ceil(BAKE_WORKGROUP),
                res.y.div_ceil(BAKE_WORKGROUP),
                res.z.div_ceil(BAKE_WORKGROUP),
            );
        }
        self.queue.submit(Some(encoder.finish()));
    }

    /// Whether a batch is currently outstanding.
    pub fn batch_in_flight(&self) -> bool {
        self.pending.in_flight()
    }

    /// Submit a batch of query points. Rejected while another batch is
    /// outstanding; results arrive through [`Self::try_recv`].
    pub fn submit(&mut self, query_points: &[Vec3]) -> Result<(), QueryError> {
        if self.pending.in_flight() {
            return Err(QueryError::BatchInFlight);
        }
        if query_points.is_empty() {
            return Err(QueryError::Dispatch("empty query batch".into()));
        }

        let padded: Vec<[f32; 4]> = query_points
            .iter()
            .map(|p| [p.x, p.y, p.z, 0.0])
            .collect();
        let point_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Query Points"),
                contents: cast_slice(&padded),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let result_size = (query_points.len() * std::mem::size_of::<f32>()) as u64;
        let result_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Query Results"),
            size: result_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Query Staging"),
            size: result_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.write_scene_params(query_points.len() as u32);
        let bind_group = self.create_bind_group(&point_buffer, &result_buffer);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Query Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Scene Distance Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.query_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                (query_points.len() as u32).div_ceil(WORKGROUP_SIZE),
                1,
                1,
            );
        }
        encoder.copy_buffer_to_buffer(&result_buffer, 0, &staging, 0, result_size);
        self.queue.submit(Some(encoder.finish()));

        let (tx, rx) = flume::bounded(1);
        staging
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });

        debug!("submitted query batch of {} points", query_points.len());
        self.pending.occupy(PendingBatch {
            staging,
            point_count: query_points.len(),
            completion: rx,
        })
    }

    /// Poll the outstanding batch. `None` while still in flight; readback
    /// failures surface as the completion's error variant, and the caller
    /// treats them as misses.
    pub fn try_recv(&mut self) -> Option<Result<Vec<f32>, QueryError>> {
        let batch = self.pending.take()?;
        self.device.poll(wgpu::Maintain::Poll);

        match batch.completion.try_recv() {
            Ok(Ok(())) => {
                let distances = {
                    let view = batch.staging.slice(..).get_mapped_range();
                    cast_slice::<u8, f32>(&view).to_vec()
                };
                batch.staging.unmap();
                debug_assert_eq!(distances.len(), batch.point_count);
                Some(Ok(distances))
            }
            Ok(Err(e)) => Some(Err(QueryError::Readback(e.to_string()))),
            Err(_) => {
                // Still in flight; keep waiting.
                self.pending.put_back(batch);
                None
            }
        }
    }

    /// Drop the outstanding batch without reading it. Safe at any time;
    /// the volume is untouched by queries.
    pub fn cancel(&mut self) {
        self.pending.clear();
    }

    fn write_scene_params(&self, point_count: u32) {
        let params = SceneParams::new(&self.config, self.layer_count, point_count);
        self.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&params));
    }

    fn create_bind_group(&self, points: &Buffer, results: &Buffer) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Distance Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.scene_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.layer_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.volume_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: points.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: results.as_entire_binding(),
                },
            ],
        })
    }
}

fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
    let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Scene Distance Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            storage_entry(1, true),
            storage_entry(2, false),
            storage_entry(3, true),
            storage_entry(4, false),
        ],
    })
}
