//! Compute-shader execution of the per-body phases.
//!
//! Only `predict` and `regularize` run on the device: they read nothing but
//! the body they update. Bodies are uploaded, dispatched one invocation per
//! body and read back every phase, so constraint generators keep seeing
//! ordinary host [`Body`] values.

use std::borrow::Cow;

use cgmath::Vector3;
use log::{debug, info};
use wgpu::util::DeviceExt;

use crate::body::Body;
use crate::coords::GenVec;
use crate::error::{SimError, SimResult};
use crate::model::BodyPhases;

const WORKGROUP_SIZE: u32 = 64;

const KIND_AFFINE: u32 = 0;
const KIND_RIGID: u32 = 1;

/// Device copy of one body. Rigid bodies use the first 7 slots of each
/// coordinate array.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuBody {
    pub kind: u32,
    pub mass: [f32; 4],
    pub x: [f32; 12],
    pub x0: [f32; 12],
    pub xdot_init: [f32; 12],
    pub x1: [f32; 12],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    gravity: [f32; 3],
    hs: f32,
    step: u32,
    substep: u32,
    count: u32,
    _pad: u32,
}

fn pad<const N: usize>(v: &GenVec<N>) -> [f32; 12] {
    let mut out = [0.0; 12];
    out[..N].copy_from_slice(v.as_slice());
    out
}

fn unpad<const N: usize>(v: &[f32; 12]) -> GenVec<N> {
    let mut out = GenVec::<N>::zero();
    out.set_segment(0, &v[..N]);
    out
}

impl From<&Body> for GpuBody {
    fn from(body: &Body) -> Self {
        match body {
            Body::Rigid(b) => GpuBody {
                kind: KIND_RIGID,
                mass: [b.mr.x, b.mr.y, b.mr.z, b.mp],
                x: pad(&b.state.x),
                x0: pad(&b.state.x0),
                xdot_init: pad(&b.state.xdot_init),
                x1: pad(&b.state.x1),
            },
            Body::Affine(b) => GpuBody {
                kind: KIND_AFFINE,
                mass: [b.wa.x, b.wa.y, b.wa.z, b.wp],
                x: pad(&b.state.x),
                x0: pad(&b.state.x0),
                xdot_init: pad(&b.state.xdot_init),
                x1: pad(&b.state.x1),
            },
        }
    }
}

/// Runs [`BodyPhases`] on a wgpu compute device.
pub struct GpuStepper {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    predict: wgpu::ComputePipeline,
    regularize: wgpu::ComputePipeline,
}

impl std::fmt::Debug for GpuStepper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuStepper").finish_non_exhaustive()
    }
}

impl GpuStepper {
    /// Picks the high-performance adapter and builds both pipelines.
    pub fn new() -> SimResult<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> SimResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or(SimError::GpuUnavailable)?;
        info!("selected GPU: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("apbd device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| SimError::GpuDevice(e.to_string()))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("body phases"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                "shaders/body_phases.wgsl"
            ))),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("body phases layout"),
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
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("body phases pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point,
                compilation_options: Default::default(),
            })
        };
        let predict = pipeline("predict");
        let regularize = pipeline("regularize");

        Ok(GpuStepper {
            device,
            queue,
            layout,
            predict,
            regularize,
        })
    }

    /// Uploads `bodies`, runs `pipeline` once per body and returns the
    /// device copies after the dispatch.
    fn dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        bodies: &[Body],
        params: Params,
    ) -> SimResult<Vec<GpuBody>> {
        let staged: Vec<GpuBody> = bodies.iter().map(GpuBody::from).collect();
        let size = std::mem::size_of_val(staged.as_slice()) as wgpu::BufferAddress;

        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let body_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("bodies"),
                contents: bytemuck::cast_slice(&staged),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            });
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bodies readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("body phases"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: body_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("body phases encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("body phases pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(params.count.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&body_buffer, 0, &readback, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| SimError::GpuReadback(e.to_string()))?
            .map_err(|e| SimError::GpuReadback(e.to_string()))?;

        let out = bytemuck::cast_slice::<u8, GpuBody>(&slice.get_mapped_range()).to_vec();
        readback.unmap();
        Ok(out)
    }
}

impl BodyPhases for GpuStepper {
    fn predict(
        &mut self,
        bodies: &mut [Body],
        step: u32,
        substep: u32,
        hs: f32,
        gravity: Vector3<f32>,
    ) -> SimResult<()> {
        if bodies.is_empty() {
            return Ok(());
        }
        let params = Params {
            gravity: gravity.into(),
            hs,
            step,
            substep,
            count: bodies.len() as u32,
            _pad: 0,
        };
        let out = self.dispatch(&self.predict, bodies, params)?;
        debug!("predicted {} bodies on the GPU", out.len());
        for (body, gb) in bodies.iter_mut().zip(&out) {
            match body {
                Body::Rigid(b) => {
                    b.state.x0 = unpad(&gb.x0);
                    b.state.accept_prediction(unpad(&gb.x1));
                }
                Body::Affine(b) => {
                    b.state.x0 = unpad(&gb.x0);
                    b.state.accept_prediction(unpad(&gb.x1));
                }
            }
        }
        Ok(())
    }

    fn regularize(&mut self, bodies: &mut [Body]) -> SimResult<()> {
        if bodies.is_empty() {
            return Ok(());
        }
        let params = Params {
            gravity: [0.0; 3],
            hs: 0.0,
            step: 0,
            substep: 0,
            count: bodies.len() as u32,
            _pad: 0,
        };
        let out = self.dispatch(&self.regularize, bodies, params)?;
        for (body, gb) in bodies.iter_mut().zip(&out) {
            match body {
                Body::Rigid(b) => b.state.x = unpad(&gb.x),
                Body::Affine(b) => b.state.x = unpad(&gb.x),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;

    #[test]
    fn device_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<GpuBody>(), 212);
        assert_eq!(std::mem::size_of::<Params>(), 32);
    }

    #[test]
    fn rigid_body_uses_leading_slots() {
        let body = Body::rigid(Shape::cuboid(Vector3::new(1.0, 2.0, 3.0)), 1.0).unwrap();
        let gb = GpuBody::from(&body);
        assert_eq!(gb.kind, KIND_RIGID);
        assert_eq!(gb.x[3], 1.0);
        assert!(gb.x[7..].iter().all(|&v| v == 0.0));
        assert_eq!(gb.mass[3], 6.0);
        let back: crate::coords::Vec7 = unpad(&gb.x);
        assert_eq!(back.as_slice(), body.x().as_slice());
    }
}
