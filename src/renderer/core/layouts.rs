use crate::resources::material::TEXTURE_SLOT_COUNT;

/// Bind group layouts shared by every program.
///
/// - group 0: frame globals (0) and the light block (1)
/// - group 1: material uniforms (0), sampler (1), texture slots (2..)
/// - group 2: bone palette (0)
pub struct BindGroupLayouts {
    pub frame: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub skin: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl BindGroupLayouts {
    pub const MATERIAL_FIRST_TEXTURE_BINDING: u32 = 2;

    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let both = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;

        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Layout"),
            entries: &[uniform_entry(0, both), uniform_entry(1, both)],
        });

        let mut material_entries = vec![
            uniform_entry(0, both),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        material_entries.extend((0..TEXTURE_SLOT_COUNT as u32).map(|i| {
            wgpu::BindGroupLayoutEntry {
                binding: Self::MATERIAL_FIRST_TEXTURE_BINDING + i,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }
        }));
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Layout"),
            entries: &material_entries,
        });

        let skin = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skin Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[Some(&frame), Some(&material), Some(&skin)],
            immediate_size: 0,
        });

        Self {
            frame,
            material,
            skin,
            pipeline_layout,
        }
    }
}
