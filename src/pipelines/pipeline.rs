use crate::entities::Vertex;

use std::rc::Rc;

use gfx_auxil as auxil;
use gfx_hal as hal;

use hal::{
    format,
    image, pass,
    pass::Subpass,
    prelude::*,
    pso,
    pso::{
        InputAssemblerDesc, Primitive, PrimitiveAssemblerDesc, ShaderStageFlags, VertexInputRate,
    },
};

use std::{iter, mem::ManuallyDrop, ptr};

const ENTRY_NAME: &str = "main";

const VERTEX_SHADER: &str = include_str!("../shaders/vert.glsl");
const FRAGMENT_SHADER: &str = include_str!("../shaders/frag.glsl");

const PIPELINE_CACHE_PATH: &str = "cube_pipeline_cache";

pub struct Pipeline<B: hal::Backend> {
    device: Rc<B::Device>,
    render_pass: ManuallyDrop<B::RenderPass>,
    pipeline_layout: ManuallyDrop<B::PipelineLayout>,
    pipeline: ManuallyDrop<B::GraphicsPipeline>,
    pipeline_cache: ManuallyDrop<B::PipelineCache>,
}

impl<B: hal::Backend> Pipeline<B> {
    pub fn new(device: Rc<B::Device>, format: hal::format::Format) -> Self {
        let render_pass = create_render_pass::<B>(device.clone(), format);
        let pipeline_layout = create_pipeline_layout::<B>(device.clone());
        let pipeline_cache = load_pipeline_cache::<B>(device.clone());
        let pipeline =
            create_pipeline::<B>(device.clone(), &*render_pass, &*pipeline_layout, &pipeline_cache);
        save_pipeline_cache::<B>(device.clone(), &pipeline_cache);

        Self {
            device,
            render_pass,
            pipeline_layout,
            pipeline,
            pipeline_cache,
        }
    }

    pub fn render_pass(&self) -> &B::RenderPass {
        &*self.render_pass
    }

    pub fn pipeline_layout(&self) -> &B::PipelineLayout {
        &*self.pipeline_layout
    }

    pub fn pipeline(&self) -> &B::GraphicsPipeline {
        &*self.pipeline
    }
}

impl<B> Drop for Pipeline<B>
where
    B: hal::Backend,
{
    fn drop(&mut self) {
        (*self.device).wait_idle().unwrap();

        unsafe {
            (*self.device)
                .destroy_pipeline_layout(ManuallyDrop::into_inner(ptr::read(
                    &self.pipeline_layout,
                )));

            (*self.device)
                .destroy_render_pass(ManuallyDrop::into_inner(ptr::read(&self.render_pass)));

            (*self.device)
                .destroy_graphics_pipeline(ManuallyDrop::into_inner(ptr::read(&self.pipeline)));

            (*self.device)
                .destroy_pipeline_cache(ManuallyDrop::into_inner(ptr::read(&self.pipeline_cache)));
        }
    }
}

fn create_render_pass<B: hal::Backend>(
    device: Rc<B::Device>,
    format: hal::format::Format,
) -> ManuallyDrop<B::RenderPass> {
    let attachment = pass::Attachment {
        format: Some(format),
        samples: 1,
        ops: pass::AttachmentOps::new(
            pass::AttachmentLoadOp::Clear,
            pass::AttachmentStoreOp::Store,
        ),
        stencil_ops: pass::AttachmentOps::DONT_CARE,
        layouts: image::Layout::Undefined..image::Layout::Present,
    };

    let subpass = pass::SubpassDesc {
        colors: &[(0, image::Layout::ColorAttachmentOptimal)],
        depth_stencil: None,
        inputs: &[],
        resolves: &[],
        preserves: &[],
    };

    ManuallyDrop::new(
        unsafe {
            (*device).create_render_pass(
                iter::once(attachment),
                iter::once(subpass),
                iter::empty(),
            )
        }
        .expect("Can't create render pass"),
    )
}

fn create_pipeline_layout<B: hal::Backend>(device: Rc<B::Device>) -> ManuallyDrop<B::PipelineLayout> {
    // The only resource the shaders see is the combined transform matrix,
    // pushed as a vertex-stage constant. No descriptor sets.
    let push_constant_bytes = std::mem::size_of::<[[f32; 4]; 4]>() as u32;

    ManuallyDrop::new(
        unsafe {
            (*device).create_pipeline_layout(
                iter::empty::<&B::DescriptorSetLayout>(),
                [(ShaderStageFlags::VERTEX, 0..push_constant_bytes)].into_iter(),
            )
        }
        .expect("Can't create pipeline layout"),
    )
}

fn compile_shader<B: hal::Backend>(
    device: &B::Device,
    source: &str,
    ty: glsl_to_spirv::ShaderType,
) -> B::ShaderModule {
    // The original demo compiles its GLSL at startup as well; shipping
    // sources keeps them editable without a build step.
    let output = glsl_to_spirv::compile(source, ty)
        .expect("Can't compile shader");

    let spirv = auxil::read_spirv(output).expect("Can't read compiled SPIR-V");

    unsafe { device.create_shader_module(&spirv) }.expect("Can't create shader module")
}

fn create_pipeline<B: hal::Backend>(
    device: Rc<B::Device>,
    render_pass: &B::RenderPass,
    pipeline_layout: &B::PipelineLayout,
    pipeline_cache: &B::PipelineCache,
) -> ManuallyDrop<B::GraphicsPipeline> {
    let vs_module =
        compile_shader::<B>(&*device, VERTEX_SHADER, glsl_to_spirv::ShaderType::Vertex);
    let fs_module =
        compile_shader::<B>(&*device, FRAGMENT_SHADER, glsl_to_spirv::ShaderType::Fragment);

    let (vs_entry, fs_entry) = (
        pso::EntryPoint {
            entry: ENTRY_NAME,
            module: &vs_module,
            specialization: pso::Specialization::default(),
        },
        pso::EntryPoint {
            entry: ENTRY_NAME,
            module: &fs_module,
            specialization: pso::Specialization::default(),
        },
    );

    let primitive_assembler = {
        PrimitiveAssemblerDesc::Vertex {
            buffers: &[pso::VertexBufferDesc {
                binding: 0,
                stride: std::mem::size_of::<Vertex>() as u32,
                rate: VertexInputRate::Vertex,
            }],

            // Two vec3 attributes per vertex: position at location 0,
            // color at location 1 right behind it.
            attributes: &[
                pso::AttributeDesc {
                    location: 0,
                    binding: 0,
                    element: pso::Element {
                        format: format::Format::Rgb32Sfloat,
                        offset: 0,
                    },
                },
                pso::AttributeDesc {
                    location: 1,
                    binding: 0,
                    element: pso::Element {
                        format: format::Format::Rgb32Sfloat,
                        offset: 12,
                    },
                },
            ],
            input_assembler: InputAssemblerDesc::new(Primitive::TriangleList),
            vertex: vs_entry,
            tessellation: None,
            geometry: None,
        }
    };

    let subpass = Subpass {
        index: 0,
        main_pass: render_pass,
    };

    // Back-face culling is all the depth handling a single convex cube
    // needs; there is no depth attachment.
    let mut pipeline_desc = pso::GraphicsPipelineDesc::new(
        primitive_assembler,
        pso::Rasterizer {
            cull_face: pso::Face::BACK,
            ..pso::Rasterizer::FILL
        },
        Some(fs_entry),
        pipeline_layout,
        subpass,
    );

    pipeline_desc.blender.targets.push(pso::ColorBlendDesc {
        mask: pso::ColorMask::ALL,
        blend: Some(pso::BlendState::ALPHA),
    });

    let pipeline = unsafe {
        (*device).create_graphics_pipeline(&pipeline_desc, Some(pipeline_cache))
    };

    unsafe {
        (*device).destroy_shader_module(vs_module);
    }
    unsafe {
        (*device).destroy_shader_module(fs_module);
    }

    ManuallyDrop::new(pipeline.expect("Can't create graphics pipeline"))
}

fn load_pipeline_cache<B: hal::Backend>(device: Rc<B::Device>) -> ManuallyDrop<B::PipelineCache> {
    let previous_pipeline_cache_data = std::fs::read(PIPELINE_CACHE_PATH);

    if let Err(error) = previous_pipeline_cache_data.as_ref() {
        log::debug!("No previous pipeline cache data: {}", error);
    }

    ManuallyDrop::new(unsafe {
        (*device)
            .create_pipeline_cache(
                previous_pipeline_cache_data
                    .as_ref()
                    .ok()
                    .map(|vec| &vec[..]),
            )
            .expect("Can't create pipeline cache")
    })
}

fn save_pipeline_cache<B: hal::Backend>(device: Rc<B::Device>, pipeline_cache: &B::PipelineCache) {
    let pipeline_cache_data = unsafe {
        (*device)
            .get_pipeline_cache_data(pipeline_cache)
            .expect("Can't read back the pipeline cache")
    };

    if let Err(error) = std::fs::write(PIPELINE_CACHE_PATH, &pipeline_cache_data) {
        log::warn!("Can't write the pipeline cache: {}", error);
        return;
    }
    log::info!(
        "Wrote the pipeline cache to {} ({} bytes)",
        PIPELINE_CACHE_PATH,
        pipeline_cache_data.len()
    );
}
