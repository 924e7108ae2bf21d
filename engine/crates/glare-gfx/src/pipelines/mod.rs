pub mod compute_pipeline;
pub mod graphics_pipeline;
pub mod shader;
