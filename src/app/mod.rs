pub mod pipeline_use_case;
pub mod ports;

pub use pipeline_use_case::{PipelineRunReport, PipelineUseCase};
