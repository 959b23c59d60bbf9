//! Vision-model side of the pipeline.
//!
//! - `providers`: hosted multimodal models behind `VisionProvider`
//! - `prompt`: the instruction text sent with each mapping call
//! - `response`: lenient parsing and strict contract checks on the reply
//! - `mapper`: `RibMapper::map_catalog_to_order`, tying it together

pub mod mapper;
pub mod prompt;
pub mod providers;
pub mod response;

pub use mapper::{MapperSettings, RibMapper, ViolationPolicy};
pub use providers::{build_provider, ProviderRegistry, ProviderSettings};
pub use response::{
    enforce_right_angles, extract_entries, parse_model_output, validate_contract, ContractReport,
    ModelEntry,
};
