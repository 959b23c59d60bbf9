pub mod error;
pub mod traits;
pub mod types;

pub use error::BendlineError;
pub use traits::{ImageInput, VisionProvider, VisionRequest, VisionResponse};
pub use types::{
    validate_letter_list, ClockDirection, ContractIssue, LetterMapping, LetterSpec,
    MappingResult, RibKind, RIGHT_ANGLE_DEGREES,
};
