pub mod llm;
pub mod parser;
pub mod prompt;
pub mod schema;
pub mod validator;

pub use llm::{GenerationError, GenerationModel, GenerationOptions, OllamaGenerator};
pub use parser::{ParseError, ResponseParser};
pub use schema::{
    Assumption, Constraint, Dependencies, ExtractionResult, Priority, Provenance, Requirement,
    RequirementType, Risk,
};
pub use validator::Validator;
