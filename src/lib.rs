pub mod constants;
mod conversion;
pub mod cross_match;
pub mod fusion_errors;
pub mod harmonizer;
pub mod normalizer;
pub mod photometry;
pub mod records;
pub mod ref_system;
pub mod schema_mapper;
pub mod time;
