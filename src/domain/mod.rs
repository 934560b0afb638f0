pub mod scoring;
pub mod sequence;
pub mod validate;
