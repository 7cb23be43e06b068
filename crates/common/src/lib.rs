pub mod configuration;
pub mod errors;
pub mod traces;
