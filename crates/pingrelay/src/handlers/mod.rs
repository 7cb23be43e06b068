pub mod downstream;
pub mod ping;
