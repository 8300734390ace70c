pub mod chunk;
pub mod config;
pub mod pipeline;
pub mod pr;
pub mod report;
pub mod review;
pub mod tokens;
