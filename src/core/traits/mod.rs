pub mod compiler;
pub mod executor;
