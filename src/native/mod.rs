/// Native module contains implementations of core traits
/// that run the host toolchain and spawn programs directly,
/// using rlimits and process groups instead of a container runtime.
pub mod compiler;
pub mod executor;
pub mod limiter;
