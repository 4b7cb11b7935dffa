use std::sync::Arc;

use tokio::process::Command;

use crate::core::domain::ResourceLimits;

/// Configures a memory ceiling on a command before it is spawned.
///
/// The limit is applied in the child between fork and exec, so it never
/// touches the harness itself and every spawn gets its own copy.
pub trait ResourceLimiter: std::fmt::Debug + Send + Sync {
    fn configure(&self, cmd: &mut Command);
}

/// Caps the child's address space with `RLIMIT_AS`.
#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy)]
pub struct AddressSpaceLimiter {
    bytes: u64,
}

#[cfg(target_os = "linux")]
impl AddressSpaceLimiter {
    pub fn new(bytes: u64) -> Self {
        Self { bytes }
    }
}

#[cfg(target_os = "linux")]
impl ResourceLimiter for AddressSpaceLimiter {
    fn configure(&self, cmd: &mut Command) {
        let limit = libc::rlimit {
            rlim_cur: self.bytes as libc::rlim_t,
            rlim_max: self.bytes as libc::rlim_t,
        };
        // SAFETY: the hook only calls setrlimit, which is async-signal-safe.
        unsafe {
            cmd.pre_exec(move || {
                if libc::setrlimit(libc::RLIMIT_AS, &limit) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(target_os = "linux", allow(dead_code))]
pub struct NoopLimiter;

impl ResourceLimiter for NoopLimiter {
    fn configure(&self, _cmd: &mut Command) {}
}

/// Picks the limiter for this platform. Called once per run.
pub fn select_limiter(limits: &ResourceLimits) -> Arc<dyn ResourceLimiter> {
    #[cfg(target_os = "linux")]
    {
        tracing::debug!("Limiting address space to {} MB", limits.memory_limit_mb());
        Arc::new(AddressSpaceLimiter::new(limits.memory_limit_bytes()))
    }

    #[cfg(not(target_os = "linux"))]
    {
        static UNSUPPORTED_WARNING: std::sync::Once = std::sync::Once::new();
        UNSUPPORTED_WARNING.call_once(|| {
            tracing::warn!(
                "Memory limiting is not supported on this platform, {} MB limit will not be enforced",
                limits.memory_limit_mb()
            );
        });
        Arc::new(NoopLimiter)
    }
}
