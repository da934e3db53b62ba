//! Compiler and kernel configuration.

use atomkit_core::Universe;
use atomkit_store::NotifyMode;

/// Configuration for the transaction compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerConfig {
    /// When set, every address in a transaction must belong to this universe.
    pub universe: Option<Universe>,
    /// Whether to stamp compiled atoms with a `timestamp` metadata entry.
    pub stamp_timestamp: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            universe: None,
            stamp_timestamp: true,
        }
    }
}

impl CompilerConfig {
    pub fn for_universe(universe: Universe) -> Self {
        Self {
            universe: Some(universe),
            ..Self::default()
        }
    }
}

/// Configuration for the Kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    pub compiler: CompilerConfig,
    /// Notify mode used when the kernel stores its own compiled atoms.
    pub local_notify: NotifyMode,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            compiler: CompilerConfig::default(),
            local_notify: NotifyMode::NotifyOnUpdate,
        }
    }
}
