//! Traits do Hardware Abstraction Layer (HAL).
//! Interfaces públicas que o escalonador usa para falar com o hardware.

pub mod cpu;
pub mod memory;

// Re-exportar para facilitar uso: `use crate::arch::traits::CpuOps;`
pub use cpu::CpuOps;
pub use memory::MemoryOps;

/// Plataforma completa exigida pelo escalonador.
pub trait Platform: CpuOps + MemoryOps {
    fn as_cpu(&self) -> &dyn CpuOps;
    fn as_memory(&self) -> &dyn MemoryOps;
}

impl<T: CpuOps + MemoryOps> Platform for T {
    fn as_cpu(&self) -> &dyn CpuOps {
        self
    }

    fn as_memory(&self) -> &dyn MemoryOps {
        self
    }
}
