//! Anvil - Núcleo de Escalonamento do Redstone OS.
//!
//! Ponto central de exportação dos módulos do escalonador.
//! Escalonador preemptivo multi-core com quatro classes de prioridade,
//! ciclo de vida de threads por handles e contêineres de processo.
//!
//! O hardware é acessado somente pelos traits de `arch::traits`; o kernel
//! hospedeiro fornece a implementação concreta (`Platform`).

#![cfg_attr(not(test), no_std)]

// Habilitar alocação dinâmica (necessário para Vec/Box/Arc)
extern crate alloc;

// --- Módulos de Baixo Nível (Hardware) ---
pub mod arch; // HAL (CpuOps, MemoryOps)

// --- Módulos Centrais ---
pub mod core; // Logging, Debug, SMP, Tempo, Objetos
pub mod klib; // Utilitários Internos (Listas, Framework de Testes)
pub mod mm; // Arena de Stacks
pub mod sync; // Primitivas de Sincronização (Mutex)
pub mod sys; // Definições de Sistema (Erros, Tipos)

// --- Subsistemas ---
pub mod sched; // Scheduler, Threads e Processos
pub mod syscall; // Interface com Userspace

pub use crate::sched::{Scheduler, ThreadHandle, ThreadParams};
pub use crate::sys::error::{KError, KResult};

/// Executa as suites de auto-teste (sync e scheduler) no boot.
///
/// Retorna `true` se nenhum caso falhou.
#[cfg(any(feature = "self_test", test))]
pub fn run_self_tests() -> bool {
    let sync = crate::sync::test::run_sync_tests();
    let sched = crate::sched::test::run_sched_tests();
    if sync.failed + sched.failed == 0 {
        crate::kok!("(Test) Auto-testes concluidos");
        true
    } else {
        crate::kfail!("(Test) Auto-testes com falhas");
        false
    }
}
