//! Arquivo: core/smp/ipi.rs
//!
//! Propósito: Tipos de Interrupções Inter-Processador (IPIs).
//! Usadas pelo escalonador para forçar reescalonamento remoto, parar um
//! núcleo ou derrubar todos em uma falha fatal.
//!
//! O envio em si é responsabilidade da plataforma (`CpuOps::send_ipi`).

use super::topology::CpuId;

/// Destino da IPI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpiTarget {
    /// Uma CPU específica
    Single(CpuId),
    /// Todas as CPUs (Broadcast)
    All,
    /// Todas exceto a atual
    AllButSelf,
}

/// Vetores de IPI usados pelo escalonador
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpiVector {
    /// Panic: Para todas as CPUs imediatamente
    Panic = 0xFE,
    /// Stop: Desliga o núcleo de forma ordenada (hlt com interrupções off)
    Stop = 0xFD,
    /// Reschedule: Força o scheduler a rodar no núcleo alvo
    Reschedule = 0xFC,
}

impl IpiVector {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}
