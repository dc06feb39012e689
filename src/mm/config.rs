//! # Configuração do Módulo de Memória
//!
//! Constantes de tamanho usadas por pilhas e pela arena.

/// Tamanho de uma página (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// Alinhamento de pilhas (exigido pela SysV ABI no ponto de chamada)
pub const STACK_ALIGN: usize = 16;
