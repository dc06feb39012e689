//! # Espaço de Endereçamento
//!
//! Identificador opaco da raiz de tabelas de páginas de um processo (o valor
//! carregado em CR3 no x86_64). O escalonador só compara e repassa o valor;
//! quem interpreta é a plataforma (`MemoryOps`).

/// Raiz de um espaço de endereçamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressSpace(u64);

impl AddressSpace {
    /// Espaço do kernel, compartilhado por todas as threads de kernel.
    pub const KERNEL: Self = Self(0);

    pub const fn new(root: u64) -> Self {
        Self(root)
    }

    pub const fn root(self) -> u64 {
        self.0
    }

    pub const fn is_kernel(self) -> bool {
        self.0 == Self::KERNEL.0
    }
}
