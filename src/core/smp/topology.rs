//! Arquivo: core/smp/topology.rs
//!
//! Propósito: Identificação de processadores e máscaras de afinidade.
//!
//! Detalhes de Implementação:
//! - `CpuId` é o índice lógico (0 a N-1) atribuído no bring-up.
//! - `CpuMask` é um bitmap de 64 bits: o bit N habilita a CPU lógica N.
//!   O limite de núcleos (`MAX_CPUS`) cabe nele.

use super::percpu::MAX_CPUS;

/// Identificador lógico de CPU (0 a N-1)
pub type CpuId = u32;

/// Máscara de afinidade (bit N = CPU lógica N).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuMask(u64);

impl CpuMask {
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Máscara contendo apenas `cpu`.
    pub const fn single(cpu: CpuId) -> Self {
        if (cpu as usize) < MAX_CPUS {
            Self(1u64 << cpu)
        } else {
            Self(0)
        }
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, cpu: CpuId) -> bool {
        (cpu as usize) < MAX_CPUS && self.0 & (1u64 << cpu) != 0
    }

    pub fn insert(&mut self, cpu: CpuId) {
        if (cpu as usize) < MAX_CPUS {
            self.0 |= 1u64 << cpu;
        }
    }

    pub fn remove(&mut self, cpu: CpuId) {
        if (cpu as usize) < MAX_CPUS {
            self.0 &= !(1u64 << cpu);
        }
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Itera as CPUs presentes, em ordem crescente.
    pub fn iter(self) -> impl Iterator<Item = CpuId> {
        (0..MAX_CPUS as CpuId).filter(move |&c| self.contains(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_and_contains() {
        let m = CpuMask::single(3);
        assert!(m.contains(3));
        assert!(!m.contains(2));
        assert_eq!(m.count(), 1);
        assert!(CpuMask::single(MAX_CPUS as CpuId).is_empty());
    }

    #[test]
    fn insert_remove_iter() {
        let mut m = CpuMask::EMPTY;
        m.insert(0);
        m.insert(5);
        m.insert(31);
        assert_eq!(m.iter().collect::<alloc::vec::Vec<_>>(), [0, 5, 31]);
        m.remove(5);
        assert!(!m.contains(5));
        assert_eq!(m.intersection(CpuMask::from_bits(1)).bits(), 1);
    }
}
