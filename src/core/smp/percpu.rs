//! Arquivo: core/smp/percpu.rs
//!
//! Propósito: Dados replicados por CPU.
//! Cada núcleo possui sua própria instância de `T`, indexada pelo `CpuId`
//! lógico, evitando contenda de cache entre núcleos.
//!
//! Detalhes de Implementação:
//! - Abordagem baseada em Array: `PerCpu<T>` mantém `[T; MAX_CPUS]` em memória
//!   fixa (o array nunca realoca, então referências a um slot vivem tanto
//!   quanto o próprio `PerCpu`).
//! - A mutabilidade fica a cargo de `T` (atômicos ou locks), pois outros
//!   núcleos podem ler o slot de um núcleo remoto (ex: checar se está online).

use super::topology::CpuId;

/// Número máximo de CPUs suportadas.
pub const MAX_CPUS: usize = 32;

/// Wrapper para dados que são replicados por CPU.
pub struct PerCpu<T> {
    data: [T; MAX_CPUS],
}

impl<T> PerCpu<T> {
    /// Cria o array chamando `init` para cada CPU lógica.
    pub fn new_with(mut init: impl FnMut(CpuId) -> T) -> Self {
        Self {
            data: core::array::from_fn(|i| init(i as CpuId)),
        }
    }

    /// Slot de uma CPU específica.
    #[inline]
    pub fn get(&self, cpu: CpuId) -> Option<&T> {
        self.data.get(cpu as usize)
    }

    /// Itera todos os slots (inclusive de CPUs offline).
    pub fn iter(&self) -> impl Iterator<Item = (CpuId, &T)> {
        self.data.iter().enumerate().map(|(i, t)| (i as CpuId, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn slots_are_independent() {
        let pc = PerCpu::new_with(|id| AtomicU32::new(id * 10));
        pc.get(3).unwrap().fetch_add(1, Ordering::Relaxed);
        assert_eq!(pc.get(3).unwrap().load(Ordering::Relaxed), 31);
        assert_eq!(pc.get(4).unwrap().load(Ordering::Relaxed), 40);
        assert!(pc.get(MAX_CPUS as CpuId).is_none());
        assert_eq!(pc.iter().count(), MAX_CPUS);
    }
}
