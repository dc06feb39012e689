//! Arquivo: core/object/refcount.rs
//!
//! Propósito: Contagem de referências para objetos do núcleo.
//! Conta os handles abertos para um registro de thread: o registro só é
//! recuperado quando está morto E a contagem chega a zero.
//!
//! Detalhes de Implementação:
//! - Usa `AtomicUsize`, com semântica Acquire/Release no decremento.
//! - Decremento abaixo de zero é recusado (`dec` retorna `None`) em vez de
//!   dar a volta no contador.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Contador de referências atômico
#[derive(Debug)]
pub struct RefCount {
    count: AtomicUsize,
}

impl RefCount {
    /// Cria um novo contador com valor inicial
    pub const fn new(initial: usize) -> Self {
        Self {
            count: AtomicUsize::new(initial),
        }
    }

    /// Incrementa o contador de referências.
    /// Retorna o valor ANTERIOR.
    #[inline]
    pub fn inc(&self) -> usize {
        self.count.fetch_add(1, Ordering::Relaxed)
    }

    /// Decrementa o contador de referências.
    ///
    /// Retorna o valor NOVO, ou `None` se já estava em zero.
    #[inline]
    pub fn dec(&self) -> Option<usize> {
        let prev = self
            .count
            .fetch_update(Ordering::Release, Ordering::Relaxed, |c| c.checked_sub(1))
            .ok()?;

        if prev == 1 {
            core::sync::atomic::fence(Ordering::Acquire);
        }
        Some(prev - 1)
    }

    /// Retorna o valor atual.
    #[inline]
    pub fn get(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dec_stops_at_zero() {
        let rc = RefCount::new(1);
        assert_eq!(rc.inc(), 1);
        assert_eq!(rc.dec(), Some(1));
        assert_eq!(rc.dec(), Some(0));
        assert_eq!(rc.dec(), None);
        assert_eq!(rc.get(), 0);
    }
}
