//! Arquivo: core/time/jiffies.rs
//!
//! Propósito: Jiffies (Contador de ticks do sistema).
//! "Jiffies" é o termo histórico (do Linux) para ticks de relógio.
//! Base dos prazos de `sleep` e dos timeouts de bloqueio.
//!
//! Detalhes de Implementação:
//! - Usa AtomicU64 para ser thread-safe e lock-free.
//! - Incrementado apenas pelo tick do timer do BSP, para que N núcleos não
//!   acelerem o relógio N vezes.
//! - Cada instância do escalonador possui o seu contador.

use core::sync::atomic::{AtomicU64, Ordering};

/// Contador de ticks desde o boot.
#[derive(Debug, Default)]
pub struct Jiffies {
    ticks: AtomicU64,
}

impl Jiffies {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Retorna o número atual de jiffies.
    #[inline]
    pub fn get(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Incrementa o contador e retorna o novo valor.
    /// Deve ser chamado APENAS pelo handler de interrupção do timer.
    #[inline]
    pub fn inc(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Avança o relógio por `n` ticks (relógio simulado, testes).
    pub fn advance(&self, n: u64) -> u64 {
        self.ticks.fetch_add(n, Ordering::Relaxed) + n
    }
}

/// Converte milisegundos para jiffies, arredondando para cima.
///
/// Um `sleep` nunca deve acordar antes do prazo pedido; qualquer valor
/// positivo resulta em pelo menos um tick. Satura em vez de transbordar.
#[inline]
pub const fn millis_to_jiffies(millis: u64, hz: u64) -> u64 {
    millis.saturating_mul(hz).saturating_add(999) / 1000
}

/// Converte jiffies para milisegundos (truncado).
#[inline]
pub const fn jiffies_to_millis(ticks: u64, hz: u64) -> u64 {
    if hz == 0 {
        0
    } else {
        ticks.saturating_mul(1000) / hz
    }
}
