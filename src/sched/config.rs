//! Constantes de configuração do Scheduler

use crate::core::time::jiffies::millis_to_jiffies;

/// Número de classes de prioridade (IDLE, LOW, NORMAL, HIGH)
pub const PRIORITY_COUNT: usize = 4;

/// Varreduras completas sobre as classes antes de cair na thread idle
pub const SELECTION_SWEEPS: usize = 2;

/// Tamanho padrão da Stack de Kernel (em bytes)
pub const DEFAULT_STACK_SIZE: usize = 8 * 1024;

/// Pilha temporária por núcleo, usada na segunda fase de `exit`
pub const TEMP_STACK_SIZE: usize = 16 * 1024;

/// Frequência do tick do timer (Hz)
pub const HZ: u64 = 1000;

/// Limite de registros de thread vivos simultaneamente
pub const MAX_THREADS: usize = 4096;

/// Código de saída de um processo morto por sinal sem handler: base + sinal
pub const SIGNAL_EXIT_BASE: u32 = 128;

// Seletores de segmento (GDT do Redstone)
pub const KERNEL_CODE_SELECTOR: u64 = 0x08;
pub const KERNEL_DATA_SELECTOR: u64 = 0x10;
pub const USER_DATA_SELECTOR: u64 = 0x1B;
pub const USER_CODE_SELECTOR: u64 = 0x23;

/// RFLAGS: bit reservado (sempre 1)
pub const RFLAGS_RESERVED: u64 = 1 << 1;
/// RFLAGS: Interrupt Enable
pub const RFLAGS_IF: u64 = 1 << 9;

/// Configuração de boot do escalonador
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedConfig {
    /// Ticks do timer por segundo
    pub hz: u64,
    /// Pilha usada quando `create` recebe tamanho 0
    pub default_stack_size: usize,
    /// Pilha temporária de cada núcleo
    pub temp_stack_size: usize,
    /// Limite de threads vivas
    pub max_threads: usize,
}

impl SchedConfig {
    pub const fn new() -> Self {
        Self {
            hz: HZ,
            default_stack_size: DEFAULT_STACK_SIZE,
            temp_stack_size: TEMP_STACK_SIZE,
            max_threads: MAX_THREADS,
        }
    }

    /// Converte milisegundos em ticks desta configuração.
    pub const fn ms_to_ticks(&self, ms: u64) -> u64 {
        millis_to_jiffies(ms, self.hz)
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self::new()
    }
}
