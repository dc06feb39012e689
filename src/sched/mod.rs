//! # Multitasking & Scheduler Subsystem
//!
//! Escalonador preemptivo multi-core do Redstone OS.
//!
//! ## Arquitetura
//! - **Arena de threads:** registros endereçados por índice + geração
//!   (`task::table`). Filas de execução e listas de processo são listas de
//!   índices; nada guarda ponteiro para registro.
//! - **Quatro classes** (IDLE, LOW, NORMAL, HIGH). O valor numérico da classe
//!   é a cota de fatias: round-robin ponderado dentro e entre classes.
//! - **Lock global:** `sync::Mutex` + flag de reentrância por núcleo. O loop
//!   e a API de ciclo de vida passam pelo mesmo lock.
//! - **Bloqueio por predicado:** sem filas de espera; o loop avalia os
//!   predicados das threads bloqueadas a cada invocação.
//! - **Saída em duas fases:** `exit` termina na pilha temporária do núcleo.
//!
//! O hardware é acessado pelo `Platform` (`arch::traits`).
//!
//! ## Uso
//! ```ignore
//! let sched = anvil::sched::init(platform, SchedConfig::default());
//! sched.bring_up_cpu(apic_id)?;      // em cada núcleo
//! // handler do timer:
//! anvil::sched::timer_tick();
//! ```

pub mod config;
pub mod core;
pub mod process;
pub mod signal;
pub mod task;

#[cfg(any(feature = "self_test", test))]
pub mod test;

use alloc::sync::Arc;

use spin::Once;

use crate::arch::traits::Platform;
use crate::sys::error::{KError, KResult};
use crate::sys::types::Tid;

pub use self::config::SchedConfig;
pub use self::core::debug::{QueueInfo, ThreadInfo};
pub use self::core::Scheduler;
pub use self::process::{Process, ProcessState};
pub use self::task::{
    BlockPredicate, PredicateContext, Priority, ThreadHandle, ThreadParams, ThreadStatus,
    WakeReason,
};

/// Instância global usada pelos handlers de interrupção e syscalls.
static SCHEDULER: Once<Scheduler> = Once::new();

/// Cria o escalonador global. Chamadas seguintes devolvem a mesma instância.
pub fn init(platform: Arc<dyn Platform>, config: SchedConfig) -> &'static Scheduler {
    SCHEDULER.call_once(|| Scheduler::new(platform, config))
}

/// Escalonador global, se `init` já rodou.
pub fn scheduler() -> Option<&'static Scheduler> {
    SCHEDULER.get()
}

/// Handler do tick do timer.
pub fn timer_tick() {
    if let Some(s) = scheduler() {
        s.timer_tick();
    }
}

/// Executa o escalonador no núcleo atual (vetor de reschedule).
pub fn schedule() {
    if let Some(s) = scheduler() {
        s.schedule();
    }
}

pub fn yield_now() {
    if let Some(s) = scheduler() {
        s.yield_now();
    }
}

pub fn sleep(ms: u64) -> KResult<()> {
    match scheduler() {
        Some(s) => s.sleep(ms),
        None => Ok(()),
    }
}

pub fn get_current_tid() -> Tid {
    scheduler().map_or(Tid::NONE, |s| s.current_tid())
}

/// Último erro da thread atual.
pub fn get_last_error() -> Option<KError> {
    scheduler().and_then(|s| s.last_error())
}

/// Adquire um `sync::Mutex` em nome da thread atual.
pub fn mutex_lock(mutex: &crate::sync::Mutex, timeout: u64, block: bool) -> KResult<()> {
    scheduler().map_or(Err(KError::AccessDenied), |s| s.mutex_lock(mutex, timeout, block))
}

pub fn mutex_unlock(mutex: &crate::sync::Mutex) -> KResult<()> {
    scheduler().map_or(Err(KError::AccessDenied), |s| s.mutex_unlock(mutex))
}

/// Chamado pelo trampolim de entrada de toda thread nova, antes de `entry`.
#[no_mangle]
pub extern "C" fn anvil_finish_switch() {
    if let Some(s) = scheduler() {
        s.finish_switch();
    }
}
