//! Núcleo do escalonador
//!
//! - `cpu`: estado por núcleo
//! - `runqueue`: filas por classe de prioridade
//! - `lock`: seção crítica global e o estado que ela protege
//! - `scheduler`: o loop (tick, yield, seleção, troca)
//! - `switch`: `exit` em duas fases e liberação de threads mortas
//! - `idle`: bring-up do núcleo e thread idle
//! - `debug`: listagem e snapshots para diagnóstico

pub mod cpu;
pub mod debug;
pub mod idle;
pub mod lock;
pub mod runqueue;
pub mod scheduler;
pub mod switch;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use self::cpu::CoreLocal;
use self::lock::{SchedLock, SchedState};
use crate::arch::traits::Platform;
use crate::core::debug::fatal;
use crate::core::smp::{CpuMask, PerCpu};
use crate::core::time::Jiffies;
use crate::sched::config::SchedConfig;
use crate::sched::task::handle::ThreadHandle;
use crate::sys::error::{KError, KResult};
use crate::sys::types::Pid;

/// Quem está chamando a API: thread atual do núcleo e seu processo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Caller {
    pub slot: Option<u32>,
    pub pid: Pid,
}

/// Escalonador multi-core.
///
/// Uma instância por kernel (ver `sched::init`). Todo estado compartilhado
/// fica atrás de `lock`; o estado por núcleo em `cpus`.
pub struct Scheduler {
    pub(crate) platform: Arc<dyn Platform>,
    pub(crate) config: SchedConfig,
    pub(crate) lock: SchedLock,
    pub(crate) cpus: PerCpu<CoreLocal>,
    online: AtomicU64,
    pub(crate) jiffies: Jiffies,
}

impl Scheduler {
    /// Cria o escalonador com o processo do kernel. Nenhum núcleo está
    /// online até `bring_up_cpu`.
    pub fn new(platform: Arc<dyn Platform>, config: SchedConfig) -> Self {
        crate::kinfo!("(Sched) Inicializando escalonador, hz=", config.hz);
        Self {
            platform,
            config,
            lock: SchedLock::new(SchedState::new(config.max_threads)),
            cpus: PerCpu::new_with(CoreLocal::new),
            online: AtomicU64::new(0),
            jiffies: Jiffies::new(),
        }
    }

    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    pub fn platform(&self) -> &dyn Platform {
        &*self.platform
    }

    /// Ticks desde o boot.
    pub fn jiffies(&self) -> u64 {
        self.jiffies.get()
    }

    /// Núcleos que já passaram pelo bring-up.
    pub fn online_mask(&self) -> CpuMask {
        CpuMask::from_bits(self.online.load(Ordering::Acquire))
    }

    pub(crate) fn mark_online(&self, cpu: &CoreLocal) {
        self.online
            .fetch_or(CpuMask::single(cpu.id).bits(), Ordering::AcqRel);
    }

    /// Estado do núcleo que está executando o chamador.
    pub(crate) fn this_core(&self) -> &CoreLocal {
        let id = self.platform.current_cpu();
        match self.cpus.get(id) {
            Some(c) => c,
            None => fatal(self.platform.as_cpu(), "(SMP) CPU fora do limite", Some(id as u64)),
        }
    }

    pub(crate) fn core(&self, id: crate::core::smp::CpuId) -> Option<&CoreLocal> {
        self.cpus.get(id)
    }

    /// Thread e processo do chamador. Antes do bring-up o chamador é o
    /// fluxo de boot, atribuído ao kernel.
    pub(crate) fn caller(&self, st: &SchedState, cpu: &CoreLocal) -> Caller {
        if !cpu.is_online() {
            return Caller {
                slot: None,
                pid: Pid::KERNEL,
            };
        }
        let slot = cpu.current();
        match st.threads.get(slot) {
            Some(t) => Caller {
                slot: Some(slot),
                pid: t.owner,
            },
            None => Caller {
                slot: None,
                pid: Pid::KERNEL,
            },
        }
    }

    /// Registra o erro no `last_error` da thread chamadora.
    pub(crate) fn note_error<T>(st: &mut SchedState, cpu: &CoreLocal, r: KResult<T>) -> KResult<T> {
        if let Err(e) = &r {
            if cpu.is_online() {
                if let Some(t) = st.threads.get_mut(cpu.current()) {
                    t.last_error = Some(*e);
                }
            }
        }
        r
    }

    /// Como `note_error`, para operações que já soltaram o lock.
    pub(crate) fn record<T>(&self, cpu: &CoreLocal, r: KResult<T>) -> KResult<T> {
        if r.is_err() && cpu.is_online() {
            let mut st = self.lock.enter(cpu, self.platform.as_cpu());
            return Self::note_error(&mut st, cpu, r);
        }
        r
    }

    /// Falha com `e`, registrando-o no chamador.
    pub(crate) fn record_error<T>(&self, e: KError) -> KResult<T> {
        self.record(self.this_core(), Err(e))
    }

    /// Valida um handle: registro ainda existe e pertence ao processo do
    /// chamador (ou o chamador é o kernel).
    pub(crate) fn resolve_handle(
        &self,
        st: &SchedState,
        cpu: &CoreLocal,
        handle: &ThreadHandle,
    ) -> KResult<u32> {
        let slot = st
            .threads
            .resolve(handle.thread_ref())
            .ok_or(KError::InvalidHandle)?;
        let caller = self.caller(st, cpu).pid;
        if caller != Pid::KERNEL && caller != handle.opener() {
            return Err(KError::InvalidHandle);
        }
        Ok(slot)
    }

    /// Processo dono da thread de `handle`.
    pub fn thread_owner(&self, handle: &ThreadHandle) -> KResult<Pid> {
        let cpu = self.this_core();
        let st = self.lock.enter(cpu, self.platform.as_cpu());
        let slot = self.resolve_handle(&st, cpu, handle)?;
        st.threads
            .get(slot)
            .map(|t| t.owner)
            .ok_or(KError::InvalidHandle)
    }
}
