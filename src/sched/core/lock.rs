//! Seção crítica do escalonador
//!
//! Um único `sync::Mutex` guarda todo o estado compartilhado (arena de
//! threads, filas, processos). O token de dono é `id do núcleo + 1`, então
//! o mutex identifica qual núcleo está decidindo.
//!
//! Entrar na seção:
//! 1. salva e desabilita as interrupções do núcleo;
//! 2. marca a flag de reentrância do núcleo (entrada aninhada é fatal);
//! 3. adquire o mutex.
//!
//! O guard desfaz tudo em ordem inversa no `Drop`. `into_irq` libera o lock
//! mantendo as interrupções desabilitadas para a troca de contexto.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::Ordering;

use super::cpu::CoreLocal;
use super::runqueue::RunQueueSet;
use crate::arch::traits::CpuOps;
use crate::core::debug::fatal;
use crate::sched::process::ProcessTable;
use crate::sched::task::table::ThreadTable;
use crate::sync::Mutex;

/// Estado protegido pelo lock do escalonador.
pub struct SchedState {
    pub threads: ThreadTable,
    pub queues: RunQueueSet,
    pub processes: ProcessTable,
    pub next_tid: u32,
    /// Relógio de justiça: avança uma vez por invocação do escalonador
    pub clock: u64,
}

impl SchedState {
    pub fn new(max_threads: usize) -> Self {
        Self {
            threads: ThreadTable::new(max_threads),
            queues: RunQueueSet::new(),
            processes: ProcessTable::new(),
            next_tid: 1,
            clock: 0,
        }
    }

    /// Próximo tid livre (nunca reutilizado).
    pub fn alloc_tid(&mut self) -> crate::sys::types::Tid {
        let tid = crate::sys::types::Tid(self.next_tid);
        self.next_tid += 1;
        tid
    }
}

pub struct SchedLock {
    mutex: Mutex,
    state: UnsafeCell<SchedState>,
}

// SAFETY: `state` só é acessado através de `SchedGuard`, que existe apenas
// enquanto o mutex está adquirido.
unsafe impl Sync for SchedLock {}

#[inline]
fn token(cpu: &CoreLocal) -> u32 {
    cpu.id + 1
}

impl SchedLock {
    pub fn new(state: SchedState) -> Self {
        Self {
            mutex: Mutex::new(),
            state: UnsafeCell::new(state),
        }
    }

    /// Entra na seção crítica, esperando o núcleo que a detém.
    pub fn enter<'a>(&'a self, cpu: &'a CoreLocal, ops: &'a dyn CpuOps) -> SchedGuard<'a> {
        let irq = ops.are_interrupts_enabled();
        ops.disable_interrupts();

        if cpu.in_scheduler.swap(true, Ordering::AcqRel) {
            crate::kerror!("(Sched) Reentrada na secao critica, cpu=", cpu.id);
            fatal(ops, "(Sched) entrada aninhada na secao critica", None);
        }

        if self.mutex.lock(token(cpu), 0, true).is_err() {
            fatal(ops, "(Sched) falha ao adquirir o lock do escalonador", None);
        }

        SchedGuard {
            lock: self,
            cpu,
            ops,
            irq,
        }
    }

    /// Tentativa única. Falha se o núcleo já está na seção ou outro núcleo
    /// detém o lock.
    pub fn try_enter<'a>(
        &'a self,
        cpu: &'a CoreLocal,
        ops: &'a dyn CpuOps,
    ) -> Option<SchedGuard<'a>> {
        let irq = ops.are_interrupts_enabled();
        ops.disable_interrupts();

        if cpu.in_scheduler.swap(true, Ordering::AcqRel) {
            if irq {
                ops.enable_interrupts();
            }
            return None;
        }

        if self.mutex.try_lock(token(cpu)).is_err() {
            cpu.in_scheduler.store(false, Ordering::Release);
            if irq {
                ops.enable_interrupts();
            }
            return None;
        }

        Some(SchedGuard {
            lock: self,
            cpu,
            ops,
            irq,
        })
    }

    /// Algum núcleo está dentro da seção?
    pub fn is_held(&self) -> bool {
        self.mutex.locked()
    }
}

pub struct SchedGuard<'a> {
    lock: &'a SchedLock,
    cpu: &'a CoreLocal,
    ops: &'a dyn CpuOps,
    /// Estado das interrupções antes da entrada
    irq: bool,
}

impl<'a> SchedGuard<'a> {
    /// Sai da seção sem reabilitar interrupções.
    ///
    /// Retorna o estado salvo para o chamador restaurar depois da troca.
    pub fn into_irq(mut self) -> bool {
        let irq = self.irq;
        self.irq = false;
        irq
    }
}

impl Deref for SchedGuard<'_> {
    type Target = SchedState;

    fn deref(&self) -> &SchedState {
        // SAFETY: o mutex está adquirido por este núcleo.
        unsafe { &*self.lock.state.get() }
    }
}

impl DerefMut for SchedGuard<'_> {
    fn deref_mut(&mut self) -> &mut SchedState {
        // SAFETY: o mutex está adquirido por este núcleo e o guard é único.
        unsafe { &mut *self.lock.state.get() }
    }
}

impl Drop for SchedGuard<'_> {
    fn drop(&mut self) {
        if self.lock.mutex.unlock(token(self.cpu)).is_err() {
            crate::kerror!("(Sched) Lock liberado por quem nao e dono, cpu=", self.cpu.id);
        }
        self.cpu.in_scheduler.store(false, Ordering::Release);
        if self.irq {
            self.ops.enable_interrupts();
        }
    }
}
