//! Ciclo de vida de threads
//!
//! API baseada em handles usada pelo resto do kernel e pelas syscalls.
//! Toda operação roda sob o lock do escalonador, linearizada com o loop, e
//! em caso de erro registra o `last_error` da thread chamadora.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::context::CpuContext;
use super::entity::Thread;
use super::handle::ThreadHandle;
use super::predicate::{BlockPredicate, SleepUntil, WaitForThreads};
use super::state::{Priority, ThreadStatus, WakeReason};
use super::table::ThreadRef;
use crate::core::smp::CpuMask;
use crate::mm::stack::{normalize_stack_size, StackRegion};
use crate::sched::core::cpu::CoreLocal;
use crate::sched::core::lock::SchedState;
use crate::sched::core::Scheduler;
use crate::sync::Mutex;
use crate::sys::error::{KError, KResult};
use crate::sys::types::{Pid, Tid};

/// Parâmetros de `create_thread`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadParams {
    /// Valor cru da prioridade (1, 2, 4 ou 8)
    pub priority: u32,
    /// Ponteiro de instrução inicial (do loader)
    pub entry: u64,
    /// Primeiro argumento
    pub arg: u64,
    /// 0 = todos os núcleos online
    pub affinity: u64,
    /// 0 = tamanho padrão
    pub stack_size: usize,
    /// `None` = processo do chamador
    pub process: Option<Pid>,
    pub start_paused: bool,
}

impl ThreadParams {
    pub const fn new(entry: u64, arg: u64) -> Self {
        Self {
            priority: Priority::Normal as u32,
            entry,
            arg,
            affinity: 0,
            stack_size: 0,
            process: None,
            start_paused: false,
        }
    }

    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority as u32;
        self
    }

    /// Prioridade vinda de fora do kernel, validada em `create_thread`.
    pub const fn raw_priority(mut self, raw: u32) -> Self {
        self.priority = raw;
        self
    }

    pub const fn affinity(mut self, mask: u64) -> Self {
        self.affinity = mask;
        self
    }

    pub const fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub const fn process(mut self, pid: Pid) -> Self {
        self.process = Some(pid);
        self
    }

    pub const fn start_paused(mut self, paused: bool) -> Self {
        self.start_paused = paused;
        self
    }
}

impl Scheduler {
    /// Cria uma thread e devolve um handle para ela.
    pub fn create_thread(&self, params: &ThreadParams) -> KResult<ThreadHandle> {
        let cpu = self.this_core();
        let r = self.create_inner(cpu, params);
        self.record(cpu, r)
    }

    fn create_inner(&self, cpu: &CoreLocal, params: &ThreadParams) -> KResult<ThreadHandle> {
        let prio = Priority::from_raw(params.priority).ok_or(KError::InvalidParameter)?;

        let online = self.online_mask();
        let affinity = match params.affinity {
            0 => online,
            bits => CpuMask::from_bits(bits),
        };
        if affinity.intersection(online).is_empty() {
            return Err(KError::InvalidParameter);
        }

        let size = normalize_stack_size(params.stack_size, self.config.default_stack_size);
        let stack = self
            .platform
            .allocate_stack(size)
            .ok_or(KError::OutOfMemory)?;

        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let r = self.insert_thread(&mut st, cpu, params, prio, affinity, stack);
        drop(st);
        if r.is_err() {
            self.platform.free_stack(stack);
        }
        r
    }

    fn insert_thread(
        &self,
        st: &mut SchedState,
        cpu: &CoreLocal,
        params: &ThreadParams,
        prio: Priority,
        affinity: CpuMask,
        stack: StackRegion,
    ) -> KResult<ThreadHandle> {
        let caller = self.caller(st, cpu).pid;
        let pid = params.process.unwrap_or(caller);
        let proc = st.processes.get(pid).ok_or(KError::NoSuchObject)?;
        if !proc.is_alive() {
            return Err(KError::NoSuchObject);
        }
        if caller != Pid::KERNEL && caller != pid {
            return Err(KError::AccessDenied);
        }

        let mut ctx = CpuContext::new();
        ctx.setup(params.entry, params.arg, stack.top(), proc.user_mode);

        let tid = st.alloc_tid();
        let thread = Thread::new(tid, pid, prio, ctx, Some(stack), affinity);
        let r = st.threads.insert(thread).ok_or(KError::OutOfMemory)?;
        let slot = r.slot;

        if let Some(t) = st.threads.get_mut(slot) {
            if params.start_paused {
                t.status.insert(ThreadStatus::PAUSED);
            }
            t.refs.inc();
        }
        st.queues.insert(&mut st.threads.run_links, slot, prio);
        if let Some(p) = st.processes.get_mut(pid) {
            p.threads.push_back(&mut st.threads.proc_links, slot);
        }

        crate::kdebug!("(Thread) Thread criada tid=", tid.0);
        crate::ktrace!("(Thread) entry=", params.entry);
        Ok(ThreadHandle::new(r, tid, caller))
    }

    /// Abre um handle para uma thread existente (viva ou morta).
    pub fn open_thread(&self, tid: Tid) -> KResult<ThreadHandle> {
        let cpu = self.this_core();
        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let r = (|| -> KResult<ThreadHandle> {
            let slot = st.threads.find_tid(tid).ok_or(KError::NoSuchObject)?;
            let r = st.threads.ref_of(slot).ok_or(KError::NoSuchObject)?;
            let t = st.threads.get(slot).ok_or(KError::NoSuchObject)?;
            if t.is_idle {
                return Err(KError::AccessDenied);
            }
            t.refs.inc();
            Ok(ThreadHandle::new(r, tid, self.caller(&st, cpu).pid))
        })();
        Self::note_error(&mut st, cpu, r)
    }

    /// Devolve o handle. Se a thread já morreu e este era o último handle,
    /// o registro é recuperado.
    pub fn close_thread(&self, handle: ThreadHandle) -> KResult<()> {
        let cpu = self.this_core();
        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let r = match self.resolve_handle(&st, cpu, &handle) {
            Ok(_) => self.close_locked(&mut st, handle),
            Err(e) => Err(e),
        };
        Self::note_error(&mut st, cpu, r)
    }

    /// Resolve o alvo de uma operação de controle (pause, terminate, ...).
    fn control_target(&self, st: &SchedState, cpu: &CoreLocal, handle: &ThreadHandle) -> KResult<u32> {
        let slot = self.resolve_handle(st, cpu, handle)?;
        let caller = self.caller(st, cpu).pid;
        let t = st.threads.get(slot).ok_or(KError::InvalidHandle)?;
        if t.is_idle {
            return Err(KError::AccessDenied);
        }
        if t.status.is_dead() {
            return Err(KError::ThreadDied);
        }
        if caller != Pid::KERNEL && caller != t.owner {
            return Err(KError::AccessDenied);
        }
        Ok(slot)
    }

    /// Suspende a thread. Pausar a thread atual troca de thread na hora.
    pub fn pause_thread(&self, handle: &ThreadHandle) -> KResult<()> {
        let cpu = self.this_core();
        let reschedule = {
            let mut st = self.lock.enter(cpu, self.platform.as_cpu());
            let r = self.control_target(&st, cpu, handle).map(|slot| {
                let t = st.threads.get_mut(slot)?;
                t.status.insert(ThreadStatus::PAUSED);
                t.status.remove(ThreadStatus::RUNNING);
                match t.bound_cpu {
                    Some(c) if c == cpu.id && slot == cpu.current() => {
                        cpu.request_stop();
                        Some(slot)
                    }
                    Some(c) if c == cpu.id => None,
                    Some(c) => {
                        self.kick_core(c);
                        None
                    }
                    None => None,
                }
            });
            Self::note_error(&mut st, cpu, r)?
        };
        if let Some(slot) = reschedule {
            self.park_current(slot, ThreadStatus::PAUSED);
        }
        Ok(())
    }

    pub fn resume_thread(&self, handle: &ThreadHandle) -> KResult<()> {
        let cpu = self.this_core();
        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let r = self.control_target(&st, cpu, handle).map(|slot| {
            if let Some(t) = st.threads.get_mut(slot) {
                t.status.remove(ThreadStatus::PAUSED);
            }
        });
        Self::note_error(&mut st, cpu, r)
    }

    /// Move a thread para outra classe e zera sua fatia.
    pub fn set_thread_priority(&self, handle: &ThreadHandle, priority: Priority) -> KResult<()> {
        let cpu = self.this_core();
        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let r = self.control_target(&st, cpu, handle).map(|slot| {
            let st = &mut *st;
            let Some(t) = st.threads.get_mut(slot) else {
                return;
            };
            let old = t.priority;
            t.priority = priority;
            t.time_slice = 0;
            t.status.remove(ThreadStatus::CLEAR_TIME_SLICE);
            if old != priority {
                st.queues.remove(&mut st.threads.run_links, slot, old);
                st.queues.insert(&mut st.threads.run_links, slot, priority);
            }
        });
        Self::note_error(&mut st, cpu, r)
    }

    /// Termina outra thread com `code`. Para a própria thread use `exit`.
    pub fn terminate_thread(&self, handle: &ThreadHandle, code: u32) -> KResult<()> {
        let cpu = self.this_core();
        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let r = self.control_target(&st, cpu, handle).and_then(|slot| {
            if self.caller(&st, cpu).slot == Some(slot) {
                return Err(KError::AccessDenied);
            }
            self.kill_locked(&mut st, cpu, slot, code);
            Ok(())
        });
        Self::note_error(&mut st, cpu, r)
    }

    /// Bloqueia a thread chamadora até `pred` ser satisfeito ou, com
    /// `timeout` (em ticks), até o prazo. `Err(Timeout)` se o prazo venceu.
    pub fn block_current<P>(&self, pred: P, timeout: Option<u64>) -> KResult<()>
    where
        P: BlockPredicate + 'static,
    {
        self.block_boxed(Box::new(pred), timeout)
    }

    fn block_boxed(&self, pred: Box<dyn BlockPredicate>, timeout: Option<u64>) -> KResult<()> {
        let cpu = self.this_core();
        let slot = {
            let mut st = self.lock.enter(cpu, self.platform.as_cpu());
            let r = self.block_locked(&mut st, cpu, pred, timeout);
            Self::note_error(&mut st, cpu, r)?
        };

        self.park_current(slot, ThreadStatus::BLOCKED);

        let cpu = self.this_core();
        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let reason = st.threads.get_mut(slot).and_then(|t| {
            if t.status.contains(ThreadStatus::BLOCKED) {
                None
            } else {
                t.wake_reason.take()
            }
        });
        match reason {
            Some(WakeReason::Timeout) => Self::note_error(&mut st, cpu, Err(KError::Timeout)),
            _ => Ok(()),
        }
    }

    /// Tira a thread chamadora (`slot`) do núcleo depois de ela mesma ter
    /// ligado `waiting`. Repete enquanto o escalonador volta sem trocar (lock
    /// disputado com uma troca ainda pendente de epílogo).
    fn park_current(&self, slot: u32, waiting: ThreadStatus) {
        loop {
            self.schedule();

            let cpu = self.this_core();
            if cpu.current() != slot {
                return;
            }
            let st = self.lock.enter(cpu, self.platform.as_cpu());
            if !st.threads.get(slot).is_some_and(|t| t.status.intersects(waiting)) {
                return;
            }
            drop(st);
            core::hint::spin_loop();
        }
    }

    pub(crate) fn block_locked(
        &self,
        st: &mut SchedState,
        cpu: &CoreLocal,
        pred: Box<dyn BlockPredicate>,
        timeout: Option<u64>,
    ) -> KResult<u32> {
        if !cpu.is_online() || cpu.is_idle_current() {
            return Err(KError::AccessDenied);
        }
        let slot = cpu.current();
        let now = self.jiffies.get();
        let t = st.threads.get_mut(slot).ok_or(KError::AccessDenied)?;
        t.status.remove(ThreadStatus::RUNNING);
        t.status.insert(ThreadStatus::BLOCKED);
        t.block = Some(pred);
        t.wake_time = timeout.map(|ticks| now.saturating_add(ticks));
        t.wake_reason = None;
        cpu.request_stop();
        crate::ktrace!("(Thread) Bloqueada tid=", t.tid.0);
        Ok(slot)
    }

    /// Bloqueia até todas as threads dos handles morrerem.
    ///
    /// Nenhum valor é entregue; consulte `thread_exit_code` depois.
    pub fn wait_for(&self, handles: &[&ThreadHandle]) -> KResult<()> {
        let cpu = self.this_core();
        let targets = {
            let mut st = self.lock.enter(cpu, self.platform.as_cpu());
            let r = (|| -> KResult<Option<Vec<ThreadRef>>> {
                let mut targets = Vec::with_capacity(handles.len());
                let mut all_dead = true;
                for h in handles {
                    let slot = self.resolve_handle(&st, cpu, h)?;
                    if st.threads.get(slot).is_some_and(|t| !t.status.is_dead()) {
                        all_dead = false;
                    }
                    targets.push(h.thread_ref());
                }
                if self.caller(&st, cpu).slot.is_some_and(|s| targets.iter().any(|t| t.slot == s)) {
                    return Err(KError::InvalidParameter);
                }
                Ok((!all_dead).then_some(targets))
            })();
            Self::note_error(&mut st, cpu, r)?
        };

        match targets {
            Some(targets) => self.block_current(WaitForThreads::new(targets), None),
            None => Ok(()),
        }
    }

    /// Dorme por `ms` milisegundos (arredondado para cima em ticks).
    pub fn sleep(&self, ms: u64) -> KResult<()> {
        if ms == 0 {
            self.yield_now();
            return Ok(());
        }
        let deadline = self.jiffies.get().saturating_add(self.config.ms_to_ticks(ms));
        self.block_current(SleepUntil::new(deadline), None)
    }

    /// Status da thread.
    pub fn thread_status(&self, handle: &ThreadHandle) -> KResult<ThreadStatus> {
        self.query(handle, |t| Ok(t.status))
    }

    /// Código de saída. `ThreadDied` se a thread ainda não morreu.
    pub fn thread_exit_code(&self, handle: &ThreadHandle) -> KResult<u32> {
        self.query(handle, |t| {
            if t.status.is_dead() {
                Ok(t.exit_code)
            } else {
                Err(KError::ThreadDied)
            }
        })
    }

    /// Último erro registrado pela thread do handle.
    pub fn thread_last_error(&self, handle: &ThreadHandle) -> KResult<Option<KError>> {
        self.query(handle, |t| Ok(t.last_error))
    }

    pub fn thread_tid(&self, handle: &ThreadHandle) -> KResult<Tid> {
        self.query(handle, |t| Ok(t.tid))
    }

    pub fn thread_priority(&self, handle: &ThreadHandle) -> KResult<Priority> {
        self.query(handle, |t| Ok(t.priority))
    }

    /// Seleções recebidas na rodada atual da classe.
    pub fn thread_time_slice(&self, handle: &ThreadHandle) -> KResult<u32> {
        self.query(handle, |t| Ok(t.time_slice))
    }

    fn query<T>(&self, handle: &ThreadHandle, f: impl FnOnce(&Thread) -> KResult<T>) -> KResult<T> {
        let cpu = self.this_core();
        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let r = self
            .resolve_handle(&st, cpu, handle)
            .and_then(|slot| st.threads.get(slot).ok_or(KError::InvalidHandle))
            .and_then(f);
        Self::note_error(&mut st, cpu, r)
    }

    /// Tid da thread chamadora (`Tid::NONE` antes do bring-up).
    pub fn current_tid(&self) -> Tid {
        let cpu = self.this_core();
        let st = self.lock.enter(cpu, self.platform.as_cpu());
        self.caller(&st, cpu)
            .slot
            .and_then(|s| st.threads.get(s))
            .map_or(Tid::NONE, |t| t.tid)
    }

    /// Último erro da thread chamadora.
    pub fn last_error(&self) -> Option<KError> {
        let cpu = self.this_core();
        let st = self.lock.enter(cpu, self.platform.as_cpu());
        self.caller(&st, cpu)
            .slot
            .and_then(|s| st.threads.get(s))
            .and_then(|t| t.last_error)
    }

    // =========================================================================
    // MUTEX DO KERNEL
    // =========================================================================

    /// Adquire `mutex` em nome da thread chamadora.
    ///
    /// O dono registrado é o tid atual; sem thread corrente (antes do
    /// bring-up) falha com `AccessDenied`. Não pode ser chamado com o lock do
    /// escalonador adquirido.
    pub fn mutex_lock(&self, mutex: &Mutex, timeout: u64, block: bool) -> KResult<()> {
        let owner = self.mutex_owner()?;
        mutex.lock(owner, timeout, block)
    }

    /// Tentativa única de `mutex_lock`.
    pub fn mutex_try_lock(&self, mutex: &Mutex) -> KResult<()> {
        self.mutex_lock(mutex, 0, false)
    }

    /// Libera `mutex`; só a thread que o adquiriu consegue.
    pub fn mutex_unlock(&self, mutex: &Mutex) -> KResult<()> {
        let owner = self.mutex_owner()?;
        mutex.unlock(owner)
    }

    fn mutex_owner(&self) -> KResult<u32> {
        match self.current_tid() {
            Tid::NONE => Err(KError::AccessDenied),
            tid => Ok(tid.0),
        }
    }
}
