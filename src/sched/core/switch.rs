//! Saída de threads e liberação de registros mortos
//!
//! `exit` não pode liberar a pilha em que está rodando. Por isso é feito em
//! duas fases:
//!
//! 1. Na pilha da própria thread: registra o pedido (`ExitRequest`) no
//!    núcleo e troca para a pilha temporária do núcleo.
//! 2. Na pilha temporária, sob o lock: marca a thread como morta, carrega o
//!    espaço de endereçamento do kernel, libera a pilha, escolhe a próxima
//!    thread e salta para ela sem salvar contexto.
//!
//! Uma thread morta é liberada em etapas: a pilha assim que ela deixa de
//! estar vinculada a um núcleo; o registro quando, além disso, não restam
//! handles abertos.

use super::cpu::{CoreLocal, ExitRequest};
use super::lock::SchedState;
use super::Scheduler;
use crate::mm::aspace::AddressSpace;
use crate::sched::task::handle::ThreadHandle;
use crate::sched::task::state::ThreadStatus;
use crate::sys::error::{KError, KResult};

impl Scheduler {
    /// Termina a thread chamadora com `code`.
    ///
    /// Em hardware não retorna. Falha para a thread idle (ou antes do
    /// bring-up do núcleo).
    pub fn exit(&self, code: u32) -> KResult<()> {
        let cpu = self.this_core();
        if !cpu.is_online() || cpu.is_idle_current() {
            return Err(KError::AccessDenied);
        }
        let temp = cpu.temp_stack().ok_or(KError::OutOfMemory)?;
        let ops = self.platform.as_cpu();

        ops.disable_interrupts();
        *cpu.exit_request.lock() = Some(ExitRequest {
            slot: cpu.current(),
            code,
        });
        crate::kdebug!("(Thread) Saindo com codigo=", code);

        ops.run_on_stack(temp.top(), &mut || self.exit_on_temp_stack());
        Ok(())
    }

    /// Segunda fase de `exit`, já na pilha temporária do núcleo.
    fn exit_on_temp_stack(&self) {
        let ops = self.platform.as_cpu();
        let cpu = self.this_core();
        let Some(req) = cpu.exit_request.lock().take() else {
            return;
        };

        let mut st = self.lock.enter(cpu, ops);
        self.finish_prev(&mut st, cpu);
        st.clock += 1;

        // Outro núcleo pode ter terminado a thread antes deste lock: o código
        // registrado por ele prevalece.
        if !self.mark_dead(&mut st, req.slot, req.code) {
            crate::kdebug!("(Thread) exit de thread ja morta, slot=", req.slot);
        }
        if !cpu.aspace().is_kernel() {
            self.platform.switch_address_space(AddressSpace::KERNEL);
            cpu.set_aspace(AddressSpace::KERNEL);
        }
        let now = self.jiffies.get();
        if let Some(t) = st.threads.get_mut(req.slot) {
            t.bound_cpu = None;
            t.accounting.end_exec(now, true);
        }
        self.release_dead(&mut st, req.slot);

        self.wake_blocked(&mut st);
        let next = self.select(&mut st, cpu);
        let next_ctx = self.bind_next(&mut st, cpu, next);
        cpu.set_current(next, next_ctx);

        let irq = st.into_irq();
        // SAFETY: interrupções desabilitadas e `next` vinculado a este núcleo.
        unsafe { ops.jump_to_context(next_ctx) };

        self.finish_switch();
        if irq {
            ops.enable_interrupts();
        }
    }

    /// Epílogo de uma troca: a thread em `prev` teve o contexto salvo.
    pub(crate) fn finish_prev(&self, st: &mut SchedState, cpu: &CoreLocal) {
        let prev = cpu.take_prev();
        let Some(t) = st.threads.get_mut(prev) else {
            return;
        };
        if t.is_idle {
            return;
        }

        t.bound_cpu = None;
        t.status.remove(ThreadStatus::RUNNING);
        if let Some(handler) = t.pending_signal.take() {
            if !t.status.is_dead() {
                t.context.redirect_to(handler);
            }
        }
        let dead = t.status.is_dead();

        // Após o fallback sem lock o núcleo pode ter ficado com o espaço de
        // endereçamento da thread que saiu.
        let owner = st
            .threads
            .get(cpu.current())
            .map_or(crate::sys::types::Pid::KERNEL, |c| c.owner);
        let target = st.processes.aspace_of(owner);
        if target != cpu.aspace() {
            self.platform.switch_address_space(target);
            cpu.set_aspace(target);
        }

        if dead {
            self.release_dead(st, prev);
        }
    }

    /// Transição para `DEAD`: sai da fila e descarta o bloqueio.
    ///
    /// `DEAD` é terminal: numa thread já morta nada muda e retorna `false`.
    pub(crate) fn mark_dead(&self, st: &mut SchedState, slot: u32, code: u32) -> bool {
        let Some(t) = st.threads.get_mut(slot) else {
            return false;
        };
        if t.status.is_dead() {
            return false;
        }
        let prio = t.priority;
        let owner = t.owner;
        let tid = t.tid;
        t.status = ThreadStatus::DEAD;
        t.exit_code = code;
        t.block = None;
        t.wake_time = None;
        t.pending_signal = None;
        st.queues.remove(&mut st.threads.run_links, slot, prio);
        if let Some(p) = st.processes.get_mut(owner) {
            p.last_thread_exit = code;
        }
        crate::kdebug!("(Thread) Thread morta tid=", tid.0);
        true
    }

    /// Termina uma thread que não é a chamadora.
    pub(crate) fn kill_locked(&self, st: &mut SchedState, cpu: &CoreLocal, slot: u32, code: u32) {
        if !self.mark_dead(st, slot, code) {
            return;
        }
        match st.threads.get(slot).and_then(|t| t.bound_cpu) {
            // Ainda no epílogo deste núcleo: `finish_prev` libera
            Some(c) if c == cpu.id => {}
            Some(c) => self.kick_core(c),
            None => self.release_dead(st, slot),
        }
    }

    /// Libera o que for possível de uma thread morta e desvinculada.
    pub(crate) fn release_dead(&self, st: &mut SchedState, slot: u32) {
        let Some(t) = st.threads.get_mut(slot) else {
            return;
        };
        if !t.status.is_dead() || t.bound_cpu.is_some() {
            return;
        }
        if let Some(stack) = t.stack.take() {
            self.platform.free_stack(stack);
            crate::ktrace!("(Stack) Pilha liberada base=", stack.base);
        }
        let owner = t.owner;
        if t.refs.get() == 0 {
            self.reclaim(st, slot);
        }
        self.check_process(st, owner);
    }

    /// Remove o registro da arena (morto, desvinculado, sem handles).
    fn reclaim(&self, st: &mut SchedState, slot: u32) {
        let Some(t) = st.threads.get(slot) else {
            return;
        };
        let (owner, tid) = (t.owner, t.tid);
        if let Some(p) = st.processes.get_mut(owner) {
            p.threads.remove(&mut st.threads.proc_links, slot);
        }
        if st.threads.remove(slot).is_some() {
            crate::ktrace!("(Thread) Registro recuperado tid=", tid.0);
        }
    }

    /// Devolve a referência de um handle sob o lock.
    pub(crate) fn close_locked(&self, st: &mut SchedState, handle: ThreadHandle) -> KResult<()> {
        let slot = st
            .threads
            .resolve(handle.thread_ref())
            .ok_or(KError::InvalidHandle)?;
        let t = st.threads.get(slot).ok_or(KError::InvalidHandle)?;
        let remaining = t.refs.dec().ok_or(KError::InvalidHandle)?;
        if remaining == 0 && t.status.is_dead() && t.bound_cpu.is_none() {
            let owner = t.owner;
            self.reclaim(st, slot);
            self.check_process(st, owner);
        }
        Ok(())
    }
}
