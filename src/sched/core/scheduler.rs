//! # Loop do Escalonador
//!
//! Executado a cada tick do timer e a cada yield/bloqueio, somente no núcleo
//! chamador:
//!
//! 1. Núcleo já dentro da seção crítica: retorna (o timer disparou de novo).
//! 2. Tenta o lock sem bloquear. Se outro núcleo está decidindo e a thread
//!    atual deixou de ser elegível, troca para a idle local sem lock. A
//!    elegibilidade é lida de `must_stop`, que toda transição para fora de
//!    CAN_RUN da thread atual liga (bloqueio, pausa, sinal, término remoto).
//! 3. Carimba a thread atual (`last_preempted`), limpa `RUNNING` e restaura a
//!    afinidade original.
//! 4. Varre as threads bloqueadas (HIGH → IDLE) avaliando os predicados.
//! 5. Seleciona: classes da maior para a menor; dentro da classe, a elegível
//!    preemptada há mais tempo com fatia abaixo da cota. Classe esgotada tem
//!    os contadores zerados antes da próxima varredura. Duas varreduras sem
//!    escolha caem na idle do núcleo.
//! 6. Mesma thread: nada a trocar. Senão vincula a nova thread ao núcleo,
//!    libera o lock e troca o contexto.
//!
//! Uma thread continua vinculada (`bound_cpu`) ao núcleo de onde saiu até o
//! epílogo da troca (`finish_switch`), quando seu contexto já foi salvo. Só
//! então outro núcleo pode escolhê-la ou sua pilha pode ser liberada.

use super::cpu::{CoreLocal, NO_THREAD};
use super::lock::SchedState;
use super::Scheduler;
use crate::core::debug::fatal;
use crate::core::smp::CpuMask;
use crate::sched::config::{PRIORITY_COUNT, SELECTION_SWEEPS};
use crate::sched::task::context::CpuContext;
use crate::sched::task::predicate::PredicateContext;
use crate::sched::task::state::{Priority, ThreadStatus, WakeReason};

/// Resultado da varredura de uma classe.
enum ClassScan {
    Picked(u32),
    /// Há elegíveis, mas todas atingiram a cota
    Exhausted,
    /// Nenhuma thread elegível neste núcleo
    Empty,
}

impl Scheduler {
    /// Tick do timer no núcleo atual. Só o núcleo 0 avança o relógio.
    pub fn timer_tick(&self) {
        let cpu = self.this_core();
        if !cpu.is_online() {
            return;
        }
        if cpu.id == 0 {
            self.jiffies.inc();
        }
        self.schedule();
    }

    /// Cede o núcleo voluntariamente.
    pub fn yield_now(&self) {
        self.schedule();
    }

    /// Executa uma decisão de escalonamento no núcleo chamador.
    pub fn schedule(&self) {
        let ops = self.platform.as_cpu();
        let cpu = self.this_core();
        if !cpu.is_online() || cpu.in_scheduler() {
            return;
        }

        let Some(mut st) = self.lock.try_enter(cpu, ops) else {
            self.contended(cpu);
            return;
        };

        self.finish_prev(&mut st, cpu);
        st.clock += 1;

        let cur = cpu.current();
        self.preempt(&mut st, cpu, cur);
        self.wake_blocked(&mut st);
        let next = self.select(&mut st, cpu);

        if next == cur {
            if let Some(t) = st.threads.get_mut(cur) {
                t.status.insert(ThreadStatus::RUNNING);
            }
            return;
        }

        let next_ctx = self.bind_next(&mut st, cpu, next);
        let cur_ctx = cpu.current_ctx();
        cpu.set_prev(cur);
        cpu.set_current(next, next_ctx);

        let irq = st.into_irq();
        // SAFETY: interrupções desabilitadas; `cur` e `next` continuam
        // vinculados a este núcleo, então seus registros (e contextos) vivem
        // até o epílogo.
        unsafe { ops.switch_context(cur_ctx, next_ctx) };

        // De volta na thread `cur`, possivelmente em outro núcleo.
        self.finish_switch();
        if irq {
            ops.enable_interrupts();
        }
    }

    /// Epílogo da troca: desvincula a thread que saiu do núcleo.
    ///
    /// Roda logo após cada troca; threads novas chegam aqui pelo gancho
    /// `anvil_finish_switch` do trampolim de entrada.
    pub fn finish_switch(&self) {
        let cpu = self.this_core();
        if cpu.prev() == NO_THREAD {
            return;
        }
        if let Some(mut st) = self.lock.try_enter(cpu, self.platform.as_cpu()) {
            self.finish_prev(&mut st, cpu);
        }
    }

    /// Lock disputado: sai da thread atual sem lock se ela não pode continuar.
    fn contended(&self, cpu: &CoreLocal) {
        if !cpu.must_stop() || cpu.prev() != NO_THREAD || cpu.is_idle_current() {
            return;
        }

        let ops = self.platform.as_cpu();
        let irq = ops.are_interrupts_enabled();
        ops.disable_interrupts();

        let cur = cpu.current();
        let cur_ctx = cpu.current_ctx();
        let idle_ctx = cpu.idle_ctx();
        cpu.clear_stop();
        cpu.set_prev(cur);
        cpu.set_current(cpu.idle(), idle_ctx);
        crate::ktrace!("(Sched) Lock disputado, indo para idle na cpu=", cpu.id);

        // SAFETY: `cur` segue vinculado a este núcleo até o epílogo; o
        // contexto da idle nunca é liberado.
        unsafe { ops.switch_context(cur_ctx, idle_ctx) };

        self.finish_switch();
        if irq {
            ops.enable_interrupts();
        }
    }

    /// Passo 3: a thread atual perde o núcleo.
    fn preempt(&self, st: &mut SchedState, cpu: &CoreLocal, cur: u32) {
        cpu.clear_stop();
        let clock = st.clock;
        let Some(t) = st.threads.get_mut(cur) else {
            return;
        };
        if t.status.is_dead() {
            return;
        }
        t.status.remove(ThreadStatus::RUNNING);
        t.last_preempted = clock;
        if !t.is_idle {
            t.affinity = t.original_affinity;
        }
    }

    /// Passo 4: avalia os predicados das threads bloqueadas.
    pub(crate) fn wake_blocked(&self, st: &mut SchedState) {
        let now = self.jiffies.get();
        for prio in Priority::DESCENDING {
            let mut cursor = st.queues.get(prio).head();
            while let Some(slot) = cursor {
                cursor = st.threads.run_links[slot as usize].next();
                self.poll_blocked(st, slot, now);
            }
        }
    }

    fn poll_blocked(&self, st: &mut SchedState, slot: u32, now: u64) {
        let Some(t) = st.threads.get_mut(slot) else {
            return;
        };
        if !t.status.contains(ThreadStatus::BLOCKED) {
            return;
        }
        if t.status.contains(ThreadStatus::IN_BLOCK_CALLBACK) {
            crate::kerror!("(Sched) Predicado reentrante, tid=", t.tid.0);
            fatal(self.platform.as_cpu(), "(Sched) avaliacao reentrante de predicado", Some(slot as u64));
        }

        let tid = t.tid;
        let wake_time = t.wake_time;
        let satisfied = match t.block.take() {
            Some(mut pred) => {
                t.status.insert(ThreadStatus::IN_BLOCK_CALLBACK);
                let ok = pred.poll(&PredicateContext::new(&st.threads, now, tid, wake_time));
                let Some(t) = st.threads.get_mut(slot) else {
                    return;
                };
                t.status.remove(ThreadStatus::IN_BLOCK_CALLBACK);
                if !ok {
                    t.block = Some(pred);
                }
                ok
            }
            None => false,
        };

        let reason = if satisfied {
            Some(WakeReason::Condition)
        } else if wake_time.is_some_and(|w| now >= w) {
            Some(WakeReason::Timeout)
        } else {
            None
        };

        if let (Some(reason), Some(t)) = (reason, st.threads.get_mut(slot)) {
            t.status.remove(ThreadStatus::BLOCKED);
            t.block = None;
            t.wake_time = None;
            t.wake_reason = Some(reason);
            crate::ktrace!("(Sched) Thread desbloqueada tid=", tid.0);
        }
    }

    /// Passo 5: escolhe a próxima thread deste núcleo (ou a idle).
    pub(crate) fn select(&self, st: &mut SchedState, cpu: &CoreLocal) -> u32 {
        let mut had_eligible = [false; PRIORITY_COUNT];
        let mut picked = None;

        'sweeps: for _ in 0..SELECTION_SWEEPS {
            for prio in Priority::DESCENDING {
                match self.scan_class(st, prio, cpu.id) {
                    ClassScan::Picked(slot) => {
                        had_eligible[prio.index()] = true;
                        picked = Some((slot, prio));
                        break 'sweeps;
                    }
                    ClassScan::Exhausted => {
                        had_eligible[prio.index()] = true;
                        Self::reset_class(st, prio);
                    }
                    ClassScan::Empty => {}
                }
            }
        }

        // Classes abaixo da escolhida não foram varridas nesta invocação.
        if let Some((_, served)) = picked {
            for prio in Priority::DESCENDING {
                if prio.index() < served.index() && !had_eligible[prio.index()] {
                    had_eligible[prio.index()] = Self::class_has_eligible(st, prio, cpu.id);
                }
            }
        }

        for prio in Priority::DESCENDING {
            let q = st.queues.get_mut(prio);
            match picked {
                Some((_, served)) if served == prio => q.iterations = 0,
                _ if had_eligible[prio.index()] => q.iterations += 1,
                _ => {}
            }
        }

        match picked {
            Some((slot, _)) => slot,
            None => cpu.idle(),
        }
    }

    fn scan_class(&self, st: &mut SchedState, prio: Priority, cpu: crate::core::smp::CpuId) -> ClassScan {
        let mut best: Option<(u32, u64)> = None;
        let mut eligible = false;

        let mut cursor = st.queues.get(prio).head();
        while let Some(slot) = cursor {
            cursor = st.threads.run_links[slot as usize].next();
            let Some(t) = st.threads.get_mut(slot) else {
                continue;
            };

            if t.status.contains(ThreadStatus::CLEAR_TIME_SLICE) {
                t.time_slice = 0;
                t.status.remove(ThreadStatus::CLEAR_TIME_SLICE);
            }
            if !t.is_selectable_on(cpu) {
                continue;
            }
            eligible = true;
            if !t.has_quota() {
                continue;
            }
            if best.map_or(true, |(_, stamp)| t.last_preempted < stamp) {
                best = Some((slot, t.last_preempted));
            }
        }

        match (best, eligible) {
            (Some((slot, _)), _) => ClassScan::Picked(slot),
            (None, true) => ClassScan::Exhausted,
            (None, false) => ClassScan::Empty,
        }
    }

    /// A classe tem alguma thread que este núcleo poderia rodar (com ou sem
    /// cota)? Não altera nenhum registro.
    fn class_has_eligible(st: &SchedState, prio: Priority, cpu: crate::core::smp::CpuId) -> bool {
        st.queues
            .get(prio)
            .iter(&st.threads.run_links)
            .any(|slot| st.threads.get(slot).is_some_and(|t| t.is_selectable_on(cpu)))
    }

    /// Marca a classe inteira para zerar as fatias na próxima varredura.
    fn reset_class(st: &mut SchedState, prio: Priority) {
        let mut cursor = st.queues.get(prio).head();
        while let Some(slot) = cursor {
            cursor = st.threads.run_links[slot as usize].next();
            if let Some(t) = st.threads.get_mut(slot) {
                t.status.insert(ThreadStatus::CLEAR_TIME_SLICE);
            }
        }
    }

    /// Passo 6: vincula `next` a este núcleo e carrega seu espaço de
    /// endereçamento. Retorna o contexto a retomar.
    pub(crate) fn bind_next(&self, st: &mut SchedState, cpu: &CoreLocal, next: u32) -> *mut CpuContext {
        let now = self.jiffies.get();
        let ops = self.platform.as_cpu();

        let Some(t) = st.threads.get_mut(next) else {
            fatal(ops, "(Sched) thread selecionada nao existe", Some(next as u64));
        };
        if t.status.contains(ThreadStatus::RUNNING) || t.bound_cpu.is_some_and(|c| c != cpu.id) {
            crate::kerror!("(Sched) Thread ja possui outro nucleo, tid=", t.tid.0);
            crate::kerror!("(Sched) status=", t.status.bits());
            crate::kerror!("(Sched) rip=", t.context.rip);
            crate::kerror!("(Sched) rsp=", t.context.rsp);
            fatal(ops, "(Sched) thread selecionada ja esta RUNNING", Some(t.bound_cpu.unwrap_or(u32::MAX) as u64));
        }
        if !t.status.is_consistent() {
            fatal(ops, "(Sched) status inconsistente", Some(t.status.bits() as u64));
        }

        if !t.is_idle {
            t.affinity = CpuMask::single(cpu.id);
            t.time_slice += 1;
        }
        t.status.insert(ThreadStatus::RUNNING);
        t.bound_cpu = Some(cpu.id);
        t.accounting.start_exec(now);
        let ctx = t.context_ptr();
        let owner = t.owner;
        crate::ktrace!("(Sched) Selecionada tid=", t.tid.0);

        if let Some(c) = st.threads.get_mut(cpu.current()) {
            if c.bound_cpu == Some(cpu.id) && !c.status.contains(ThreadStatus::RUNNING) {
                let voluntary = !c.status.is_eligible();
                c.accounting.end_exec(now, voluntary);
            }
        }

        let target = st.processes.aspace_of(owner);
        if target != cpu.aspace() {
            self.platform.switch_address_space(target);
            cpu.set_aspace(target);
        }
        ctx
    }
}
