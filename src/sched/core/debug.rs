//! Ferramentas de Debug para o Escalonador

use alloc::vec::Vec;

use super::cpu::NO_THREAD;
use super::Scheduler;
use crate::core::smp::CpuId;
use crate::sched::task::state::{Priority, ThreadStatus};
use crate::sys::types::{Pid, Tid};

/// Cópia do estado de uma thread em um instante.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadInfo {
    pub tid: Tid,
    pub owner: Pid,
    pub status: ThreadStatus,
    pub priority: Priority,
    pub time_slice: u32,
    pub bound_cpu: Option<CpuId>,
    pub refs: usize,
    pub selections: u64,
    pub is_idle: bool,
}

/// Cópia de uma fila de execução.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueInfo {
    pub priority: Priority,
    pub len: usize,
    pub iterations: u64,
}

impl Scheduler {
    /// Estado de todas as threads com registro.
    pub fn snapshot(&self) -> Vec<ThreadInfo> {
        let cpu = self.this_core();
        let st = self.lock.enter(cpu, self.platform.as_cpu());
        st.threads
            .iter()
            .map(|(_, t)| ThreadInfo {
                tid: t.tid,
                owner: t.owner,
                status: t.status,
                priority: t.priority,
                time_slice: t.time_slice,
                bound_cpu: t.bound_cpu,
                refs: t.refs.get(),
                selections: t.accounting.selections,
                is_idle: t.is_idle,
            })
            .collect()
    }

    pub fn queue_info(&self, prio: Priority) -> QueueInfo {
        let cpu = self.this_core();
        let st = self.lock.enter(cpu, self.platform.as_cpu());
        let q = st.queues.get(prio);
        QueueInfo {
            priority: prio,
            len: q.len(),
            iterations: q.iterations,
        }
    }

    /// Tid da thread que possui o núcleo `cpu`.
    pub fn current_tid_on(&self, cpu: CpuId) -> Option<Tid> {
        let core = self.core(cpu)?;
        if !core.is_online() {
            return None;
        }
        let this = self.this_core();
        let st = self.lock.enter(this, self.platform.as_cpu());
        let slot = core.current();
        if slot == NO_THREAD {
            return None;
        }
        st.threads.get(slot).map(|t| t.tid)
    }

    /// Confere, sob o lock, as invariantes de status, vínculo e filas.
    pub fn verify(&self) -> Result<(), &'static str> {
        let this = self.this_core();
        let st = self.lock.enter(this, self.platform.as_cpu());

        for (slot, t) in st.threads.iter() {
            if !t.status.is_consistent() {
                return Err("RUNNING combinado com BLOCKED, PAUSED ou DEAD");
            }
            if t.status.contains(ThreadStatus::RUNNING) && t.bound_cpu.is_none() {
                return Err("thread RUNNING sem nucleo");
            }
            let queued = st.threads.run_links[slot as usize].is_linked();
            if t.is_idle || t.status.is_dead() {
                if queued {
                    return Err("idle ou morta em fila de execucao");
                }
            } else if !st.queues.get(t.priority).iter(&st.threads.run_links).any(|s| s == slot) {
                return Err("thread viva fora da fila da sua prioridade");
            }
        }

        let mut seen: Vec<u32> = Vec::new();
        for (id, core) in self.cpus.iter() {
            if !core.is_online() {
                continue;
            }
            let cur = core.current();
            if seen.contains(&cur) {
                return Err("mesma thread atual em dois nucleos");
            }
            seen.push(cur);
            match st.threads.get(cur) {
                Some(t) if t.bound_cpu == Some(id) => {}
                _ => return Err("thread atual nao vinculada ao nucleo"),
            }
        }
        Ok(())
    }

    /// Imprime filas, threads e núcleos no log.
    pub fn dump_threads(&self) {
        let this = self.this_core();
        let st = self.lock.enter(this, self.platform.as_cpu());

        crate::kinfo!("--- (Sched) ESTADO DO ESCALONADOR ---");
        crate::kinfo!("  jiffies=", self.jiffies.get());
        for prio in Priority::DESCENDING {
            let q = st.queues.get(prio);
            crate::kinfo!("  Fila prio=", prio.as_u32());
            crate::kinfo!("    tamanho=", q.len());
            crate::kinfo!("    iteracoes=", q.iterations);
            for slot in q.iter(&st.threads.run_links) {
                if let Some(t) = st.threads.get(slot) {
                    crate::kinfo!("    -> tid=", t.tid.0);
                    crate::kinfo!("       status=", t.status.bits());
                    crate::kinfo!("       fatia=", t.time_slice);
                }
            }
        }
        for (id, core) in self.cpus.iter() {
            if !core.is_online() {
                continue;
            }
            crate::kinfo!("  CPU ", id);
            if let Some(t) = st.threads.get(core.current()) {
                crate::kinfo!("    atual tid=", t.tid.0);
            }
            if let Some(t) = st.threads.get(core.idle()) {
                crate::kinfo!("    idle tid=", t.tid.0);
            }
        }
        crate::kinfo!("--- fim ---");
    }
}
