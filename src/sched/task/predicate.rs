//! Predicados de bloqueio
//!
//! Uma thread bloqueada guarda um predicado que o escalonador avalia a cada
//! varredura (passo 4 do loop). Não existem filas de espera por condição: o
//! custo é O(threads bloqueadas) por tick e a latência de despertar é de até
//! um tick, em troca de nenhuma referência pendurada em filas de espera.
//!
//! O predicado roda DENTRO da seção crítica do escalonador, com a thread
//! marcada `IN_BLOCK_CALLBACK`: não pode chamar a API de threads.

use alloc::vec::Vec;

use super::state::ThreadStatus;
use super::table::{ThreadRef, ThreadTable};
use crate::sys::types::Tid;

/// Visão somente-leitura entregue ao predicado.
pub struct PredicateContext<'a> {
    threads: &'a ThreadTable,
    now: u64,
    tid: Tid,
    wake_time: Option<u64>,
}

impl<'a> PredicateContext<'a> {
    pub(crate) fn new(threads: &'a ThreadTable, now: u64, tid: Tid, wake_time: Option<u64>) -> Self {
        Self {
            threads,
            now,
            tid,
            wake_time,
        }
    }

    /// Jiffies atuais.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Thread bloqueada que está sendo avaliada.
    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn wake_time(&self) -> Option<u64> {
        self.wake_time
    }

    /// Status de outra thread; `None` se o registro já foi recuperado.
    pub fn thread_status(&self, r: ThreadRef) -> Option<ThreadStatus> {
        let slot = self.threads.resolve(r)?;
        self.threads.get(slot).map(|t| t.status)
    }

    /// Registro recuperado conta como morto (só se recupera após a morte).
    pub fn is_dead(&self, r: ThreadRef) -> bool {
        self.thread_status(r).map_or(true, |s| s.is_dead())
    }
}

/// Condição arbitrária que libera uma thread bloqueada.
pub trait BlockPredicate: Send {
    /// `true` libera a thread.
    fn poll(&mut self, ctx: &PredicateContext<'_>) -> bool;
}

impl<F> BlockPredicate for F
where
    F: FnMut(&PredicateContext<'_>) -> bool + Send,
{
    fn poll(&mut self, ctx: &PredicateContext<'_>) -> bool {
        self(ctx)
    }
}

/// Satisfeito quando todas as threads alvo estão mortas (`wait_for`).
pub struct WaitForThreads {
    targets: Vec<ThreadRef>,
}

impl WaitForThreads {
    pub fn new(targets: Vec<ThreadRef>) -> Self {
        Self { targets }
    }
}

impl BlockPredicate for WaitForThreads {
    fn poll(&mut self, ctx: &PredicateContext<'_>) -> bool {
        self.targets.iter().all(|&t| ctx.is_dead(t))
    }
}

/// Satisfeito quando o relógio alcança o prazo (`sleep`).
pub struct SleepUntil {
    deadline: u64,
}

impl SleepUntil {
    pub const fn new(deadline: u64) -> Self {
        Self { deadline }
    }
}

impl BlockPredicate for SleepUntil {
    fn poll(&mut self, ctx: &PredicateContext<'_>) -> bool {
        ctx.now() >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::smp::CpuMask;
    use crate::sched::task::context::CpuContext;
    use crate::sched::task::entity::Thread;
    use crate::sched::task::state::Priority;
    use crate::sys::types::Pid;

    fn table_with(n: u32) -> (ThreadTable, Vec<ThreadRef>) {
        let mut t = ThreadTable::new(16);
        let refs = (1..=n)
            .map(|i| {
                t.insert(Thread::new(
                    Tid(i),
                    Pid::KERNEL,
                    Priority::Low,
                    CpuContext::new(),
                    None,
                    CpuMask::single(0),
                ))
                .unwrap()
            })
            .collect();
        (t, refs)
    }

    #[test]
    fn wait_for_requires_every_target_dead() {
        let (mut table, refs) = table_with(2);
        let mut p = WaitForThreads::new(refs.clone());

        assert!(!p.poll(&PredicateContext::new(&table, 0, Tid(9), None)));
        table.get_mut(refs[0].slot).unwrap().status = ThreadStatus::DEAD;
        assert!(!p.poll(&PredicateContext::new(&table, 0, Tid(9), None)));
        table.remove(refs[1].slot);
        assert!(p.poll(&PredicateContext::new(&table, 0, Tid(9), None)));
    }

    #[test]
    fn sleep_until_and_closures() {
        let (table, _) = table_with(0);
        let mut s = SleepUntil::new(10);
        assert!(!s.poll(&PredicateContext::new(&table, 9, Tid(1), None)));
        assert!(s.poll(&PredicateContext::new(&table, 10, Tid(1), None)));

        let mut calls = 0u32;
        let mut f = move |_: &PredicateContext<'_>| {
            calls += 1;
            calls == 2
        };
        let ctx = PredicateContext::new(&table, 0, Tid(1), None);
        assert!(!BlockPredicate::poll(&mut f, &ctx));
        assert!(BlockPredicate::poll(&mut f, &ctx));
    }
}
