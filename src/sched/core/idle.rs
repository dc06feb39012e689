//! Bring-up de núcleo e thread idle
//!
//! Cada núcleo tem uma thread idle própria: prioridade IDLE, cota ilimitada,
//! fora das filas de execução, sempre vinculada ao seu núcleo. Ela nunca
//! morre e não pode ser aberta nem terminada.
//!
//! O fluxo de boot do núcleo se torna a idle: o registro é criado sem pilha
//! e o contexto é preenchido na primeira troca.

use super::Scheduler;
use crate::core::smp::CpuMask;
use crate::mm::stack::normalize_stack_size;
use crate::sched::task::context::CpuContext;
use crate::sched::task::entity::Thread;
use crate::sched::task::state::{Priority, ThreadStatus};
use crate::sys::error::{KError, KResult};
use crate::sys::types::Pid;

impl Scheduler {
    /// Ativa o núcleo chamador. O chamador passa a ser a thread idle dele.
    pub fn bring_up_cpu(&self, hw_id: u32) -> KResult<()> {
        let cpu = self.this_core();
        if cpu.is_online() {
            return Err(KError::AlreadyExists);
        }

        let temp_size = normalize_stack_size(self.config.temp_stack_size, self.config.temp_stack_size);
        let temp = self
            .platform
            .allocate_stack(temp_size)
            .ok_or(KError::OutOfMemory)?;

        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let tid = st.alloc_tid();
        let mut idle = Thread::new(
            tid,
            Pid::KERNEL,
            Priority::Idle,
            CpuContext::new(),
            None,
            CpuMask::single(cpu.id),
        );
        idle.is_idle = true;
        idle.bound_cpu = Some(cpu.id);
        idle.status = ThreadStatus::CAN_RUN | ThreadStatus::RUNNING;

        let Some(r) = st.threads.insert(idle) else {
            drop(st);
            self.platform.free_stack(temp);
            return Err(KError::OutOfMemory);
        };
        let st = &mut *st;
        if let Some(k) = st.processes.get_mut(Pid::KERNEL) {
            k.threads.push_back(&mut st.threads.proc_links, r.slot);
        }
        let ctx = match st.threads.get_mut(r.slot) {
            Some(t) => t.context_ptr(),
            None => return Err(KError::OutOfMemory),
        };

        cpu.bring_online(hw_id, r.slot, ctx, temp);
        self.mark_online(cpu);

        crate::kinfo!("(SMP) Nucleo online, cpu=", cpu.id);
        crate::kdebug!("(SMP) Thread idle tid=", tid.0);
        Ok(())
    }

    /// Corpo da thread idle: espera interrupções para sempre.
    pub fn idle_loop(&self) -> ! {
        let ops = self.platform.as_cpu();
        loop {
            ops.enable_interrupts();
            ops.halt();
        }
    }
}
