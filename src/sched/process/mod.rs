//! Contêineres de processo
//!
//! Um processo possui um espaço de endereçamento, a lista de suas threads
//! (lista de índices na arena, família `proc_links`), a tabela de handles de
//! usuário e a tabela de handlers de sinal.
//!
//! Ciclo de vida:
//! - `Alive` enquanto houver thread viva ou ainda vinculada a um núcleo.
//! - `Dead` quando a última thread morre e sai do núcleo: o espaço de
//!   endereçamento é destruído e os handles de usuário são fechados.
//! - O registro some quando a lista de threads esvazia (último handle
//!   fechado). Os filhos passam para o processo do kernel.
//!
//! O processo do kernel (`Pid::KERNEL`) existe desde o boot e nunca morre.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::core::smp::ipi::{IpiTarget, IpiVector};
use crate::klib::list::IndexList;
use crate::mm::aspace::AddressSpace;
use crate::sched::core::lock::SchedState;
use crate::sched::core::Scheduler;
use crate::sched::signal::SignalTable;
use crate::sched::task::state::ThreadStatus;
use crate::sys::error::{KError, KResult};
use crate::sys::types::Pid;
use crate::syscall::handle::HandleTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Alive,
    Dead,
}

pub struct Process {
    pub pid: Pid,
    pub parent: Option<Pid>,
    pub children: Vec<Pid>,
    pub aspace: AddressSpace,
    pub user_mode: bool,
    /// Threads do processo (inclusive mortas ainda referenciadas)
    pub threads: IndexList,
    pub state: ProcessState,
    /// Definido por `terminate_process`; senão, o código da última thread
    pub exit_code: Option<u32>,
    pub last_thread_exit: u32,
    pub signals: SignalTable,
    pub handles: HandleTable,
}

impl Process {
    pub fn new(pid: Pid, parent: Option<Pid>, aspace: AddressSpace, user_mode: bool) -> Self {
        Self {
            pid,
            parent,
            children: Vec::new(),
            aspace,
            user_mode,
            threads: IndexList::new(),
            state: ProcessState::Alive,
            exit_code: None,
            last_thread_exit: 0,
            signals: SignalTable::new(),
            handles: HandleTable::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == ProcessState::Alive
    }
}

/// Lista global de processos.
pub struct ProcessTable {
    procs: BTreeMap<Pid, Process>,
    next_pid: u32,
}

impl ProcessTable {
    /// Tabela contendo apenas o processo do kernel.
    pub fn new() -> Self {
        let mut procs = BTreeMap::new();
        procs.insert(
            Pid::KERNEL,
            Process::new(Pid::KERNEL, None, AddressSpace::KERNEL, false),
        );
        Self { procs, next_pid: 1 }
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.procs.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.procs.get_mut(&pid)
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.procs.keys().copied()
    }

    /// Espaço de endereçamento de `pid` (kernel se o processo sumiu).
    pub fn aspace_of(&self, pid: Pid) -> AddressSpace {
        self.get(pid).map_or(AddressSpace::KERNEL, |p| p.aspace)
    }

    fn alloc_pid(&mut self) -> Pid {
        let pid = Pid(self.next_pid);
        self.next_pid += 1;
        pid
    }

    fn insert(&mut self, proc: Process) {
        self.procs.insert(proc.pid, proc);
    }

    fn remove(&mut self, pid: Pid) -> Option<Process> {
        self.procs.remove(&pid)
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Cria um processo filho do processo chamador.
    pub fn create_process(&self, user_mode: bool) -> KResult<Pid> {
        let aspace = if user_mode {
            self.platform
                .create_address_space(true)
                .ok_or(KError::OutOfMemory)?
        } else {
            AddressSpace::KERNEL
        };

        let cpu = self.this_core();
        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let parent = self.caller(&st, cpu).pid;

        let pid = st.processes.alloc_pid();
        st.processes
            .insert(Process::new(pid, Some(parent), aspace, user_mode));
        if let Some(p) = st.processes.get_mut(parent) {
            p.children.push(pid);
        }

        crate::kdebug!("(Proc) Processo criado pid=", pid.0);
        Ok(pid)
    }

    /// Termina todas as threads de `pid` (e, antes, seus filhos).
    ///
    /// Se a thread chamadora pertence ao processo, ela sai por último pela
    /// pilha temporária do núcleo; em hardware esta chamada não retorna.
    pub fn terminate_process(&self, pid: Pid, code: u32) -> KResult<()> {
        let cpu = self.this_core();
        let exiting_self = {
            let mut st = self.lock.enter(cpu, self.platform.as_cpu());
            let r = self.terminate_process_locked(&mut st, cpu, pid, code);
            let r = Self::note_error(&mut st, cpu, r);
            r?
        };

        if exiting_self {
            self.exit(code)?;
        }
        Ok(())
    }

    /// Retorna `true` quando a thread chamadora pertence a `pid` e ainda
    /// precisa sair.
    pub(crate) fn terminate_process_locked(
        &self,
        st: &mut SchedState,
        cpu: &crate::sched::core::cpu::CoreLocal,
        pid: Pid,
        code: u32,
    ) -> KResult<bool> {
        if pid == Pid::KERNEL {
            return Err(KError::AccessDenied);
        }
        let caller = self.caller(st, cpu);
        let proc = st.processes.get_mut(pid).ok_or(KError::NoSuchObject)?;
        if !proc.is_alive() {
            return Err(KError::ThreadDied);
        }
        if caller.pid != Pid::KERNEL && caller.pid != pid && proc.parent != Some(caller.pid) {
            return Err(KError::AccessDenied);
        }
        proc.exit_code.get_or_insert(code);

        let children = proc.children.clone();
        for child in children {
            // Filhos já mortos não impedem a terminação do pai
            let _ = self.terminate_process_locked(st, cpu, child, code);
        }

        let mut exiting_self = false;
        let slots: Vec<u32> = match st.processes.get(pid) {
            Some(p) => p.threads.iter(&st.threads.proc_links).collect(),
            None => Vec::new(),
        };
        for slot in slots {
            if Some(slot) == caller.slot {
                if let Some(t) = st.threads.get_mut(slot) {
                    t.status.insert(ThreadStatus::IS_EXITING_PROCESS);
                }
                exiting_self = true;
                continue;
            }
            // Marcada por uma terminação anterior: já está a caminho da
            // própria `exit`, que registra o código dela
            let leaving = st.threads.get(slot).is_some_and(|t| {
                t.status.is_dead() || t.status.contains(ThreadStatus::IS_EXITING_PROCESS)
            });
            if !leaving {
                self.kill_locked(st, cpu, slot, code);
            }
        }

        crate::kinfo!("(Proc) Processo terminado pid=", pid.0);
        Ok(exiting_self)
    }

    /// Verifica se o processo morreu ou pode ser descartado.
    ///
    /// Chamado sempre que uma thread sua morre, sai de um núcleo ou é
    /// recuperada.
    pub(crate) fn check_process(&self, st: &mut SchedState, pid: Pid) {
        if pid == Pid::KERNEL {
            return;
        }
        let Some(proc) = st.processes.get(pid) else {
            return;
        };

        if proc.is_alive() {
            let live = proc.threads.iter(&st.threads.proc_links).any(|s| {
                st.threads
                    .get(s)
                    .is_some_and(|t| !t.status.is_dead() || t.bound_cpu.is_some())
            });
            if live {
                return;
            }

            let Some(proc) = st.processes.get_mut(pid) else {
                return;
            };
            proc.state = ProcessState::Dead;
            let last = proc.last_thread_exit;
            proc.exit_code.get_or_insert(last);
            let aspace = proc.aspace;
            let handles = proc.handles.drain();

            if !aspace.is_kernel() {
                self.platform.destroy_address_space(aspace);
                crate::kdebug!("(Proc) Espaco de enderecamento destruido, raiz=", aspace.root());
            }
            for h in handles {
                let tid = h.tid();
                if let Err(e) = self.close_locked(st, h) {
                    crate::kwarn!("(Proc) Falha ao fechar handle de usuario, tid=", tid.0);
                    crate::kwarn!(e.as_str());
                }
            }
        }

        let Some(proc) = st.processes.get(pid) else {
            return;
        };
        if !proc.threads.is_empty() {
            return;
        }

        if let Some(proc) = st.processes.remove(pid) {
            if let Some(parent) = proc.parent.and_then(|pp| st.processes.get_mut(pp)) {
                parent.children.retain(|&c| c != pid);
            }
            for child in proc.children {
                if let Some(c) = st.processes.get_mut(child) {
                    c.parent = Some(Pid::KERNEL);
                }
                if let Some(k) = st.processes.get_mut(Pid::KERNEL) {
                    k.children.push(child);
                }
            }
            crate::kdebug!("(Proc) Registro descartado pid=", pid.0);
        }
    }

    /// Código de saída de um processo morto.
    pub fn process_exit_code(&self, pid: Pid) -> KResult<u32> {
        let cpu = self.this_core();
        let st = self.lock.enter(cpu, self.platform.as_cpu());
        let p = st.processes.get(pid).ok_or(KError::NoSuchObject)?;
        match (p.state, p.exit_code) {
            (ProcessState::Dead, Some(code)) => Ok(code),
            _ => Err(KError::ThreadDied),
        }
    }

    pub fn is_user_mode(&self, pid: Pid) -> KResult<bool> {
        let cpu = self.this_core();
        let st = self.lock.enter(cpu, self.platform.as_cpu());
        st.processes
            .get(pid)
            .map(|p| p.user_mode)
            .ok_or(KError::NoSuchObject)
    }

    pub fn process_state(&self, pid: Pid) -> Option<ProcessState> {
        let cpu = self.this_core();
        let st = self.lock.enter(cpu, self.platform.as_cpu());
        st.processes.get(pid).map(|p| p.state)
    }

    /// Processo da thread chamadora.
    pub fn current_pid(&self) -> Pid {
        let cpu = self.this_core();
        let st = self.lock.enter(cpu, self.platform.as_cpu());
        self.caller(&st, cpu).pid
    }

    pub fn process_children(&self, pid: Pid) -> Vec<Pid> {
        let cpu = self.this_core();
        let st = self.lock.enter(cpu, self.platform.as_cpu());
        st.processes
            .get(pid)
            .map(|p| p.children.clone())
            .unwrap_or_default()
    }

    /// Força o núcleo `target` a sair da thread atual.
    pub(crate) fn kick_core(&self, target: crate::core::smp::CpuId) {
        if let Some(core) = self.cpus.get(target) {
            core.request_stop();
            self.platform
                .send_ipi(IpiTarget::Single(target), IpiVector::Reschedule);
        }
    }

    /// Tira o núcleo `target` da thread atual (depuração e desligamento).
    pub fn stop_core(&self, target: crate::core::smp::CpuId) -> KResult<()> {
        let core = self.cpus.get(target).ok_or(KError::InvalidParameter)?;
        if !core.is_online() {
            return Err(KError::InvalidParameter);
        }
        crate::kdebug!("(SMP) Parando nucleo=", target);
        self.kick_core(target);
        Ok(())
    }

    /// Pede ao núcleo `target` uma nova decisão de escalonamento.
    pub fn reschedule_core(&self, target: crate::core::smp::CpuId) -> KResult<()> {
        let core = self.cpus.get(target).ok_or(KError::InvalidParameter)?;
        if !core.is_online() {
            return Err(KError::InvalidParameter);
        }
        self.platform
            .send_ipi(IpiTarget::Single(target), IpiVector::Reschedule);
        Ok(())
    }
}
