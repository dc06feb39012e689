//! Sinais (caminho mínimo)
//!
//! Cada processo tem uma tabela de handlers (endereço da função por sinal).
//! Entregar um sinal desvia a thread alvo para o handler, que retorna ao
//! ponto interrompido. Sem handler, `call_signal_or_terminate` derruba o
//! processo com código `SIGNAL_EXIT_BASE + sinal`.
//!
//! O desvio só é aplicado com o contexto da thread salvo: se ela está
//! vinculada a um núcleo, o sinal fica pendente (a thread deixa de ser
//! selecionável) e o núcleo é forçado a sair dela; o epílogo da troca aplica
//! o desvio.

use crate::sched::config::SIGNAL_EXIT_BASE;
use crate::sched::core::Scheduler;
use crate::sched::task::handle::ThreadHandle;
use crate::sys::error::{KError, KResult};
use crate::sys::types::Pid;

/// Número de sinais por processo
pub const SIGMAX: usize = 32;

pub type Signal = u32;

pub const SIGINT: Signal = 2;
pub const SIGKILL: Signal = 9;
pub const SIGSEGV: Signal = 11;
pub const SIGTERM: Signal = 15;

/// Handlers de um processo.
#[derive(Debug, Clone)]
pub struct SignalTable {
    handlers: [Option<u64>; SIGMAX],
}

impl SignalTable {
    pub const fn new() -> Self {
        Self {
            handlers: [None; SIGMAX],
        }
    }

    /// Instala (ou remove, com `None`) o handler de `sig`.
    ///
    /// `SIGKILL` não pode ser capturado.
    pub fn set(&mut self, sig: Signal, handler: Option<u64>) -> KResult<()> {
        if sig == 0 || sig as usize >= SIGMAX || sig == SIGKILL {
            return Err(KError::InvalidParameter);
        }
        self.handlers[sig as usize] = handler;
        Ok(())
    }

    pub fn get(&self, sig: Signal) -> Option<u64> {
        self.handlers.get(sig as usize).copied().flatten()
    }
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn set_signal_handler(&self, pid: Pid, sig: Signal, handler: Option<u64>) -> KResult<()> {
        let cpu = self.this_core();
        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let caller = self.caller(&st, cpu).pid;
        let r = match st.processes.get_mut(pid) {
            None => Err(KError::NoSuchObject),
            Some(_) if caller != pid && caller != Pid::KERNEL => Err(KError::AccessDenied),
            Some(p) => p.signals.set(sig, handler),
        };
        Self::note_error(&mut st, cpu, r)
    }

    /// Desvia a thread de `handle` para o handler de `sig`.
    pub fn call_signal(&self, handle: &ThreadHandle, sig: Signal) -> KResult<()> {
        let cpu = self.this_core();
        let (r, reschedule) = {
            let mut st = self.lock.enter(cpu, self.platform.as_cpu());
            let r = self.signal_locked(&mut st, cpu, handle, sig);
            let reschedule = matches!(r, Ok(true));
            (Self::note_error(&mut st, cpu, r.map(|_| ())), reschedule)
        };
        if reschedule {
            self.schedule();
        }
        r
    }

    /// `Ok(true)` quando o alvo é a própria thread chamadora.
    fn signal_locked(
        &self,
        st: &mut crate::sched::core::lock::SchedState,
        cpu: &crate::sched::core::cpu::CoreLocal,
        handle: &ThreadHandle,
        sig: Signal,
    ) -> KResult<bool> {
        let slot = self.resolve_handle(st, cpu, handle)?;
        let caller = self.caller(st, cpu);
        let t = st.threads.get(slot).ok_or(KError::InvalidHandle)?;
        if t.status.is_dead() {
            return Err(KError::ThreadDied);
        }
        if caller.pid != Pid::KERNEL && caller.pid != t.owner {
            return Err(KError::AccessDenied);
        }
        if sig as usize >= SIGMAX {
            return Err(KError::InvalidParameter);
        }
        let handler = st
            .processes
            .get(t.owner)
            .and_then(|p| p.signals.get(sig))
            .ok_or(KError::NoSuchObject)?;

        let t = st.threads.get_mut(slot).ok_or(KError::InvalidHandle)?;
        crate::kdebug!("(Thread) Sinal entregue tid=", t.tid.0);
        match t.bound_cpu {
            None => {
                t.context.redirect_to(handler);
                Ok(false)
            }
            Some(c) => {
                t.pending_signal = Some(handler);
                if c != cpu.id {
                    self.kick_core(c);
                    Ok(false)
                } else {
                    Ok(Some(slot) == caller.slot)
                }
            }
        }
    }

    /// Como `call_signal`, mas sem handler instalado derruba o processo dono.
    pub fn call_signal_or_terminate(&self, handle: &ThreadHandle, sig: Signal) -> KResult<()> {
        match self.call_signal(handle, sig) {
            Err(KError::NoSuchObject) => {
                let owner = self.thread_owner(handle)?;
                crate::kwarn!("(Proc) Sinal sem handler, terminando pid=", owner.0);
                self.terminate_process(owner, SIGNAL_EXIT_BASE + sig)
            }
            r => r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigkill_cannot_be_caught() {
        let mut t = SignalTable::new();
        assert_eq!(t.set(SIGKILL, Some(0x1000)), Err(KError::InvalidParameter));
        assert_eq!(t.set(SIGMAX as Signal, Some(0x1000)), Err(KError::InvalidParameter));
        t.set(SIGTERM, Some(0x2000)).unwrap();
        assert_eq!(t.get(SIGTERM), Some(0x2000));
        t.set(SIGTERM, None).unwrap();
        assert_eq!(t.get(SIGTERM), None);
    }
}
