//! Thread Control Block

use alloc::boxed::Box;

use super::accounting::Accounting;
use super::context::CpuContext;
use super::predicate::BlockPredicate;
use super::state::{Priority, ThreadStatus, WakeReason};
use crate::core::object::RefCount;
use crate::core::smp::{CpuId, CpuMask};
use crate::mm::stack::StackRegion;
use crate::sys::error::KError;
use crate::sys::types::{Pid, Tid};

/// Thread Control Block
///
/// Vive na arena `ThreadTable` e é alterado somente sob o lock do
/// escalonador. Os enlaces de fila ficam em arrays paralelos da tabela.
pub struct Thread {
    /// ID único
    pub tid: Tid,
    /// Processo dono
    pub owner: Pid,
    /// Máscara de status
    pub status: ThreadStatus,
    /// Classe de prioridade (e cota)
    pub priority: Priority,
    /// Seleções recebidas na rodada atual da classe
    pub time_slice: u32,
    /// Contexto de CPU salvo (em Box para ter endereço estável)
    pub context: Box<CpuContext>,
    /// Pilha de kernel; `None` para threads idle e após a liberação
    pub stack: Option<StackRegion>,
    /// Núcleos que podem rodar a thread agora
    pub affinity: CpuMask,
    /// Afinidade pedida na criação, restaurada a cada preempção
    pub original_affinity: CpuMask,
    /// Relógio do escalonador na última preempção (justiça dentro da classe)
    pub last_preempted: u64,
    /// Predicado de bloqueio (presente apenas com BLOCKED)
    pub block: Option<Box<dyn BlockPredicate>>,
    /// Prazo (jiffies) do bloqueio atual
    pub wake_time: Option<u64>,
    /// Motivo do último despertar
    pub wake_reason: Option<WakeReason>,
    pub exit_code: u32,
    /// Último erro de uma operação de ciclo de vida feita POR esta thread
    pub last_error: Option<KError>,
    /// Handles abertos
    pub refs: RefCount,
    /// Núcleo cujo contexto ainda pertence a esta thread (rodando ou salvando)
    pub bound_cpu: Option<CpuId>,
    /// Thread idle de um núcleo: nunca entra em fila nem pode ser aberta
    pub is_idle: bool,
    pub user_mode: bool,
    /// Handler de sinal aguardando o contexto ficar livre
    pub pending_signal: Option<u64>,
    pub accounting: Accounting,
}

impl Thread {
    pub fn new(
        tid: Tid,
        owner: Pid,
        priority: Priority,
        context: CpuContext,
        stack: Option<StackRegion>,
        affinity: CpuMask,
    ) -> Self {
        Self {
            tid,
            owner,
            status: ThreadStatus::CAN_RUN,
            priority,
            time_slice: 0,
            context: Box::new(context),
            stack,
            affinity,
            original_affinity: affinity,
            last_preempted: 0,
            block: None,
            wake_time: None,
            wake_reason: None,
            exit_code: 0,
            last_error: None,
            refs: RefCount::new(0),
            bound_cpu: None,
            is_idle: false,
            user_mode: context.is_user(),
            pending_signal: None,
            accounting: Accounting::new(),
        }
    }

    /// Pode ser escolhida pelo núcleo `cpu` agora?
    pub fn is_selectable_on(&self, cpu: CpuId) -> bool {
        self.status.is_eligible()
            && self.affinity.contains(cpu)
            && self.bound_cpu.map_or(true, |c| c == cpu)
            && self.pending_signal.is_none()
    }

    /// Ainda tem fatias nesta rodada da classe.
    #[inline]
    pub fn has_quota(&self) -> bool {
        self.is_idle || self.time_slice < self.priority.quota()
    }

    #[inline]
    pub fn context_ptr(&mut self) -> *mut CpuContext {
        &mut *self.context as *mut CpuContext
    }
}
