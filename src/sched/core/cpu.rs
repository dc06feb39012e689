//! Estado por núcleo
//!
//! Um `CoreLocal` por CPU lógica, criado junto com o escalonador e ativado no
//! bring-up do núcleo. Os campos são atômicos porque outros núcleos os leem
//! (ex: `must_stop`, `online`); as escritas de `current`/`prev` acontecem sob
//! o lock do escalonador, exceto no caminho de fallback sem lock.

use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU32, AtomicU64, Ordering};

use spin::{Mutex, Once};

use crate::core::smp::CpuId;
use crate::mm::aspace::AddressSpace;
use crate::mm::stack::StackRegion;
use crate::sched::task::context::CpuContext;

/// Valor dos campos de slot quando não há thread.
pub const NO_THREAD: u32 = u32::MAX;

/// Pedido de `exit` aguardando a segunda fase na pilha temporária.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRequest {
    pub slot: u32,
    pub code: u32,
}

pub struct CoreLocal {
    /// ID lógico
    pub id: CpuId,
    /// ID de hardware (APIC ID)
    hw_id: AtomicU32,
    online: AtomicBool,
    /// Flag de reentrância: o núcleo está dentro da seção crítica
    pub(crate) in_scheduler: AtomicBool,
    /// Slot da thread que possui o núcleo
    current: AtomicU32,
    /// Slot da thread idle deste núcleo
    idle: AtomicU32,
    /// Thread que acabou de perder o núcleo e ainda não foi desvinculada
    prev: AtomicU32,
    /// A thread atual deixou de ser elegível (bloqueada, pausada, morta ou
    /// sinalizada), por ela mesma ou por outro núcleo. Espelho lido sem lock
    /// pelo caminho de lock disputado.
    must_stop: AtomicBool,
    current_ctx: AtomicPtr<CpuContext>,
    idle_ctx: AtomicPtr<CpuContext>,
    /// Raiz do espaço de endereçamento carregado
    aspace: AtomicU64,
    temp_stack: Once<StackRegion>,
    pub(crate) exit_request: Mutex<Option<ExitRequest>>,
}

impl CoreLocal {
    pub fn new(id: CpuId) -> Self {
        Self {
            id,
            hw_id: AtomicU32::new(0),
            online: AtomicBool::new(false),
            in_scheduler: AtomicBool::new(false),
            current: AtomicU32::new(NO_THREAD),
            idle: AtomicU32::new(NO_THREAD),
            prev: AtomicU32::new(NO_THREAD),
            must_stop: AtomicBool::new(false),
            current_ctx: AtomicPtr::new(core::ptr::null_mut()),
            idle_ctx: AtomicPtr::new(core::ptr::null_mut()),
            aspace: AtomicU64::new(AddressSpace::KERNEL.root()),
            temp_stack: Once::new(),
            exit_request: Mutex::new(None),
        }
    }

    #[inline]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn hw_id(&self) -> u32 {
        self.hw_id.load(Ordering::Relaxed)
    }

    /// Ativa o núcleo com a thread idle já registrada.
    pub(crate) fn bring_online(
        &self,
        hw_id: u32,
        idle: u32,
        idle_ctx: *mut CpuContext,
        temp_stack: StackRegion,
    ) {
        self.hw_id.store(hw_id, Ordering::Relaxed);
        self.idle.store(idle, Ordering::Relaxed);
        self.idle_ctx.store(idle_ctx, Ordering::Relaxed);
        self.current.store(idle, Ordering::Relaxed);
        self.current_ctx.store(idle_ctx, Ordering::Relaxed);
        self.temp_stack.call_once(|| temp_stack);
        self.online.store(true, Ordering::Release);
    }

    #[inline]
    pub fn current(&self) -> u32 {
        self.current.load(Ordering::Acquire)
    }

    #[inline]
    pub fn idle(&self) -> u32 {
        self.idle.load(Ordering::Acquire)
    }

    /// A thread atual é a idle?
    #[inline]
    pub fn is_idle_current(&self) -> bool {
        let cur = self.current();
        cur != NO_THREAD && cur == self.idle()
    }

    pub(crate) fn set_current(&self, slot: u32, ctx: *mut CpuContext) {
        self.current_ctx.store(ctx, Ordering::Release);
        self.current.store(slot, Ordering::Release);
    }

    #[inline]
    pub(crate) fn current_ctx(&self) -> *mut CpuContext {
        self.current_ctx.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn idle_ctx(&self) -> *mut CpuContext {
        self.idle_ctx.load(Ordering::Acquire)
    }

    pub(crate) fn set_prev(&self, slot: u32) {
        self.prev.store(slot, Ordering::Release);
    }

    pub(crate) fn prev(&self) -> u32 {
        self.prev.load(Ordering::Acquire)
    }

    pub(crate) fn take_prev(&self) -> u32 {
        self.prev.swap(NO_THREAD, Ordering::AcqRel)
    }

    #[inline]
    pub fn must_stop(&self) -> bool {
        self.must_stop.load(Ordering::Acquire)
    }

    pub(crate) fn request_stop(&self) {
        self.must_stop.store(true, Ordering::Release);
    }

    pub(crate) fn clear_stop(&self) {
        self.must_stop.store(false, Ordering::Release);
    }

    pub fn aspace(&self) -> AddressSpace {
        AddressSpace::new(self.aspace.load(Ordering::Acquire))
    }

    pub(crate) fn set_aspace(&self, aspace: AddressSpace) {
        self.aspace.store(aspace.root(), Ordering::Release);
    }

    pub fn temp_stack(&self) -> Option<StackRegion> {
        self.temp_stack.get().copied()
    }

    /// O núcleo está dentro da seção crítica do escalonador?
    pub fn in_scheduler(&self) -> bool {
        self.in_scheduler.load(Ordering::Acquire)
    }
}
