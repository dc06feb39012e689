//! Plataforma simulada para testes no host.
//!
//! Cada thread do host escolhe qual núcleo representa (`set_current_cpu`).
//! Trocas de contexto não trocam nada: são registradas e retornam na hora,
//! como se a thread escolhida tivesse rodado e voltado ao escalonador. Pilhas
//! vêm de uma `StackArena` sobre um buffer do host.

use std::boxed::Box;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::vec;
use std::vec::Vec;

use spin::Mutex;

use crate::arch::traits::{CpuOps, MemoryOps};
use crate::core::smp::ipi::{IpiTarget, IpiVector};
use crate::core::smp::{CpuId, MAX_CPUS};
use crate::mm::aspace::AddressSpace;
use crate::mm::stack::{StackArena, StackRegion};
use crate::sched::task::context::CpuContext;

std::thread_local! {
    static CURRENT_CPU: Cell<CpuId> = const { Cell::new(0) };
}

/// Define o núcleo representado pela thread do host.
pub fn set_current_cpu(cpu: CpuId) {
    CURRENT_CPU.with(|c| c.set(cpu));
}

/// Executa `f` como o núcleo `cpu` e volta ao núcleo anterior.
pub fn on_cpu<R>(cpu: CpuId, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_CPU.with(|c| c.replace(cpu));
    let r = f();
    set_current_cpu(prev);
    r
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchRecord {
    pub cpu: CpuId,
    pub from: usize,
    pub to: usize,
    /// `jump_to_context` (sem salvar o contexto de origem)
    pub jump: bool,
}

pub struct HostedPlatform {
    irq: [AtomicBool; MAX_CPUS],
    arena: StackArena,
    fail_stacks: AtomicBool,
    live_stacks: AtomicUsize,
    next_aspace: AtomicU64,
    loaded: [AtomicU64; MAX_CPUS],
    destroyed: Mutex<Vec<AddressSpace>>,
    switches: Mutex<Vec<SwitchRecord>>,
    ipis: Mutex<Vec<(CpuId, IpiTarget, IpiVector)>>,
    temp_stack_runs: AtomicUsize,
}

impl HostedPlatform {
    /// Plataforma com `arena_size` bytes de pilhas.
    pub fn new(arena_size: usize) -> Arc<Self> {
        let region: &'static mut [u8] = Box::leak(vec![0u8; arena_size].into_boxed_slice());
        let arena = StackArena::empty();
        // SAFETY: o buffer foi vazado e pertence só à arena.
        unsafe { arena.init(region.as_mut_ptr(), region.len()) };

        Arc::new(Self {
            irq: core::array::from_fn(|_| AtomicBool::new(true)),
            arena,
            fail_stacks: AtomicBool::new(false),
            live_stacks: AtomicUsize::new(0),
            next_aspace: AtomicU64::new(0x1000),
            loaded: core::array::from_fn(|_| AtomicU64::new(AddressSpace::KERNEL.root())),
            destroyed: Mutex::new(Vec::new()),
            switches: Mutex::new(Vec::new()),
            ipis: Mutex::new(Vec::new()),
            temp_stack_runs: AtomicUsize::new(0),
        })
    }

    fn cpu_index() -> usize {
        CURRENT_CPU.with(|c| c.get()) as usize % MAX_CPUS
    }

    /// Faz as próximas alocações de pilha falharem.
    pub fn fail_stack_allocations(&self, fail: bool) {
        self.fail_stacks.store(fail, Ordering::SeqCst);
    }

    pub fn live_stacks(&self) -> usize {
        self.live_stacks.load(Ordering::SeqCst)
    }

    pub fn switches(&self) -> Vec<SwitchRecord> {
        self.switches.lock().clone()
    }

    pub fn switch_count(&self) -> usize {
        self.switches.lock().len()
    }

    pub fn ipis(&self) -> Vec<(CpuId, IpiTarget, IpiVector)> {
        self.ipis.lock().clone()
    }

    pub fn destroyed_aspaces(&self) -> Vec<AddressSpace> {
        self.destroyed.lock().clone()
    }

    /// Espaço de endereçamento carregado no núcleo.
    pub fn loaded_aspace(&self, cpu: CpuId) -> AddressSpace {
        AddressSpace::new(self.loaded[cpu as usize].load(Ordering::SeqCst))
    }

    pub fn temp_stack_runs(&self) -> usize {
        self.temp_stack_runs.load(Ordering::SeqCst)
    }
}

impl CpuOps for HostedPlatform {
    fn current_cpu(&self) -> CpuId {
        CURRENT_CPU.with(|c| c.get())
    }

    fn halt(&self) {
        std::thread::yield_now();
    }

    fn disable_interrupts(&self) {
        self.irq[Self::cpu_index()].store(false, Ordering::SeqCst);
    }

    fn enable_interrupts(&self) {
        self.irq[Self::cpu_index()].store(true, Ordering::SeqCst);
    }

    fn are_interrupts_enabled(&self) -> bool {
        self.irq[Self::cpu_index()].load(Ordering::SeqCst)
    }

    fn send_ipi(&self, target: IpiTarget, vector: IpiVector) {
        let from = CURRENT_CPU.with(|c| c.get());
        self.ipis.lock().push((from, target, vector));
    }

    unsafe fn switch_context(&self, old: *mut CpuContext, new: *const CpuContext) {
        assert!(!self.are_interrupts_enabled(), "troca com interrupcoes habilitadas");
        self.switches.lock().push(SwitchRecord {
            cpu: CURRENT_CPU.with(|c| c.get()),
            from: old as usize,
            to: new as usize,
            jump: false,
        });
    }

    unsafe fn jump_to_context(&self, new: *const CpuContext) {
        assert!(!self.are_interrupts_enabled(), "salto com interrupcoes habilitadas");
        self.switches.lock().push(SwitchRecord {
            cpu: CURRENT_CPU.with(|c| c.get()),
            from: 0,
            to: new as usize,
            jump: true,
        });
    }

    fn run_on_stack(&self, stack_top: u64, f: &mut dyn FnMut()) {
        assert_ne!(stack_top, 0);
        self.temp_stack_runs.fetch_add(1, Ordering::SeqCst);
        f();
    }

    fn hang(&self) -> ! {
        panic!("hang: falha fatal no nucleo {}", CURRENT_CPU.with(|c| c.get()));
    }
}

impl MemoryOps for HostedPlatform {
    fn allocate_stack(&self, size: usize) -> Option<StackRegion> {
        if self.fail_stacks.load(Ordering::SeqCst) {
            return None;
        }
        let s = self.arena.allocate(size)?;
        self.live_stacks.fetch_add(1, Ordering::SeqCst);
        Some(s)
    }

    fn free_stack(&self, stack: StackRegion) {
        self.live_stacks.fetch_sub(1, Ordering::SeqCst);
        self.arena.free(stack);
    }

    fn create_address_space(&self, _user_mode: bool) -> Option<AddressSpace> {
        Some(AddressSpace::new(
            self.next_aspace.fetch_add(0x1000, Ordering::SeqCst),
        ))
    }

    fn switch_address_space(&self, aspace: AddressSpace) {
        self.loaded[Self::cpu_index()].store(aspace.root(), Ordering::SeqCst);
    }

    fn destroy_address_space(&self, aspace: AddressSpace) {
        let loaded_somewhere = self
            .loaded
            .iter()
            .any(|l| l.load(Ordering::SeqCst) == aspace.root());
        assert!(!loaded_somewhere, "espaco de enderecamento destruido enquanto carregado");
        self.destroyed.lock().push(aspace);
    }

    fn can_access_user(&self, addr: u64, len: usize) -> bool {
        addr != 0 && addr.checked_add(len as u64).is_some()
    }
}
