//! # Pilhas de Kernel
//!
//! Regiões de pilha das threads e a arena que as fornece.
//!
//! A arena usa `linked_list_allocator::Heap` sobre uma região contígua
//! reservada pela plataforma no boot. Alocação é first-fit; pilhas liberadas
//! voltam à lista de buracos e são fundidas com vizinhas.

use core::alloc::Layout;
use core::ptr::NonNull;

use linked_list_allocator::Heap;
use spin::Mutex;

use crate::klib::align_up;
use crate::mm::config::{PAGE_SIZE, STACK_ALIGN};

/// Região de pilha `[base, base + size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    pub base: u64,
    pub size: usize,
}

impl StackRegion {
    pub const fn new(base: u64, size: usize) -> Self {
        Self { base, size }
    }

    /// Topo da pilha (a pilha cresce para baixo).
    pub const fn top(&self) -> u64 {
        self.base + self.size as u64
    }

    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.top()
    }
}

/// Normaliza o tamanho pedido para uma pilha.
///
/// Zero vira `default`; o resultado é sempre múltiplo de página.
pub const fn normalize_stack_size(requested: usize, default: usize) -> usize {
    let size = if requested == 0 { default } else { requested };
    align_up(size, PAGE_SIZE)
}

struct ArenaInner {
    heap: Heap,
}

// SAFETY: o Heap só referencia a região reservada para a arena, que não
// pertence a nenhuma CPU em particular. O acesso é serializado pelo Mutex.
unsafe impl Send for ArenaInner {}

/// Arena first-fit de pilhas de kernel.
pub struct StackArena {
    inner: Mutex<ArenaInner>,
}

impl StackArena {
    /// Arena vazia; toda alocação falha até `init`.
    pub const fn empty() -> Self {
        Self {
            inner: Mutex::new(ArenaInner { heap: Heap::empty() }),
        }
    }

    /// Entrega a região `[base, base + size)` para a arena.
    ///
    /// # Safety
    ///
    /// A região deve estar mapeada, ser exclusiva da arena e viver enquanto
    /// ela existir. Só pode ser chamada uma vez.
    pub unsafe fn init(&self, base: *mut u8, size: usize) {
        self.inner.lock().heap.init(base, size);
        crate::kinfo!("(Stack) Arena inicializada tamanho=", size);
    }

    pub fn allocate(&self, size: usize) -> Option<StackRegion> {
        let layout = Layout::from_size_align(size, STACK_ALIGN).ok()?;
        let ptr = self.inner.lock().heap.allocate_first_fit(layout).ok()?;
        crate::ktrace!("(Stack) Pilha alocada base=", ptr.as_ptr() as u64);
        Some(StackRegion::new(ptr.as_ptr() as u64, size))
    }

    pub fn free(&self, stack: StackRegion) {
        let (Ok(layout), Some(ptr)) = (
            Layout::from_size_align(stack.size, STACK_ALIGN),
            NonNull::new(stack.base as *mut u8),
        ) else {
            crate::kwarn!("(Stack) Liberação de pilha inválida base=", stack.base);
            return;
        };
        // SAFETY: a região veio de `allocate` com o mesmo layout.
        unsafe { self.inner.lock().heap.deallocate(ptr, layout) };
        crate::ktrace!("(Stack) Pilha liberada base=", stack.base);
    }

    /// Bytes em uso.
    pub fn used(&self) -> usize {
        self.inner.lock().heap.used()
    }

    /// Bytes livres.
    pub fn free_bytes(&self) -> usize {
        self.inner.lock().heap.free()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec;

    fn arena(size: usize) -> StackArena {
        let region: &'static mut [u8] = Box::leak(vec![0u8; size].into_boxed_slice());
        let arena = StackArena::empty();
        unsafe { arena.init(region.as_mut_ptr(), region.len()) };
        arena
    }

    #[test]
    fn normalizes_sizes() {
        assert_eq!(normalize_stack_size(0, 8192), 8192);
        assert_eq!(normalize_stack_size(1, 8192), 4096);
        assert_eq!(normalize_stack_size(4096, 8192), 4096);
        assert_eq!(normalize_stack_size(4097, 8192), 8192);
    }

    #[test]
    fn allocate_and_free_reuse_space() {
        let a = arena(64 * 1024);
        let s1 = a.allocate(16 * 1024).unwrap();
        let s2 = a.allocate(16 * 1024).unwrap();
        assert_ne!(s1.base, s2.base);
        assert_eq!(s1.top(), s1.base + 16 * 1024);
        assert!(a.used() >= 32 * 1024);

        a.free(s1);
        a.free(s2);
        assert_eq!(a.used(), 0);
        assert!(a.allocate(48 * 1024).is_some());
    }

    #[test]
    fn exhaustion_returns_none() {
        let a = arena(16 * 1024);
        assert!(a.allocate(8 * 1024).is_some());
        assert!(a.allocate(32 * 1024).is_none());
        assert!(StackArena::empty().allocate(4096).is_none());
    }
}
