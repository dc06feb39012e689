//! Kernel Library (KLib).
//!
//! Utilitários agnósticos de hardware para uso interno do escalonador.

pub mod list;
pub mod test_framework;

/// Alinha um endereço para cima.
///
/// # Exemplo
/// `align_up(10, 4) -> 12`
#[inline]
pub const fn align_up(addr: usize, align: usize) -> usize {
    (addr + align - 1) & !(align - 1)
}
