//! Primitivas de Sincronização
//!
//! - `mutex`: spinlock com rastreamento de dono, timeout e modo
//!   não-bloqueante. Guarda a seção crítica do escalonador e é exposto ao
//!   resto do kernel.

pub mod mutex;

#[cfg(any(feature = "self_test", test))]
pub mod test;

pub use mutex::Mutex;
