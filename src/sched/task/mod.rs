//! Threads
//!
//! - `state`: máscara de status, prioridades, motivo de despertar
//! - `context`: registradores salvos e contexto inicial
//! - `entity`: o registro de thread
//! - `table`: arena de registros endereçada por índice + geração
//! - `handle`: referência contada entregue aos chamadores
//! - `predicate`: condições de bloqueio avaliadas a cada varredura
//! - `accounting`: estatísticas de escalonamento
//! - `lifecycle`: API de ciclo de vida (create, pause, terminate, ...)

pub mod accounting;
pub mod context;
pub mod entity;
pub mod handle;
pub mod lifecycle;
pub mod predicate;
pub mod state;
pub mod table;

pub use crate::sys::Tid;
pub use entity::Thread;
pub use handle::ThreadHandle;
pub use lifecycle::ThreadParams;
pub use predicate::{BlockPredicate, PredicateContext, SleepUntil, WaitForThreads};
pub use state::{Priority, ThreadStatus, WakeReason};
pub use table::{ThreadRef, ThreadTable};
