//! Syscalls de Threads
//!
//! Interface de userspace para a API de threads. Userspace nunca vê
//! `ThreadHandle`s: pede um handle de usuário vazio (`SYS_THREAD_MAKE_HANDLE`),
//! preenche com `open`/`create` e opera por ele. A tabela de handles é por
//! processo.
//!
//! # Módulos
//!
//! - `abi`: argumentos em registradores e structs de parâmetros
//! - `numbers`: números das syscalls
//! - `handle`: tabela de handles de usuário (índice + geração)
//! - `dispatch`: tabela de handlers e ponto de entrada

pub mod abi;
pub mod dispatch;
pub mod handle;
pub mod numbers;

pub use abi::{CreateThreadArgs, SyscallArgs};
pub use dispatch::dispatch;
pub use handle::{HandleTable, UserObject};
