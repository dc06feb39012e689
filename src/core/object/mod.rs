//! # Object - Objetos do Núcleo
//!
//! Blocos básicos compartilhados por threads e handles de usuário.

pub mod handle;
pub mod refcount;

pub use handle::Handle;
pub use refcount::RefCount;
