//! System Definitions (ABI).
//!
//! Tipos e códigos de erro que definem a interface entre o escalonador e o
//! resto do sistema.

pub mod error;
pub mod types;

pub use error::{Errno, KError, KResult};
pub use types::{Pid, Tid};
