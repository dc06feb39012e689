//! # Memória do Escalonador
//!
//! O escalonador não gerencia memória física nem tabelas de páginas; ele só
//! precisa de pilhas de kernel e de identificadores de espaços de
//! endereçamento.
//!
//! - `stack`: regiões de pilha, normalização de tamanho e arena first-fit
//! - `aspace`: raiz opaca de tabelas de páginas

pub mod aspace;
pub mod config;
pub mod stack;

pub use aspace::AddressSpace;
pub use stack::{StackArena, StackRegion};
