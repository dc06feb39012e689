//! # Hardware Abstraction Layer (HAL)
//!
//! O módulo `arch` é a **única** ponte entre o escalonador (lógica agnóstica)
//! e o hardware real. Toda troca de contexto, IPI, controle de interrupções e
//! gerência de pilhas/espaços de endereçamento passa pelos traits daqui.
//!
//! - `traits`: `CpuOps`, `MemoryOps` e o agregado `Platform`.
//! - `hosted`: plataforma simulada (apenas testes), onde cada thread do host
//!   faz o papel de um núcleo.

pub mod traits;

#[cfg(test)]
pub mod hosted;

pub use traits::*;
