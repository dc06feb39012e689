//! Arquivo: core/smp/mod.rs
//!
//! Propósito: Suporte a Multiprocessamento Simétrico (SMP).
//!
//! Módulos contidos:
//! - `percpu`: Dados replicados por núcleo.
//! - `topology`: `CpuId` e máscaras de afinidade.
//! - `ipi`: Vetores e destinos de Inter-Processor Interrupts.

pub mod ipi;
pub mod percpu;
pub mod topology;

pub use percpu::{PerCpu, MAX_CPUS};
pub use topology::{CpuId, CpuMask};
