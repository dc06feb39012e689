//! Tempo
//!
//! Apenas o contador de ticks: o hardware de timer é da plataforma, que
//! chama `Scheduler::timer_tick` a cada interrupção.

pub mod jiffies;

pub use jiffies::Jiffies;
