//! Módulos centrais do núcleo.
//!
//! - `logging`: macros de log zero-overhead (kerror!, kinfo!, ...)
//! - `debug`: destino dos logs e diagnóstico fatal
//! - `smp`: identificação de CPUs, máscaras de afinidade, IPIs
//! - `time`: contador de ticks
//! - `object`: contagem de referências e handles com geração

pub mod debug;
pub mod logging;
pub mod object;
pub mod smp;
pub mod time;
