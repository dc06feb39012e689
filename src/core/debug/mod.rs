//! Depuração do núcleo
//!
//! - `klog`: destino dos macros de log
//! - `oops`: parada fatal com diagnóstico

pub mod klog;
pub mod oops;

pub use oops::fatal;
