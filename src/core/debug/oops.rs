//! Arquivo: core/debug/oops.rs
//!
//! Propósito: Parada fatal do núcleo.
//! Usado quando uma invariante interna do escalonador é violada (thread
//! selecionada já rodando em outro núcleo, predicado de bloqueio reentrante,
//! etc). Não existe recuperação: o estado compartilhado já é suspeito.
//!
//! Detalhes de Implementação:
//! - Loga o erro de forma visível, com um valor hex opcional.
//! - Com a feature `smp`, para os demais núcleos via IPI de pânico.
//! - Desabilita interrupções e trava o núcleo atual (`CpuOps::hang`).

use crate::arch::traits::CpuOps;

/// Para o núcleo atual após registrar o diagnóstico.
///
/// O chamador deve ter registrado antes qualquer dump adicional (thread,
/// contexto) que ajude a entender a falha.
pub fn fatal(cpu: &dyn CpuOps, msg: &str, value: Option<u64>) -> ! {
    crate::kerror!("*****************************************************");
    crate::kerror!("*              FALHA FATAL DO ESCALONADOR           *");
    crate::kerror!("*****************************************************");
    crate::kerror!(msg);
    if let Some(v) = value {
        crate::kerror!("valor=", v);
    }
    crate::kerror!("cpu=", cpu.current_cpu());

    #[cfg(feature = "smp")]
    cpu.send_ipi(
        crate::core::smp::ipi::IpiTarget::AllButSelf,
        crate::core::smp::ipi::IpiVector::Panic,
    );

    cpu.disable_interrupts();
    cpu.hang()
}
