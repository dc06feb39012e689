//! Interface Abstrata de CPU (HAL).
//! Define as operações de processador que o escalonador usa. A plataforma
//! (x86_64 no kernel, simulada nos testes) fornece a implementação.

use crate::core::smp::ipi::{IpiTarget, IpiVector};
use crate::core::smp::CpuId;
use crate::sched::task::context::CpuContext;

pub trait CpuOps: Send + Sync {
    /// CPU lógica que está executando o chamador.
    fn current_cpu(&self) -> CpuId;

    /// Para a execução da CPU até a próxima interrupção (instrução HLT).
    fn halt(&self);

    /// Desabilita interrupções no núcleo atual (CLI).
    fn disable_interrupts(&self);

    /// Habilita interrupções no núcleo atual (STI).
    fn enable_interrupts(&self);

    /// Verifica se as interrupções estão habilitadas.
    fn are_interrupts_enabled(&self) -> bool;

    /// Envia uma IPI (ex: reschedule para o núcleo que roda uma thread pausada).
    fn send_ipi(&self, target: IpiTarget, vector: IpiVector);

    /// Salva o contexto atual em `old` e retoma `new`.
    ///
    /// Retorna quando alguém voltar a escalonar `old`.
    ///
    /// # Safety
    ///
    /// - Interrupções devem estar desabilitadas.
    /// - Ambos os ponteiros devem apontar para contextos vivos.
    /// - A pilha de `new` deve estar mapeada no espaço de endereçamento atual.
    unsafe fn switch_context(&self, old: *mut CpuContext, new: *const CpuContext);

    /// Retoma `new` sem salvar o contexto atual.
    ///
    /// Em hardware nunca retorna; a implementação simulada retorna para que o
    /// teste possa continuar.
    ///
    /// # Safety
    ///
    /// Mesmas regras de `switch_context`.
    unsafe fn jump_to_context(&self, new: *const CpuContext);

    /// Executa `f` sobre a pilha que termina em `stack_top`.
    ///
    /// Usado para a segunda fase de `exit`: a pilha da thread que está
    /// morrendo não pode ser liberada enquanto ainda é a pilha ativa.
    fn run_on_stack(&self, stack_top: u64, f: &mut dyn FnMut());

    /// Entra em loop infinito de halt com interrupções desabilitadas.
    /// Usado em falhas irrecuperáveis.
    fn hang(&self) -> ! {
        self.disable_interrupts();
        loop {
            self.halt();
        }
    }
}
