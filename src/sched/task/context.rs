//! Context switch
//!
//! Snapshot de registradores de uma thread. O assembly de troca fica na
//! plataforma (`CpuOps::switch_context`); aqui só montamos o contexto
//! inicial e aplicamos redirecionamentos de sinal.
//!
//! Offsets (repr(C)), usados pelo assembly da plataforma:
//! 0:rbx, 8:rbp, 16:r12, 24:r13, 32:r14, 40:r15, 48:rsp, 56:rip,
//! 64:rdi, 72:rflags, 80:cs, 88:ss, 96:pending_return, 104:has_pending_return

use crate::sched::config::{
    KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR, RFLAGS_IF, RFLAGS_RESERVED, USER_CODE_SELECTOR,
    USER_DATA_SELECTOR,
};

/// Contexto de CPU (registradores salvos)
///
/// NOTA: estado FPU/SSE não é salvo; o kernel não usa SSE.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuContext {
    // Callee-saved registers (SysV ABI)
    pub rbx: u64,
    pub rbp: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,

    // Stack pointer
    pub rsp: u64,

    // Instruction pointer
    pub rip: u64,

    /// Primeiro argumento (SysV): o `userdata` da thread na primeira execução
    pub rdi: u64,

    pub rflags: u64,
    pub cs: u64,
    pub ss: u64,

    /// Endereço de retorno a empilhar antes de retomar (entrega de sinal).
    /// A plataforma escreve `pending_return` em `[rsp]` com o espaço de
    /// endereçamento da thread já carregado e zera `has_pending_return`.
    pub pending_return: u64,
    pub has_pending_return: u64,
}

impl CpuContext {
    /// Cria CpuContext zerado
    pub const fn new() -> Self {
        Self {
            rbx: 0,
            rbp: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            rsp: 0,
            rip: 0,
            rdi: 0,
            rflags: 0,
            cs: 0,
            ss: 0,
            pending_return: 0,
            has_pending_return: 0,
        }
    }

    /// Configura para iniciar em `entry(arg)` sobre a pilha `stack_top`.
    ///
    /// `entry` e `arg` são usados literalmente (vêm do loader). Threads de
    /// usuário recebem seletores ring 3 e interrupções habilitadas.
    pub fn setup(&mut self, entry: u64, arg: u64, stack_top: u64, user_mode: bool) {
        *self = Self::new();
        self.rip = entry;
        self.rdi = arg;
        // Alinhamento SysV: rsp+8 múltiplo de 16 na entrada da função
        self.rsp = (stack_top & !0xF).wrapping_sub(8);
        self.rbp = 0;
        if user_mode {
            self.cs = USER_CODE_SELECTOR;
            self.ss = USER_DATA_SELECTOR;
            self.rflags = RFLAGS_RESERVED | RFLAGS_IF;
        } else {
            self.cs = KERNEL_CODE_SELECTOR;
            self.ss = KERNEL_DATA_SELECTOR;
            self.rflags = RFLAGS_RESERVED;
        }
    }

    #[inline]
    pub fn is_user(&self) -> bool {
        self.cs & 3 == 3
    }

    /// Desvia a execução para `handler`, que retornará para o ponto interrompido.
    pub fn redirect_to(&mut self, handler: u64) {
        self.rsp = self.rsp.wrapping_sub(8);
        self.pending_return = self.rip;
        self.has_pending_return = 1;
        self.rip = handler;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_uses_entry_and_arg_verbatim() {
        let mut ctx = CpuContext::new();
        ctx.setup(0xdead_b000, 0x1234, 0x8000_0000, false);
        assert_eq!(ctx.rip, 0xdead_b000);
        assert_eq!(ctx.rdi, 0x1234);
        assert_eq!(ctx.rsp, 0x8000_0000 - 8);
        assert_eq!(ctx.cs, KERNEL_CODE_SELECTOR);
        assert!(!ctx.is_user());
        assert_eq!(ctx.rflags & RFLAGS_IF, 0);
    }

    #[test]
    fn user_threads_get_ring3_and_interrupts() {
        let mut ctx = CpuContext::new();
        ctx.setup(0x40_0000, 0, 0x7fff_f000, true);
        assert!(ctx.is_user());
        assert_eq!(ctx.ss, USER_DATA_SELECTOR);
        assert_ne!(ctx.rflags & RFLAGS_IF, 0);
    }

    #[test]
    fn redirect_saves_interrupted_ip() {
        let mut ctx = CpuContext::new();
        ctx.setup(0x1000, 0, 0x9000, true);
        let rsp = ctx.rsp;
        ctx.redirect_to(0x5000);
        assert_eq!(ctx.rip, 0x5000);
        assert_eq!(ctx.pending_return, 0x1000);
        assert_eq!(ctx.has_pending_return, 1);
        assert_eq!(ctx.rsp, rsp - 8);
    }
}
