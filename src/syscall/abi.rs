//! ABI das Syscalls (x86_64)
//!
//! # Convenção de Registradores
//!
//! | Registrador | Uso                       |
//! |-------------|---------------------------|
//! | RAX         | Número da syscall         |
//! | RDI         | Argumento 1               |
//! | RSI         | Argumento 2               |
//! | RDX         | Argumento 3               |
//! | R10         | Argumento 4               |
//! | R8          | Argumento 5               |
//! | R9          | Argumento 6               |
//! | RAX         | Retorno (valor ou -errno) |
//!
//! Parâmetros que não cabem em registradores vão numa struct `#[repr(C)]`
//! na memória do processo, validada pela plataforma antes da leitura.

/// Máximo de argumentos suportados por syscall
pub const MAX_SYSCALL_ARGS: usize = 6;

/// Argumentos de syscall extraídos do contexto
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallArgs {
    pub num: usize,
    pub arg1: usize,
    pub arg2: usize,
    pub arg3: usize,
    pub arg4: usize,
    pub arg5: usize,
    pub arg6: usize,
}

impl SyscallArgs {
    pub const fn new(num: usize, args: [usize; MAX_SYSCALL_ARGS]) -> Self {
        Self {
            num,
            arg1: args[0],
            arg2: args[1],
            arg3: args[2],
            arg4: args[3],
            arg5: args[4],
            arg6: args[5],
        }
    }

    /// Argumentos vazios (para testes)
    pub const fn empty() -> Self {
        Self::new(0, [0; MAX_SYSCALL_ARGS])
    }
}

/// Parâmetros de `SYS_THREAD_CREATE`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateThreadArgs {
    /// Handle de usuário vazio que recebe a thread
    pub handle: u32,
    /// IDLE=1, LOW=2, NORMAL=4, HIGH=8
    pub priority: u32,
    /// 0 = tamanho padrão
    pub stack_size: u64,
    pub entry: u64,
    pub arg: u64,
    /// 0 = todos os núcleos online
    pub affinity: u64,
    /// 0 = processo do chamador
    pub process: u32,
    /// Diferente de zero cria a thread pausada
    pub start_paused: u32,
}
