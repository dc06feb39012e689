//! # Números das Syscalls de Threads
//!
//! **ATENÇÃO**: numeração própria, não compatível com Linux/POSIX.
//!
//! Convenção de retorno: valor >= 0 em sucesso, `-errno` em falha.
//!
//! | Número | Syscall                  | Args                         |
//! |--------|--------------------------|------------------------------|
//! | 0      | `SYS_THREAD_MAKE_HANDLE` | -                            |
//! | 1      | `SYS_THREAD_OPEN`        | (handle, tid)                |
//! | 2      | `SYS_THREAD_CREATE`      | (*const CreateThreadArgs)    |
//! | 3      | `SYS_THREAD_PAUSE`       | (handle)                     |
//! | 4      | `SYS_THREAD_RESUME`      | (handle)                     |
//! | 5      | `SYS_THREAD_SET_PRIORITY`| (handle, priority)           |
//! | 6      | `SYS_THREAD_TERMINATE`   | (handle, exit_code)          |
//! | 7      | `SYS_THREAD_STATUS`      | (handle)                     |
//! | 8      | `SYS_THREAD_EXIT_CODE`   | (handle)                     |
//! | 9      | `SYS_THREAD_LAST_ERROR`  | (handle)                     |
//! | 10     | `SYS_THREAD_TID`         | (handle)                     |
//! | 11     | `SYS_CURRENT_TID`        | -                            |
//! | 12     | `SYS_THREAD_EXIT`        | (exit_code)                  |
//! | 23     | `SYS_THREAD_CLOSE`       | (handle)                     |

/// Aloca um handle de usuário vazio.
/// Retorno: handle
pub const SYS_THREAD_MAKE_HANDLE: usize = 0;

/// Abre uma thread existente no handle vazio.
pub const SYS_THREAD_OPEN: usize = 1;

/// Cria uma thread no handle vazio.
pub const SYS_THREAD_CREATE: usize = 2;

pub const SYS_THREAD_PAUSE: usize = 3;
pub const SYS_THREAD_RESUME: usize = 4;
pub const SYS_THREAD_SET_PRIORITY: usize = 5;

/// Termina outra thread. Para a própria, `SYS_THREAD_EXIT`.
pub const SYS_THREAD_TERMINATE: usize = 6;

/// Retorno: bits de `ThreadStatus`
pub const SYS_THREAD_STATUS: usize = 7;

/// Retorno: código de saída (`-ESRCH` se a thread ainda vive)
pub const SYS_THREAD_EXIT_CODE: usize = 8;

/// Retorno: errno positivo do último erro da thread, ou 0
pub const SYS_THREAD_LAST_ERROR: usize = 9;

pub const SYS_THREAD_TID: usize = 10;
pub const SYS_CURRENT_TID: usize = 11;

/// Termina a thread chamadora. Não retorna.
pub const SYS_THREAD_EXIT: usize = 12;

/// Fecha o handle de usuário (aberto ou vazio).
pub const SYS_THREAD_CLOSE: usize = 23;
