//! # Códigos de Erro
//!
//! Dois níveis:
//! - `KError`: erros estruturados do escalonador e das primitivas de
//!   sincronização, usados internamente e pela API de threads.
//! - `Errno`: códigos POSIX devolvidos negativos em RAX pelas syscalls.
//!
//! Todo `KError` tem um `Errno` correspondente (`KError::to_errno`).

use core::fmt;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    Success = 0,
    EPERM = 1,      // Operation not permitted
    ENOENT = 2,     // No such file or directory
    ESRCH = 3,      // No such process
    EBADF = 9,      // Bad file number
    ENOMEM = 12,    // Out of memory
    EBUSY = 16,     // Device or resource busy
    EEXIST = 17,    // File exists
    EINVAL = 22,    // Invalid argument
    ENOSYS = 38,    // Function not implemented
    ETIMEDOUT = 110, // Connection timed out
}

impl Errno {
    pub fn as_usize(self) -> usize {
        self as usize
    }

    pub fn as_isize(self) -> isize {
        -(self as i32) as isize
    }
}

/// Erros do escalonador e da API de threads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KError {
    /// Handle não aberto, já fechado, com geração antiga ou de outro processo
    InvalidHandle,
    /// Prioridade desconhecida, máscara de afinidade sem núcleos online, etc
    InvalidParameter,
    /// A thread já terminou (ou ainda não terminou, para consulta do código de saída)
    ThreadDied,
    /// Operação proibida para o chamador
    AccessDenied,
    /// Sem memória para registro, pilha ou espaço de endereçamento
    OutOfMemory,
    /// Nenhuma thread ou processo com o id pedido
    NoSuchObject,
    /// Mutex ocupado em aquisição não-bloqueante
    MutexLocked,
    /// Prazo esgotado (mutex ou bloqueio com timeout)
    Timeout,
    /// Handle de usuário já aberto
    AlreadyExists,
}

impl KError {
    pub fn as_str(&self) -> &'static str {
        match self {
            KError::InvalidHandle => "Handle inválido",
            KError::InvalidParameter => "Parâmetro inválido",
            KError::ThreadDied => "Estado terminal da thread incompatível com a operação",
            KError::AccessDenied => "Acesso negado",
            KError::OutOfMemory => "Sem memória",
            KError::NoSuchObject => "Objeto inexistente",
            KError::MutexLocked => "Mutex ocupado",
            KError::Timeout => "Tempo esgotado",
            KError::AlreadyExists => "Handle já aberto",
        }
    }

    pub fn to_errno(self) -> Errno {
        match self {
            KError::InvalidHandle => Errno::EBADF,
            KError::InvalidParameter => Errno::EINVAL,
            KError::ThreadDied => Errno::ESRCH,
            KError::AccessDenied => Errno::EPERM,
            KError::OutOfMemory => Errno::ENOMEM,
            KError::NoSuchObject => Errno::ENOENT,
            KError::MutexLocked => Errno::EBUSY,
            KError::Timeout => Errno::ETIMEDOUT,
            KError::AlreadyExists => Errno::EEXIST,
        }
    }
}

impl fmt::Display for KError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<KError> for Errno {
    fn from(e: KError) -> Self {
        e.to_errno()
    }
}

/// Result type para operações do escalonador
pub type KResult<T> = Result<T, KError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_is_negative_in_rax() {
        assert_eq!(Errno::EINVAL.as_isize(), -22);
        assert_eq!(KError::Timeout.to_errno().as_isize(), -110);
        assert_eq!(Errno::from(KError::InvalidHandle), Errno::EBADF);
    }

    #[test]
    fn display_uses_message() {
        use alloc::string::ToString;
        assert_eq!(KError::AccessDenied.to_string(), "Acesso negado");
    }
}
