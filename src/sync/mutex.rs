//! Mutex com rastreamento de dono e timeout
//!
//! Spinlock puro: nunca dorme nem chama o escalonador, por isso pode guardar a
//! própria seção crítica do escalonador. O "dono" é um identificador opaco de
//! 32 bits. O resto do kernel passa por `Scheduler::mutex_lock`/`mutex_unlock`,
//! que usam o tid da thread atual; a forma crua com dono explícito fica para
//! o lock do escalonador, que usa um token por núcleo.
//!
//! # Semântica
//!
//! - `lock` pelo dono atual retorna sucesso imediatamente (recursivo, sem
//!   contagem: um único `unlock` libera).
//! - `lock` não-bloqueante em mutex ocupado falha com `MutexLocked`.
//! - `timeout` diferente de zero limita o número de tentativas de CAS.
//! - `unlock` por quem não é dono falha com `AccessDenied`.
//! - Uma thread que morre segurando o mutex o deixa ocupado para sempre.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::sys::error::{KError, KResult};

/// Valor de `owner` quando ninguém segura o mutex.
pub const NO_OWNER: u32 = 0;

pub struct Mutex {
    /// Estado do lock
    locked: AtomicBool,
    /// Identificador de quem segura o lock
    owner: AtomicU32,
    /// Marcado no primeiro uso ou em `init`; limpo por `destroy`
    initialized: AtomicBool,
}

impl Mutex {
    /// Mutex já inicializado.
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            owner: AtomicU32::new(NO_OWNER),
            initialized: AtomicBool::new(true),
        }
    }

    /// Mutex que será inicializado no primeiro `lock`.
    pub const fn uninit() -> Self {
        Self {
            locked: AtomicBool::new(false),
            owner: AtomicU32::new(NO_OWNER),
            initialized: AtomicBool::new(false),
        }
    }

    /// Marca o mutex como inicializado (idempotente).
    #[inline]
    pub fn init(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Adquire o mutex para `owner`.
    ///
    /// `timeout` em tentativas de CAS (0 = sem limite). Com `block` falso
    /// faz uma única tentativa.
    pub fn lock(&self, owner: u32, timeout: u64, block: bool) -> KResult<()> {
        if !self.is_initialized() {
            self.init();
        }

        if owner != NO_OWNER
            && self.locked.load(Ordering::Acquire)
            && self.owner.load(Ordering::Acquire) == owner
        {
            return Ok(());
        }

        let mut spins: u64 = 0;
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            if !block {
                // compare_exchange_weak pode falhar espuriamente
                if self.locked.load(Ordering::Relaxed) {
                    return Err(KError::MutexLocked);
                }
                continue;
            }
            spins += 1;
            if timeout != 0 && spins >= timeout {
                return Err(KError::Timeout);
            }
            core::hint::spin_loop();
        }

        self.owner.store(owner, Ordering::Release);
        Ok(())
    }

    /// Tentativa única, equivalente a `lock(owner, 0, false)`.
    #[inline]
    pub fn try_lock(&self, owner: u32) -> KResult<()> {
        self.lock(owner, 0, false)
    }

    /// Libera o mutex. Apenas o dono pode liberar.
    pub fn unlock(&self, owner: u32) -> KResult<()> {
        if !self.locked.load(Ordering::Acquire) || self.owner.load(Ordering::Acquire) != owner {
            return Err(KError::AccessDenied);
        }
        self.owner.store(NO_OWNER, Ordering::Release);
        self.locked.store(false, Ordering::Release);
        Ok(())
    }

    /// Consulta sem efeitos colaterais.
    #[inline]
    pub fn locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub fn owner(&self) -> Option<u32> {
        if !self.locked() {
            return None;
        }
        match self.owner.load(Ordering::Acquire) {
            NO_OWNER => None,
            id => Some(id),
        }
    }

    /// Libera incondicionalmente e volta ao estado não inicializado.
    pub fn destroy(&self) {
        self.owner.store(NO_OWNER, Ordering::Release);
        self.locked.store(false, Ordering::Release);
        self.initialized.store(false, Ordering::Release);
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn lock_unlock_records_owner() {
        let m = Mutex::new();
        assert!(!m.locked());
        m.lock(7, 0, true).unwrap();
        assert!(m.locked());
        assert_eq!(m.owner(), Some(7));
        m.unlock(7).unwrap();
        assert!(!m.locked());
        assert_eq!(m.owner(), None);
    }

    #[test]
    fn non_owner_cannot_unlock() {
        let m = Mutex::new();
        m.lock(1, 0, true).unwrap();
        assert_eq!(m.unlock(2), Err(KError::AccessDenied));
        assert!(m.locked());
        assert_eq!(Mutex::new().unlock(1), Err(KError::AccessDenied));
    }

    #[test]
    fn non_blocking_and_timeout() {
        let m = Mutex::new();
        m.lock(1, 0, true).unwrap();
        assert_eq!(m.lock(2, 0, false), Err(KError::MutexLocked));
        assert_eq!(m.lock(2, 100, true), Err(KError::Timeout));
        assert_eq!(m.owner(), Some(1));
    }

    #[test]
    fn recursive_lock_by_owner() {
        let m = Mutex::new();
        m.lock(3, 0, true).unwrap();
        m.lock(3, 0, false).unwrap();
        m.unlock(3).unwrap();
        assert!(!m.locked());
    }

    #[test]
    fn lazy_init_and_destroy() {
        let m = Mutex::uninit();
        assert!(!m.is_initialized());
        m.lock(1, 0, true).unwrap();
        assert!(m.is_initialized());
        m.destroy();
        assert!(!m.is_initialized());
        assert!(!m.locked());
        m.try_lock(2).unwrap();
        assert_eq!(m.owner(), Some(2));
    }

    #[test]
    fn contended_increments_are_exclusive() {
        let m = Arc::new(Mutex::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let total = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (1..=4u32)
            .map(|id| {
                let (m, inside, total) = (m.clone(), inside.clone(), total.clone());
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        m.lock(id, 0, true).unwrap();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        total.fetch_add(1, Ordering::Relaxed);
                        inside.fetch_sub(1, Ordering::SeqCst);
                        m.unlock(id).unwrap();
                    }
                })
            })
            .collect();

        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(total.load(Ordering::Relaxed), 4000);
        assert!(!m.locked());
    }
}
