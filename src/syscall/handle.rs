//! # Tabela de Handles de Usuário
//!
//! Uma por processo, guardada no `Process` e protegida pelo lock do
//! escalonador. Cada entrada é um slot com geração: o handle entregue ao
//! userspace é `Handle::new(índice, geração)` e a geração muda a cada
//! reutilização do slot, então handles antigos são rejeitados.
//!
//! Uma entrada começa vazia (`Unopened`) e recebe um `ThreadHandle` em
//! `open`/`create`. Quando o processo morre, `drain` devolve todos os
//! `ThreadHandle`s para serem fechados.

use alloc::vec::Vec;

use crate::core::object::Handle;
use crate::sched::core::Scheduler;
use crate::sched::task::handle::ThreadHandle;
use crate::sys::error::{KError, KResult};

/// Objeto apontado por um handle de usuário.
#[derive(Debug, PartialEq, Eq)]
pub enum UserObject {
    /// Alocado por `SYS_THREAD_MAKE_HANDLE`, ainda sem thread
    Unopened,
    Thread(ThreadHandle),
}

struct Entry {
    generation: u16,
    object: Option<UserObject>,
}

pub struct HandleTable {
    entries: Vec<Entry>,
    capacity: usize,
}

impl HandleTable {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub const fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Handles em uso.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.object.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aloca uma entrada vazia.
    pub fn alloc(&mut self) -> Option<Handle> {
        let idx = match self.entries.iter().position(|e| e.object.is_none()) {
            Some(i) => i,
            None if self.entries.len() < self.capacity => {
                self.entries.push(Entry {
                    generation: 0,
                    object: None,
                });
                self.entries.len() - 1
            }
            None => return None,
        };

        let entry = &mut self.entries[idx];
        entry.generation = entry.generation.wrapping_add(1);
        entry.object = Some(UserObject::Unopened);
        Some(Handle::new(idx as u16, entry.generation))
    }

    fn slot(&self, handle: Handle) -> Option<&Entry> {
        let entry = self.entries.get(handle.index() as usize)?;
        (entry.object.is_some() && entry.generation == handle.generation()).then_some(entry)
    }

    fn slot_mut(&mut self, handle: Handle) -> Option<&mut Entry> {
        let entry = self.entries.get_mut(handle.index() as usize)?;
        (entry.object.is_some() && entry.generation == handle.generation()).then_some(entry)
    }

    pub fn get(&self, handle: Handle) -> Option<&UserObject> {
        self.slot(handle)?.object.as_ref()
    }

    /// Exige uma entrada válida e ainda vazia.
    pub fn check_unopened(&self, handle: Handle) -> KResult<()> {
        match self.get(handle) {
            Some(UserObject::Unopened) => Ok(()),
            Some(UserObject::Thread(_)) => Err(KError::AlreadyExists),
            None => Err(KError::InvalidHandle),
        }
    }

    /// Guarda `thread` na entrada vazia. Em falha o handle volta ao
    /// chamador, que deve fechá-lo.
    pub fn install(&mut self, handle: Handle, thread: ThreadHandle) -> Result<(), (KError, ThreadHandle)> {
        if let Err(e) = self.check_unopened(handle) {
            return Err((e, thread));
        }
        match self.slot_mut(handle) {
            Some(entry) => {
                entry.object = Some(UserObject::Thread(thread));
                Ok(())
            }
            None => Err((KError::InvalidHandle, thread)),
        }
    }

    /// `ThreadHandle` guardado na entrada.
    pub fn thread(&self, handle: Handle) -> KResult<&ThreadHandle> {
        match self.get(handle) {
            Some(UserObject::Thread(t)) => Ok(t),
            _ => Err(KError::InvalidHandle),
        }
    }

    /// Libera a entrada e devolve o que ela guardava.
    pub fn remove(&mut self, handle: Handle) -> KResult<UserObject> {
        self.slot_mut(handle)
            .and_then(|e| e.object.take())
            .ok_or(KError::InvalidHandle)
    }

    /// Esvazia a tabela devolvendo os `ThreadHandle`s abertos.
    pub fn drain(&mut self) -> Vec<ThreadHandle> {
        self.entries
            .iter_mut()
            .filter_map(|e| match e.object.take() {
                Some(UserObject::Thread(t)) => Some(t),
                _ => None,
            })
            .collect()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Executa `f` sobre a tabela de handles do processo chamador, sob o
    /// lock. Erros ficam no `last_error` do chamador.
    pub(crate) fn with_user_handles<R>(
        &self,
        f: impl FnOnce(&mut HandleTable) -> KResult<R>,
    ) -> KResult<R> {
        let cpu = self.this_core();
        let mut st = self.lock.enter(cpu, self.platform.as_cpu());
        let pid = self.caller(&st, cpu).pid;
        let r = match st.processes.get_mut(pid) {
            Some(p) => f(&mut p.handles),
            None => Err(KError::NoSuchObject),
        };
        Self::note_error(&mut st, cpu, r)
    }
}
