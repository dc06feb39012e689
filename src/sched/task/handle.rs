//! Handles de thread
//!
//! Um `ThreadHandle` conta como uma referência no registro: enquanto existir,
//! o registro não é recuperado, mesmo morto. Não é `Clone`; para outra
//! referência use `Scheduler::open_thread`. Deve ser devolvido com
//! `Scheduler::close_thread`.

use super::table::ThreadRef;
use crate::sys::types::{Pid, Tid};

#[must_use = "handles devem ser fechados com close_thread"]
#[derive(Debug, PartialEq, Eq)]
pub struct ThreadHandle {
    thread: ThreadRef,
    tid: Tid,
    /// Processo que abriu o handle
    opener: Pid,
}

impl ThreadHandle {
    pub(crate) fn new(thread: ThreadRef, tid: Tid, opener: Pid) -> Self {
        Self {
            thread,
            tid,
            opener,
        }
    }

    /// Tid da thread referenciada.
    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn opener(&self) -> Pid {
        self.opener
    }

    pub(crate) fn thread_ref(&self) -> ThreadRef {
        self.thread
    }

    /// Cópia que não conta como referência, para operar sobre um handle
    /// guardado em tabela. Nunca deve chegar a `close_thread`.
    pub(crate) fn shadow(&self) -> ThreadHandle {
        Self {
            thread: self.thread,
            tid: self.tid,
            opener: self.opener,
        }
    }
}
