//! Arena de registros de thread
//!
//! Registros são endereçados por índice estável (`slot`) + geração. Nenhuma
//! estrutura guarda ponteiros para registros: filas e listas de processo são
//! listas de índices (`klib::list`) cujos enlaces vivem nos arrays paralelos
//! `run_links` e `proc_links`.
//!
//! Um slot só é reciclado por `remove`, que exige o registro fora de todas as
//! listas; a geração incrementa, invalidando todo `ThreadRef` antigo.

use alloc::vec::Vec;

use super::entity::Thread;
use crate::klib::list::Link;
use crate::sys::types::Tid;

/// Referência não-proprietária a um registro (slot + geração).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadRef {
    pub slot: u32,
    pub generation: u32,
}

pub struct ThreadTable {
    slots: Vec<Option<Thread>>,
    generations: Vec<u32>,
    /// Enlaces da família de run-queues
    pub run_links: Vec<Link>,
    /// Enlaces da família de listas de threads por processo
    pub proc_links: Vec<Link>,
    free: Vec<u32>,
    live: usize,
    capacity: usize,
}

impl ThreadTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            run_links: Vec::new(),
            proc_links: Vec::new(),
            free: Vec::new(),
            live: 0,
            capacity,
        }
    }

    /// Registros vivos (inclusive mortos ainda não recuperados).
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Guarda um registro novo. `None` quando a tabela está cheia.
    pub fn insert(&mut self, thread: Thread) -> Option<ThreadRef> {
        if self.live >= self.capacity {
            return None;
        }

        let slot = match self.free.pop() {
            Some(s) => s,
            None => {
                let s = u32::try_from(self.slots.len()).ok()?;
                self.slots.push(None);
                self.generations.push(0);
                self.run_links.push(Link::UNLINKED);
                self.proc_links.push(Link::UNLINKED);
                s
            }
        };

        let idx = slot as usize;
        self.slots[idx] = Some(thread);
        self.live += 1;
        Some(ThreadRef {
            slot,
            generation: self.generations[idx],
        })
    }

    /// Remove o registro do slot. Ele precisa estar fora de todas as listas.
    pub fn remove(&mut self, slot: u32) -> Option<Thread> {
        let idx = slot as usize;
        if self.run_links.get(idx)?.is_linked() || self.proc_links.get(idx)?.is_linked() {
            return None;
        }
        let thread = self.slots.get_mut(idx)?.take()?;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free.push(slot);
        self.live -= 1;
        Some(thread)
    }

    #[inline]
    pub fn get(&self, slot: u32) -> Option<&Thread> {
        self.slots.get(slot as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, slot: u32) -> Option<&mut Thread> {
        self.slots.get_mut(slot as usize)?.as_mut()
    }

    /// Valida a referência e devolve o slot.
    pub fn resolve(&self, r: ThreadRef) -> Option<u32> {
        let idx = r.slot as usize;
        if self.generations.get(idx) == Some(&r.generation) && self.slots[idx].is_some() {
            Some(r.slot)
        } else {
            None
        }
    }

    pub fn ref_of(&self, slot: u32) -> Option<ThreadRef> {
        self.get(slot)?;
        Some(ThreadRef {
            slot,
            generation: self.generations[slot as usize],
        })
    }

    pub fn find_tid(&self, tid: Tid) -> Option<u32> {
        self.iter().find(|(_, t)| t.tid == tid).map(|(s, _)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Thread)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (i as u32, t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::smp::CpuMask;
    use crate::klib::list::IndexList;
    use crate::sched::task::context::CpuContext;
    use crate::sched::task::state::Priority;
    use crate::sys::types::Pid;

    fn thread(tid: u32) -> Thread {
        Thread::new(
            Tid(tid),
            Pid::KERNEL,
            Priority::Normal,
            CpuContext::new(),
            None,
            CpuMask::single(0),
        )
    }

    #[test]
    fn stale_refs_are_rejected_after_reuse() {
        let mut t = ThreadTable::new(8);
        let a = t.insert(thread(1)).unwrap();
        assert_eq!(t.resolve(a), Some(a.slot));
        assert!(t.remove(a.slot).is_some());
        assert_eq!(t.resolve(a), None);

        let b = t.insert(thread(2)).unwrap();
        assert_eq!(b.slot, a.slot);
        assert_ne!(b.generation, a.generation);
        assert_eq!(t.resolve(a), None);
        assert_eq!(t.find_tid(Tid(2)), Some(b.slot));
    }

    #[test]
    fn linked_records_cannot_be_removed() {
        let mut t = ThreadTable::new(8);
        let a = t.insert(thread(1)).unwrap();
        let mut list = IndexList::new();
        list.push_back(&mut t.proc_links, a.slot);
        assert!(t.remove(a.slot).is_none());
        list.remove(&mut t.proc_links, a.slot);
        assert!(t.remove(a.slot).is_some());
        assert!(t.is_empty());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut t = ThreadTable::new(2);
        assert!(t.insert(thread(1)).is_some());
        assert!(t.insert(thread(2)).is_some());
        assert!(t.insert(thread(3)).is_none());
        assert_eq!(t.len(), 2);
    }
}
