//! Filas de execução por classe de prioridade
//!
//! Quatro listas de índices na arena de threads (IDLE, LOW, NORMAL, HIGH).
//! Criadas no boot e nunca destruídas. Toda mutação acontece sob o lock do
//! escalonador, então não há lock por fila.

use crate::klib::list::{IndexList, Link};
use crate::sched::config::PRIORITY_COUNT;
use crate::sched::task::state::Priority;

/// Uma classe de prioridade.
#[derive(Debug, Default)]
pub struct RunQueue {
    list: IndexList,
    /// Invocações seguidas em que a classe tinha thread elegível mas outra
    /// classe recebeu a fatia (diagnóstico)
    pub iterations: u64,
}

impl RunQueue {
    pub const fn new() -> Self {
        Self {
            list: IndexList::new(),
            iterations: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn head(&self) -> Option<u32> {
        self.list.head()
    }

    pub fn iter<'a>(&self, links: &'a [Link]) -> crate::klib::list::Iter<'a> {
        self.list.iter(links)
    }
}

/// As quatro filas, indexadas por `Priority::index`.
#[derive(Debug, Default)]
pub struct RunQueueSet {
    queues: [RunQueue; PRIORITY_COUNT],
}

impl RunQueueSet {
    pub const fn new() -> Self {
        Self {
            queues: [
                RunQueue::new(),
                RunQueue::new(),
                RunQueue::new(),
                RunQueue::new(),
            ],
        }
    }

    #[inline]
    pub fn get(&self, prio: Priority) -> &RunQueue {
        &self.queues[prio.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, prio: Priority) -> &mut RunQueue {
        &mut self.queues[prio.index()]
    }

    /// Enfileira `slot` no fim da classe. Falha se já estiver em alguma fila.
    pub fn insert(&mut self, links: &mut [Link], slot: u32, prio: Priority) -> bool {
        self.get_mut(prio).list.push_back(links, slot)
    }

    /// Retira `slot` da classe `prio`.
    pub fn remove(&mut self, links: &mut [Link], slot: u32, prio: Priority) -> bool {
        self.get_mut(prio).list.remove(links, slot)
    }

    /// Total de threads enfileiradas.
    pub fn total(&self) -> usize {
        self.queues.iter().map(RunQueue::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn a_slot_lives_in_one_queue_at_a_time() {
        let mut links = vec![Link::UNLINKED; 4];
        let mut set = RunQueueSet::new();

        assert!(set.insert(&mut links, 1, Priority::Normal));
        assert!(!set.insert(&mut links, 1, Priority::High));
        assert!(set.insert(&mut links, 2, Priority::Normal));
        assert_eq!(
            set.get(Priority::Normal).iter(&links).collect::<Vec<_>>(),
            [1, 2]
        );

        assert!(set.remove(&mut links, 1, Priority::Normal));
        assert!(set.insert(&mut links, 1, Priority::High));
        assert_eq!(set.get(Priority::High).len(), 1);
        assert_eq!(set.total(), 2);
    }
}
