//! Lista duplamente encadeada intrusiva por índices
//!
//! Os nós não guardam ponteiros: cada elemento é um índice em uma arena e os
//! enlaces (`Link`) vivem num array paralelo, um por família de listas. Um
//! elemento pode estar em no máximo uma lista de cada família.
//!
//! Como a lista só conhece índices, remover um elemento cujo registro já foi
//! liberado é impossível por construção: o dono da arena remove o índice da
//! lista antes de reciclar o slot.

/// Enlace de um elemento numa família de listas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Link {
    prev: Option<u32>,
    next: Option<u32>,
    linked: bool,
}

impl Link {
    pub const UNLINKED: Self = Self {
        prev: None,
        next: None,
        linked: false,
    };

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    #[inline]
    pub fn next(&self) -> Option<u32> {
        self.next
    }
}

/// Cabeça de lista (head, tail, tamanho).
#[derive(Debug, Default)]
pub struct IndexList {
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl IndexList {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn head(&self) -> Option<u32> {
        self.head
    }

    /// Insere `idx` no fim. Falha se o elemento já está encadeado.
    pub fn push_back(&mut self, links: &mut [Link], idx: u32) -> bool {
        match links.get(idx as usize) {
            Some(l) if !l.linked => {}
            _ => return false,
        }

        let tail = self.tail;
        links[idx as usize] = Link {
            prev: tail,
            next: None,
            linked: true,
        };
        match tail {
            Some(t) => links[t as usize].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
        true
    }

    /// Remove `idx`. Falha se o elemento não está encadeado.
    ///
    /// O chamador garante que `idx` pertence a ESTA lista.
    pub fn remove(&mut self, links: &mut [Link], idx: u32) -> bool {
        let (prev, next) = match links.get(idx as usize) {
            Some(l) if l.linked => (l.prev, l.next),
            _ => return false,
        };

        match prev {
            Some(p) => links[p as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => links[n as usize].prev = prev,
            None => self.tail = prev,
        }
        links[idx as usize] = Link::UNLINKED;
        self.len -= 1;
        true
    }

    /// Itera os índices do início ao fim.
    pub fn iter<'a>(&self, links: &'a [Link]) -> Iter<'a> {
        Iter {
            links,
            cursor: self.head,
        }
    }
}

pub struct Iter<'a> {
    links: &'a [Link],
    cursor: Option<u32>,
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let cur = self.cursor?;
        self.cursor = self.links.get(cur as usize).and_then(|l| l.next);
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn collect(list: &IndexList, links: &[Link]) -> Vec<u32> {
        list.iter(links).collect()
    }

    #[test]
    fn push_and_remove_keep_order() {
        let mut links = [Link::UNLINKED; 5];
        let mut list = IndexList::new();
        for i in [0, 3, 1, 4] {
            assert!(list.push_back(&mut links, i));
        }
        assert_eq!(collect(&list, &links), [0, 3, 1, 4]);

        assert!(list.remove(&mut links, 3));
        assert!(list.remove(&mut links, 0));
        assert!(list.remove(&mut links, 4));
        assert_eq!(collect(&list, &links), [1]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.head(), Some(1));
    }

    #[test]
    fn double_insert_and_stray_remove_are_rejected() {
        let mut links = [Link::UNLINKED; 2];
        let mut list = IndexList::new();
        assert!(list.push_back(&mut links, 1));
        assert!(!list.push_back(&mut links, 1));
        assert!(!list.remove(&mut links, 0));
        assert!(!list.push_back(&mut links, 9));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn reinsert_after_remove_goes_to_tail() {
        let mut links = [Link::UNLINKED; 3];
        let mut list = IndexList::new();
        for i in 0..3 {
            list.push_back(&mut links, i);
        }
        list.remove(&mut links, 0);
        list.push_back(&mut links, 0);
        assert_eq!(collect(&list, &links), [1, 2, 0]);
        assert!(links[0].is_linked());
    }
}
