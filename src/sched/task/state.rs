//! Estados e prioridades de thread

use bitflags::bitflags;

bitflags! {
    /// Máscara de status de uma thread.
    ///
    /// `RUNNING` é um bit extra sobre `CAN_RUN`: a thread está vinculada a
    /// exatamente um núcleo. Preempção só limpa `RUNNING`.
    ///
    /// Invariantes: `RUNNING` nunca combina com `BLOCKED`, `PAUSED` ou `DEAD`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ThreadStatus: u32 {
        /// Elegível (sujeita aos demais bits)
        const CAN_RUN = 1 << 0;
        /// Executando em algum núcleo
        const RUNNING = 1 << 1;
        /// Aguardando o predicado de bloqueio
        const BLOCKED = 1 << 2;
        /// Suspensa até `resume`
        const PAUSED = 1 << 3;
        /// Terminal
        const DEAD = 1 << 4;
        /// Contador de fatia será zerado na próxima varredura da classe
        const CLEAR_TIME_SLICE = 1 << 5;
        /// Predicado de bloqueio em avaliação
        const IN_BLOCK_CALLBACK = 1 << 6;
        /// A thread está derrubando o próprio processo
        const IS_EXITING_PROCESS = 1 << 7;
    }
}

impl ThreadStatus {
    /// Bits que impedem a seleção.
    pub const INELIGIBLE: Self = Self::RUNNING
        .union(Self::BLOCKED)
        .union(Self::PAUSED)
        .union(Self::DEAD)
        .union(Self::IN_BLOCK_CALLBACK);

    /// `CAN_RUN` sem nenhum bit que impeça a seleção.
    #[inline]
    pub const fn is_eligible(self) -> bool {
        self.contains(Self::CAN_RUN) && !self.intersects(Self::INELIGIBLE)
    }

    #[inline]
    pub const fn is_dead(self) -> bool {
        self.contains(Self::DEAD)
    }

    /// Verifica as exclusões mútuas com `RUNNING`.
    pub const fn is_consistent(self) -> bool {
        !(self.contains(Self::RUNNING)
            && self.intersects(Self::BLOCKED.union(Self::PAUSED).union(Self::DEAD)))
    }
}

/// Classe de prioridade. O valor numérico é também a cota de fatias.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Idle = 1,
    Low = 2,
    Normal = 4,
    High = 8,
}

impl Priority {
    /// Ordem de varredura do escalonador (maior prioridade primeiro).
    pub const DESCENDING: [Priority; 4] = [
        Priority::High,
        Priority::Normal,
        Priority::Low,
        Priority::Idle,
    ];

    /// Converte o valor cru (syscall, `create`). Valores fora do conjunto são rejeitados.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Idle),
            2 => Some(Self::Low),
            4 => Some(Self::Normal),
            8 => Some(Self::High),
            _ => None,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Seleções permitidas antes que os pares da classe recebam a vez.
    #[inline]
    pub const fn quota(self) -> u32 {
        self as u32
    }

    /// Índice da fila na `RunQueueSet` (0 = IDLE ... 3 = HIGH).
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Low => 1,
            Self::Normal => 2,
            Self::High => 3,
        }
    }
}

/// Por que uma thread bloqueada voltou a rodar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// O predicado foi satisfeito
    Condition,
    /// O prazo de bloqueio expirou antes
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility() {
        assert!(ThreadStatus::CAN_RUN.is_eligible());
        assert!(!(ThreadStatus::CAN_RUN | ThreadStatus::PAUSED).is_eligible());
        assert!(!(ThreadStatus::CAN_RUN | ThreadStatus::RUNNING).is_eligible());
        assert!(!(ThreadStatus::CAN_RUN | ThreadStatus::IN_BLOCK_CALLBACK).is_eligible());
        assert!((ThreadStatus::CAN_RUN | ThreadStatus::CLEAR_TIME_SLICE).is_eligible());
        assert!(!ThreadStatus::empty().is_eligible());
    }

    #[test]
    fn running_exclusions() {
        assert!((ThreadStatus::CAN_RUN | ThreadStatus::RUNNING).is_consistent());
        assert!(!(ThreadStatus::RUNNING | ThreadStatus::BLOCKED).is_consistent());
        assert!(!(ThreadStatus::RUNNING | ThreadStatus::PAUSED).is_consistent());
        assert!(!(ThreadStatus::RUNNING | ThreadStatus::DEAD).is_consistent());
    }

    #[test]
    fn priority_values_are_quotas() {
        assert_eq!(Priority::from_raw(4), Some(Priority::Normal));
        assert_eq!(Priority::from_raw(3), None);
        assert_eq!(Priority::from_raw(0), None);
        assert_eq!(Priority::High.quota(), 8);
        assert_eq!(Priority::Idle.quota(), 1);
        let idx: alloc::vec::Vec<_> = Priority::DESCENDING.iter().map(|p| p.index()).collect();
        assert_eq!(idx, [3, 2, 1, 0]);
    }
}
