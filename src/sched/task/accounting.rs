//! Contabilidade de Recursos (Accounting)
//!
//! Rastreia quantas vezes a thread foi escolhida e como perdeu a CPU.

/// Estatísticas de escalonamento de uma thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accounting {
    /// Vezes que a thread foi escolhida pelo escalonador
    pub selections: u64,

    /// Ticks (jiffies) acumulados em execução
    pub total_cpu_time: u64,

    /// Timestamp (em jiffies) da última vez que a thread começou a executar
    pub last_start_time: u64,

    /// Trocas de contexto voluntárias (yield, bloqueio, pausa própria)
    pub voluntary_switches: u64,

    /// Trocas de contexto involuntárias (fim de fatia, preempção)
    pub involuntary_switches: u64,
}

impl Accounting {
    /// Cria uma nova estrutura de contabilidade zerada
    pub const fn new() -> Self {
        Self {
            selections: 0,
            total_cpu_time: 0,
            last_start_time: 0,
            voluntary_switches: 0,
            involuntary_switches: 0,
        }
    }

    /// Registra o início da execução (chamado quando a thread ganha a CPU)
    pub fn start_exec(&mut self, now: u64) {
        self.selections += 1;
        self.last_start_time = now;
    }

    /// Registra o fim da execução. Retorna o tempo executado nesta fatia.
    pub fn end_exec(&mut self, now: u64, voluntary: bool) -> u64 {
        if voluntary {
            self.voluntary_switches += 1;
        } else {
            self.involuntary_switches += 1;
        }
        let delta = now.saturating_sub(self.last_start_time);
        self.total_cpu_time += delta;
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_switch_kinds() {
        let mut a = Accounting::new();
        a.start_exec(10);
        assert_eq!(a.end_exec(14, false), 4);
        a.start_exec(20);
        assert_eq!(a.end_exec(19, true), 0);
        assert_eq!(a.selections, 2);
        assert_eq!(a.voluntary_switches, 1);
        assert_eq!(a.involuntary_switches, 1);
        assert_eq!(a.total_cpu_time, 4);
    }
}
