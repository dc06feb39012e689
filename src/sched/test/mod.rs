//! Testes do Scheduler
//!
//! `run_sched_tests` é a suite de auto-teste executada no boot (estruturas
//! puras, sem tocar no hardware). Os cenários de host rodam o escalonador
//! sobre a plataforma simulada (`arch::hosted`).

use crate::core::smp::CpuMask;
use crate::klib::test_framework::{run_test_suite, SuiteReport, TestCase, TestResult};
use crate::mm::stack::normalize_stack_size;
use crate::sched::core::runqueue::RunQueueSet;
use crate::sched::signal::{SignalTable, SIGINT, SIGKILL};
use crate::sched::task::context::CpuContext;
use crate::sched::task::entity::Thread;
use crate::sched::task::state::{Priority, ThreadStatus};
use crate::sched::task::table::ThreadTable;
use crate::sys::types::{Pid, Tid};

#[cfg(test)]
mod smp;

/// Casos de teste do Scheduler
const SCHED_TESTS: &[TestCase] = &[
    TestCase::new("priority_quotas", test_priority_quotas),
    TestCase::new("status_exclusions", test_status_exclusions),
    TestCase::new("table_generations", test_table_generations),
    TestCase::new("runqueue_membership", test_runqueue_membership),
    TestCase::new("stack_normalization", test_stack_normalization),
    TestCase::new("signal_table", test_signal_table),
];

/// Executa todos os testes de scheduler
pub fn run_sched_tests() -> SuiteReport {
    run_test_suite("Scheduler", SCHED_TESTS)
}

fn dummy_thread(tid: u32, prio: Priority) -> Thread {
    Thread::new(
        Tid(tid),
        Pid::KERNEL,
        prio,
        CpuContext::new(),
        None,
        CpuMask::single(0),
    )
}

/// Valor numérico = cota, ordem de varredura decrescente
fn test_priority_quotas() -> TestResult {
    if Priority::from_raw(3).is_some() || Priority::from_raw(0).is_some() {
        crate::kerror!("(Sched) Prioridade invalida aceita");
        return TestResult::Fail;
    }
    let quotas = Priority::DESCENDING.map(Priority::quota);
    if quotas != [8, 4, 2, 1] {
        return TestResult::Fail;
    }

    crate::ktrace!("(Sched) Cotas de prioridade OK");
    TestResult::Pass
}

/// RUNNING exclui BLOCKED/PAUSED/DEAD
fn test_status_exclusions() -> TestResult {
    let running = ThreadStatus::CAN_RUN | ThreadStatus::RUNNING;
    if !running.is_consistent() || running.is_eligible() {
        return TestResult::Fail;
    }
    if (running | ThreadStatus::PAUSED).is_consistent() {
        return TestResult::Fail;
    }
    if (ThreadStatus::CAN_RUN | ThreadStatus::BLOCKED).is_eligible() {
        return TestResult::Fail;
    }
    if !ThreadStatus::CAN_RUN.is_eligible() || !ThreadStatus::DEAD.is_dead() {
        return TestResult::Fail;
    }
    TestResult::Pass
}

/// Slot reciclado invalida referências antigas
fn test_table_generations() -> TestResult {
    let mut table = ThreadTable::new(2);
    let Some(a) = table.insert(dummy_thread(1, Priority::Normal)) else {
        return TestResult::Fail;
    };
    if table.remove(a.slot).is_none() {
        return TestResult::Fail;
    }
    let Some(b) = table.insert(dummy_thread(2, Priority::Normal)) else {
        return TestResult::Fail;
    };

    if a.slot != b.slot || table.resolve(a).is_some() || table.resolve(b) != Some(b.slot) {
        crate::kerror!("(Sched) Referencia antiga resolvida");
        return TestResult::Fail;
    }
    TestResult::Pass
}

/// No máximo uma fila por thread; registro enfileirado não é removido
fn test_runqueue_membership() -> TestResult {
    let mut table = ThreadTable::new(4);
    let mut queues = RunQueueSet::new();
    let Some(r) = table.insert(dummy_thread(1, Priority::Low)) else {
        return TestResult::Fail;
    };

    if !queues.insert(&mut table.run_links, r.slot, Priority::Low) {
        return TestResult::Fail;
    }
    if queues.insert(&mut table.run_links, r.slot, Priority::High) {
        crate::kerror!("(Sched) Thread em duas filas");
        return TestResult::Fail;
    }
    if table.remove(r.slot).is_some() {
        return TestResult::Fail;
    }
    if !queues.remove(&mut table.run_links, r.slot, Priority::Low) || queues.total() != 0 {
        return TestResult::Fail;
    }
    if table.remove(r.slot).is_none() {
        return TestResult::Fail;
    }
    TestResult::Pass
}

/// Zero vira o padrão; sempre múltiplo de página
fn test_stack_normalization() -> TestResult {
    let cases = [(0, 8192), (1, 4096), (4096, 4096), (8193, 12288)];
    for (requested, expected) in cases {
        if normalize_stack_size(requested, 8192) != expected {
            crate::kerror!("(Stack) Tamanho normalizado errado para ", requested);
            return TestResult::Fail;
        }
    }
    TestResult::Pass
}

fn test_signal_table() -> TestResult {
    let mut signals = SignalTable::new();
    if signals.set(SIGKILL, Some(0x1000)).is_ok() || signals.set(0, Some(0x1000)).is_ok() {
        return TestResult::Fail;
    }
    if signals.set(SIGINT, Some(0x4000)).is_err() || signals.get(SIGINT) != Some(0x4000) {
        return TestResult::Fail;
    }
    let _ = signals.set(SIGINT, None);
    if signals.get(SIGINT).is_some() {
        return TestResult::Fail;
    }
    TestResult::Pass
}

#[cfg(test)]
mod tests {
    #[test]
    fn sched_suite_passes() {
        assert_eq!(super::run_sched_tests().failed, 0);
    }
}
