//! Testes de Sincronização

use crate::klib::test_framework::{run_test_suite, SuiteReport, TestCase, TestResult};
use crate::sync::mutex::Mutex;
use crate::sys::error::KError;

/// Casos de teste de sync
const SYNC_TESTS: &[TestCase] = &[
    TestCase::new("mutex_owner", test_mutex_owner),
    TestCase::new("mutex_non_blocking", test_mutex_non_blocking),
    TestCase::new("mutex_lazy_init", test_mutex_lazy_init),
];

/// Executa todos os testes de sync
pub fn run_sync_tests() -> SuiteReport {
    run_test_suite("Sync", SYNC_TESTS)
}

/// Lock/unlock com verificação de dono
fn test_mutex_owner() -> TestResult {
    let m = Mutex::new();
    if m.lock(5, 0, true).is_err() || m.owner() != Some(5) {
        return TestResult::Fail;
    }
    if m.unlock(6) != Err(KError::AccessDenied) {
        crate::kerror!("(Mutex) Unlock por não-dono foi aceito");
        return TestResult::Fail;
    }
    if m.unlock(5).is_err() || m.locked() {
        return TestResult::Fail;
    }

    crate::ktrace!("(Mutex) Dono rastreado corretamente");
    TestResult::Pass
}

/// Tentativa única em mutex ocupado
fn test_mutex_non_blocking() -> TestResult {
    let m = Mutex::new();
    if m.try_lock(1).is_err() {
        return TestResult::Fail;
    }
    let busy = m.try_lock(2);
    let timed = m.lock(2, 16, true);
    let _ = m.unlock(1);

    if busy != Err(KError::MutexLocked) || timed != Err(KError::Timeout) {
        crate::kerror!("(Mutex) Falha não-bloqueante incorreta");
        return TestResult::Fail;
    }
    TestResult::Pass
}

/// Inicialização no primeiro uso
fn test_mutex_lazy_init() -> TestResult {
    let m = Mutex::uninit();
    if m.is_initialized() {
        return TestResult::Fail;
    }
    let _ = m.try_lock(1);
    let ok = m.is_initialized();
    m.destroy();

    if !ok || m.is_initialized() || m.locked() {
        return TestResult::Fail;
    }
    TestResult::Pass
}

#[cfg(test)]
mod tests {
    #[test]
    fn sync_suite_passes() {
        assert_eq!(super::run_sync_tests().failed, 0);
    }
}
