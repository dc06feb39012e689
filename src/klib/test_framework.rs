//! Framework de testes do kernel
//!
//! Suites de auto-teste executadas no boot (feature `self_test`). Os testes
//! de host (`cargo test`) também rodam cada suite e exigem zero falhas.

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Pass,
    Fail,
    Skip,
}

/// Um caso de teste
pub struct TestCase {
    pub name: &'static str,
    pub func: fn() -> TestResult,
}

impl TestCase {
    pub const fn new(name: &'static str, func: fn() -> TestResult) -> Self {
        Self { name, func }
    }
}

/// Totais de uma suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteReport {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Executa suite de testes
pub fn run_test_suite(name: &str, tests: &[TestCase]) -> SuiteReport {
    crate::kinfo!("=== Executando suite de testes");
    crate::klog!(name);
    crate::knl!();

    let mut report = SuiteReport::default();

    for test in tests {
        match (test.func)() {
            TestResult::Pass => {
                crate::kok!(test.name);
                report.passed += 1;
            }
            TestResult::Fail => {
                crate::kfail!(test.name);
                report.failed += 1;
            }
            TestResult::Skip => {
                crate::kwarn!("[SKIP]");
                crate::klog!(test.name);
                crate::knl!();
                report.skipped += 1;
            }
        }
    }

    crate::kinfo!("Resultados: passed=", report.passed);
    if report.failed > 0 {
        crate::kerror!("Resultados: failed=", report.failed);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok() -> TestResult {
        TestResult::Pass
    }

    fn bad() -> TestResult {
        TestResult::Fail
    }

    fn skip() -> TestResult {
        TestResult::Skip
    }

    #[test]
    fn counts_each_outcome() {
        let suite = [
            TestCase::new("ok", ok),
            TestCase::new("bad", bad),
            TestCase::new("skip", skip),
            TestCase::new("ok2", ok),
        ];
        let r = run_test_suite("Meta", &suite);
        assert_eq!(
            r,
            SuiteReport {
                passed: 2,
                failed: 1,
                skipped: 1
            }
        );
    }
}
