//! Vários núcleos: vínculo, migração, IPIs e concorrência real entre
//! threads do host.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;

use super::harness::{Rig, ENTRY};
use crate::arch::hosted::{on_cpu, set_current_cpu};
use crate::core::smp::ipi::{IpiTarget, IpiVector};
use crate::core::smp::CpuMask;
use crate::sched::task::lifecycle::ThreadParams;
use crate::sched::task::predicate::PredicateContext;
use crate::sched::task::state::{Priority, ThreadStatus};
use crate::sys::error::KError;

#[test]
fn bound_thread_is_not_taken_by_other_core() {
    let rig = Rig::new(2);
    let idle1 = rig.current(1);
    let h = rig.spawn(Priority::Normal);
    rig.run(&h);
    assert_eq!(rig.info(h.tid()).unwrap().bound_cpu, Some(0));

    rig.schedule_on(1, 3);
    assert_eq!(rig.current(1), idle1);
    assert_eq!(rig.current(0), Some(h.tid()));
    rig.assert_consistent();
}

#[test]
fn thread_migrates_after_leaving_core() {
    let rig = Rig::new(2);
    let h = rig.spawn(Priority::Normal);
    rig.run(&h);

    // Sai do núcleo 0 e volta a ser elegível em qualquer núcleo
    rig.sched.pause_thread(&h).unwrap();
    assert_eq!(rig.info(h.tid()).unwrap().bound_cpu, None);
    rig.sched.resume_thread(&h).unwrap();

    rig.schedule_on(1, 1);
    assert_eq!(rig.current(1), Some(h.tid()));
    assert_eq!(rig.info(h.tid()).unwrap().bound_cpu, Some(1));
    rig.assert_consistent();
}

#[test]
fn affinity_limits_cores() {
    let rig = Rig::new(2);
    let idle0 = rig.current(0);
    let h = rig.spawn_with(ThreadParams::new(ENTRY, 0).affinity(CpuMask::single(1).bits()));

    rig.schedule_on(0, 2);
    assert_eq!(rig.current(0), idle0);
    rig.schedule_on(1, 1);
    assert_eq!(rig.current(1), Some(h.tid()));
}

#[test]
fn remote_pause_kicks_owner_core() {
    let rig = Rig::new(2);
    let idle1 = rig.current(1);
    let h = rig.spawn(Priority::Normal);
    rig.schedule_on(1, 1);
    assert_eq!(rig.current(1), Some(h.tid()));

    rig.sched.pause_thread(&h).unwrap();
    assert!(rig
        .platform
        .ipis()
        .contains(&(0, IpiTarget::Single(1), IpiVector::Reschedule)));
    let info = rig.info(h.tid()).unwrap();
    assert!(!info.status.contains(ThreadStatus::RUNNING));
    assert_eq!(info.bound_cpu, Some(1));
    rig.assert_consistent();

    // O núcleo 1 atende a IPI
    rig.schedule_on(1, 1);
    assert_eq!(rig.current(1), idle1);
    assert_eq!(rig.info(h.tid()).unwrap().bound_cpu, None);
    rig.assert_consistent();
}

#[test]
fn remote_terminate_frees_stack_after_reschedule() {
    let rig = Rig::new(2);
    let h = rig.spawn(Priority::Normal);
    rig.schedule_on(1, 1);
    assert_eq!(rig.current(1), Some(h.tid()));

    rig.sched.terminate_thread(&h, 9).unwrap();
    assert_eq!(rig.sched.thread_status(&h), Ok(ThreadStatus::DEAD));
    assert_eq!(rig.thread_stacks(2), 1);

    rig.schedule_on(1, 1);
    assert_ne!(rig.current(1), Some(h.tid()));
    assert_eq!(rig.thread_stacks(2), 0);
    assert_eq!(rig.sched.thread_exit_code(&h), Ok(9));
    rig.close(h);
    rig.assert_consistent();
}

#[test]
fn exit_after_remote_terminate_keeps_first_code() {
    let rig = Rig::new(2);
    let h = rig.spawn(Priority::Normal);
    rig.schedule_on(1, 1);
    assert_eq!(rig.current(1), Some(h.tid()));

    // O núcleo 0 termina `h` antes de ela chegar à segunda fase da `exit`
    rig.sched.terminate_thread(&h, 5).unwrap();
    on_cpu(1, || rig.sched.exit(9)).unwrap();

    assert_eq!(rig.sched.thread_exit_code(&h), Ok(5));
    assert_ne!(rig.current(1), Some(h.tid()));
    assert_eq!(rig.info(h.tid()).unwrap().bound_cpu, None);
    assert_eq!(rig.thread_stacks(2), 0);
    rig.close(h);
    rig.assert_consistent();
}

#[test]
fn core_control_validates_target() {
    let rig = Rig::new(2);
    assert_eq!(rig.sched.stop_core(5), Err(KError::InvalidParameter));
    assert_eq!(rig.sched.reschedule_core(99), Err(KError::InvalidParameter));

    rig.sched.reschedule_core(1).unwrap();
    rig.sched.stop_core(1).unwrap();
    let ipis = rig.platform.ipis();
    assert_eq!(ipis.len(), 2);
    assert!(ipis
        .iter()
        .all(|&i| i == (0, IpiTarget::Single(1), IpiVector::Reschedule)));
}

#[test]
fn concurrent_ticks_keep_invariants() {
    const CORES: u32 = 4;
    let rig = Rig::new(CORES);
    let prios = [
        Priority::High,
        Priority::Normal,
        Priority::Normal,
        Priority::Low,
        Priority::Idle,
        Priority::Normal,
    ];
    let handles: Vec<_> = prios
        .into_iter()
        .map(|p| rig.spawn(p))
        .collect();

    std::thread::scope(|s| {
        for id in 1..CORES {
            let sched = &rig.sched;
            s.spawn(move || {
                set_current_cpu(id);
                for _ in 0..500 {
                    sched.timer_tick();
                }
            });
        }

        // Núcleo 0: ticks misturados com pausa/retomada remotas
        let sched = &rig.sched;
        let handles = &handles;
        s.spawn(move || {
            set_current_cpu(0);
            for i in 0..500 {
                let h = &handles[i % handles.len()];
                if i % 7 == 0 {
                    let _ = sched.pause_thread(h);
                } else if i % 7 == 3 {
                    let _ = sched.resume_thread(h);
                }
                sched.timer_tick();
            }
            for h in handles {
                let _ = sched.resume_thread(h);
            }
        });
    });

    rig.assert_consistent();
    assert_eq!(rig.sched.jiffies(), 500);
    assert_eq!(rig.thread_stacks(CORES as usize), handles.len());
}

#[test]
fn concurrent_create_and_close() {
    const CORES: u32 = 4;
    let rig = Rig::new(CORES);

    std::thread::scope(|s| {
        for id in 0..CORES {
            let sched = &rig.sched;
            s.spawn(move || {
                set_current_cpu(id);
                for _ in 0..100 {
                    let h = sched
                        .create_thread(&ThreadParams::new(ENTRY, 0).priority(Priority::Low))
                        .unwrap();
                    sched.terminate_thread(&h, 0).unwrap();
                    sched.close_thread(h).unwrap();
                }
            });
        }
    });

    assert_eq!(rig.thread_stacks(CORES as usize), 0);
    assert_eq!(rig.sched.snapshot().len(), CORES as usize);
    rig.assert_consistent();
}

#[test]
fn contended_lock_moves_blocked_thread_off_core() {
    let rig = Rig::new(2);
    let h = rig.spawn(Priority::Normal);
    rig.run(&h);
    let slot = h.thread_ref().slot;
    let core0 = rig.sched.core(0).unwrap();

    let never = |_: &PredicateContext<'_>| false;
    rig.with_state(|st| rig.sched.block_locked(st, core0, Box::new(never), None))
        .unwrap();

    // Núcleo 1 segura a seção crítica enquanto o núcleo 0 escalona
    let held = Barrier::new(2);
    let release = Barrier::new(2);
    let (left_core, on_idle) = std::thread::scope(|s| {
        s.spawn(|| {
            set_current_cpu(1);
            let core1 = rig.sched.core(1).unwrap();
            let guard = rig.sched.lock.enter(core1, rig.sched.platform.as_cpu());
            held.wait();
            release.wait();
            drop(guard);
        });
        held.wait();
        rig.sched.schedule();
        let seen = (core0.current() != slot, core0.is_idle_current());
        release.wait();
        seen
    });
    assert!(left_core);
    assert!(on_idle);

    let info = rig.info(h.tid()).unwrap();
    assert!(info.status.contains(ThreadStatus::BLOCKED));
    assert!(!info.status.contains(ThreadStatus::RUNNING));

    // O epílogo pendente roda na próxima decisão com o lock livre
    rig.schedule_on(0, 1);
    assert_eq!(rig.info(h.tid()).unwrap().bound_cpu, None);
    rig.assert_consistent();
}

#[test]
fn contended_lock_keeps_eligible_thread() {
    let rig = Rig::new(2);
    let h = rig.spawn(Priority::Normal);
    rig.run(&h);
    let slot = h.thread_ref().slot;
    let core0 = rig.sched.core(0).unwrap();

    let held = Barrier::new(2);
    let release = Barrier::new(2);
    let stayed = std::thread::scope(|s| {
        s.spawn(|| {
            set_current_cpu(1);
            let core1 = rig.sched.core(1).unwrap();
            let guard = rig.sched.lock.enter(core1, rig.sched.platform.as_cpu());
            held.wait();
            release.wait();
            drop(guard);
        });
        held.wait();
        rig.sched.schedule();
        let stayed = core0.current() == slot;
        release.wait();
        stayed
    });
    assert!(stayed);
    rig.assert_consistent();
}

#[test]
fn sleeping_under_contention_always_leaves_core() {
    let rig = Rig::new(2);
    let h = rig.spawn_with(ThreadParams::new(ENTRY, 0).affinity(CpuMask::single(0).bits()));
    rig.run(&h);
    let slot = h.thread_ref().slot;
    let core0 = rig.sched.core(0).unwrap();

    let stop = AtomicBool::new(false);
    let outcome = std::thread::scope(|s| {
        s.spawn(|| {
            set_current_cpu(1);
            while !stop.load(Ordering::Relaxed) {
                rig.sched.schedule();
            }
        });

        // Nada aqui pode entrar em pânico antes de `stop`, senão o núcleo 1
        // gira para sempre
        let mut kept_core = 0;
        let mut failed = 0;
        for _ in 0..200 {
            if rig.sched.sleep(1).is_err() {
                failed += 1;
            }
            if core0.current() == slot {
                kept_core += 1;
            }
            for _ in 0..1_000_000 {
                if core0.current() == slot {
                    break;
                }
                rig.sched.timer_tick();
            }
        }
        stop.store(true, Ordering::Relaxed);
        (kept_core, failed)
    });

    assert_eq!(outcome, (0, 0));
    assert_eq!(core0.current(), slot);
    rig.assert_consistent();
}

#[test]
#[should_panic(expected = "hang")]
fn selecting_thread_owned_by_other_core_is_fatal() {
    let rig = Rig::new(2);
    let h = rig.spawn(Priority::Normal);
    rig.schedule_on(1, 1);
    assert_eq!(rig.current(1), Some(h.tid()));

    let slot = h.thread_ref().slot;
    let core0 = rig.sched.core(0).unwrap();
    rig.with_state(|st| {
        rig.sched.bind_next(st, core0, slot);
    });
}

#[test]
#[should_panic(expected = "hang")]
fn reentrant_predicate_is_fatal() {
    let rig = Rig::new(1);
    let h = rig.spawn(Priority::Normal);
    let slot = h.thread_ref().slot;
    rig.with_state(|st| {
        let t = st.threads.get_mut(slot).unwrap();
        t.status.insert(ThreadStatus::BLOCKED | ThreadStatus::IN_BLOCK_CALLBACK);
    });
    rig.schedule_on(0, 1);
}
