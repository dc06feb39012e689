//! Dispatcher das Syscalls de Threads
//!
//! Tabela estática de handlers indexada pelo número da syscall, no estilo
//! do resto do kernel. `None` = syscall inexistente (`-ENOSYS`).

use core::mem::{align_of, size_of};

use super::abi::{CreateThreadArgs, SyscallArgs};
use super::numbers::*;
use crate::core::object::Handle;
use crate::sched::core::Scheduler;
use crate::sched::task::handle::ThreadHandle;
use crate::sched::task::lifecycle::ThreadParams;
use crate::sched::task::state::Priority;
use crate::sys::error::{Errno, KError, KResult};
use crate::sys::types::{Pid, Tid};

/// Tipo de handler de syscall
pub type SyscallHandler = fn(&Scheduler, &SyscallArgs) -> KResult<usize>;

/// Tamanho da tabela
pub const TABLE_SIZE: usize = 32;

pub static SYSCALL_TABLE: [Option<SyscallHandler>; TABLE_SIZE] = {
    let mut table: [Option<SyscallHandler>; TABLE_SIZE] = [None; TABLE_SIZE];

    table[SYS_THREAD_MAKE_HANDLE] = Some(sys_make_handle);
    table[SYS_THREAD_OPEN] = Some(sys_open);
    table[SYS_THREAD_CREATE] = Some(sys_create);
    table[SYS_THREAD_PAUSE] = Some(sys_pause);
    table[SYS_THREAD_RESUME] = Some(sys_resume);
    table[SYS_THREAD_SET_PRIORITY] = Some(sys_set_priority);
    table[SYS_THREAD_TERMINATE] = Some(sys_terminate);
    table[SYS_THREAD_STATUS] = Some(sys_status);
    table[SYS_THREAD_EXIT_CODE] = Some(sys_exit_code);
    table[SYS_THREAD_LAST_ERROR] = Some(sys_last_error);
    table[SYS_THREAD_TID] = Some(sys_tid);
    table[SYS_CURRENT_TID] = Some(sys_current_tid);
    table[SYS_THREAD_EXIT] = Some(sys_exit);
    table[SYS_THREAD_CLOSE] = Some(sys_close);

    table
};

/// Executa a syscall. Retorna o valor para RAX (negativo = `-errno`).
pub fn dispatch(sched: &Scheduler, args: &SyscallArgs) -> isize {
    crate::ktrace!("(Syscall) num=", args.num);

    let Some(handler) = SYSCALL_TABLE.get(args.num).copied().flatten() else {
        crate::kwarn!("(Syscall) Desconhecida num=", args.num);
        return Errno::ENOSYS.as_isize();
    };

    match handler(sched, args) {
        Ok(val) => val as isize,
        Err(e) => {
            crate::ktrace!("(Syscall) Erro na syscall num=", args.num);
            e.to_errno().as_isize()
        }
    }
}

/// Ponto de entrada chamado pelo stub de syscall da plataforma.
#[no_mangle]
pub extern "C" fn anvil_syscall(args: &SyscallArgs) -> isize {
    match crate::sched::scheduler() {
        Some(s) => dispatch(s, args),
        None => Errno::ENOSYS.as_isize(),
    }
}

fn user_handle(raw: usize) -> Handle {
    Handle::from_raw(raw as u32)
}

/// Lê uma struct de parâmetros da memória do processo.
fn read_user<T: Copy>(sched: &Scheduler, addr: usize) -> KResult<T> {
    if addr % align_of::<T>() != 0 || !sched.platform().can_access_user(addr as u64, size_of::<T>()) {
        return Err(KError::InvalidParameter);
    }
    // SAFETY: faixa validada pela plataforma e alinhada.
    Ok(unsafe { core::ptr::read(addr as *const T) })
}

/// Cópia do `ThreadHandle` guardado no handle de usuário.
fn user_thread(sched: &Scheduler, raw: usize) -> KResult<ThreadHandle> {
    let h = user_handle(raw);
    sched.with_user_handles(|t| t.thread(h).map(ThreadHandle::shadow))
}

/// Guarda `thread` no handle de usuário, fechando-o se a entrada mudou.
fn bind(sched: &Scheduler, h: Handle, thread: ThreadHandle) -> KResult<usize> {
    let rejected = sched.with_user_handles(|t| Ok(t.install(h, thread).err()))?;
    match rejected {
        None => Ok(0),
        Some((e, thread)) => {
            let tid = thread.tid();
            if let Err(close) = sched.close_thread(thread) {
                crate::kwarn!("(Syscall) Handle recusado nao foi fechado, tid=", tid.0);
                crate::kwarn!(close.as_str());
            }
            Err(e)
        }
    }
}

fn sys_make_handle(sched: &Scheduler, _args: &SyscallArgs) -> KResult<usize> {
    let h = sched.with_user_handles(|t| t.alloc().ok_or(KError::OutOfMemory))?;
    Ok(h.as_u32() as usize)
}

fn sys_open(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    let h = user_handle(args.arg1);
    sched.with_user_handles(|t| t.check_unopened(h))?;
    let thread = sched.open_thread(Tid(args.arg2 as u32))?;
    bind(sched, h, thread)
}

fn sys_create(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    let p: CreateThreadArgs = read_user(sched, args.arg1)?;
    let h = Handle::from_raw(p.handle);
    sched.with_user_handles(|t| t.check_unopened(h))?;

    let mut params = ThreadParams::new(p.entry, p.arg)
        .raw_priority(p.priority)
        .affinity(p.affinity)
        .stack_size(p.stack_size as usize)
        .start_paused(p.start_paused != 0);
    if p.process != 0 {
        params = params.process(Pid(p.process));
    }

    let thread = sched.create_thread(&params)?;
    bind(sched, h, thread)
}

fn sys_pause(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    sched.pause_thread(&user_thread(sched, args.arg1)?)?;
    Ok(0)
}

fn sys_resume(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    sched.resume_thread(&user_thread(sched, args.arg1)?)?;
    Ok(0)
}

fn sys_set_priority(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    let thread = user_thread(sched, args.arg1)?;
    let prio = match Priority::from_raw(args.arg2 as u32) {
        Some(p) => p,
        None => return sched.record_error(KError::InvalidParameter),
    };
    sched.set_thread_priority(&thread, prio)?;
    Ok(0)
}

fn sys_terminate(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    sched.terminate_thread(&user_thread(sched, args.arg1)?, args.arg2 as u32)?;
    Ok(0)
}

fn sys_status(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    let status = sched.thread_status(&user_thread(sched, args.arg1)?)?;
    Ok(status.bits() as usize)
}

fn sys_exit_code(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    let code = sched.thread_exit_code(&user_thread(sched, args.arg1)?)?;
    Ok(code as usize)
}

fn sys_last_error(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    let err = sched.thread_last_error(&user_thread(sched, args.arg1)?)?;
    Ok(err.map_or(0, |e| e.to_errno().as_usize()))
}

fn sys_tid(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    let tid = sched.thread_tid(&user_thread(sched, args.arg1)?)?;
    Ok(tid.0 as usize)
}

fn sys_current_tid(sched: &Scheduler, _args: &SyscallArgs) -> KResult<usize> {
    Ok(sched.current_tid().0 as usize)
}

fn sys_exit(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    crate::kdebug!("(Syscall) exit code=", args.arg1);
    sched.exit(args.arg1 as u32)?;
    Ok(0)
}

fn sys_close(sched: &Scheduler, args: &SyscallArgs) -> KResult<usize> {
    let h = user_handle(args.arg1);
    match sched.with_user_handles(|t| t.remove(h))? {
        super::handle::UserObject::Thread(thread) => sched.close_thread(thread)?,
        super::handle::UserObject::Unopened => {}
    }
    Ok(0)
}
