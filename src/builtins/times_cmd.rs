//! times builtin

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;

pub fn times(
    _exec: &mut Executor,
    _state: &mut ShellState,
    _argv: &[String],
) -> Result<i32, ExecError> {
    let mut tms = unsafe { std::mem::zeroed::<libc::tms>() };
    unsafe {
        libc::times(&mut tms);
    }
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) }.max(1) as f64;

    println!(
        "{} {}\n{} {}",
        format_ticks(tms.tms_utime as f64 / ticks),
        format_ticks(tms.tms_stime as f64 / ticks),
        format_ticks(tms.tms_cutime as f64 / ticks),
        format_ticks(tms.tms_cstime as f64 / ticks),
    );
    Ok(0)
}

fn format_ticks(seconds: f64) -> String {
    let minutes = (seconds / 60.0) as u64;
    format!("{}m{:.3}s", minutes, seconds - (minutes as f64) * 60.0)
}
