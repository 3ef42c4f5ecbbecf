#![allow(clippy::missing_errors_doc)]

pub mod fs;

use std::ffi::CStr;

/// Hardware name of the host as reported by `uname -m` (e.g. `x86_64`, `aarch64`).
pub fn machine_name() -> std::io::Result<String> {
    let mut info: libc::utsname = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::uname(&mut info) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    let machine = unsafe { CStr::from_ptr(info.machine.as_ptr()) };
    Ok(machine.to_string_lossy().into_owned())
}

/// Set the scheduling priority (nice value) of the calling process.
///
/// Negative values usually require elevated privileges.
pub fn set_priority(nice: i32) -> std::io::Result<()> {
    // the `which` argument is `c_int` on some targets and `c_uint` on others
    #[allow(clippy::useless_conversion)]
    let ret = unsafe { libc::setpriority(libc::PRIO_PROCESS as _, 0, nice) };
    if ret == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_machine_name() -> std::io::Result<()> {
        let machine = super::machine_name()?;
        assert!(!machine.is_empty());
        assert!(!machine.contains('\0'));
        Ok(())
    }

    #[test]
    fn test_keep_current_priority() -> std::io::Result<()> {
        // reading the current value and setting it again never needs privileges
        let current = unsafe { libc::getpriority(libc::PRIO_PROCESS as _, 0) };
        super::set_priority(current)
    }
}
