//! Safe bindings to the libfaac AAC encoder.

pub use faac_sys as sys;

mod config;
pub use config::*;

mod encoder;
pub use encoder::*;

use snafu::Snafu;
use std::ffi::{c_char, CStr};

#[derive(Debug, Snafu)]
pub enum FaacVersionError {
    #[snafu(display("libfaac reports configuration version {runtime}, but the bindings were generated for {compiled}"))]
    AbiMismatch { runtime: i32, compiled: i32 },
}

#[derive(Clone, Debug)]
pub struct FaacVersion {
    pub id: String,
    pub copyright: String,
    /// The layout version of the library's configuration struct.
    pub config_version: i32,
}

/// Queries the linked libfaac, failing if its configuration layout differs from the one the
/// bindings were generated against.
pub fn version() -> Result<FaacVersion, FaacVersionError> {
    let mut id: *mut c_char = std::ptr::null_mut();
    let mut copyright: *mut c_char = std::ptr::null_mut();
    let runtime = unsafe { sys::faacEncGetVersion(&mut id as _, &mut copyright as _) };
    let compiled = sys::FAAC_CFG_VERSION as i32;
    if runtime != compiled {
        return Err(FaacVersionError::AbiMismatch { runtime, compiled });
    }

    let to_string = |s: *mut c_char| {
        if s.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned()
        }
    };
    Ok(FaacVersion {
        id: to_string(id),
        copyright: to_string(copyright),
        config_version: runtime,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_version() {
        let version = version().unwrap();
        assert!(!version.id.is_empty());
        assert_eq!(version.config_version, sys::FAAC_CFG_VERSION as i32);
    }
}
