#![allow(
    deref_nullptr,
    non_snake_case,
    non_upper_case_globals,
    non_camel_case_types,
    clippy::unreadable_literal,
    clippy::cognitive_complexity
)]
include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

#[cfg(test)]
mod test {
    use super::*;
    use std::os::raw::{c_char, c_ulong};

    #[test]
    fn test_faac_enc_get_version() {
        let mut id: *mut c_char = std::ptr::null_mut();
        let mut copyright: *mut c_char = std::ptr::null_mut();
        let version = unsafe { faacEncGetVersion(&mut id as _, &mut copyright as _) };
        assert_eq!(version, FAAC_CFG_VERSION as i32);
        assert!(!id.is_null());
    }

    #[test]
    fn test_faac_enc_open_close() {
        let mut input_samples: c_ulong = 0;
        let mut max_output_bytes: c_ulong = 0;
        unsafe {
            let handle = faacEncOpen(44100, 2, &mut input_samples as _, &mut max_output_bytes as _);
            assert!(!handle.is_null());
            assert!(input_samples > 0);
            assert!(max_output_bytes > 0);
            faacEncClose(handle);
        }
    }
}
