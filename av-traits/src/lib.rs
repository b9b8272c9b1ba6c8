#![no_std]

extern crate alloc;

mod audio_encoder;
pub use audio_encoder::*;
