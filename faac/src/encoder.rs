use crate::config::{FaacConfiguration, FaacConfigurationError, InputFormat};
use av_traits::{AudioEncoder, EncodedAudioPacket, RawAudioPacket};
use faac_sys as sys;
use scopeguard::guard;
use snafu::Snafu;
use std::{
    ffi::{c_uint, c_ulong},
    mem, ptr,
};

#[derive(Debug, Snafu)]
pub enum FaacEncoderError {
    #[snafu(display("sample rate and channel count must be non-zero (got {sample_rate} Hz, {channels} channels)"))]
    InvalidParameters { sample_rate: u32, channels: u32 },
    #[snafu(display("unable to open encoder for {sample_rate} Hz, {channels} channels"))]
    Init { sample_rate: u32, channels: u32 },
    #[snafu(display("configuration rejected by libfaac"))]
    Configuration,
    #[snafu(context(false), display("unable to read configuration"))]
    ReadConfiguration { source: FaacConfigurationError },
    #[snafu(display("the encoder is closed"))]
    Closed,
    #[snafu(display("no samples to encode"))]
    EmptyInput,
    #[snafu(display("got {samples} samples but at most {max} can be encoded per call"))]
    TooManySamples { samples: usize, max: usize },
    #[snafu(display("output buffer is {len} bytes but must be at least {required}"))]
    OutputBufferTooSmall { len: usize, required: usize },
    #[snafu(display("no integer input format has been configured"))]
    NotConfigured,
    #[snafu(display("got {provided:?} samples but the configured input format is {configured:?}"))]
    InputFormatMismatch { configured: Option<InputFormat>, provided: InputFormat },
    #[snafu(display("error encoding (code = {code})"))]
    Encode { code: i32 },
    #[snafu(display("error getting decoder specific info (code = {code})"))]
    DecoderSpecificInfo { code: i32 },
}

type Result<T> = core::result::Result<T, FaacEncoderError>;

// libfaac stops emitting once more than four flush frames have been submitted
const MAX_FLUSH_FRAMES: u32 = 5;

/// An AAC encoder backed by libfaac.
///
/// Each encoder owns one native instance, which is released by `close` or when the encoder is
/// dropped. All operations take `&mut self` because libfaac instances aren't safe for concurrent
/// use.
///
/// Samples are always interleaved. `input_samples` and `max_output_bytes` describe the buffer
/// sizes for a single encode call, with `input_samples` counting samples across all channels.
pub struct FaacEncoder {
    handle: sys::faacEncHandle,
    sample_rate: u32,
    channels: u32,
    input_samples: usize,
    max_output_bytes: usize,
    // only set by set_configuration, regardless of the library's defaults
    input_format: Option<InputFormat>,
    // aligned copy of byte input
    scratch: Vec<i32>,
    packet_buffer: Vec<u8>,
    // null-input calls since the last real input
    flush_frames: u32,
}

unsafe impl Send for FaacEncoder {}

impl FaacEncoder {
    pub fn open(sample_rate: u32, channels: u32) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(FaacEncoderError::InvalidParameters { sample_rate, channels });
        }

        let mut input_samples: c_ulong = 0;
        let mut max_output_bytes: c_ulong = 0;
        let handle = unsafe { sys::faacEncOpen(sample_rate as _, channels as _, &mut input_samples as _, &mut max_output_bytes as _) };
        if handle.is_null() {
            log::warn!("unable to open faac encoder for {sample_rate} Hz, {channels} channels");
            return Err(FaacEncoderError::Init { sample_rate, channels });
        }

        log::debug!(
            "opened faac encoder: {sample_rate} Hz, {channels} channels, {input_samples} input samples, {max_output_bytes} max output bytes"
        );

        Ok(Self {
            handle,
            sample_rate,
            channels,
            input_samples: input_samples as _,
            max_output_bytes: max_output_bytes as _,
            input_format: None,
            scratch: Vec::new(),
            packet_buffer: Vec::new(),
            flush_frames: 0,
        })
    }

    /// Opens an encoder and applies the given configuration to it.
    pub fn new(sample_rate: u32, channels: u32, configuration: &FaacConfiguration) -> Result<Self> {
        let mut encoder = Self::open(sample_rate, channels)?;
        encoder.set_configuration(configuration)?;
        Ok(encoder)
    }

    fn handle(&self) -> Result<sys::faacEncHandle> {
        if self.handle.is_null() {
            Err(FaacEncoderError::Closed)
        } else {
            Ok(self.handle)
        }
    }

    fn current_configuration(&self) -> Result<sys::faacEncConfigurationPtr> {
        let handle = self.handle()?;
        Ok(unsafe { sys::faacEncGetCurrentConfiguration(handle) })
    }

    pub fn configuration(&self) -> Result<FaacConfiguration> {
        let config = self.current_configuration()?;
        Ok(FaacConfiguration::from_sys(unsafe { &*config })?)
    }

    /// Writes the configuration into the encoder. This may be called again at any time to
    /// reconfigure it.
    ///
    /// If the configuration is rejected, the encoder is left with whatever parameters libfaac
    /// retained, which may be a mix of the old and new ones.
    pub fn set_configuration(&mut self, configuration: &FaacConfiguration) -> Result<()> {
        let handle = self.handle()?;
        let config = self.current_configuration()?;
        let accepted = unsafe {
            configuration.apply_to(&mut *config);
            sys::faacEncSetConfiguration(handle, config)
        };

        // the live configuration keeps the written input format even when it's rejected
        self.input_format = InputFormat::from_repr(unsafe { (*config).inputFormat } as _);

        if accepted == 0 {
            log::warn!("faac rejected configuration: {configuration:?}");
            return Err(FaacEncoderError::Configuration);
        }
        log::debug!("configured faac encoder: {configuration:?}");
        Ok(())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// The number of samples, across all channels, that each encode call should provide.
    pub fn input_samples(&self) -> usize {
        self.input_samples
    }

    /// The number of bytes a single encode call may write.
    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }

    /// The input format selected by the most recent `set_configuration` call.
    pub fn input_format(&self) -> Option<InputFormat> {
        self.input_format
    }

    /// The number of bytes per sample expected by `encode_bytes`. This is `None` until a
    /// configuration with an integer input format has been set.
    pub fn sample_width(&self) -> Option<usize> {
        self.input_format.and_then(|format| format.sample_width())
    }

    /// Allocates a buffer large enough for any single encode call.
    pub fn output_buffer(&self) -> Vec<u8> {
        vec![0; self.max_output_bytes]
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_null()
    }

    fn check_buffers(&self, samples: usize, output: &[u8]) -> Result<()> {
        self.handle()?;
        if samples == 0 {
            return Err(FaacEncoderError::EmptyInput);
        }
        if samples > self.input_samples {
            return Err(FaacEncoderError::TooManySamples {
                samples,
                max: self.input_samples,
            });
        }
        self.check_output(output)
    }

    fn check_output(&self, output: &[u8]) -> Result<()> {
        if output.len() < self.max_output_bytes {
            return Err(FaacEncoderError::OutputBufferTooSmall {
                len: output.len(),
                required: self.max_output_bytes,
            });
        }
        Ok(())
    }

    /// # Safety
    /// `input` must point to `samples` samples of the format libfaac is currently configured for,
    /// or be null if `samples` is zero.
    unsafe fn encode_raw(&mut self, input: *mut i32, samples: usize, output: &mut [u8]) -> Result<usize> {
        let code = sys::faacEncEncode(
            self.handle,
            input,
            samples as _,
            output.as_mut_ptr(),
            output.len().min(c_uint::MAX as usize) as _,
        );
        if code < 0 {
            return Err(FaacEncoderError::Encode { code });
        }
        if samples > 0 {
            self.flush_frames = 0;
        }
        Ok(code as _)
    }

    /// Encodes interleaved float samples, returning the number of bytes written to `output`.
    ///
    /// The samples are passed through as-is, so the encoder should be configured for
    /// `InputFormat::Float`. Zero is returned while the encoder is buffering input.
    pub fn encode_floats(&mut self, samples: &[f32], output: &mut [u8]) -> Result<usize> {
        self.check_buffers(samples.len(), output)?;
        let input: &[i32] = bytemuck::cast_slice(samples);
        // libfaac never writes through the input pointer
        unsafe { self.encode_raw(input.as_ptr() as *mut i32, samples.len(), output) }
    }

    /// Encodes packed native-endian integer samples, returning the number of bytes written to
    /// `output`.
    ///
    /// The sample width comes from the configured input format. Trailing bytes that don't make up
    /// a whole sample are ignored.
    pub fn encode_bytes(&mut self, samples: &[u8], output: &mut [u8]) -> Result<usize> {
        self.handle()?;
        let width = self.sample_width().ok_or(FaacEncoderError::NotConfigured)?;
        let count = samples.len() / width;
        self.check_buffers(count, output)?;

        let len = count * width;
        self.scratch.clear();
        self.scratch.resize(len.div_ceil(mem::size_of::<i32>()), 0);
        bytemuck::cast_slice_mut::<i32, u8>(&mut self.scratch)[..len].copy_from_slice(&samples[..len]);
        let input = self.scratch.as_mut_ptr();
        unsafe { self.encode_raw(input, count, output) }
    }

    /// Drains buffered input, returning the number of bytes written to `output`. This should be
    /// invoked after the last encode call until it returns zero.
    ///
    /// libfaac may need several empty submissions before delayed frames come out, so this keeps
    /// submitting until it produces output or the library has nothing left to drain.
    pub fn flush_into(&mut self, output: &mut [u8]) -> Result<usize> {
        self.handle()?;
        self.check_output(output)?;
        while self.flush_frames < MAX_FLUSH_FRAMES {
            self.flush_frames += 1;
            let written = unsafe { self.encode_raw(ptr::null_mut(), 0, output)? };
            if written > 0 {
                return Ok(written);
            }
        }
        Ok(0)
    }

    /// Returns the AudioSpecificConfig describing the stream, as needed by MP4 muxers. This is
    /// only available for MPEG-4 streams.
    pub fn decoder_specific_info(&self) -> Result<Vec<u8>> {
        let handle = self.handle()?;
        let mut buffer: *mut u8 = ptr::null_mut();
        let mut len: c_ulong = 0;
        let code = unsafe { sys::faacEncGetDecoderSpecificInfo(handle, &mut buffer as _, &mut len as _) };
        let buffer = guard(buffer, |buffer| unsafe { libc::free(buffer as _) });
        if code != 0 {
            return Err(FaacEncoderError::DecoderSpecificInfo { code });
        }
        if buffer.is_null() {
            return Ok(Vec::new());
        }
        Ok(unsafe { std::slice::from_raw_parts(*buffer, len as _) }.to_vec())
    }

    /// Releases the native encoder. Calling this more than once has no effect, and every other
    /// operation fails with `FaacEncoderError::Closed` afterwards.
    pub fn close(&mut self) {
        if self.handle.is_null() {
            return;
        }
        let code = unsafe { sys::faacEncClose(self.handle) };
        self.handle = ptr::null_mut();
        if code != 0 {
            log::warn!("faacEncClose returned {code}");
        } else {
            log::debug!("closed faac encoder");
        }
    }

    fn check_input_format(&self, provided: InputFormat) -> Result<()> {
        if self.input_format != Some(provided) {
            return Err(FaacEncoderError::InputFormatMismatch {
                configured: self.input_format,
                provided,
            });
        }
        Ok(())
    }

    fn encode_packet<F>(&mut self, encode: F) -> Result<Option<EncodedAudioPacket>>
    where
        F: FnOnce(&mut Self, &mut [u8]) -> Result<usize>,
    {
        let mut buffer = mem::take(&mut self.packet_buffer);
        buffer.resize(self.max_output_bytes, 0);
        let packet = encode(self, &mut buffer).map(|n| (n > 0).then(|| EncodedAudioPacket { data: buffer[..n].to_vec() }));
        self.packet_buffer = buffer;
        packet
    }
}

impl Drop for FaacEncoder {
    fn drop(&mut self) {
        self.close();
    }
}

impl AudioEncoder<f32> for FaacEncoder {
    type Error = FaacEncoderError;

    fn encode(&mut self, packet: RawAudioPacket<f32>) -> Result<Option<EncodedAudioPacket>> {
        self.check_input_format(InputFormat::Float)?;
        self.encode_packet(|encoder, output| encoder.encode_floats(packet.samples, output))
    }

    fn flush(&mut self) -> Result<Option<EncodedAudioPacket>> {
        self.encode_packet(|encoder, output| encoder.flush_into(output))
    }
}

impl AudioEncoder<i16> for FaacEncoder {
    type Error = FaacEncoderError;

    fn encode(&mut self, packet: RawAudioPacket<i16>) -> Result<Option<EncodedAudioPacket>> {
        self.check_input_format(InputFormat::Int16)?;
        self.encode_packet(|encoder, output| encoder.encode_bytes(bytemuck::cast_slice(packet.samples), output))
    }

    fn flush(&mut self) -> Result<Option<EncodedAudioPacket>> {
        self.encode_packet(|encoder, output| encoder.flush_into(output))
    }
}

impl AudioEncoder<i32> for FaacEncoder {
    type Error = FaacEncoderError;

    fn encode(&mut self, packet: RawAudioPacket<i32>) -> Result<Option<EncodedAudioPacket>> {
        self.check_input_format(InputFormat::Int32)?;
        self.encode_packet(|encoder, output| encoder.encode_bytes(bytemuck::cast_slice(packet.samples), output))
    }

    fn flush(&mut self) -> Result<Option<EncodedAudioPacket>> {
        self.encode_packet(|encoder, output| encoder.flush_into(output))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{MpegVersion, ObjectType};

    fn configured_encoder(input_format: InputFormat) -> FaacEncoder {
        let mut encoder = FaacEncoder::open(44100, 2).unwrap();
        let mut config = encoder.configuration().unwrap();
        config.input_format = input_format;
        config.object_type = ObjectType::Low;
        config.mpeg_version = MpegVersion::Mpeg4;
        encoder.set_configuration(&config).unwrap();
        encoder
    }

    #[test]
    fn test_open() {
        let encoder = FaacEncoder::open(44100, 2).unwrap();
        assert_eq!(encoder.sample_rate(), 44100);
        assert_eq!(encoder.channels(), 2);
        assert!(encoder.input_samples() > 0);
        assert!(encoder.max_output_bytes() > 0);
        assert_eq!(encoder.output_buffer().len(), encoder.max_output_bytes());
        assert_eq!(encoder.sample_width(), None);
    }

    #[test]
    fn test_open_invalid_parameters() {
        assert!(matches!(FaacEncoder::open(0, 2), Err(FaacEncoderError::InvalidParameters { .. })));
        assert!(matches!(FaacEncoder::open(44100, 0), Err(FaacEncoderError::InvalidParameters { .. })));
    }

    #[test]
    fn test_close() {
        let mut encoder = FaacEncoder::open(48000, 1).unwrap();
        encoder.close();
        assert!(encoder.is_closed());
        encoder.close();
        assert!(encoder.is_closed());

        let mut output = vec![0; encoder.max_output_bytes()];
        assert!(matches!(encoder.configuration(), Err(FaacEncoderError::Closed)));
        assert!(matches!(encoder.encode_floats(&[0.0; 16], &mut output), Err(FaacEncoderError::Closed)));
        assert!(matches!(encoder.flush_into(&mut output), Err(FaacEncoderError::Closed)));
    }

    #[test]
    fn test_sample_width() {
        assert_eq!(configured_encoder(InputFormat::Int16).sample_width(), Some(2));
        assert_eq!(configured_encoder(InputFormat::Int32).sample_width(), Some(4));
        assert_eq!(configured_encoder(InputFormat::Float).sample_width(), None);
    }

    #[test]
    fn test_encode_empty_input() {
        let mut encoder = configured_encoder(InputFormat::Float);
        let mut output = encoder.output_buffer();
        assert!(matches!(encoder.encode_floats(&[], &mut output), Err(FaacEncoderError::EmptyInput)));

        let mut encoder = configured_encoder(InputFormat::Int16);
        assert!(matches!(encoder.encode_bytes(&[], &mut output), Err(FaacEncoderError::EmptyInput)));
        // a single byte doesn't make up a sample
        assert!(matches!(encoder.encode_bytes(&[0], &mut output), Err(FaacEncoderError::EmptyInput)));
    }

    #[test]
    fn test_encode_bytes_not_configured() {
        let mut encoder = FaacEncoder::open(44100, 2).unwrap();
        let mut output = encoder.output_buffer();
        assert!(matches!(encoder.encode_bytes(&[0; 64], &mut output), Err(FaacEncoderError::NotConfigured)));

        let mut encoder = configured_encoder(InputFormat::Float);
        assert!(matches!(encoder.encode_bytes(&[0; 64], &mut output), Err(FaacEncoderError::NotConfigured)));
    }

    #[test]
    fn test_encode_too_many_samples() {
        let mut encoder = configured_encoder(InputFormat::Float);
        let mut output = encoder.output_buffer();
        let samples = vec![0.0; encoder.input_samples() + 1];
        assert!(matches!(
            encoder.encode_floats(&samples, &mut output),
            Err(FaacEncoderError::TooManySamples { .. })
        ));
    }

    #[test]
    fn test_encode_output_buffer_too_small() {
        let mut encoder = configured_encoder(InputFormat::Float);
        let mut output = vec![0; encoder.max_output_bytes() - 1];
        let samples = vec![0.0; encoder.input_samples()];
        match encoder.encode_floats(&samples, &mut output) {
            Err(FaacEncoderError::OutputBufferTooSmall { len, required }) => {
                assert_eq!(len, encoder.max_output_bytes() - 1);
                assert_eq!(required, encoder.max_output_bytes());
            }
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn test_encode_bytes_truncates_partial_samples() {
        let mut encoder = configured_encoder(InputFormat::Int16);
        let mut output = encoder.output_buffer();
        let len = encoder.input_samples() * 2 + 1;
        let written = encoder.encode_bytes(&vec![0; len], &mut output).unwrap();
        assert!(written <= encoder.max_output_bytes());

        let mut encoder = configured_encoder(InputFormat::Int32);
        let written = encoder.encode_bytes(&[0; 7], &mut output).unwrap();
        assert!(written <= encoder.max_output_bytes());
    }

    #[test]
    fn test_flush_single_frame() {
        let mut encoder = configured_encoder(InputFormat::Float);
        let mut output = encoder.output_buffer();
        let samples = vec![1000.0; encoder.input_samples()];
        let mut total = encoder.encode_floats(&samples, &mut output).unwrap();
        let first = encoder.flush_into(&mut output).unwrap();
        assert!(first > 0);
        total += first;
        loop {
            let written = encoder.flush_into(&mut output).unwrap();
            if written == 0 {
                break;
            }
            total += written;
        }
        assert!(total > 0);
        // once drained, flushing stays at zero without touching the library
        assert_eq!(encoder.flush_into(&mut output).unwrap(), 0);
        assert_eq!(encoder.flush_frames, MAX_FLUSH_FRAMES);
    }

    #[test]
    fn test_audio_encoder_input_format_mismatch() {
        let mut encoder = configured_encoder(InputFormat::Int16);
        let samples = [0i32; 16];
        assert!(matches!(
            encoder.encode(RawAudioPacket { samples: &samples[..] }),
            Err(FaacEncoderError::InputFormatMismatch {
                configured: Some(InputFormat::Int16),
                provided: InputFormat::Int32,
            })
        ));
    }
}
