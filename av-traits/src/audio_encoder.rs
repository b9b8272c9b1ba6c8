use alloc::vec::Vec;

/// Interleaved samples for all channels of a stream.
pub struct RawAudioPacket<'a, S> {
    pub samples: &'a [S],
}

pub struct EncodedAudioPacket {
    pub data: Vec<u8>,
}

/// Implements basic audio encoding behavior.
///
/// Typical usage should look like this:
///
/// ```
/// # use av_traits::{RawAudioPacket, AudioEncoder};
/// fn encode<'a, S, E>(mut source: S, mut encoder: E) -> Result<(), E::Error>
///     where S: Iterator<Item = RawAudioPacket<'a, i16>>,
///     E: AudioEncoder<i16>
/// {
///     while let Some(packet) = source.next() {
///         if let Some(encoded_packet) = encoder.encode(packet)? {
///             // do something with encoded_packet
///         }
///     }
///
///     while let Some(encoded_packet) = encoder.flush()? {
///         // do something with encoded_packet
///     }
///
///     Ok(())
/// }
/// ```
pub trait AudioEncoder<S> {
    type Error;

    /// Encodes an audio packet.
    ///
    /// Most codecs need several packets of priming input before they produce anything, so `None`
    /// may be returned at the start of a stream.
    fn encode(&mut self, packet: RawAudioPacket<S>) -> Result<Option<EncodedAudioPacket>, Self::Error>;

    /// Indicates to the encoder that no more input will be provided and it should emit any delayed
    /// packets. This should be invoked until no more packets are returned.
    fn flush(&mut self) -> Result<Option<EncodedAudioPacket>, Self::Error>;
}
