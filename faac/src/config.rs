use faac_sys as sys;
use snafu::Snafu;
use std::ffi::c_uint;

#[derive(Debug, Snafu)]
pub enum FaacConfigurationError {
    #[snafu(display("unrecognized {field} value reported by libfaac: {value}"))]
    UnknownValue { field: &'static str, value: c_uint },
}

/// The layout of samples handed to the encoder. Integer samples are native-endian.
#[enum_repr::EnumRepr(type = "c_uint")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputFormat {
    /// 32-bit floats scaled to the 16-bit integer range (-32768.0 to 32767.0).
    Float = sys::FAAC_INPUT_FLOAT,
    Int16 = sys::FAAC_INPUT_16BIT,
    Int32 = sys::FAAC_INPUT_32BIT,
}

impl InputFormat {
    /// The number of bytes per sample when samples are provided as packed bytes. Floats can't be
    /// submitted that way.
    pub fn sample_width(&self) -> Option<usize> {
        match self {
            Self::Float => None,
            Self::Int16 => Some(2),
            Self::Int32 => Some(4),
        }
    }
}

#[enum_repr::EnumRepr(type = "c_uint")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputFormat {
    /// Raw access units, as stored in MP4 files.
    Raw = sys::RAW_STREAM,
    /// Access units preceded by ADTS headers.
    Adts = sys::ADTS_STREAM,
}

#[enum_repr::EnumRepr(type = "c_uint")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObjectType {
    Main = sys::MAIN,
    /// Low complexity. This is the only profile supported by every libfaac release.
    Low = sys::LOW,
    Ssr = sys::SSR,
    Ltp = sys::LTP,
}

#[enum_repr::EnumRepr(type = "c_uint")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MpegVersion {
    Mpeg4 = sys::MPEG4,
    Mpeg2 = sys::MPEG2,
}

#[enum_repr::EnumRepr(type = "c_uint")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShortBlockControl {
    Normal = sys::SHORTCTL_NORMAL,
    NoShort = sys::SHORTCTL_NOSHORT,
    NoLong = sys::SHORTCTL_NOLONG,
}

/// The tunable subset of the encoder's parameters.
///
/// This is a snapshot: it's read from the live encoder by `FaacEncoder::configuration` and written
/// back by `FaacEncoder::set_configuration`. The usual way to change a setting is to read the
/// current configuration, modify it, and write it back.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FaacConfiguration {
    /// Bits per second per channel.
    pub bit_rate: u32,
    pub input_format: InputFormat,
    pub output_format: OutputFormat,
    pub object_type: ObjectType,
    pub mpeg_version: MpegVersion,
    pub use_lfe: bool,
    pub use_tns: bool,
    /// Cutoff frequency in Hz. libfaac may derive its own value from the bit rate, so this
    /// doesn't necessarily read back as written.
    pub bandwidth: u32,
    /// Quantizer quality for VBR encoding. Like `bandwidth`, libfaac may override it.
    pub quantizer_quality: u32,
    /// Block switching is not tunable. This always reads back as `ShortBlockControl::Normal`
    /// and is ignored when writing.
    pub short_block_control: ShortBlockControl,
}

impl FaacConfiguration {
    pub(crate) fn from_sys(config: &sys::faacEncConfiguration) -> Result<Self, FaacConfigurationError> {
        fn field<T>(field: &'static str, value: c_uint, from_repr: fn(c_uint) -> Option<T>) -> Result<T, FaacConfigurationError> {
            from_repr(value).ok_or(FaacConfigurationError::UnknownValue { field, value })
        }

        Ok(Self {
            bit_rate: config.bitRate as _,
            input_format: field("input format", config.inputFormat as _, InputFormat::from_repr)?,
            output_format: field("output format", config.outputFormat as _, OutputFormat::from_repr)?,
            object_type: field("object type", config.aacObjectType as _, ObjectType::from_repr)?,
            mpeg_version: field("mpeg version", config.mpegVersion as _, MpegVersion::from_repr)?,
            use_lfe: config.useLfe != 0,
            use_tns: config.useTns != 0,
            bandwidth: config.bandWidth as _,
            quantizer_quality: config.quantqual as _,
            short_block_control: field("short block control", config.shortctl as _, ShortBlockControl::from_repr)?,
        })
    }

    /// Copies the settings into the library's configuration, leaving fields that aren't modeled
    /// here untouched.
    pub(crate) fn apply_to(&self, config: &mut sys::faacEncConfiguration) {
        config.bitRate = self.bit_rate as _;
        config.inputFormat = self.input_format.repr() as _;
        config.outputFormat = self.output_format.repr() as _;
        config.aacObjectType = self.object_type.repr() as _;
        config.mpegVersion = self.mpeg_version.repr() as _;
        config.useLfe = if self.use_lfe { 1 } else { 0 };
        config.useTns = if self.use_tns { 1 } else { 0 };
        config.bandWidth = self.bandwidth as _;
        config.quantqual = self.quantizer_quality as _;
        config.shortctl = ShortBlockControl::Normal.repr() as _;
    }
}
