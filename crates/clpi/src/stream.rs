//! Per-stream attribute records and their coding-type dispatch.
//!
//! The same `{length, coding_type, fields}` record shape appears in
//! clip-info program tables and in playlist stream-number tables, so
//! the decoder lives here and the playlist crate reuses it.

use bits::BitReader;
use tracing::warn;

use crate::Result;

/// Elementary-stream coding type byte.
///
/// Closed enumeration over the codes seen on discs; anything else is
/// carried as `Unknown` rather than silently zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingType {
    Mpeg1Video,
    Mpeg2Video,
    Avc,
    Mvc,
    Hevc,
    Vc1,
    Mpeg1Audio,
    Mpeg2Audio,
    Lpcm,
    Ac3,
    Dts,
    TrueHd,
    Ac3Plus,
    DtsHd,
    DtsHdMaster,
    Ac3PlusSecondary,
    DtsHdSecondary,
    PresentationGraphics,
    InteractiveGraphics,
    TextSubtitle,
    Unknown(u8),
}

impl From<u8> for CodingType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => CodingType::Mpeg1Video,
            0x02 => CodingType::Mpeg2Video,
            0x1B => CodingType::Avc,
            0x20 => CodingType::Mvc,
            0x24 => CodingType::Hevc,
            0xEA => CodingType::Vc1,
            0x03 => CodingType::Mpeg1Audio,
            0x04 => CodingType::Mpeg2Audio,
            0x80 => CodingType::Lpcm,
            0x81 => CodingType::Ac3,
            0x82 => CodingType::Dts,
            0x83 => CodingType::TrueHd,
            0x84 => CodingType::Ac3Plus,
            0x85 => CodingType::DtsHd,
            0x86 => CodingType::DtsHdMaster,
            0xA1 => CodingType::Ac3PlusSecondary,
            0xA2 => CodingType::DtsHdSecondary,
            0x90 => CodingType::PresentationGraphics,
            0x91 => CodingType::InteractiveGraphics,
            0x92 => CodingType::TextSubtitle,
            other => CodingType::Unknown(other),
        }
    }
}

impl CodingType {
    pub fn raw(self) -> u8 {
        match self {
            CodingType::Mpeg1Video => 0x01,
            CodingType::Mpeg2Video => 0x02,
            CodingType::Avc => 0x1B,
            CodingType::Mvc => 0x20,
            CodingType::Hevc => 0x24,
            CodingType::Vc1 => 0xEA,
            CodingType::Mpeg1Audio => 0x03,
            CodingType::Mpeg2Audio => 0x04,
            CodingType::Lpcm => 0x80,
            CodingType::Ac3 => 0x81,
            CodingType::Dts => 0x82,
            CodingType::TrueHd => 0x83,
            CodingType::Ac3Plus => 0x84,
            CodingType::DtsHd => 0x85,
            CodingType::DtsHdMaster => 0x86,
            CodingType::Ac3PlusSecondary => 0xA1,
            CodingType::DtsHdSecondary => 0xA2,
            CodingType::PresentationGraphics => 0x90,
            CodingType::InteractiveGraphics => 0x91,
            CodingType::TextSubtitle => 0x92,
            CodingType::Unknown(v) => v,
        }
    }

    pub fn is_video(self) -> bool {
        matches!(
            self,
            CodingType::Mpeg1Video
                | CodingType::Mpeg2Video
                | CodingType::Avc
                | CodingType::Mvc
                | CodingType::Hevc
                | CodingType::Vc1
        )
    }

    pub fn is_audio(self) -> bool {
        matches!(
            self,
            CodingType::Mpeg1Audio
                | CodingType::Mpeg2Audio
                | CodingType::Lpcm
                | CodingType::Ac3
                | CodingType::Dts
                | CodingType::TrueHd
                | CodingType::Ac3Plus
                | CodingType::DtsHd
                | CodingType::DtsHdMaster
                | CodingType::Ac3PlusSecondary
                | CodingType::DtsHdSecondary
        )
    }

    /// Lossless / high-resolution audio, for the main-title heuristic.
    pub fn is_lossless_audio(self) -> bool {
        matches!(
            self,
            CodingType::Lpcm | CodingType::TrueHd | CodingType::DtsHdMaster
        )
    }

    /// Relative codec quality used when ranking candidate titles:
    /// HEVC above AVC/MVC/VC-1 above MPEG-1/2. Non-video is tier 0.
    pub fn video_tier(self) -> u8 {
        match self {
            CodingType::Hevc => 3,
            CodingType::Avc | CodingType::Mvc | CodingType::Vc1 => 2,
            CodingType::Mpeg1Video | CodingType::Mpeg2Video => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoFormat {
    Interlaced480,
    Interlaced576,
    Progressive240,
    Progressive480,
    Interlaced1080,
    Progressive720,
    Progressive1080,
    Progressive576,
    Progressive2160,
    #[default]
    Unknown,
}

impl From<u8> for VideoFormat {
    fn from(value: u8) -> Self {
        match value {
            1 => VideoFormat::Interlaced480,
            2 => VideoFormat::Interlaced576,
            3 => VideoFormat::Progressive480,
            4 => VideoFormat::Interlaced1080,
            5 => VideoFormat::Progressive720,
            6 => VideoFormat::Progressive1080,
            7 => VideoFormat::Progressive576,
            8 => VideoFormat::Progressive2160,
            _ => VideoFormat::Unknown,
        }
    }
}

impl VideoFormat {
    /// Vertical resolution in lines, 0 when unknown.
    pub fn lines(self) -> u32 {
        match self {
            VideoFormat::Interlaced480 | VideoFormat::Progressive480 => 480,
            VideoFormat::Interlaced576 | VideoFormat::Progressive576 => 576,
            VideoFormat::Progressive240 => 240,
            VideoFormat::Progressive720 => 720,
            VideoFormat::Interlaced1080 | VideoFormat::Progressive1080 => 1080,
            VideoFormat::Progressive2160 => 2160,
            VideoFormat::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameRate {
    Rate23_976,
    Rate24,
    Rate25,
    Rate29_97,
    Rate50,
    Rate59_94,
    #[default]
    Unknown,
}

impl From<u8> for FrameRate {
    fn from(value: u8) -> Self {
        match value {
            1 => FrameRate::Rate23_976,
            2 => FrameRate::Rate24,
            3 => FrameRate::Rate25,
            4 => FrameRate::Rate29_97,
            6 => FrameRate::Rate50,
            7 => FrameRate::Rate59_94,
            _ => FrameRate::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    Mono,
    Stereo,
    Multichannel,
    StereoAndMultichannel,
    #[default]
    Unknown,
}

impl From<u8> for AudioFormat {
    fn from(value: u8) -> Self {
        match value {
            1 => AudioFormat::Mono,
            3 => AudioFormat::Stereo,
            6 => AudioFormat::Multichannel,
            12 => AudioFormat::StereoAndMultichannel,
            _ => AudioFormat::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioRate {
    Khz48,
    Khz96,
    Khz192,
    Khz48And192,
    Khz48And96,
    #[default]
    Unknown,
}

impl From<u8> for AudioRate {
    fn from(value: u8) -> Self {
        match value {
            1 => AudioRate::Khz48,
            4 => AudioRate::Khz96,
            5 => AudioRate::Khz192,
            12 => AudioRate::Khz48And192,
            14 => AudioRate::Khz48And96,
            _ => AudioRate::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DynamicRange {
    #[default]
    Sdr,
    Hdr10,
    DolbyVision,
    Unknown,
}

impl From<u8> for DynamicRange {
    fn from(value: u8) -> Self {
        match value {
            0 => DynamicRange::Sdr,
            1 => DynamicRange::Hdr10,
            2 => DynamicRange::DolbyVision,
            _ => DynamicRange::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    BT709,
    BT2020,
    #[default]
    Unknown,
}

impl From<u8> for ColorSpace {
    fn from(value: u8) -> Self {
        match value {
            1 => ColorSpace::BT709,
            2 => ColorSpace::BT2020,
            _ => ColorSpace::Unknown,
        }
    }
}

/// Decoded attribute fields, shaped by the coding type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAttr {
    Video {
        format: VideoFormat,
        rate: FrameRate,
        aspect: u8,
        dynamic_range: DynamicRange,
        color_space: ColorSpace,
    },
    Audio {
        format: AudioFormat,
        rate: AudioRate,
        language: String,
    },
    Graphics {
        language: String,
    },
    Text {
        char_code: u8,
        language: String,
    },
    Unknown,
}

/// Reads one `{length u8, coding_type u8, fields}` attribute record and
/// leaves the reader positioned just past its declared length.
///
/// Unrecognized coding types are logged and yield `StreamAttr::Unknown`;
/// they never fail the enclosing parse.
pub fn read_stream_attr(reader: &mut BitReader) -> Result<(CodingType, StreamAttr)> {
    let len = reader.read_u8()? as u64;
    let end = reader.position() as u64 + len;

    let coding = CodingType::from(reader.read_u8()?);
    let attr = if coding.is_video() {
        let format = VideoFormat::from(reader.read(4)? as u8);
        let rate = FrameRate::from(reader.read(4)? as u8);
        let aspect = reader.read(4)? as u8;
        reader.skip(4)?;
        let (dynamic_range, color_space) = if coding == CodingType::Hevc {
            reader.skip(1)?; // cr_flag
            let dr = DynamicRange::from(reader.read(4)? as u8);
            let cs = ColorSpace::from(reader.read(4)? as u8);
            (dr, cs)
        } else {
            (DynamicRange::default(), ColorSpace::default())
        };
        StreamAttr::Video {
            format,
            rate,
            aspect,
            dynamic_range,
            color_space,
        }
    } else if coding.is_audio() {
        let format = AudioFormat::from(reader.read(4)? as u8);
        let rate = AudioRate::from(reader.read(4)? as u8);
        let language = reader.read_string(3)?;
        StreamAttr::Audio {
            format,
            rate,
            language,
        }
    } else {
        match coding {
            CodingType::PresentationGraphics | CodingType::InteractiveGraphics => {
                StreamAttr::Graphics {
                    language: reader.read_string(3)?,
                }
            }
            CodingType::TextSubtitle => StreamAttr::Text {
                char_code: reader.read_u8()?,
                language: reader.read_string(3)?,
            },
            other => {
                warn!(coding_type = other.raw(), "unrecognized stream coding type");
                StreamAttr::Unknown
            }
        }
    };

    reader.seek(end)?;
    Ok((coding, attr))
}
