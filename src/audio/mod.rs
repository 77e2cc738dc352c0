//! Audio input: ffmpeg-subprocess PCM decode and the amplitude curve extractor.

pub mod amplitude;
pub mod decode;
