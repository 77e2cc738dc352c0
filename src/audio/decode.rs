//! PCM decode through a spawned `ffmpeg` process.

use crate::foundation::error::{AudiogramError, AudiogramResult};
use std::path::Path;

/// Sample rate every input is resampled to before analysis.
pub const ANALYSIS_SAMPLE_RATE: u32 = 48_000;

/// Decoded mono PCM.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Mono samples in `[-1, 1]`.
    pub samples: Vec<f32>,
}

impl AudioPcm {
    /// Clip length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Decode any ffmpeg-readable audio file to mono f32le PCM at `sample_rate`.
///
/// A file without a usable audio stream is a [`AudiogramError::MediaLoad`]: an audiogram
/// cannot be built from it.
pub fn decode_audio_f32_mono(path: &Path, sample_rate: u32) -> AudiogramResult<AudioPcm> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "1",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| AudiogramError::media(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        return Err(AudiogramError::media(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    if !out.stdout.len().is_multiple_of(4) {
        return Err(AudiogramError::media(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    if out.stdout.is_empty() {
        return Err(AudiogramError::media(format!(
            "'{}' contains no audio samples",
            path.display()
        )));
    }

    let mut samples = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        samples.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_follows_sample_count() {
        let pcm = AudioPcm {
            sample_rate: 48_000,
            samples: vec![0.0; 96_000],
        };
        assert_eq!(pcm.duration_secs(), 2.0);

        let empty = AudioPcm {
            sample_rate: 0,
            samples: Vec::new(),
        };
        assert_eq!(empty.duration_secs(), 0.0);
    }

    #[test]
    fn decode_missing_file_is_media_error() {
        let err = decode_audio_f32_mono(Path::new("/definitely/not/here.mp3"), 48_000)
            .expect_err("missing file must not decode");
        assert!(matches!(err, AudiogramError::MediaLoad(_)));
    }
}
