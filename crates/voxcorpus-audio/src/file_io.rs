//! Audio file I/O

use crate::error::{AudioError, Result};
use hound::WavReader;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Mono audio at the source's native sample rate
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Channel-averaged samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Native sample rate
    pub sample_rate: u32,
    /// Channel count of the source before downmixing
    pub channels: usize,
}

impl DecodedAudio {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Load an audio file and downmix it to mono. No resampling happens here.
pub fn load_audio_file(path: &Path) -> Result<DecodedAudio> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let decoded = match ext.as_str() {
        "wav" | "wave" => load_wav(path)?,
        _ => load_with_symphonia(path)?,
    };

    if decoded.samples.is_empty() {
        return Err(AudioError::Empty {
            path: path.display().to_string(),
        });
    }

    tracing::debug!(
        "Decoded {:?}: {} samples, {} Hz, {} channel(s)",
        path,
        decoded.samples.len(),
        decoded.sample_rate,
        decoded.channels
    );

    Ok(decoded)
}

/// Write mono f32 samples as a 16-bit PCM WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| AudioError::Io {
                context: "creating artifact directory",
                source,
            })?;
        }
    }

    let mut writer =
        hound::WavWriter::create(path, wav_spec(sample_rate)).map_err(|e| AudioError::write(path, e))?;
    for &sample in samples {
        writer
            .write_sample(to_i16(sample))
            .map_err(|e| AudioError::write(path, e))?;
    }
    writer.finalize().map_err(|e| AudioError::write(path, e))?;

    Ok(())
}

/// Convert f32 samples (mono) to WAV bytes
pub fn samples_to_wav_bytes(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec(sample_rate))
            .map_err(|e| AudioError::processing("wav encoding", e))?;
        for &sample in samples {
            writer
                .write_sample(to_i16(sample))
                .map_err(|e| AudioError::processing("wav encoding", e))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::processing("wav encoding", e))?;
    }

    Ok(cursor.into_inner())
}

fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Load WAV file using hound
fn load_wav(path: &Path) -> Result<DecodedAudio> {
    let reader = WavReader::open(path).map_err(|e| AudioError::decode(path, e))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| AudioError::decode(path, e))?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| AudioError::decode(path, e))?
        }
    };

    Ok(DecodedAudio {
        samples: downmix(samples, channels),
        sample_rate: spec.sample_rate,
        channels,
    })
}

/// Load audio file using symphonia (mp3, m4a, ogg, flac, aiff, ...)
fn load_with_symphonia(path: &Path) -> Result<DecodedAudio> {
    let file = std::fs::File::open(path).map_err(|e| AudioError::decode(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::decode(path, e))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::decode(path, "no audio track found"))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::decode(path, "unknown sample rate"))?;
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::decode(path, e))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::decode(path, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!("Skipping corrupt packet in {:?}: {}", path, e);
                continue;
            }
            Err(e) => return Err(AudioError::decode(path, e)),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count().max(1);

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    Ok(DecodedAudio {
        samples: downmix(samples, channels),
        sample_rate,
        channels,
    })
}

/// Average interleaved channels into one
fn downmix(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples;
    }

    samples
        .chunks(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_channels() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix(stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_wav_round_trip_preserves_rate_and_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin() * 0.5)
            .collect();

        write_wav(&path, &samples, 8000).unwrap();
        let decoded = load_audio_file(&path).unwrap();

        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), samples.len());
        assert!((decoded.duration() - 1.0).abs() < 1e-9);
        let max_err = decoded
            .samples
            .iter()
            .zip(samples.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_err < 1e-3);
    }

    #[test]
    fn test_stereo_wav_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = load_audio_file(&path).unwrap();
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples.len(), 100);
        assert!((decoded.samples[0] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_empty_wav_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, &[], 16000).unwrap();

        let err = load_audio_file(&path).unwrap_err();
        assert!(matches!(err, AudioError::Empty { .. }));
        assert!(!err.is_decode());
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let err = load_audio_file(&path).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_wav_bytes_have_riff_header() {
        let bytes = samples_to_wav_bytes(&[0.0, 0.5, -0.5], 16000).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(bytes.len(), 44 + 3 * 2);
    }
}
