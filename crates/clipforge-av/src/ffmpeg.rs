//! ffmpeg/ffprobe backed [`Encoder`].

use crate::asset::Asset;
use crate::command::{ToolCommand, DEFAULT_TIMEOUT};
use crate::encoder::{Encoder, ExportSession};
use crate::probe::probe_asset;
use crate::quality::{Preset, VideoRate};
use crate::tools::{get_tool_path, ToolConfig};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Share of the payload added for container overhead in size estimates.
const CONTAINER_OVERHEAD_DIVISOR: u64 = 50;

/// Encoder that probes with ffprobe and exports with ffmpeg/libx264.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
}

impl FfmpegEncoder {
    /// Resolve ffmpeg and ffprobe from the configured paths or `PATH`.
    pub fn new(tools: &ToolConfig) -> Result<Self> {
        Ok(Self::with_paths(
            get_tool_path("ffmpeg", tools.ffmpeg_path.as_deref())?,
            get_tool_path("ffprobe", tools.ffprobe_path.as_deref())?,
        ))
    }

    /// Use explicit tool paths without checking them.
    pub fn with_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Maximum time a single export may run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// ffmpeg arguments for an export session.
    pub fn build_args(&self, session: &ExportSession) -> Result<Vec<String>> {
        let output = session.output().ok_or_else(|| {
            Error::InvalidInput("export session has no output settings".to_string())
        })?;
        let asset = session.asset();
        let preset = session.preset();

        let mut args: Vec<String> = ["-y", "-nostdin", "-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(String::from)
            .collect();

        if let Some(range) = session.time_range() {
            if !range.start.is_zero() {
                args.extend(["-ss".to_string(), format_secs(range.start)]);
            }
            args.extend(["-i".to_string(), asset.path.to_string_lossy().to_string()]);
            args.extend(["-t".to_string(), format_secs(range.duration)]);
        } else {
            args.extend(["-i".to_string(), asset.path.to_string_lossy().to_string()]);
        }

        if let Some(rate) = preset.video_rate() {
            args.extend(["-map".to_string(), "0:v:0".to_string()]);
            if asset.has_audio {
                args.extend(["-map".to_string(), "0:a:0".to_string()]);
            }

            args.extend(
                ["-c:v", "libx264", "-profile:v", "high", "-pix_fmt", "yuv420p"]
                    .into_iter()
                    .map(String::from),
            );

            match rate {
                VideoRate::Crf(crf) => {
                    args.extend([
                        "-crf".to_string(),
                        crf.to_string(),
                        "-preset".to_string(),
                        "medium".to_string(),
                    ]);
                }
                VideoRate::Bitrate(bps) => {
                    args.extend([
                        "-b:v".to_string(),
                        bps.to_string(),
                        "-maxrate".to_string(),
                        bps.to_string(),
                        "-bufsize".to_string(),
                        (bps * 2).to_string(),
                    ]);
                }
            }

            // libx264 with yuv420p needs even dimensions.
            let filter = match preset.frame_box() {
                Some((w, h)) => format!(
                    "scale='min({w},iw)':'min({h},ih)':force_original_aspect_ratio=decrease:force_divisible_by=2"
                ),
                None => "scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string(),
            };
            args.extend(["-vf".to_string(), filter]);
        } else {
            args.extend(["-map".to_string(), "0:a:0".to_string(), "-vn".to_string()]);
        }

        if asset.has_audio {
            args.extend([
                "-c:a".to_string(),
                "aac".to_string(),
                "-b:a".to_string(),
                preset.audio_bitrate_bps().to_string(),
                "-ac".to_string(),
                preset.audio_channels().to_string(),
            ]);
        } else {
            args.push("-an".to_string());
        }

        if output.strip_metadata {
            args.extend(
                ["-map_metadata", "-1", "-map_chapters", "-1"]
                    .into_iter()
                    .map(String::from),
            );
        }

        if output.optimize_for_network {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }

        if let Some(limit) = session.file_length_limit() {
            args.extend(["-fs".to_string(), limit.to_string()]);
        }

        args.extend([
            "-f".to_string(),
            output.container.muxer().to_string(),
            output.path.to_string_lossy().to_string(),
        ]);

        Ok(args)
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn load_asset(&self, path: &Path) -> Result<Asset> {
        probe_asset(&self.ffprobe, path).await
    }

    fn create_session(&self, asset: &Asset, preset: Preset) -> Result<ExportSession> {
        if preset.has_video() && asset.primary_video().is_none() {
            return Err(Error::session(&asset.path, preset, "asset has no video track"));
        }
        if !preset.has_video() && !asset.has_audio {
            return Err(Error::session(&asset.path, preset, "asset has no audio track"));
        }
        if asset.duration.is_none() {
            return Err(Error::session(&asset.path, preset, "asset duration is unknown"));
        }

        Ok(ExportSession::new(asset.clone(), preset))
    }

    fn estimate_output_len(&self, session: &ExportSession) -> u64 {
        estimate_output_len(session)
    }

    async fn export(&self, session: &ExportSession) -> Result<()> {
        let args = self.build_args(session)?;
        tracing::debug!("FFmpeg args: {:?}", args);

        ToolCommand::new(self.ffmpeg.clone())
            .args(args)
            .timeout(self.timeout)
            .execute()
            .await
            .map_err(|e| match e {
                Error::ToolFailed { message, .. } => Error::export("failed", message),
                other => Error::export("failed", other.to_string()),
            })?;

        if let Some(output) = session.output() {
            if !output.path.exists() {
                return Err(Error::export("failed", "encoder produced no output file"));
            }
        }

        Ok(())
    }
}

/// Estimate the size of an export from the preset's bitrate model.
///
/// Bitrate-targeted presets are priced at their target. Quality-targeted
/// presets follow the source bitrate, scaled by the pixel-count reduction of
/// the preset's frame box and bounded by the preset ceiling.
pub fn estimate_output_len(session: &ExportSession) -> u64 {
    let asset = session.asset();
    let preset = session.preset();
    let secs = session
        .export_duration()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    let audio_bps = if asset.has_audio {
        preset.audio_bitrate_bps()
    } else {
        0
    };

    let video_bps = match preset.video_rate() {
        None => 0,
        Some(VideoRate::Bitrate(bps)) => bps,
        Some(VideoRate::Crf(_)) => {
            let ceiling = preset.video_ceiling_bps();
            let source_bps = asset.overall_bitrate().unwrap_or(ceiling);
            let scaled = match (preset.frame_box(), asset.natural_size()) {
                (Some((w, h)), Some(size)) if size.area() > 0 => {
                    let fitted = size.fit_within(w, h);
                    (source_bps as u128 * fitted.area() as u128 / size.area() as u128) as u64
                }
                _ => source_bps,
            };
            scaled.min(ceiling)
        }
    };

    let payload = ((video_bps + audio_bps) as f64 * secs / 8.0) as u64;
    payload + payload / CONTAINER_OVERHEAD_DIVISOR
}

fn format_secs(d: Duration) -> String {
    format!("{:.3}", d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{NaturalSize, VideoTrack};
    use crate::encoder::{OutputSettings, TimeRange};
    use crate::quality::{Container, QualityTier};

    fn video_asset(width: u32, height: u32, size: u64, secs: u64) -> Asset {
        let mut asset = Asset::new("/media/IMG_0001.MOV");
        asset.file_size = size;
        asset.duration = Some(Duration::from_secs(secs));
        asset.has_audio = true;
        asset.video_tracks.push(VideoTrack {
            index: 0,
            codec: "hevc".into(),
            natural_size: NaturalSize::new(width, height),
            frame_rate: Some(30.0),
        });
        asset
    }

    fn encoder() -> FfmpegEncoder {
        FfmpegEncoder::with_paths("ffmpeg", "ffprobe")
    }

    #[test]
    fn test_session_requires_video_track() {
        let mut asset = Asset::new("memo.wav");
        asset.duration = Some(Duration::from_secs(3));
        asset.has_audio = true;

        let err = encoder()
            .create_session(&asset, Preset::HighestQuality)
            .unwrap_err();
        assert!(matches!(err, Error::SessionConstruction { .. }));
        assert!(encoder().create_session(&asset, Preset::AppleM4a).is_ok());
    }

    #[test]
    fn test_session_requires_duration() {
        let mut asset = video_asset(1280, 720, 1_000, 1);
        asset.duration = None;
        assert!(encoder()
            .create_session(&asset, Preset::MediumQuality)
            .is_err());
    }

    #[test]
    fn test_estimates_follow_the_ladder() {
        // 4K, 60 s, 50 Mbit/s overall
        let asset = video_asset(3840, 2160, 375_000_000, 60);
        let estimates: Vec<u64> = QualityTier::LADDER
            .iter()
            .map(|tier| {
                let session = encoder().create_session(&asset, tier.preset()).unwrap();
                estimate_output_len(&session)
            })
            .collect();

        for pair in estimates.windows(2) {
            assert!(pair[0] >= pair[1], "estimates not monotonic: {:?}", estimates);
        }
        // Low: (150k + 64k) * 60 / 8 plus overhead
        assert_eq!(estimates[3], 1_605_000 + 1_605_000 / 50);
    }

    #[test]
    fn test_estimates_with_unknown_file_size() {
        let mut asset = video_asset(1920, 1080, 0, 60);
        asset.has_audio = false;
        assert_eq!(asset.overall_bitrate(), None);

        let estimates: Vec<u64> = QualityTier::LADDER
            .iter()
            .map(|tier| {
                let session = encoder().create_session(&asset, tier.preset()).unwrap();
                estimate_output_len(&session)
            })
            .collect();

        for pair in estimates.windows(2) {
            assert!(pair[0] >= pair[1], "estimates not monotonic: {:?}", estimates);
        }
        // Highest falls back to its 40 Mbit/s ceiling.
        assert_eq!(estimates[0], 300_000_000 + 300_000_000 / 50);
    }

    #[test]
    fn test_estimate_uses_range() {
        let asset = video_asset(640, 480, 10_000_000, 100);
        let mut session = encoder()
            .create_session(&asset, Preset::LowQuality)
            .unwrap();
        let full = estimate_output_len(&session);
        session.set_time_range(TimeRange::from_zero(Duration::from_secs(50)));
        assert_eq!(estimate_output_len(&session), full / 2);
    }

    #[test]
    fn test_build_args_for_upload() {
        let asset = video_asset(3840, 2160, 1_000_000, 10);
        let mut session = encoder()
            .create_session(&asset, Preset::Hd1920x1080)
            .unwrap();
        session.set_time_range(TimeRange::from_zero(Duration::from_secs(10)));
        session.set_file_length_limit(2_000_000);
        session.set_output(OutputSettings::for_upload("/tmp/IMG_0001.mp4", Container::Mp4));

        let args = encoder().build_args(&session).unwrap();
        let joined = args.join(" ");
        assert!(joined.contains("-i /media/IMG_0001.MOV -t 10.000"));
        assert!(!joined.contains("-ss"));
        assert!(joined.contains("-crf 20"));
        assert!(joined.contains("min(1920,iw)"));
        assert!(joined.contains("-map_metadata -1"));
        assert!(joined.contains("-movflags +faststart"));
        assert!(joined.contains("-fs 2000000"));
        assert!(joined.ends_with("-f mp4 /tmp/IMG_0001.mp4"));
    }

    #[test]
    fn test_build_args_audio_preset() {
        let mut asset = Asset::new("memo.wav");
        asset.duration = Some(Duration::from_secs(3));
        asset.has_audio = true;
        let mut session = encoder()
            .create_session(&asset, Preset::AppleM4a)
            .unwrap();
        session.set_output(OutputSettings {
            path: PathBuf::from("memo.m4a"),
            container: Container::M4a,
            optimize_for_network: false,
            strip_metadata: false,
        });

        let args = encoder().build_args(&session).unwrap();
        assert!(args.contains(&"-vn".to_string()));
        assert!(!args.contains(&"-c:v".to_string()));
        assert!(!args.contains(&"-movflags".to_string()));
        assert_eq!(&args[args.len() - 3..], ["-f", "ipod", "memo.m4a"]);
    }

    #[test]
    fn test_build_args_without_output() {
        let asset = video_asset(640, 480, 1_000, 1);
        let session = encoder()
            .create_session(&asset, Preset::LowQuality)
            .unwrap();
        assert!(matches!(
            encoder().build_args(&session),
            Err(Error::InvalidInput(_))
        ));
    }
}
