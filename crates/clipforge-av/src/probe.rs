//! FFprobe-based asset inspection.

use crate::asset::{Asset, NaturalSize, VideoTrack};
use crate::command::ToolCommand;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// ffprobe answers quickly; anything slower is a stuck process.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

/// Probe a media file with ffprobe and describe it as an [`Asset`].
pub async fn probe_asset(ffprobe: &Path, path: &Path) -> Result<Asset> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    let output = ToolCommand::new(ffprobe.to_path_buf())
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path.to_string_lossy())
        .timeout(PROBE_TIMEOUT)
        .execute()
        .await?;

    parse_ffprobe_json(path, &output.stdout)
}

/// Parse ffprobe's JSON report.
pub fn parse_ffprobe_json(path: &Path, json: &str) -> Result<Asset> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::parse_error("ffprobe", e.to_string()))?;

    let mut asset = Asset::new(path);
    asset.container = output.format.format_name;
    asset.file_size = output.format.size.and_then(|s| s.parse().ok()).unwrap_or(0);
    asset.duration = output
        .format
        .duration
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64);

    let mut video_index = 0u32;
    for stream in output.streams {
        match stream.codec_type.as_str() {
            "video" => {
                // Embedded cover art and placeholder streams are not video.
                if stream.disposition.attached_pic == 1 {
                    continue;
                }
                let (Some(width), Some(height)) = (stream.width, stream.height) else {
                    continue;
                };
                if width == 0 || height == 0 {
                    continue;
                }
                asset.video_tracks.push(VideoTrack {
                    index: video_index,
                    codec: stream.codec_name.unwrap_or_default(),
                    natural_size: NaturalSize::new(width, height),
                    frame_rate: stream.r_frame_rate.and_then(|s| parse_frame_rate(&s)),
                });
                video_index += 1;
            }
            "audio" => asset.has_audio = true,
            _ => {}
        }
    }

    Ok(asset)
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
    }
    rate_str.parse().ok()
}
