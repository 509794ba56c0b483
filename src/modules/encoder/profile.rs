use std::ffi::OsString;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Encoder parameters applied to every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeProfile {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub target_height: u32,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "h264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            target_height: 720,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

impl EncodeProfile {
    /// ffmpeg encoder name for the configured video codec.
    pub fn video_encoder(&self) -> &str {
        match self.video_codec.to_ascii_lowercase().as_str() {
            "h264" | "avc" => "libx264",
            "h265" | "hevc" => "libx265",
            "vp9" => "libvpx-vp9",
            "av1" => "libsvtav1",
            _ => &self.video_codec,
        }
    }

    /// Builds the full ffmpeg argument list. The result depends only on the
    /// paths and the profile.
    pub fn build_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());

        let scale = format!("scale=-2:{}", self.target_height);
        let crf = self.crf.to_string();
        let rest: [&str; 21] = [
            "-map",
            "0:v:0",
            "-map",
            "0:a:0?",
            "-vf",
            &scale,
            "-c:v",
            self.video_encoder(),
            "-preset",
            &self.preset,
            "-crf",
            &crf,
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            &self.audio_codec,
            "-b:a",
            &self.audio_bitrate,
            "-movflags",
            "+faststart",
            "-progress",
        ];
        args.extend(rest.into_iter().map(OsString::from));
        args.extend(["pipe:1", "-nostats"].into_iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_default_profile_args() {
        let profile = EncodeProfile::default();
        let args = strings(&profile.build_args(Path::new("/tmp/in.mov"), Path::new("/tmp/out.mp4")));

        assert_eq!(args[4], "/tmp/in.mov");
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-c:v") + 1], "libx264");
        assert_eq!(args[pos("-preset") + 1], "medium");
        assert_eq!(args[pos("-crf") + 1], "23");
        assert_eq!(args[pos("-vf") + 1], "scale=-2:720");
        assert_eq!(args[pos("-c:a") + 1], "aac");
        assert_eq!(args[pos("-b:a") + 1], "128k");
        assert_eq!(args[pos("-progress") + 1], "pipe:1");
    }

    #[test]
    fn test_args_are_deterministic() {
        let profile = EncodeProfile {
            crf: 28,
            target_height: 480,
            ..EncodeProfile::default()
        };
        let a = profile.build_args(Path::new("in"), Path::new("out.mp4"));
        let b = profile.build_args(Path::new("in"), Path::new("out.mp4"));
        assert_eq!(a, b);
        assert!(strings(&a).contains(&"scale=-2:480".to_string()));
    }

    #[test]
    fn test_video_encoder_mapping() {
        let mut profile = EncodeProfile::default();
        assert_eq!(profile.video_encoder(), "libx264");

        profile.video_codec = "HEVC".to_string();
        assert_eq!(profile.video_encoder(), "libx265");

        profile.video_codec = "av1".to_string();
        assert_eq!(profile.video_encoder(), "libsvtav1");

        profile.video_codec = "h264_nvenc".to_string();
        assert_eq!(profile.video_encoder(), "h264_nvenc");
    }
}
