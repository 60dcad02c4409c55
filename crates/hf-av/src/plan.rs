//! Encode plan compiler: turns a [`RenditionLadder`] into the ordered ffmpeg
//! argument list that produces every rendition in a single encoder run.
//!
//! ffmpeg binds option flags to the next output path on the command line, so
//! each rendition is emitted as one self-contained block that ends with its
//! playlist path. Blocks are never reordered or merged.
//!
//! Known limitations:
//! - The GOP size is a fixed frame count. Segment boundaries only align with
//!   keyframes when the source frame rate matches
//!   [`EncodeSettings::assumed_frame_rate`].
//! - Audio codec and sample rate are shared by all renditions.
//! - The `%03d` segment pattern grows a fourth digit past segment 999.

use std::path::Path;

use hf_core::config::EncodeSettings;
use hf_core::{RenditionLadder, RenditionSpec};

/// The argument block for one rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionBlock {
    /// The rendition's playlist base name, for logging.
    pub name: String,
    /// Arguments in encoder order; the last one is the playlist path.
    pub args: Vec<String>,
}

impl RenditionBlock {
    /// The output path that closes this block.
    pub fn playlist_path(&self) -> &str {
        self.args.last().map(String::as_str).unwrap_or_default()
    }
}

/// A compiled encode plan: a global prefix followed by one block per
/// rendition, in ladder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodePlan {
    prefix: Vec<String>,
    blocks: Vec<RenditionBlock>,
}

impl EncodePlan {
    /// Compile the plan for `input` into `output_dir`.
    ///
    /// Pure and deterministic: no I/O, identical inputs give identical plans.
    /// Non-UTF-8 paths are converted lossily; the supervisor rejects them
    /// before compiling.
    pub fn compile(
        input: &Path,
        output_dir: &Path,
        ladder: &RenditionLadder,
        settings: &EncodeSettings,
    ) -> Self {
        let prefix = vec![
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
        ];

        let blocks = ladder
            .iter()
            .map(|r| compile_block(r, output_dir, settings))
            .collect();

        Self { prefix, blocks }
    }

    /// Global arguments preceding the first block.
    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// Per-rendition blocks, in ladder order.
    pub fn blocks(&self) -> &[RenditionBlock] {
        &self.blocks
    }

    /// Flatten into the argument vector handed to the encoder.
    pub fn to_args(&self) -> Vec<String> {
        let len = self.prefix.len() + self.blocks.iter().map(|b| b.args.len()).sum::<usize>();
        let mut args = Vec::with_capacity(len);
        args.extend(self.prefix.iter().cloned());
        for block in &self.blocks {
            args.extend(block.args.iter().cloned());
        }
        args
    }
}

fn compile_block(r: &RenditionSpec, output_dir: &Path, s: &EncodeSettings) -> RenditionBlock {
    let segment_pattern = output_dir.join(segment_pattern(&r.segment_prefix));
    let playlist = output_dir.join(playlist_filename(&r.playlist_name));

    let args = vec![
        // Fit inside WxH, never upscale, never distort.
        "-vf".to_string(),
        scale_filter(r.width, r.height),
        // Audio.
        "-c:a".to_string(),
        s.audio_codec.clone(),
        "-ar".to_string(),
        s.audio_sample_rate.to_string(),
        // Video.
        "-c:v".to_string(),
        s.video_codec.clone(),
        "-profile:v".to_string(),
        r.profile.clone(),
        "-crf".to_string(),
        s.crf.to_string(),
        "-sc_threshold".to_string(),
        "0".to_string(),
        "-g".to_string(),
        s.gop_size.to_string(),
        // Segmentation.
        "-hls_time".to_string(),
        r.segment_duration.to_string(),
        "-hls_playlist_type".to_string(),
        "vod".to_string(),
        "-hls_flags".to_string(),
        "split_by_time".to_string(),
        // Rate control.
        "-b:v".to_string(),
        r.video_bitrate.clone(),
        "-maxrate".to_string(),
        r.max_bitrate.clone(),
        "-bufsize".to_string(),
        r.buffer_size.clone(),
        "-b:a".to_string(),
        r.audio_bitrate.clone(),
        // Outputs.
        "-hls_segment_filename".to_string(),
        segment_pattern.to_string_lossy().into_owned(),
        playlist.to_string_lossy().into_owned(),
    ];

    RenditionBlock {
        name: r.playlist_name.clone(),
        args,
    }
}

/// Scale filter that fits the frame inside `width x height`, downscaling only.
pub fn scale_filter(width: u32, height: u32) -> String {
    format!(
        "scale=w='min({width},iw)':h='min({height},ih)':force_original_aspect_ratio=decrease:force_divisible_by=2"
    )
}

/// ffmpeg segment filename template for a rendition: `<prefix>_%03d.ts`.
pub fn segment_pattern(prefix: &str) -> String {
    format!("{prefix}_%03d.ts")
}

/// Concrete segment filename for sequence number `seq`: `<prefix>_NNN.ts`.
pub fn segment_filename(prefix: &str, seq: u32) -> String {
    format!("{prefix}_{seq:03}.ts")
}

/// A rendition's playlist filename: `<name>.m3u8`.
pub fn playlist_filename(name: &str) -> String {
    format!("{name}.m3u8")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> RenditionLadder {
        RenditionLadder::default_ladder()
    }

    fn compile(ladder: &RenditionLadder) -> EncodePlan {
        EncodePlan::compile(
            Path::new("/videos/in.mp4"),
            Path::new("/srv/hls/out"),
            ladder,
            &EncodeSettings::default(),
        )
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
        let i = args.iter().position(|a| a == flag).unwrap();
        &args[i + 1]
    }

    #[test]
    fn prefix_is_fixed() {
        let plan = compile(&ladder());
        assert_eq!(plan.prefix(), ["-hide_banner", "-y", "-i", "/videos/in.mp4"]);
        assert_eq!(plan.to_args()[..4], plan.prefix()[..]);
    }

    #[test]
    fn one_block_per_rendition_in_order() {
        let plan = compile(&ladder());
        let names: Vec<&str> = plan.blocks().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["360p", "480p", "720p", "1080p"]);
        for (block, r) in plan.blocks().iter().zip(ladder().iter()) {
            assert_eq!(
                block.playlist_path(),
                format!("/srv/hls/out/{}.m3u8", r.playlist_name)
            );
        }
    }

    #[test]
    fn flattened_args_end_each_block_with_playlist() {
        let plan = compile(&ladder());
        let args = plan.to_args();
        let playlists: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| a.ends_with(".m3u8"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(playlists.len(), 4);
        assert_eq!(*playlists.last().unwrap(), args.len() - 1);

        // Every block opens with its scale filter right after the previous
        // playlist path.
        let mut start = plan.prefix().len();
        for &end in &playlists {
            assert_eq!(args[start], "-vf");
            start = end + 1;
        }
    }

    #[test]
    fn block_carries_rendition_values() {
        let plan = compile(&ladder());
        let block = &plan.blocks()[1].args;
        assert_eq!(value_after(block, "-vf"), scale_filter(842, 480));
        assert_eq!(value_after(block, "-profile:v"), "main");
        assert_eq!(value_after(block, "-hls_time"), "4");
        assert_eq!(value_after(block, "-b:v"), "1400k");
        assert_eq!(value_after(block, "-maxrate"), "1498k");
        assert_eq!(value_after(block, "-bufsize"), "2100k");
        assert_eq!(value_after(block, "-b:a"), "128k");
        assert_eq!(
            value_after(block, "-hls_segment_filename"),
            "/srv/hls/out/480p_%03d.ts"
        );
    }

    #[test]
    fn block_carries_fixed_settings() {
        let plan = compile(&ladder());
        let block = &plan.blocks()[0].args;
        assert_eq!(value_after(block, "-c:a"), "aac");
        assert_eq!(value_after(block, "-ar"), "48000");
        assert_eq!(value_after(block, "-c:v"), "libx264");
        assert_eq!(value_after(block, "-crf"), "10");
        assert_eq!(value_after(block, "-sc_threshold"), "0");
        assert_eq!(value_after(block, "-g"), "48");
        assert_eq!(value_after(block, "-hls_playlist_type"), "vod");
        assert_eq!(value_after(block, "-hls_flags"), "split_by_time");
    }

    #[test]
    fn custom_settings_flow_through() {
        let settings = EncodeSettings {
            crf: 23,
            gop_size: 60,
            ..Default::default()
        };
        let plan = EncodePlan::compile(
            Path::new("in.mov"),
            Path::new("out"),
            &ladder(),
            &settings,
        );
        let block = &plan.blocks()[0].args;
        assert_eq!(value_after(block, "-crf"), "23");
        assert_eq!(value_after(block, "-g"), "60");
    }

    #[test]
    fn compile_is_deterministic() {
        let a = compile(&ladder()).to_args();
        let b = compile(&ladder()).to_args();
        assert_eq!(a, b);
    }

    #[test]
    fn explicit_ladder_size_wins() {
        let one = RenditionLadder::new(vec![ladder().as_slice()[2].clone()]).unwrap();
        let plan = compile(&one);
        assert_eq!(plan.blocks().len(), 1);
        assert_eq!(plan.to_args().iter().filter(|a| *a == "-vf").count(), 1);
    }

    #[test]
    fn scale_never_upscales() {
        assert_eq!(
            scale_filter(1280, 720),
            "scale=w='min(1280,iw)':h='min(720,ih)':force_original_aspect_ratio=decrease:force_divisible_by=2"
        );
    }

    #[test]
    fn segment_names() {
        assert_eq!(segment_pattern("720p"), "720p_%03d.ts");
        let names: Vec<String> = (0..3).map(|i| segment_filename("720p", i)).collect();
        assert_eq!(names, ["720p_000.ts", "720p_001.ts", "720p_002.ts"]);
        assert_eq!(segment_filename("720p", 42), "720p_042.ts");
        assert_eq!(playlist_filename("720p"), "720p.m3u8");
    }
}
