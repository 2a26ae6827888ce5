//! Thin wrapper around an external `ffmpeg`/`ffprobe` pair. Every operation
//! is a pure file→file (or pipe→file) transformation; the driver never keeps
//! a subprocess alive across operations.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::models::{LOUDNESS_RANGE, MAX_TRUE_PEAK_DBTP, SAMPLE_RATE_HZ};

const STDERR_TAIL_LINES: usize = 20;

/// Duration and channel layout as reported by `ffprobe`.
#[derive(Debug, Clone, Copy)]
pub struct ProbeInfo {
    pub duration_ms: i64,
    pub channels: u16,
    pub is_stereo: bool,
}

/// Owns the paths to the `ffmpeg`/`ffprobe` binaries. Constructed once at
/// worker startup after [`AudioProcess::detect_capabilities`] succeeds.
#[derive(Debug, Clone)]
pub struct AudioProcess {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl Default for AudioProcess {
    fn default() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

/// How many `voice_sec` + `pause_sec` cycles are needed to cover
/// `target_sec`, before the result gets trimmed down to
/// the exact target. Pulled out as a pure function so the loop-length math
/// is testable without shelling out to `ffmpeg`.
pub fn voice_loop_repeat_count(voice_sec: f64, pause_sec: f64, target_sec: f64) -> u32 {
    let cycle_sec = voice_sec + pause_sec;
    (target_sec / cycle_sec).ceil() as u32
}

impl AudioProcess {
    pub fn new(ffmpeg_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }

    /// Startup capability probe: confirms the binary exists and
    /// that the filters the pipeline depends on (`loudnorm`, `afade`,
    /// `concat`) are compiled in, rather than discovering this mid-job.
    pub async fn detect_capabilities(&self) -> WorkerResult<()> {
        let output = Command::new(&self.ffmpeg_bin)
            .arg("-filters")
            .output()
            .await
            .map_err(|e| {
                WorkerError::AudioProcessError(format!("{} not found or not runnable: {e}", self.ffmpeg_bin))
            })?;
        if !output.status.success() {
            return Err(WorkerError::AudioProcessError(format!(
                "{} -filters exited non-zero",
                self.ffmpeg_bin
            )));
        }
        let listing = String::from_utf8_lossy(&output.stdout);
        for required in ["loudnorm", "afade", "concat", "anullsrc"] {
            if !listing.contains(required) {
                return Err(WorkerError::AudioProcessError(format!(
                    "{} build is missing required filter '{required}'",
                    self.ffmpeg_bin
                )));
            }
        }
        info!(ffmpeg = %self.ffmpeg_bin, "audio process driver capability check passed");
        Ok(())
    }

    /// Encode a raw PCM16 buffer (from [`crate::pcm`]) into a compressed
    /// stereo file at 192 kbit/s, 44.1 kHz.
    pub async fn encode_pcm16(
        &self,
        pcm: &[u8],
        channels: u16,
        sample_rate: u32,
        out_path: &Path,
    ) -> WorkerResult<()> {
        let mut child = Command::new(&self.ffmpeg_bin)
            .args(["-y", "-f", "s16le", "-ar"])
            .arg(sample_rate.to_string())
            .args(["-ac"])
            .arg(channels.to_string())
            .args(["-i", "pipe:0"])
            .args(["-ar"])
            .arg(SAMPLE_RATE_HZ.to_string())
            .args(["-ac", "2", "-c:a", "libmp3lame", "-b:a", "192k"])
            .arg(out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WorkerError::AudioProcessError(format!("failed to spawn {}: {e}", self.ffmpeg_bin)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerError::AudioProcessError("ffmpeg stdin pipe unavailable".to_string()))?;
        let pcm_owned = pcm.to_vec();
        let write_task = tokio::spawn(async move {
            let _ = stdin.write_all(&pcm_owned).await;
            drop(stdin);
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| WorkerError::AudioProcessError(format!("ffmpeg wait failed: {e}")))?;
        let _ = write_task.await;
        check_status(&self.ffmpeg_bin, &output.status, &output.stderr)
    }

    /// Mix `[(path, gain_db)...]` into one file: per-input
    /// gain, sum with `duration=longest`, force stereo. Degenerates to a
    /// gain+format pass with a single input.
    pub async fn mix(&self, inputs: &[(PathBuf, f64)], out_path: &Path) -> WorkerResult<()> {
        if inputs.is_empty() {
            return Err(WorkerError::NoLayersError);
        }
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.arg("-y");
        for (path, _) in inputs {
            cmd.args(["-i"]).arg(path);
        }

        if inputs.len() == 1 {
            let gain_linear = crate::pcm::db_to_linear(inputs[0].1);
            cmd.args(["-af", &format!("volume={gain_linear}"), "-ac", "2"]);
        } else {
            let mut filter = String::new();
            for (i, (_, gain_db)) in inputs.iter().enumerate() {
                let gain_linear = crate::pcm::db_to_linear(*gain_db);
                filter.push_str(&format!("[{i}:a]volume={gain_linear}[a{i}];"));
            }
            for i in 0..inputs.len() {
                filter.push_str(&format!("[a{i}]"));
            }
            filter.push_str(&format!(
                "amix=inputs={}:duration=longest:normalize=0[mixed]",
                inputs.len()
            ));
            cmd.args(["-filter_complex", &filter, "-map", "[mixed]", "-ac", "2"]);
        }

        cmd.args(["-c:a", "libmp3lame", "-b:a", "192k"]).arg(out_path);
        run(&mut cmd, &self.ffmpeg_bin).await
    }

    /// Two-pass EBU R128 loudness normalize.
    pub async fn loudness_normalize(&self, path: &Path, target_lufs: f64, out_path: &Path) -> WorkerResult<()> {
        let measure_filter = format!(
            "loudnorm=I={target_lufs}:TP={MAX_TRUE_PEAK_DBTP}:LRA={LOUDNESS_RANGE}:print_format=json"
        );
        let measure = Command::new(&self.ffmpeg_bin)
            .args(["-y", "-i"])
            .arg(path)
            .args(["-af", &measure_filter, "-f", "null", "-"])
            .output()
            .await
            .map_err(|e| WorkerError::AudioProcessError(format!("loudnorm measure pass failed to spawn: {e}")))?;
        check_status(&self.ffmpeg_bin, &measure.status, &measure.stderr)?;
        let measured = parse_loudnorm_json(&measure.stderr).ok_or_else(|| {
            WorkerError::AudioProcessError("could not parse loudnorm measurement output".to_string())
        })?;

        let apply_filter = format!(
            "loudnorm=I={target_lufs}:TP={MAX_TRUE_PEAK_DBTP}:LRA={LOUDNESS_RANGE}:measured_I={}:measured_TP={}:measured_LRA={}:measured_thresh={}:offset={}:linear=true",
            measured.input_i, measured.input_tp, measured.input_lra, measured.input_thresh, measured.target_offset
        );
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.args(["-y", "-i"])
            .arg(path)
            .args(["-af", &apply_filter, "-ar"])
            .arg(SAMPLE_RATE_HZ.to_string())
            .args(["-c:a", "libmp3lame", "-b:a", "192k"])
            .arg(out_path);
        run(&mut cmd, &self.ffmpeg_bin).await
    }

    /// Linear fade-in from 0 and fade-out ending at file end.
    pub async fn fade(&self, path: &Path, fade_in_ms: u32, fade_out_ms: u32, out_path: &Path) -> WorkerResult<()> {
        let probe = self.probe(path).await?;
        let duration_sec = probe.duration_ms as f64 / 1000.0;
        let fade_out_start = (duration_sec - fade_out_ms as f64 / 1000.0).max(0.0);
        let filter = format!(
            "afade=t=in:st=0:d={:.3},afade=t=out:st={:.3}:d={:.3}",
            fade_in_ms as f64 / 1000.0,
            fade_out_start,
            fade_out_ms as f64 / 1000.0
        );
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.args(["-y", "-i"])
            .arg(path)
            .args(["-af", &filter, "-c:a", "libmp3lame", "-b:a", "192k"])
            .arg(out_path);
        run(&mut cmd, &self.ffmpeg_bin).await
    }

    /// Post-hoc tempo-only, pitch-preserving time-stretch: used
    /// by providers with no native speed control. `atempo` only accepts
    /// 0.5–2.0 per filter instance, so factors outside that range are
    /// chained across multiple `atempo` stages.
    pub async fn tempo_stretch(&self, path: &Path, speed: f64, out_path: &Path) -> WorkerResult<()> {
        let filter = atempo_chain(speed);
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.args(["-y", "-i"])
            .arg(path)
            .args(["-af", &filter, "-c:a", "libmp3lame", "-b:a", "192k"])
            .arg(out_path);
        run(&mut cmd, &self.ffmpeg_bin).await
    }

    /// Trim to an exact duration.
    pub async fn trim(&self, path: &Path, duration_sec: f64, out_path: &Path) -> WorkerResult<()> {
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.args(["-y", "-i"])
            .arg(path)
            .args(["-t"])
            .arg(format!("{duration_sec:.3}"))
            .args(["-c:a", "libmp3lame", "-b:a", "192k"])
            .arg(out_path);
        run(&mut cmd, &self.ffmpeg_bin).await
    }

    /// Generate stereo silence at the pipeline's sample rate.
    pub async fn silence(&self, duration_sec: f64, out_path: &Path) -> WorkerResult<()> {
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.args(["-y", "-f", "lavfi", "-i"])
            .arg(format!("anullsrc=r={SAMPLE_RATE_HZ}:cl=stereo"))
            .args(["-t"])
            .arg(format!("{duration_sec:.3}"))
            .args(["-c:a", "libmp3lame", "-b:a", "192k"])
            .arg(out_path);
        run(&mut cmd, &self.ffmpeg_bin).await
    }

    /// Sample-accurate concatenation via the `concat` filter, not stream
    /// copy.
    pub async fn concat(&self, inputs: &[PathBuf], out_path: &Path) -> WorkerResult<()> {
        if inputs.is_empty() {
            return Err(WorkerError::AudioProcessError("concat called with no inputs".to_string()));
        }
        if inputs.len() == 1 {
            let mut cmd = Command::new(&self.ffmpeg_bin);
            cmd.args(["-y", "-i"]).arg(&inputs[0]).args(["-c:a", "libmp3lame", "-b:a", "192k"]).arg(out_path);
            return run(&mut cmd, &self.ffmpeg_bin).await;
        }
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.arg("-y");
        for input in inputs {
            cmd.args(["-i"]).arg(input);
        }
        let mut filter = String::new();
        for i in 0..inputs.len() {
            filter.push_str(&format!("[{i}:a]"));
        }
        filter.push_str(&format!("concat=n={}:v=0:a=1[out]", inputs.len()));
        cmd.args(["-filter_complex", &filter, "-map", "[out]", "-c:a", "libmp3lame", "-b:a", "192k"])
            .arg(out_path);
        run(&mut cmd, &self.ffmpeg_bin).await
    }

    /// Stage a background-music layer to exactly `target_sec`. Uses the encoder's native stream-loop
    /// mechanism for looping so repeats are artifact-free.
    pub async fn prepare_background_music(
        &self,
        path: &Path,
        target_sec: u32,
        fade_in_ms: u32,
        fade_out_ms: u32,
        temp_dir: &Path,
        out_path: &Path,
    ) -> WorkerResult<()> {
        let probe = self.probe(path).await?;
        let source_sec = probe.duration_ms as f64 / 1000.0;
        let staged = temp_dir.join("music_staged.mp3");

        if source_sec >= target_sec as f64 {
            self.trim(path, target_sec as f64, &staged).await?;
        } else {
            let mut cmd = Command::new(&self.ffmpeg_bin);
            cmd.args(["-y", "-stream_loop", "-1", "-i"])
                .arg(path)
                .args(["-t"])
                .arg(target_sec.to_string())
                .args(["-c:a", "libmp3lame", "-b:a", "192k"])
                .arg(&staged);
            run(&mut cmd, &self.ffmpeg_bin).await?;
        }

        self.fade(&staged, fade_in_ms, fade_out_ms, out_path).await
    }

    /// Loop, pad, or trim a voice track to `target_sec`. Returns the path of
    /// the final file. When `loop_mode` is false and the voice is shorter
    /// than `target_sec`, it is padded out with a single block of silence
    /// rather than repeated.
    pub async fn loop_voice(
        &self,
        voice_path: &Path,
        target_sec: u32,
        pause_sec: u32,
        loop_mode: bool,
        temp_dir: &Path,
    ) -> WorkerResult<PathBuf> {
        let out_path = temp_dir.join("voice_looped.mp3");
        let probe = self.probe(voice_path).await?;
        let voice_sec = probe.duration_ms as f64 / 1000.0;

        if voice_sec >= target_sec as f64 {
            self.trim(voice_path, target_sec as f64, &out_path).await?;
            return Ok(out_path);
        }

        if !loop_mode {
            let pad_sec = target_sec as f64 - voice_sec;
            let silence_path = temp_dir.join("voice_pad_silence.mp3");
            self.silence(pad_sec, &silence_path).await?;
            self.concat(&[voice_path.to_path_buf(), silence_path], &out_path).await?;
            return Ok(out_path);
        }

        let repeat_count = voice_loop_repeat_count(voice_sec, pause_sec as f64, target_sec as f64);
        let silence_path = temp_dir.join("voice_pause.mp3");
        self.silence(pause_sec as f64, &silence_path).await?;

        let mut pattern = Vec::with_capacity(repeat_count as usize * 2);
        for _ in 0..repeat_count {
            pattern.push(voice_path.to_path_buf());
            pattern.push(silence_path.clone());
        }
        let concatenated = temp_dir.join("voice_concatenated.mp3");
        self.concat(&pattern, &concatenated).await?;
        self.trim(&concatenated, target_sec as f64, &out_path).await?;
        Ok(out_path)
    }

    /// Probe duration and channel layout.
    pub async fn probe(&self, path: &Path) -> WorkerResult<ProbeInfo> {
        let output = Command::new(&self.ffprobe_bin)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration:stream=channels",
                "-select_streams",
                "a:0",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| WorkerError::AudioProcessError(format!("failed to spawn {}: {e}", self.ffprobe_bin)))?;
        check_status(&self.ffprobe_bin, &output.status, &output.stderr)?;

        let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| WorkerError::AudioProcessError(format!("could not parse ffprobe output: {e}")))?;
        let duration_sec: f64 = parsed
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse().ok())
            .unwrap_or(0.0);
        let channels = parsed.streams.first().map(|s| s.channels).unwrap_or(2);

        Ok(ProbeInfo {
            duration_ms: (duration_sec * 1000.0).round() as i64,
            channels,
            is_stereo: channels == 2,
        })
    }
}

/// Break a single speed factor into a chain of `atempo=x` filters, each
/// within ffmpeg's supported 0.5–2.0 range per stage.
fn atempo_chain(speed: f64) -> String {
    let mut remaining = speed.clamp(0.1, 10.0);
    let mut stages = Vec::new();
    while remaining > 2.0 {
        stages.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push(0.5);
        remaining /= 0.5;
    }
    stages.push(remaining);
    stages
        .iter()
        .map(|s| format!("atempo={s:.4}"))
        .collect::<Vec<_>>()
        .join(",")
}

async fn run(cmd: &mut Command, bin: &str) -> WorkerResult<()> {
    let output = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| WorkerError::AudioProcessError(format!("failed to spawn {bin}: {e}")))?;
    check_status(bin, &output.status, &output.stderr)
}

fn check_status(bin: &str, status: &std::process::ExitStatus, stderr: &[u8]) -> WorkerResult<()> {
    if status.success() {
        return Ok(());
    }
    let tail = stderr_tail(stderr);
    warn!(%bin, exit_code = ?status.code(), stderr_tail = %tail, "audio process exited non-zero");
    Err(WorkerError::AudioProcessError(format!("{bin} exited {status}: {tail}")))
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .rev()
        .take(STDERR_TAIL_LINES)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Deserialize)]
struct LoudnormMeasurement {
    #[serde(rename = "input_i")]
    input_i: String,
    #[serde(rename = "input_tp")]
    input_tp: String,
    #[serde(rename = "input_lra")]
    input_lra: String,
    #[serde(rename = "input_thresh")]
    input_thresh: String,
    #[serde(rename = "target_offset")]
    target_offset: String,
}

fn parse_loudnorm_json(stderr: &[u8]) -> Option<LoudnormMeasurement> {
    let text = String::from_utf8_lossy(stderr);
    let start = text.rfind('{')?;
    let end = text.rfind('}')?;
    serde_json::from_str(&text[start..=end]).ok()
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    channels: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_tail_keeps_last_lines_in_order() {
        let text = (1..=30).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n");
        let tail = stderr_tail(text.as_bytes());
        let lines: Vec<&str> = tail.lines().collect();
        assert_eq!(lines.len(), STDERR_TAIL_LINES);
        assert_eq!(lines.first(), Some(&"line 11"));
        assert_eq!(lines.last(), Some(&"line 30"));
    }

    #[test]
    fn atempo_chain_splits_out_of_range_factors() {
        assert_eq!(atempo_chain(1.5), "atempo=1.5000");
        assert!(atempo_chain(3.0).contains("atempo=2.0000"));
        assert!(atempo_chain(0.3).contains("atempo=0.5000"));
    }

    #[test]
    fn parse_loudnorm_json_extracts_trailing_object() {
        let stderr = b"some ffmpeg chatter\n{\"input_i\":\"-23.00\",\"input_tp\":\"-5.00\",\"input_lra\":\"4.00\",\"input_thresh\":\"-33.00\",\"target_offset\":\"0.50\"}";
        let measured = parse_loudnorm_json(stderr).expect("should parse");
        assert_eq!(measured.input_i, "-23.00");
        assert_eq!(measured.target_offset, "0.50");
    }

    #[test]
    fn voice_loop_repeat_count_covers_target_with_whole_cycles() {
        assert_eq!(voice_loop_repeat_count(10.0, 5.0, 30.0), 2);
        assert_eq!(voice_loop_repeat_count(10.0, 5.0, 31.0), 3);
    }
}
