//! Media file metadata probing.
//!
//! [`MediaProbe`] answers one question: which title tag does a media file
//! carry. [`FfprobeProbe`] answers it by running `ffprobe`.

use crate::config::ProbeConfig;
use crate::error::{FixupError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Reads the title tag of a media file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// The title tag of the file at `path`, or `None` when it has none.
    async fn title(&self, path: &Path) -> Result<Option<String>>;
}

/// Probe backed by the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new(ProbeConfig::FFPROBE_PROGRAM)
    }
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn title(&self, path: &Path) -> Result<Option<String>> {
        debug!("Probing {} with {}", path.display(), self.program.display());
        // sv=ignore passes invalid UTF-8 through unchanged instead of
        // replacing it, so AVI tags in legacy encodings can be decoded here.
        let output = Command::new(&self.program)
            .args(["-hide_banner", "-show_format", "-of", "json=sv=ignore"])
            .arg(path)
            .output()
            .await
            .map_err(|e| FixupError::Probe {
                path: path.to_path_buf(),
                message: format!("Failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FixupError::Probe {
                path: path.to_path_buf(),
                message: format!("ffprobe failed ({}): {}", output.status, stderr.trim()),
            });
        }

        let stdout = decode_output(path, output.stdout)?;
        parse_title(path, &stdout)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Extract `format.tags.title` from ffprobe JSON output.
pub fn parse_title(path: &Path, stdout: &str) -> Result<Option<String>> {
    let output: ProbeOutput = serde_json::from_str(stdout).map_err(|e| FixupError::Probe {
        path: path.to_path_buf(),
        message: format!("ffprobe returned invalid JSON: {}", e),
    })?;
    Ok(output.format.and_then(|mut f| f.tags.remove("title")))
}

/// Decode ffprobe stdout. AVI tags are frequently stored in Windows-1252,
/// so AVI output that is not valid UTF-8 is decoded as Windows-1252.
fn decode_output(path: &Path, stdout: Vec<u8>) -> Result<String> {
    let is_avi = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avi"));

    match String::from_utf8(stdout) {
        Ok(text) => Ok(text),
        Err(err) if is_avi => decode_cp1252(err.as_bytes()).ok_or_else(|| FixupError::Probe {
            path: path.to_path_buf(),
            message: "Cannot decode ffprobe output as UTF-8 or Windows-1252".to_string(),
        }),
        Err(err) => Err(FixupError::Probe {
            path: path.to_path_buf(),
            message: format!("ffprobe output is not valid UTF-8: {}", err),
        }),
    }
}

/// Windows-1252 code points for bytes 0x80..=0x9F; `None` marks bytes the
/// encoding leaves undefined.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('€'), None, Some('‚'), Some('ƒ'), Some('„'), Some('…'), Some('†'), Some('‡'),
    Some('ˆ'), Some('‰'), Some('Š'), Some('‹'), Some('Œ'), None, Some('Ž'), None,
    None, Some('‘'), Some('’'), Some('“'), Some('”'), Some('•'), Some('–'), Some('—'),
    Some('˜'), Some('™'), Some('š'), Some('›'), Some('œ'), None, Some('ž'), Some('Ÿ'),
];

/// Decode Windows-1252 bytes, failing on undefined bytes.
pub fn decode_cp1252(bytes: &[u8]) -> Option<String> {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)],
            _ => Some(char::from(b)),
        })
        .collect()
}
