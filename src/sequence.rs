//! Image sequence discovery.
//!
//! A sequence is a set of sibling files whose names differ only in a run of
//! digits, the frame number: `shot.0001.png`, `shot.0002.png`, ... A
//! [`SequencePattern`] is parsed from either one concrete frame or a
//! placeholder name (`shot.####.png`, `shot.%04d.png`) and then matched
//! against the directory contents.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::errors::{NiraError, Result};

/// Prefix, padding and suffix around the frame number of a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePattern {
    dir: PathBuf,
    prefix: String,
    suffix: String,
    /// Exact digit count for zero-padded sequences, `None` when unpadded.
    padding: Option<usize>,
}

/// Frames of a sequence found on disk, sorted by frame number.
#[derive(Debug, Clone)]
pub struct SequenceFrames {
    pub pattern: SequencePattern,
    pub frames: Vec<(u64, PathBuf)>,
}

impl SequencePattern {
    /// Parse a frame path or placeholder pattern.
    ///
    /// The frame number is taken from the last run of digits, `#` characters
    /// or a `%0Nd` directive in the file name.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                NiraError::InvalidInput(format!("{} has no usable file name", path.display()))
            })?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (prefix, suffix, padding) = split_printf(name)
            .or_else(|| {
                split_run(name, |c| c == '#')
                    .map(|(p, run, s)| (p, s, Some(run.len()).filter(|w| *w > 1)))
            })
            .or_else(|| {
                split_run(name, |c| c.is_ascii_digit()).map(|(p, run, s)| {
                    let padding = (run.len() > 1 && run.starts_with('0')).then_some(run.len());
                    (p, s, padding)
                })
            })
            .ok_or_else(|| {
                NiraError::InvalidInput(format!("{name} does not contain a frame number"))
            })?;

        Ok(Self {
            dir,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            padding,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The pattern written with `#` placeholders, e.g. `shot.####.png`.
    pub fn display_pattern(&self) -> String {
        let hashes = "#".repeat(self.padding.unwrap_or(1));
        format!("{}{}{}", self.prefix, hashes, self.suffix)
    }

    /// Frame number of `name` if it belongs to this sequence.
    pub fn frame_number(&self, name: &str) -> Option<u64> {
        let digits = name
            .strip_prefix(&self.prefix)?
            .strip_suffix(&self.suffix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if let Some(width) = self.padding {
            if digits.len() != width {
                return None;
            }
        }
        digits.parse().ok()
    }

    /// Scan the pattern's directory for matching frames.
    pub fn collect(&self) -> Result<SequenceFrames> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(n) = self.frame_number(name) {
                frames.push((n, entry.path()));
            }
        }

        if frames.is_empty() {
            return Err(NiraError::InvalidInput(format!(
                "no files matching {} in {}",
                self.display_pattern(),
                self.dir.display()
            )));
        }

        frames.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(SequenceFrames {
            pattern: self.clone(),
            frames,
        })
    }
}

impl SequenceFrames {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first_frame(&self) -> Option<u64> {
        self.frames.first().map(|f| f.0)
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.frames.last().map(|f| f.0)
    }

    /// Runs of frame numbers absent between the first and last frame.
    pub fn gaps(&self) -> Vec<RangeInclusive<u64>> {
        self.frames
            .windows(2)
            .filter_map(|pair| {
                let (prev, next) = (pair[0].0, pair[1].0);
                (next > prev.saturating_add(1)).then(|| prev + 1..=next - 1)
            })
            .collect()
    }

    /// Number of frame numbers absent between the first and last frame.
    pub fn missing_count(&self) -> u64 {
        self.gaps()
            .iter()
            .map(|gap| gap.end() - gap.start() + 1)
            .sum()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.frames.iter().map(|(_, p)| p.clone()).collect()
    }
}

/// Split `name` around its last maximal run of chars matching `pred`.
fn split_run(name: &str, pred: impl Fn(char) -> bool) -> Option<(&str, &str, &str)> {
    let end = name.rfind(&pred)? + 1;
    let start = name[..end]
        .rfind(|c: char| !pred(c))
        .map(|i| i + 1)
        .unwrap_or(0);
    Some((&name[..start], &name[start..end], &name[end..]))
}

/// Split `name` around a `%d` / `%0Nd` directive.
fn split_printf(name: &str) -> Option<(&str, &str, Option<usize>)> {
    let start = name.rfind('%')?;
    let rest = &name[start + 1..];
    let end = rest.find('d')?;
    let spec = &rest[..end];
    if !spec.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padding = match spec {
        "" => None,
        s => Some(s.trim_start_matches('0').parse::<usize>().ok()?),
    };
    Some((&name[..start], &rest[end + 1..], padding.filter(|w| *w > 1)))
}
