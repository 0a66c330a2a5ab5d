//! Grouping scanned files into analysis units and loading their text.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::scan::FileDescriptor;

/// Start of the header line that precedes each member's text.
pub const MEMBER_HEADER_PREFIX: &str = "===== FILE: ";
/// End of the member header line.
pub const MEMBER_HEADER_SUFFIX: &str = " =====";

/// Default per-file ceiling in per-file mode.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 100_000;

/// How files are grouped, and which artifact schema the model must follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UnitMode {
    /// One unit per file, keyed by its relative name.
    PerFile,
    /// All scanned files form one unit, keyed by the feature name.
    Feature { name: String },
}

/// Size ceilings applied while loading unit contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLimits {
    /// Per-file mode: files larger than this are skipped.
    pub per_file: u64,
    /// Feature mode: cap on the summed size of members; `None` is unbounded.
    pub feature: Option<u64>,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            per_file: DEFAULT_MAX_FILE_BYTES,
            feature: None,
        }
    }
}

/// One bundle of source analysed together and mapped to one destination record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisUnit {
    pub unit_key: String,
    pub members: Vec<FileDescriptor>,
    pub concatenated_source: String,
}

impl AnalysisUnit {
    /// Member relative names joined with ", "; written as the record's file path.
    pub fn source_label(&self) -> String {
        self.members
            .iter()
            .map(|m| m.relative_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Split `concatenated_source` back into `(relative_name, text)` pairs at the header lines.
    ///
    /// Only a header naming the next member in order opens a segment, so header-like
    /// lines inside a member's own text stay part of that text.
    pub fn segments(&self) -> Vec<(String, String)> {
        let mut segments: Vec<(String, String)> = Vec::new();
        let mut expected = self.members.iter().map(|m| m.relative_name.as_str()).peekable();
        for line in self.concatenated_source.split_inclusive('\n') {
            let bare = line.trim_end_matches(&['\n', '\r'][..]);
            let header = bare
                .strip_prefix(MEMBER_HEADER_PREFIX)
                .and_then(|rest| rest.strip_suffix(MEMBER_HEADER_SUFFIX));
            match (header, expected.peek()) {
                (Some(name), Some(&next)) if name == next => {
                    expected.next();
                    segments.push((name.to_string(), String::new()));
                }
                _ => {
                    if let Some((_, text)) = segments.last_mut() {
                        text.push_str(line);
                    }
                }
            }
        }
        segments
    }
}

#[derive(Debug, Error)]
#[error("no eligible source files for unit `{unit_key}`")]
pub struct EmptyUnitError {
    pub unit_key: String,
}

/// Files left out of a unit, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub relative_name: String,
    pub reason: String,
}

/// Result of building units: the units plus what was left out.
#[derive(Debug, Clone, Default)]
pub struct BuiltUnits {
    pub units: Vec<AnalysisUnit>,
    pub skipped: Vec<SkippedFile>,
}

fn member_header(relative_name: &str) -> String {
    format!("{MEMBER_HEADER_PREFIX}{relative_name}{MEMBER_HEADER_SUFFIX}\n")
}

fn push_member(source: &mut String, relative_name: &str, text: &str) {
    source.push_str(&member_header(relative_name));
    source.push_str(text);
    if !text.ends_with('\n') {
        source.push('\n');
    }
}

fn file_size(file: &FileDescriptor) -> Option<u64> {
    match std::fs::metadata(&file.absolute_path) {
        Ok(m) => Some(m.len()),
        Err(e) => {
            warn!(file = %file.relative_name, error = ?e, "Cannot stat file, skipping");
            None
        }
    }
}

fn read_text(file: &FileDescriptor) -> Option<String> {
    match std::fs::read_to_string(&file.absolute_path) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(file = %file.relative_name, error = ?e, "Cannot read file as text, skipping");
            None
        }
    }
}

fn skip(skipped: &mut Vec<SkippedFile>, file: &FileDescriptor, reason: impl Into<String>) {
    let reason = reason.into();
    info!(file = %file.relative_name, %reason, "Skipped file");
    skipped.push(SkippedFile {
        relative_name: file.relative_name.clone(),
        reason,
    });
}

/// Group `files` into analysis units according to `mode`, loading their contents.
///
/// Per-file mode returns zero units (not an error) when every file is skipped.
/// Feature mode fails if no member survives.
pub fn build_units(
    files: Vec<FileDescriptor>,
    mode: &UnitMode,
    limits: &SizeLimits,
) -> Result<BuiltUnits, EmptyUnitError> {
    if files.is_empty() {
        let unit_key = match mode {
            UnitMode::PerFile => "<all files>".to_string(),
            UnitMode::Feature { name } => name.clone(),
        };
        return Err(EmptyUnitError { unit_key });
    }

    let mut built = BuiltUnits::default();
    match mode {
        UnitMode::PerFile => {
            for file in files {
                let Some(size) = file_size(&file) else {
                    skip(&mut built.skipped, &file, "unreadable metadata");
                    continue;
                };
                if size > limits.per_file {
                    skip(
                        &mut built.skipped,
                        &file,
                        format!("{size} bytes exceeds ceiling of {} bytes", limits.per_file),
                    );
                    continue;
                }
                let Some(text) = read_text(&file) else {
                    skip(&mut built.skipped, &file, "not readable as text");
                    continue;
                };
                let mut source = String::new();
                push_member(&mut source, &file.relative_name, &text);
                debug!(unit_key = %file.relative_name, bytes = source.len(), "Built per-file unit");
                built.units.push(AnalysisUnit {
                    unit_key: file.relative_name.clone(),
                    members: vec![file],
                    concatenated_source: source,
                });
            }
            if built.units.is_empty() {
                warn!(
                    skipped = built.skipped.len(),
                    "Every file was skipped; no units to process"
                );
            }
        }
        UnitMode::Feature { name } => {
            let mut members = Vec::new();
            let mut source = String::new();
            let mut total: u64 = 0;
            for file in files {
                let Some(text) = read_text(&file) else {
                    skip(&mut built.skipped, &file, "not readable as text");
                    continue;
                };
                let size = text.len() as u64;
                if let Some(limit) = limits.feature {
                    if total + size > limit {
                        skip(
                            &mut built.skipped,
                            &file,
                            format!("feature ceiling of {limit} bytes reached"),
                        );
                        continue;
                    }
                }
                total += size;
                push_member(&mut source, &file.relative_name, &text);
                members.push(file);
            }
            if members.is_empty() {
                return Err(EmptyUnitError {
                    unit_key: name.clone(),
                });
            }
            info!(unit_key = %name, members = members.len(), bytes = total, "Built feature unit");
            built.units.push(AnalysisUnit {
                unit_key: name.clone(),
                members,
                concatenated_source: source,
            });
        }
    }
    Ok(built)
}
