use std::fmt;
use std::path::Path;

/// Why an event was ignored without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The object is one of our own published outputs.
    AlreadyOutput,
    OutsideIntake,
    /// Folder placeholder or an empty file name.
    NotAFile,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyOutput => "already_output",
            SkipReason::OutsideIntake => "outside_intake",
            SkipReason::NotAFile => "not_a_file",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source object accepted for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedObject {
    pub job_id: String,
    pub source_path: String,
    pub destination_path: String,
}

/// Intake/output prefix rules. Both prefixes are expected to be normalized
/// (`settings::normalize_prefix`).
#[derive(Debug, Clone)]
pub struct PathPolicy {
    intake_prefix: String,
    output_prefix: String,
}

impl PathPolicy {
    pub fn new(intake_prefix: impl Into<String>, output_prefix: impl Into<String>) -> Self {
        Self {
            intake_prefix: intake_prefix.into(),
            output_prefix: output_prefix.into(),
        }
    }

    /// The output check runs first: when the output prefix sits inside the
    /// intake prefix, our own uploads must never be picked up again.
    pub fn accept(&self, object_path: &str) -> Result<AcceptedObject, SkipReason> {
        if object_path.starts_with(&self.output_prefix) {
            return Err(SkipReason::AlreadyOutput);
        }
        let Some(relative) = object_path.strip_prefix(&self.intake_prefix) else {
            return Err(SkipReason::OutsideIntake);
        };
        if relative.is_empty() || relative.ends_with('/') {
            return Err(SkipReason::NotAFile);
        }
        let job_id = job_id(relative).ok_or(SkipReason::NotAFile)?;

        Ok(AcceptedObject {
            job_id,
            source_path: object_path.to_string(),
            destination_path: format!("{}{}", self.output_prefix, relative),
        })
    }
}

/// Intake-relative path without the file extension, so same-named files in
/// different folders get distinct ids (`2024/a.mp4` becomes `2024/a`).
pub fn job_id(relative: &str) -> Option<String> {
    let stem = Path::new(relative)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())?;

    match relative.rsplit_once('/') {
        Some((dir, _)) => Some(format!("{}/{}", dir, stem)),
        None => Some(stem.to_string()),
    }
}
