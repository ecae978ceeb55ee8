use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// `index` zero-padded to six digits, matching ffmpeg's `%06d` pattern.
pub fn sequential_name(index: usize, extension: &str) -> String {
    format!("{index:06}.{extension}")
}

/// Stable sort on the lowercased names.
pub fn sort_case_insensitive(names: &mut [String]) {
    names.sort_by_cached_key(|name| name.to_lowercase());
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub original: String,
    pub sequential: String,
}

#[derive(Debug)]
pub enum RenameError {
    /// The move would overwrite a file that is not part of the sequence.
    Conflict { original: String, target: String },
    Io {
        from: String,
        to: String,
        source: std::io::Error,
    },
}

impl fmt::Display for RenameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict { original, target } => write!(
                f,
                "cannot rename {original} to {target}: {target} already exists in the directory"
            ),
            Self::Io { from, to, source } => {
                write!(f, "failed to rename {from} to {to}: {source}")
            }
        }
    }
}

impl std::error::Error for RenameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Conflict { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Per-file outcome of a batch of renames.
#[derive(Debug, Default)]
pub struct RenameReport {
    pub completed: Vec<Rename>,
    pub failed: Vec<RenameError>,
}

impl RenameReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered mapping between original names and their temporary sequential names.
#[derive(Debug, Clone, Default)]
pub struct RenamePlan {
    renames: Vec<Rename>,
}

impl RenamePlan {
    /// Sorts `accepted`, assigns contiguous indices from zero and checks the moves against
    /// `existing` (every file name currently in the directory). Moves run in plan order, so a
    /// target is free if nothing occupies it at the moment it is reached.
    pub fn build(
        accepted: &[String],
        extension: &str,
        existing: &[String],
    ) -> Result<Self, RenameError> {
        let mut sorted = accepted.to_vec();
        sort_case_insensitive(&mut sorted);

        let renames = sorted
            .into_iter()
            .enumerate()
            .map(|(index, original)| Rename {
                sequential: sequential_name(index, extension),
                original,
            })
            .collect::<Vec<_>>();

        check_conflicts(&renames, existing)?;
        Ok(Self { renames })
    }

    pub fn renames(&self) -> &[Rename] {
        &self.renames
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    pub fn original_for(&self, sequential: &str) -> Option<&str> {
        self.renames
            .iter()
            .find(|rename| rename.sequential == sequential)
            .map(|rename| rename.original.as_str())
    }

    /// Moves every file to its sequential name. On the first failure the moves already made
    /// are undone and the error is returned.
    pub fn apply(&self, dir: &Path) -> Result<(), RenameError> {
        let mut report = RenameReport::default();

        for rename in &self.renames {
            match move_file(dir, &rename.original, &rename.sequential) {
                Ok(()) => report.completed.push(rename.clone()),
                Err(error) => {
                    let rollback = restore_in_reverse(dir, &report.completed);
                    log_failures("rolling back renames", &rollback);
                    return Err(error);
                }
            }
        }

        log::info!(
            "found {} files to convert into gif, renaming them temporarily",
            report.completed.len()
        );
        for rename in &report.completed {
            log::debug!("{} -> {}", rename.original, rename.sequential);
        }
        Ok(())
    }

    /// Moves every file back to its original name. Never stops early; failures are collected.
    pub fn restore(&self, dir: &Path) -> RenameReport {
        let report = restore_in_reverse(dir, &self.renames);
        log_failures("restoring original file names", &report);
        report
    }
}

fn check_conflicts(renames: &[Rename], existing: &[String]) -> Result<(), RenameError> {
    let mut occupied = existing.iter().map(String::as_str).collect::<HashSet<_>>();
    for rename in renames {
        if rename.original == rename.sequential {
            continue;
        }
        if occupied.contains(rename.sequential.as_str()) {
            return Err(RenameError::Conflict {
                original: rename.original.clone(),
                target: rename.sequential.clone(),
            });
        }
        occupied.remove(rename.original.as_str());
        occupied.insert(rename.sequential.as_str());
    }
    Ok(())
}

fn restore_in_reverse(dir: &Path, renames: &[Rename]) -> RenameReport {
    let mut report = RenameReport::default();
    for rename in renames.iter().rev() {
        match move_file(dir, &rename.sequential, &rename.original) {
            Ok(()) => report.completed.push(rename.clone()),
            Err(error) => report.failed.push(error),
        }
    }
    report
}

fn move_file(dir: &Path, from: &str, to: &str) -> Result<(), RenameError> {
    if from == to {
        return Ok(());
    }
    fs::rename(dir.join(from), dir.join(to)).map_err(|source| RenameError::Io {
        from: from.to_owned(),
        to: to.to_owned(),
        source,
    })
}

fn log_failures(action: &str, report: &RenameReport) {
    if report.is_clean() {
        return;
    }
    log::error!(
        "{} failed for {} file(s); they must be renamed manually",
        action,
        report.failed.len()
    );
    for failure in &report.failed {
        log::error!("  {failure}");
    }
}
