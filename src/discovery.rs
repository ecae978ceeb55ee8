use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image::{GenericImageView, ImageReader};

use crate::encoding::{OUTPUT_FILE_NAME, PALETTE_FILE_NAME, TILE_FILE_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Result of scanning a directory for frames.
///
/// `accepted` keeps directory-listing order; sorting happens when the rename plan is built.
/// `listed` holds every regular file seen, frame or not.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub listed: Vec<String>,
    pub accepted: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    pub mismatched: Vec<String>,
    pub reference: Option<(String, Dimensions)>,
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Lists `dir` and validates every file ending in `extension`. A listing failure is
/// logged and reported as an empty discovery.
pub fn discover(dir: &Path, extension: &str) -> Discovery {
    match list_file_names(dir) {
        Ok(names) => {
            let mut discovery = validate_files(dir, &names, extension);
            discovery.listed = names;
            discovery
        }
        Err(error) => {
            log::error!("{error:#}");
            Discovery::default()
        }
    }
}

/// Regular files directly inside `dir`, sorted by name.
fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
    {
        let entry =
            entry.with_context(|| format!("failed reading directory entry in {}", dir.display()))?;
        if !entry.path().is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => log::debug!("ignoring non-UTF-8 file name {:?}", raw),
        }
    }
    names.sort();
    Ok(names)
}

pub fn matches_extension(name: &str, extension: &str) -> bool {
    name.to_lowercase().ends_with(extension)
}

fn is_artifact(name: &str) -> bool {
    [TILE_FILE_NAME, PALETTE_FILE_NAME, OUTPUT_FILE_NAME].contains(&name)
}

fn validate_files(dir: &Path, names: &[String], extension: &str) -> Discovery {
    let mut discovery = Discovery::default();

    for name in names {
        if !matches_extension(name, extension) {
            continue;
        }
        if is_artifact(name) {
            log::warn!("{name} is a gifmaker output file name, skipping it from conversion");
            discovery.skipped.push(SkippedFile {
                name: name.clone(),
                reason: "reserved output file name".to_owned(),
            });
            continue;
        }

        let dimensions = match probe_dimensions(&dir.join(name)) {
            Ok(dimensions) => dimensions,
            Err(error) => {
                log::warn!("{error:#}");
                log::warn!("failed to decode image of file {name}, skipping it from conversion");
                discovery.skipped.push(SkippedFile {
                    name: name.clone(),
                    reason: format!("{error:#}"),
                });
                continue;
            }
        };

        if let Some((reference_name, reference)) = &discovery.reference {
            if *reference != dimensions {
                log::warn!(
                    "output might look unexpected because not all files match in size: {} is {}x{}, {} is {}x{}",
                    reference_name,
                    reference.width,
                    reference.height,
                    name,
                    dimensions.width,
                    dimensions.height
                );
                discovery.mismatched.push(name.clone());
            }
        } else {
            discovery.reference = Some((name.clone(), dimensions));
        }

        discovery.accepted.push(name.clone());
    }

    discovery
}

fn probe_dimensions(path: &Path) -> Result<Dimensions> {
    let image = ImageReader::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to read image {}", path.display()))?
        .decode()
        .with_context(|| format!("failed to decode image {}", path.display()))?;

    let (width, height) = image.dimensions();
    Ok(Dimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::{discover, matches_extension, Dimensions};
    use image::RgbImage;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        RgbImage::new(width, height)
            .save(dir.join(name))
            .expect("png should write");
    }

    #[test]
    fn extension_match_is_case_insensitive_suffix() {
        assert!(matches_extension("Frame.PNG", "png"));
        assert!(matches_extension("a.png", "png"));
        assert!(!matches_extension("a.jpg", "png"));
        assert!(!matches_extension("png.txt", "png"));
    }

    #[test]
    fn corrupt_file_is_skipped() {
        let dir = tempdir().expect("tempdir should create");
        write_png(dir.path(), "a.png", 4, 4);
        write_png(dir.path(), "c.png", 4, 4);
        fs::write(dir.path().join("b.png"), b"definitely not a png").expect("file should write");

        let discovery = discover(dir.path(), "png");
        assert_eq!(discovery.accepted, vec!["a.png", "c.png"]);
        assert_eq!(discovery.skipped.len(), 1);
        assert_eq!(discovery.skipped[0].name, "b.png");
    }

    #[test]
    fn size_mismatch_is_flagged_but_kept() {
        let dir = tempdir().expect("tempdir should create");
        write_png(dir.path(), "a.png", 4, 4);
        write_png(dir.path(), "b.png", 8, 2);

        let discovery = discover(dir.path(), "png");
        assert_eq!(discovery.accepted, vec!["a.png", "b.png"]);
        assert_eq!(discovery.mismatched, vec!["b.png"]);
        assert_eq!(
            discovery.reference,
            Some((
                "a.png".to_owned(),
                Dimensions {
                    width: 4,
                    height: 4
                }
            ))
        );
    }

    #[test]
    fn ignores_other_extensions_directories_and_artifacts() {
        let dir = tempdir().expect("tempdir should create");
        write_png(dir.path(), "frame.png", 2, 2);
        write_png(dir.path(), "tile.png", 2, 2);
        write_png(dir.path(), "palette.png", 2, 2);
        fs::write(dir.path().join("notes.txt"), "hello").expect("file should write");
        fs::create_dir(dir.path().join("nested.png")).expect("dir should create");

        let discovery = discover(dir.path(), "png");
        assert_eq!(discovery.accepted, vec!["frame.png"]);
        let skipped = discovery
            .skipped
            .iter()
            .map(|file| file.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(skipped, vec!["palette.png", "tile.png"]);
    }

    #[test]
    fn unreadable_directory_is_empty_discovery() {
        let dir = tempdir().expect("tempdir should create");
        let discovery = discover(&dir.path().join("missing"), "png");
        assert!(discovery.is_empty());
    }

    #[test]
    fn format_is_guessed_from_content() {
        let dir = tempdir().expect("tempdir should create");
        RgbImage::new(3, 5)
            .save_with_format(dir.path().join("shot.jpg"), image::ImageFormat::Png)
            .expect("png should write");

        let discovery = discover(dir.path(), "jpg");
        assert_eq!(discovery.accepted, vec!["shot.jpg"]);
    }
}
