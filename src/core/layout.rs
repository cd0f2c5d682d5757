/*!
 * Naming rules for the experiment / subject / camera source layout
 */

use regex::{Regex, RegexBuilder};
use std::path::Path;

/// Compiled name patterns for each level of the source tree
#[derive(Debug, Clone)]
pub struct LayoutRules {
    experiment: Regex,
    subject: Regex,
    camera: Regex,
}

impl LayoutRules {
    pub fn new() -> Self {
        // Patterns are literals; failure to compile is a programming error.
        Self {
            experiment: case_insensitive(r"^experiment_\d{2,3}$"),
            subject: Regex::new(r"^__\d{8}_\d+$").expect("valid subject pattern"),
            camera: case_insensitive(r"^cam\d{2}_video_r$"),
        }
    }

    /// `experiment_07`, `EXPERIMENT_123`
    pub fn is_experiment(&self, name: &str) -> bool {
        self.experiment.is_match(name)
    }

    /// `__20160225_17406`
    pub fn is_subject(&self, name: &str) -> bool {
        self.subject.is_match(name)
    }

    /// `cam01_video_r`, `CAM12_Video_R`
    pub fn is_camera(&self, name: &str) -> bool {
        self.camera.is_match(name)
    }
}

impl Default for LayoutRules {
    fn default() -> Self {
        Self::new()
    }
}

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("valid layout pattern")
}

/// True when the file name ends with one of `exts` (already lowercased, dot-prefixed).
pub fn has_extension(path: &Path, exts: &[String]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_lowercase();
    exts.iter().any(|ext| name.ends_with(ext.as_str()))
}

/// Join identity components with `/`, whatever the platform separator.
///
/// Characters inside a component are kept as-is, so a `\` in a Unix file
/// name stays part of that name.
pub fn rel_path_identity(
    experiment: &str,
    subject: &str,
    camera: &str,
    below_camera: &Path,
) -> String {
    let mut parts = vec![experiment.to_string(), subject.to_string(), camera.to_string()];
    parts.extend(
        below_camera
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}
