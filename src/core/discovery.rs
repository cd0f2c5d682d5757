/*!
 * Path discovery over the experiment / subject / camera source tree
 *
 * Walks `<root>/experiment_NN/[included/]__YYYYMMDD_N/camNN_video_r/...` and
 * returns every video file found, tagged with its experiment, subject and
 * camera. Unreadable branches are reported as warnings alongside the files
 * rather than aborting the walk.
 */

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::layout::{has_extension, rel_path_identity, LayoutRules};
use crate::config::{normalize_extensions, BackupConfig};
use crate::error::Result;

/// A candidate file and the tree position it was found at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub experiment: String,
    pub subject: String,
    pub camera: String,
    pub camera_dir: PathBuf,
    pub path: PathBuf,
}

impl DiscoveredFile {
    /// Path of the file relative to its camera directory
    pub fn below_camera(&self) -> &Path {
        self.path.strip_prefix(&self.camera_dir).unwrap_or(&self.path)
    }

    /// Stable `experiment/subject/camera/sub/path` identity
    pub fn rel_path(&self) -> String {
        rel_path_identity(&self.experiment, &self.subject, &self.camera, self.below_camera())
    }
}

/// A branch of the tree that contributed no files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryWarning {
    /// Experiment directory held no matching subject folders
    NoSubjects { experiment: PathBuf },
    /// Experiment directory could not be listed
    ExperimentUnreadable { experiment: PathBuf, reason: String },
    /// Subject directory could not be listed; the whole subject is skipped
    SubjectUnreadable { subject: PathBuf, reason: String },
    /// An entry below a camera directory could not be read
    CameraEntryUnreadable { path: PathBuf, reason: String },
}

impl fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryWarning::NoSubjects { experiment } => {
                write!(f, "No subjects found in: {}", experiment.display())
            }
            DiscoveryWarning::ExperimentUnreadable { experiment, reason } => {
                write!(f, "Cannot list experiment {}: {}", experiment.display(), reason)
            }
            DiscoveryWarning::SubjectUnreadable { subject, reason } => {
                write!(f, "Permission error in {}: {}", subject.display(), reason)
            }
            DiscoveryWarning::CameraEntryUnreadable { path, reason } => {
                write!(f, "Cannot read {}: {}", path.display(), reason)
            }
        }
    }
}

/// Result of one discovery pass
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub experiments: usize,
    pub files: Vec<DiscoveredFile>,
    pub warnings: Vec<DiscoveryWarning>,
}

/// Discovers backup candidates below a source root
#[derive(Debug, Clone)]
pub struct PathDiscovery {
    rules: LayoutRules,
    extensions: Vec<String>,
    subject_container: String,
}

impl PathDiscovery {
    /// Create a discoverer; extensions are normalized (lowercase, dot-prefixed)
    pub fn new<S: AsRef<str>>(extensions: &[S], subject_container: impl Into<String>) -> Self {
        Self {
            rules: LayoutRules::new(),
            extensions: normalize_extensions(extensions),
            subject_container: subject_container.into(),
        }
    }

    pub fn from_config(config: &BackupConfig) -> Self {
        Self {
            rules: LayoutRules::new(),
            extensions: config.normalized_extensions(),
            subject_container: config.subject_container.clone(),
        }
    }

    /// Walk `root` and collect every eligible file.
    ///
    /// Only a failure to list `root` itself is an error.
    pub fn discover(&self, root: &Path) -> Result<Discovery> {
        let mut discovery = Discovery::default();

        let experiments: Vec<PathBuf> = sorted_children(root)?
            .into_iter()
            .filter(|p| p.is_dir() && self.rules.is_experiment(&file_name(p)))
            .collect();
        discovery.experiments = experiments.len();

        for exp_dir in &experiments {
            let subjects = match self.subjects_of(exp_dir) {
                Ok(subjects) => subjects,
                Err(e) => {
                    discovery.warn(DiscoveryWarning::ExperimentUnreadable {
                        experiment: exp_dir.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if subjects.is_empty() {
                discovery.warn(DiscoveryWarning::NoSubjects {
                    experiment: exp_dir.clone(),
                });
                continue;
            }

            for subj_dir in &subjects {
                self.discover_subject(&file_name(exp_dir), subj_dir, &mut discovery);
            }
        }

        debug!(
            experiments = discovery.experiments,
            files = discovery.files.len(),
            warnings = discovery.warnings.len(),
            "Discovery finished"
        );

        Ok(discovery)
    }

    /// Subject folders under the container dir, or directly under the
    /// experiment when the container is absent.
    fn subjects_of(&self, exp_dir: &Path) -> io::Result<Vec<PathBuf>> {
        let container = exp_dir.join(&self.subject_container);
        let parent = if container.is_dir() {
            container
        } else {
            exp_dir.to_path_buf()
        };

        Ok(sorted_children(&parent)?
            .into_iter()
            .filter(|p| p.is_dir() && self.rules.is_subject(&file_name(p)))
            .collect())
    }

    fn discover_subject(&self, experiment: &str, subj_dir: &Path, discovery: &mut Discovery) {
        let children = match sorted_children(subj_dir) {
            Ok(children) => children,
            Err(e) => {
                discovery.warn(DiscoveryWarning::SubjectUnreadable {
                    subject: subj_dir.to_path_buf(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        let subject = file_name(subj_dir);
        for cam_dir in children {
            let camera = file_name(&cam_dir);
            if !cam_dir.is_dir() || !self.rules.is_camera(&camera) {
                continue;
            }

            for entry in WalkDir::new(&cam_dir).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().unwrap_or(cam_dir.as_path()).to_path_buf();
                        discovery.warn(DiscoveryWarning::CameraEntryUnreadable {
                            path,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };

                let path = entry.path();
                if entry.file_type().is_dir() || !path.is_file() {
                    continue;
                }
                if !has_extension(path, &self.extensions) {
                    continue;
                }

                discovery.files.push(DiscoveredFile {
                    experiment: experiment.to_string(),
                    subject: subject.clone(),
                    camera: camera.clone(),
                    camera_dir: cam_dir.clone(),
                    path: path.to_path_buf(),
                });
            }
        }
    }
}

impl Discovery {
    fn warn(&mut self, warning: DiscoveryWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Directory children sorted by name, so discovery output is reproducible
fn sorted_children(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    children.sort();
    Ok(children)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"video").unwrap();
    }

    fn discoverer() -> PathDiscovery {
        PathDiscovery::new(&[".mp4", ".avi", ".mov", ".mkv", ".m4v"], "included")
    }

    #[test]
    fn test_discovers_nested_video_files() {
        let dir = tempdir().unwrap();
        let cam = dir
            .path()
            .join("experiment_07/included/__20160225_17406/cam01_video_r");
        touch(&cam.join("a.mp4"));
        touch(&cam.join("day2/b.MKV"));
        touch(&cam.join("notes.txt"));

        let found = discoverer().discover(dir.path()).unwrap();

        assert_eq!(found.experiments, 1);
        let rels: Vec<String> = found.files.iter().map(|f| f.rel_path()).collect();
        assert_eq!(
            rels,
            vec![
                "experiment_07/__20160225_17406/cam01_video_r/a.mp4",
                "experiment_07/__20160225_17406/cam01_video_r/day2/b.MKV",
            ]
        );
        assert!(found.warnings.is_empty());
    }

    #[test]
    fn test_falls_back_to_subjects_under_experiment() {
        let dir = tempdir().unwrap();
        touch(
            &dir.path()
                .join("EXPERIMENT_123/__20200101_5/CAM02_VIDEO_R/clip.mov"),
        );

        let found = discoverer().discover(dir.path()).unwrap();

        assert_eq!(found.files.len(), 1);
        assert_eq!(found.files[0].experiment, "EXPERIMENT_123");
        assert_eq!(found.files[0].subject, "__20200101_5");
        assert_eq!(found.files[0].camera, "CAM02_VIDEO_R");
    }

    #[test]
    fn test_container_present_hides_direct_subjects() {
        let dir = tempdir().unwrap();
        let exp = dir.path().join("experiment_01");
        touch(&exp.join("included/__20200101_1/cam01_video_r/in.mp4"));
        touch(&exp.join("__20200101_2/cam01_video_r/out.mp4"));

        let found = discoverer().discover(dir.path()).unwrap();

        assert_eq!(found.files.len(), 1);
        assert_eq!(found.files[0].subject, "__20200101_1");
    }

    #[test]
    fn test_ignores_non_matching_directories() {
        let dir = tempdir().unwrap();
        touch(
            &dir.path()
                .join("experiment_7/included/__20200101_1/cam01_video_r/a.mp4"),
        );
        touch(
            &dir.path()
                .join("experiment_01/included/subject_x/cam01_video_r/a.mp4"),
        );
        touch(
            &dir.path()
                .join("experiment_02/included/__20200101_1/cam01_video/a.mp4"),
        );
        touch(&dir.path().join("experiment_02/included/__20200101_1/a.mp4"));

        let found = discoverer().discover(dir.path()).unwrap();

        assert!(found.files.is_empty());
        assert_eq!(found.experiments, 2);
    }

    #[test]
    fn test_experiment_without_subjects_warns() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("experiment_03/included")).unwrap();

        let found = discoverer().discover(dir.path()).unwrap();

        assert!(found.files.is_empty());
        assert_eq!(
            found.warnings,
            vec![DiscoveryWarning::NoSubjects {
                experiment: dir.path().join("experiment_03"),
            }]
        );
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = tempdir().unwrap();
        assert!(discoverer().discover(&dir.path().join("missing")).is_err());
    }

    #[cfg(unix)]
    fn set_mode(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    /// Permissions are not enforced for root, so the locked dir stays readable
    #[cfg(unix)]
    fn permissions_enforced(locked: &Path) -> bool {
        fs::read_dir(locked).is_err()
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subject_is_skipped_with_warning() {
        let dir = tempdir().unwrap();
        let included = dir.path().join("experiment_07/included");
        touch(&included.join("__20160225_1/cam01_video_r/a.mp4"));
        touch(&included.join("__20160225_2/cam01_video_r/b.mp4"));
        touch(&included.join("__20160225_3/cam01_video_r/c.mp4"));
        let locked = included.join("__20160225_2");
        set_mode(&locked, 0o000);

        if !permissions_enforced(&locked) {
            set_mode(&locked, 0o755);
            return;
        }
        let found = discoverer().discover(dir.path());
        set_mode(&locked, 0o755);
        let found = found.unwrap();

        let subjects: Vec<&str> = found.files.iter().map(|f| f.subject.as_str()).collect();
        assert_eq!(subjects, vec!["__20160225_1", "__20160225_3"]);
        assert_eq!(found.warnings.len(), 1);
        assert!(matches!(
            &found.warnings[0],
            DiscoveryWarning::SubjectUnreadable { subject, .. } if *subject == locked
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_experiment_is_skipped_with_warning() {
        let dir = tempdir().unwrap();
        touch(
            &dir.path()
                .join("experiment_01/included/__20200101_1/cam01_video_r/a.mp4"),
        );
        touch(
            &dir.path()
                .join("experiment_02/included/__20200101_1/cam01_video_r/b.mp4"),
        );
        let locked = dir.path().join("experiment_01");
        set_mode(&locked, 0o000);

        if !permissions_enforced(&locked) {
            set_mode(&locked, 0o755);
            return;
        }
        let found = discoverer().discover(dir.path());
        set_mode(&locked, 0o755);
        let found = found.unwrap();

        assert_eq!(found.experiments, 2);
        assert_eq!(found.files.len(), 1);
        assert_eq!(found.files[0].experiment, "experiment_02");
        assert!(matches!(
            &found.warnings[..],
            [DiscoveryWarning::ExperimentUnreadable { experiment, .. }] if *experiment == locked
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_camera_subdir_keeps_other_files() {
        let dir = tempdir().unwrap();
        let cam = dir
            .path()
            .join("experiment_07/included/__20160225_17406/cam01_video_r");
        touch(&cam.join("a.mp4"));
        touch(&cam.join("day2/b.mp4"));
        let locked = cam.join("day2");
        set_mode(&locked, 0o000);

        if !permissions_enforced(&locked) {
            set_mode(&locked, 0o755);
            return;
        }
        let found = discoverer().discover(dir.path());
        set_mode(&locked, 0o755);
        let found = found.unwrap();

        assert_eq!(found.files.len(), 1);
        assert!(found.files[0].path.ends_with("a.mp4"));
        assert!(matches!(
            &found.warnings[..],
            [DiscoveryWarning::CameraEntryUnreadable { path, .. }] if *path == locked
        ));
    }

    #[test]
    fn test_extensions_without_dot() {
        let dir = tempdir().unwrap();
        let cam = dir
            .path()
            .join("experiment_07/included/__20160225_17406/cam01_video_r");
        touch(&cam.join("a.mp4"));
        touch(&cam.join("b.avi"));

        let found = PathDiscovery::new(&["AVI"], "included")
            .discover(dir.path())
            .unwrap();

        assert_eq!(found.files.len(), 1);
        assert!(found.files[0].path.ends_with("b.avi"));
    }
}
