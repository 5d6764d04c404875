use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::skills::metadata::{parse_skill_header, SkillMeta};

/// File name that marks a skill
pub const SKILL_FILE_NAME: &str = "SKILL.md";

/// Scan directories for skill files.
///
/// Each directory may hold a `SKILL.md` itself or one per sub-directory.
/// Missing directories and unparsable files are skipped. When two skills
/// share a name the first one found wins.
pub fn discover_skills(dirs: &[PathBuf]) -> Vec<SkillMeta> {
    let mut skills: Vec<SkillMeta> = Vec::new();

    for dir in dirs {
        for path in candidate_files(dir) {
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot read skill file");
                    continue;
                }
            };

            match parse_skill_header(&content, &path) {
                Ok(meta) if skills.iter().any(|s| s.name == meta.name) => {
                    warn!(skill = %meta.name, path = %path.display(), "duplicate skill name, skipping");
                }
                Ok(meta) => {
                    debug!(skill = %meta.name, "discovered skill");
                    skills.push(meta);
                }
                Err(e) => warn!(error = %e, "skipping invalid skill"),
            }
        }
    }

    skills
}

fn candidate_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let direct = dir.join(SKILL_FILE_NAME);
    if direct.is_file() {
        files.push(direct);
    }

    let Ok(entries) = fs::read_dir(dir) else {
        return files;
    };

    let mut nested: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().join(SKILL_FILE_NAME))
        .filter(|path| path.is_file())
        .collect();
    nested.sort();
    files.extend(nested);
    files
}
