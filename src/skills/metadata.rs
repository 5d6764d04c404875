use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gray_matter::engine::YAML;
use gray_matter::{Matter, Pod};
use serde::{Deserialize, Serialize};

use crate::core::{CortexError, Result};

/// Pointer to an externally stored skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMeta {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Location of the full skill file
    pub path: PathBuf,
}

/// Parse the leading `---` header block of a skill file.
///
/// `name` and `description` are required; `tags` may be a list or a
/// comma-separated string. The body is ignored.
pub fn parse_skill_header(content: &str, path: &Path) -> Result<SkillMeta> {
    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(content);

    let data = parsed
        .data
        .ok_or_else(|| CortexError::skill(format!("{}: no header block found", path.display())))?;

    let hash = data
        .as_hashmap()
        .map_err(|_| CortexError::skill(format!("{}: header is not a mapping", path.display())))?;

    let name = get_string(&hash, "name")
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| CortexError::skill(format!("{}: missing 'name'", path.display())))?;
    let description = get_string(&hash, "description")
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| CortexError::skill(format!("{}: missing 'description'", path.display())))?;

    Ok(SkillMeta {
        name: name.trim().to_string(),
        description: description.trim().to_string(),
        tags: get_tags(&hash),
        version: get_string(&hash, "version"),
        path: path.to_path_buf(),
    })
}

/// Scalar values as text; versions like `1.0` arrive as floats.
fn pod_to_string(pod: &Pod) -> Option<String> {
    match pod {
        Pod::String(s) => Some(s.clone()),
        Pod::Integer(i) => Some(i.to_string()),
        Pod::Float(f) => Some(f.to_string()),
        Pod::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn get_string(map: &HashMap<String, Pod>, key: &str) -> Option<String> {
    map.get(key).and_then(pod_to_string)
}

fn get_tags(map: &HashMap<String, Pod>) -> Vec<String> {
    match map.get("tags") {
        Some(Pod::Array(items)) => items.iter().filter_map(pod_to_string).collect(),
        Some(Pod::String(s)) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKILL_MD: &str = r#"---
name: pdf-extract
description: Extract tables and text from PDF files
tags: [pdf, documents]
version: "1.2.0"
---

# PDF extraction

Run `pdftotext -layout` first...
"#;

    #[test]
    fn test_parse_full_header() {
        let meta = parse_skill_header(SKILL_MD, Path::new("/skills/pdf/SKILL.md")).unwrap();
        assert_eq!(meta.name, "pdf-extract");
        assert_eq!(meta.description, "Extract tables and text from PDF files");
        assert_eq!(meta.tags, vec!["pdf", "documents"]);
        assert_eq!(meta.version.as_deref(), Some("1.2.0"));
        assert_eq!(meta.path, PathBuf::from("/skills/pdf/SKILL.md"));
    }

    #[test]
    fn test_comma_separated_tags_and_numeric_version() {
        let content = "---\nname: git\ndescription: Git helpers\ntags: vcs, cli\nversion: 2\n---\nbody";
        let meta = parse_skill_header(content, Path::new("SKILL.md")).unwrap();
        assert_eq!(meta.tags, vec!["vcs", "cli"]);
        assert_eq!(meta.version.as_deref(), Some("2"));
    }

    #[test]
    fn test_missing_description_is_error() {
        let content = "---\nname: lonely\n---\nbody";
        assert!(parse_skill_header(content, Path::new("SKILL.md")).is_err());
    }

    #[test]
    fn test_no_header_is_error() {
        assert!(parse_skill_header("# Just markdown", Path::new("SKILL.md")).is_err());
    }
}
