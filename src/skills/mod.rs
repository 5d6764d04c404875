//! Skills - progressive disclosure of detailed instructions
//!
//! Only the header of each `SKILL.md` (name, description, tags, version)
//! is loaded and advertised in the system prompt. The body stays on disk
//! until the model reads the file by path.

pub mod discovery;
pub mod metadata;

pub use discovery::{discover_skills, SKILL_FILE_NAME};
pub use metadata::{parse_skill_header, SkillMeta};
