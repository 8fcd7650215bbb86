use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_embed::Embed;
use serde::Deserialize;

#[derive(Embed)]
#[folder = "assets/syllabus/"]
struct SyllabusAssets;

const CATALOG: &str = "catalog.toml";

#[derive(Clone, Debug, Deserialize)]
pub struct Module {
    pub number: u32,
    pub title: String,
    pub description: String,
    /// Path of the chapter text, relative to the syllabus root.
    #[serde(default)]
    pub content: Option<String>,
}

impl Module {
    pub fn is_available(&self) -> bool {
        self.content.is_some()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Subject {
    pub name: String,
    pub chapters: u32,
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl Subject {
    pub fn is_available(&self) -> bool {
        !self.modules.is_empty()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Syllabus {
    pub subjects: Vec<Subject>,
    /// Chapters offered when setting up a mock test.
    #[serde(default)]
    pub test_chapters: Vec<String>,
    #[serde(skip)]
    user_dir: Option<PathBuf>,
}

impl Syllabus {
    /// Load the catalog from `user_dir` when it has one, else the bundled copy.
    pub fn load(user_dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = user_dir {
            let path = dir.join(CATALOG);
            if path.exists() {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let mut syllabus = Self::parse(&content)
                    .with_context(|| format!("parsing {}", path.display()))?;
                syllabus.user_dir = Some(dir.to_path_buf());
                tracing::info!(dir = %dir.display(), "loaded user syllabus");
                return Ok(syllabus);
            }
        }

        let file = SyllabusAssets::get(CATALOG).context("bundled syllabus catalog is missing")?;
        let content = std::str::from_utf8(file.data.as_ref())?;
        let mut syllabus = Self::parse(content).context("parsing bundled syllabus catalog")?;
        syllabus.user_dir = user_dir.map(Path::to_path_buf);
        Ok(syllabus)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut syllabus: Syllabus = toml::from_str(content)?;
        for subject in &mut syllabus.subjects {
            subject.modules.sort_by_key(|m| m.number);
        }
        Ok(syllabus)
    }

    /// Chapter text for `module`: the user directory wins over bundled files.
    pub fn module_text(&self, module: &Module) -> Option<String> {
        let rel = module.content.as_deref()?;
        if let Some(dir) = &self.user_dir {
            if let Ok(text) = fs::read_to_string(dir.join(rel)) {
                return Some(text);
            }
        }
        let file = SyllabusAssets::get(rel)?;
        std::str::from_utf8(file.data.as_ref())
            .ok()
            .map(str::to_string)
    }
}
