use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use roxmltree::{Document, Node};
use tracing::{info, warn};

use super::generator::{Densities, PathZone};

/// Per-level generator tuning. The defaults match the shipped levels; a defs
/// file only needs to spell out what it changes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GeneratorTuning {
    pub(crate) seed: u32,
    pub(crate) border: f32,
    pub(crate) densities: Densities,
    pub(crate) path_zones: Vec<PathZone>,
}

impl Default for GeneratorTuning {
    fn default() -> Self {
        Self {
            seed: 42,
            border: 32.0,
            densities: Densities::default(),
            path_zones: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LevelDefs {
    by_level: HashMap<String, GeneratorTuning>,
}

impl LevelDefs {
    /// Reads `assets/defs/levels.xml`. A missing file is normal (defaults
    /// apply); a malformed one is reported and also degrades to defaults,
    /// never a crash.
    pub(crate) fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "level_defs_missing_using_defaults");
                return Self::default();
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "level_defs_unreadable_using_defaults");
                return Self::default();
            }
        };
        match parse_defs(&raw) {
            Ok(defs) => defs,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "level_defs_malformed_using_defaults");
                Self::default()
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn with_tuning(mut self, level_id: &str, tuning: GeneratorTuning) -> Self {
        self.by_level.insert(level_id.to_string(), tuning);
        self
    }

    pub(crate) fn tuning_for(&self, level_id: &str) -> GeneratorTuning {
        self.by_level.get(level_id).cloned().unwrap_or_default()
    }
}

fn parse_defs(raw: &str) -> Result<LevelDefs, String> {
    let doc = Document::parse(raw).map_err(|error| format!("malformed XML: {error}"))?;
    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err("root element must be <Defs>".to_string());
    }

    let mut defs = LevelDefs::default();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "Level" {
            return Err(format!(
                "unsupported def type <{}>; expected <Level>",
                child.tag_name().name()
            ));
        }
        let id = child
            .attribute("id")
            .ok_or_else(|| "<Level> is missing the id attribute".to_string())?;
        let tuning = parse_level(child)?;
        defs.by_level.insert(id.to_string(), tuning);
    }
    Ok(defs)
}

fn parse_level(node: Node<'_, '_>) -> Result<GeneratorTuning, String> {
    let mut tuning = GeneratorTuning::default();

    for field in node.children().filter(|child| child.is_element()) {
        match field.tag_name().name() {
            "seed" => {
                let value = required_text(field, "seed")?;
                tuning.seed = value
                    .parse::<u32>()
                    .map_err(|_| format!("seed '{value}' is not a valid u32"))?;
            }
            "border" => {
                let value = required_text(field, "border")?;
                let parsed = value
                    .parse::<f32>()
                    .map_err(|_| format!("border '{value}' is not a valid number"))?;
                if !parsed.is_finite() || parsed < 0.0 {
                    return Err("border must be finite and >= 0".to_string());
                }
                tuning.border = parsed;
            }
            "density" => {
                let kind = field
                    .attribute("kind")
                    .ok_or_else(|| "<density> is missing the kind attribute".to_string())?;
                let value = required_text(field, "density")?;
                let parsed = value
                    .parse::<f64>()
                    .map_err(|_| format!("density '{value}' is not a valid number"))?;
                if !(0.0..=1.0).contains(&parsed) {
                    return Err(format!("density for '{kind}' must be within 0..=1"));
                }
                match kind {
                    "tree" => tuning.densities.tree = parsed,
                    "bush" => tuning.densities.bush = parsed,
                    "stone" => tuning.densities.stone = parsed,
                    other => {
                        return Err(format!(
                            "invalid density kind '{other}'; allowed: tree, bush, stone"
                        ))
                    }
                }
            }
            "pathZone" => {
                tuning.path_zones.push(PathZone {
                    x1: required_int_attribute(field, "x1")?,
                    x2: required_int_attribute(field, "x2")?,
                    y1: required_int_attribute(field, "y1")?,
                    y2: required_int_attribute(field, "y2")?,
                });
            }
            other => return Err(format!("unknown field <{other}> in <Level>")),
        }
    }

    Ok(tuning)
}

fn required_text(node: Node<'_, '_>, name: &str) -> Result<String, String> {
    let text = node.text().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(format!("<{name}> must contain a value"));
    }
    Ok(text.to_string())
}

fn required_int_attribute(node: Node<'_, '_>, name: &str) -> Result<i32, String> {
    let raw = node
        .attribute(name)
        .ok_or_else(|| format!("<pathZone> is missing the {name} attribute"))?;
    raw.parse::<i32>()
        .map_err(|_| format!("pathZone attribute {name}='{raw}' is not a valid integer"))
}
