// DataSection - hierarchical data sections
//
// A section is a name, a textual value and an ordered list of child
// sections; children may repeat names (`vertex`, `waypoint`, `portal`).
// Typed readers parse the value text on demand, falling back to the given
// default the way chunk files expect. On disk sections are JSON:
// `{"name": "...", "value": "...", "children": [...]}`.

use std::path::Path;

use glam::{Affine3A, Vec3, Vec3A};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DataSection>,
}

impl DataSection {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: DataSection) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: DataSection) {
        self.children.push(child);
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn section_name(&self) -> &str {
        &self.name
    }

    pub fn as_string(&self) -> &str {
        self.value.trim()
    }

    /// Integer value; float text is truncated, anything else reads as 0.
    pub fn as_int(&self) -> i32 {
        let text = self.as_string();
        text.parse::<i32>()
            .ok()
            .or_else(|| text.parse::<f32>().ok().map(|f| f as i32))
            .unwrap_or(0)
    }

    pub fn as_float(&self) -> f32 {
        self.as_string().parse().unwrap_or(0.0)
    }

    pub fn as_bool(&self) -> bool {
        matches!(
            self.as_string().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        )
    }

    /// Three whitespace separated floats; missing components read as 0.
    pub fn as_vector3(&self) -> Vec3 {
        let mut parts = self
            .as_string()
            .split_whitespace()
            .map(|s| s.parse::<f32>().unwrap_or(0.0));
        Vec3::new(
            parts.next().unwrap_or(0.0),
            parts.next().unwrap_or(0.0),
            parts.next().unwrap_or(0.0),
        )
    }

    /// Open a descendant by a `/` separated path of child names.
    pub fn open_section(&self, path: &str) -> Option<&DataSection> {
        path.split('/')
            .filter(|p| !p.is_empty())
            .try_fold(self, |section, part| {
                section.children.iter().find(|c| c.name == part)
            })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DataSection> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn read_string(&self, path: &str) -> String {
        self.open_section(path)
            .map(|s| s.as_string().to_string())
            .unwrap_or_default()
    }

    pub fn read_float(&self, path: &str, default: f32) -> f32 {
        self.open_section(path)
            .and_then(|s| s.as_string().parse().ok())
            .unwrap_or(default)
    }

    pub fn read_int(&self, path: &str, default: i32) -> i32 {
        self.open_section(path).map_or(default, |s| s.as_int())
    }

    pub fn read_bool(&self, path: &str, default: bool) -> bool {
        self.open_section(path).map_or(default, |s| s.as_bool())
    }

    pub fn read_vector3(&self, path: &str, default: Vec3) -> Vec3 {
        self.open_section(path).map_or(default, |s| s.as_vector3())
    }

    /// Every direct child with the given name, as a vector.
    pub fn read_vector3s(&self, name: &str) -> Vec<Vec3> {
        self.children_named(name).map(|s| s.as_vector3()).collect()
    }

    /// A 4x3 matrix stored as `row0`..`row3` (x, y, z axes then translation).
    /// Identity when the section is missing.
    pub fn read_matrix34(&self, path: &str) -> Affine3A {
        let Some(section) = self.open_section(path) else {
            return Affine3A::IDENTITY;
        };
        let row = |name: &str, default: Vec3| Vec3A::from(section.read_vector3(name, default));
        Affine3A::from_cols(
            row("row0", Vec3::X),
            row("row1", Vec3::Y),
            row("row2", Vec3::Z),
            row("row3", Vec3::ZERO),
        )
    }
}

/// Format a vector the way `as_vector3` reads it back.
pub fn format_vector3(v: Vec3) -> String {
    format!("{} {} {}", v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataSection {
        DataSection::new("waypointSet", "")
            .with_child(DataSection::new("girth", "2.5"))
            .with_child(
                DataSection::new("waypoint", "7")
                    .with_child(DataSection::new("height", "1.5"))
                    .with_child(DataSection::new("vertex", "1 2 3"))
                    .with_child(DataSection::new("vertex", "4 5 -6")),
            )
    }

    #[test]
    fn test_typed_readers() {
        let s = sample();
        assert_eq!(s.read_float("girth", 0.5), 2.5);
        assert_eq!(s.read_float("missing", 0.5), 0.5);
        assert_eq!(s.read_float("waypoint/height", 0.0), 1.5);

        let wp = s.open_section("waypoint").unwrap();
        assert_eq!(wp.as_int(), 7);
        let vs = wp.read_vector3s("vertex");
        assert_eq!(vs, vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, -6.0)]);
    }

    #[test]
    fn test_json_round_trip() {
        let s = sample();
        let text = s.to_json_string().unwrap();
        assert_eq!(DataSection::from_json_str(&text).unwrap(), s);
    }

    #[test]
    fn test_json_defaults() {
        let s = DataSection::from_json_str(r#"{"name": "chunk", "children": [{"name": "outside", "value": "true"}]}"#).unwrap();
        assert_eq!(s.value, "");
        assert!(s.read_bool("outside", false));
        assert!(!s.read_bool("internal", false));
    }

    #[test]
    fn test_matrix() {
        let s = DataSection::new("chunk", "c").with_child(
            DataSection::new("transform", "")
                .with_child(DataSection::new("row3", "100 0 200")),
        );
        let m = s.read_matrix34("transform");
        assert_eq!(m.transform_point3(Vec3::ONE), Vec3::new(101.0, 1.0, 201.0));
        assert_eq!(s.read_matrix34("nothing"), Affine3A::IDENTITY);
    }
}
