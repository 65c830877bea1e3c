use serde::{Deserialize, Serialize};
use tablecast_core::{polygon_area, polygon_arc_length, Point, RgbColor};

/// Captured fingerprint of one physical object.
///
/// `canonical_contour` lives in the y-up canvas frame with the centroid at the
/// origin and the farthest contour point on the +x axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectTemplate {
    pub name: String,
    pub canonical_contour: Vec<Point>,
    /// Hue in `[0, 1)` under neutral light.
    pub white_hue: f64,
    /// Hue in `[0, 1)` while `assigned_color` is projected on the object.
    pub color_hue: f64,
    pub assigned_color: RgbColor,
    pub check_color_match: bool,
}

impl ObjectTemplate {
    #[inline]
    pub fn area(&self) -> f64 {
        polygon_area(&self.canonical_contour)
    }

    /// Perimeter of the canonical contour; the size component of identity keys.
    #[inline]
    pub fn arc_length(&self) -> f64 {
        polygon_arc_length(&self.canonical_contour)
    }
}

/// Ordered, append-only template collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateLibrary {
    templates: Vec<ObjectTemplate>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and return the template's index.
    pub fn push(&mut self, template: ObjectTemplate) -> usize {
        log::info!(
            "template '{}' added ({} points, area {:.1})",
            template.name,
            template.canonical_contour.len(),
            template.area()
        );
        self.templates.push(template);
        self.templates.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&ObjectTemplate> {
        self.templates.get(index)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObjectTemplate> {
        self.templates.iter()
    }

    pub fn as_slice(&self) -> &[ObjectTemplate] {
        &self.templates
    }

    /// Area of the smallest template, `None` when empty.
    pub fn smallest_area(&self) -> Option<f64> {
        self.templates
            .iter()
            .map(ObjectTemplate::area)
            .min_by(f64::total_cmp)
    }
}

impl From<Vec<ObjectTemplate>> for TemplateLibrary {
    fn from(templates: Vec<ObjectTemplate>) -> Self {
        Self { templates }
    }
}

impl<'a> IntoIterator for &'a TemplateLibrary {
    type Item = &'a ObjectTemplate;
    type IntoIter = std::slice::Iter<'a, ObjectTemplate>;

    fn into_iter(self) -> Self::IntoIter {
        self.templates.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_template(name: &str, half: f64) -> ObjectTemplate {
        ObjectTemplate {
            name: name.to_string(),
            canonical_contour: vec![
                Point::new(-half, -half),
                Point::new(half, -half),
                Point::new(half, half),
                Point::new(-half, half),
            ],
            white_hue: 0.0,
            color_hue: 0.5,
            assigned_color: [0, 255, 255],
            check_color_match: false,
        }
    }

    #[test]
    fn smallest_area_and_order() {
        let mut lib = TemplateLibrary::new();
        assert_eq!(lib.smallest_area(), None);
        assert_eq!(lib.push(square_template("big", 10.0)), 0);
        assert_eq!(lib.push(square_template("small", 2.0)), 1);
        assert_eq!(lib.smallest_area(), Some(16.0));
        let names: Vec<_> = lib.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["big", "small"]);
        assert_eq!(lib.get(1).map(|t| t.arc_length()), Some(16.0));
    }

    #[test]
    fn library_serializes_as_a_plain_list() {
        let lib = TemplateLibrary::from(vec![square_template("a", 1.0)]);
        let json = serde_json::to_value(&lib).expect("json");
        assert!(json.is_array());
        let back: TemplateLibrary = serde_json::from_value(json).expect("parse");
        assert_eq!(back, lib);
    }
}
