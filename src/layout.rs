//! Calibrated position table: where each certificate field lands on the
//! template, in template-native units with a top-left origin and y growing
//! downward. Coordinates come from visual calibration against a specific
//! template, so the table records the template dimensions it was calibrated
//! for and is rejected against anything else.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use kurbo::Point;

use crate::error::{AttestaError, AttestaResult};
use crate::template::TemplateAsset;

/// Overlay fields in draw order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    StudentName,
    BatchStartDate,
    BatchEndDate,
    BatchNumber,
    StudentId,
    IssueDate,
}

impl FieldId {
    pub const ALL: [FieldId; 6] = [
        FieldId::StudentName,
        FieldId::BatchStartDate,
        FieldId::BatchEndDate,
        FieldId::BatchNumber,
        FieldId::StudentId,
        FieldId::IssueDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldId::StudentName => "student_name",
            FieldId::BatchStartDate => "batch_start_date",
            FieldId::BatchEndDate => "batch_end_date",
            FieldId::BatchNumber => "batch_number",
            FieldId::StudentId => "student_id",
            FieldId::IssueDate => "issue_date",
        }
    }
}

/// How a placement's `pos` relates to the laid-out text box. One anchor
/// policy applies to the whole table; calibrating under one convention and
/// rendering under another is exactly the drift this type exists to stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// `pos` is the top-left corner of the text box.
    TopLeft,
    /// `pos` is the center of the text box.
    Center,
    /// `pos` is the left end of the first baseline.
    BaselineLeft,
}

/// RGBA8 fill color for overlay text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextPlacement {
    pub pos: Point,
    pub size: f32,
    pub color: Rgba8,
    pub anchor: Anchor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TemplateLayout {
    pub template_id: String,
    pub template_width: f64,
    pub template_height: f64,
    pub fields: BTreeMap<FieldId, TextPlacement>,
}

impl TemplateLayout {
    /// Calibrated table for the stock 1056x816 certificate template. Every
    /// placement is center-anchored; the three headline fields carry the
    /// calibrated coordinates, the small print sits along the bottom edge.
    pub fn classic_1056x816() -> Self {
        let headline = Rgba8::opaque(26, 54, 93);
        let date_ink = Rgba8::opaque(45, 55, 72);
        let small_ink = Rgba8::opaque(74, 85, 104);
        let mut fields = BTreeMap::new();
        fields.insert(
            FieldId::StudentName,
            TextPlacement {
                pos: Point::new(550.0, 400.0),
                size: 36.0,
                color: headline,
                anchor: Anchor::Center,
                font_family: None,
            },
        );
        fields.insert(
            FieldId::BatchStartDate,
            TextPlacement {
                pos: Point::new(420.0, 530.0),
                size: 28.0,
                color: date_ink,
                anchor: Anchor::Center,
                font_family: None,
            },
        );
        fields.insert(
            FieldId::BatchEndDate,
            TextPlacement {
                pos: Point::new(680.0, 530.0),
                size: 28.0,
                color: date_ink,
                anchor: Anchor::Center,
                font_family: None,
            },
        );
        fields.insert(
            FieldId::BatchNumber,
            TextPlacement {
                pos: Point::new(150.0, 745.0),
                size: 14.0,
                color: small_ink,
                anchor: Anchor::Center,
                font_family: None,
            },
        );
        fields.insert(
            FieldId::StudentId,
            TextPlacement {
                pos: Point::new(150.0, 775.0),
                size: 14.0,
                color: small_ink,
                anchor: Anchor::Center,
                font_family: None,
            },
        );
        fields.insert(
            FieldId::IssueDate,
            TextPlacement {
                pos: Point::new(900.0, 775.0),
                size: 14.0,
                color: small_ink,
                anchor: Anchor::Center,
                font_family: None,
            },
        );
        Self {
            template_id: "classic".to_string(),
            template_width: 1056.0,
            template_height: 816.0,
            fields,
        }
    }

    pub fn validate(&self) -> AttestaResult<()> {
        if self.template_width <= 0.0 || self.template_height <= 0.0 {
            return Err(AttestaError::validation(
                "layout template dimensions must be > 0",
            ));
        }
        if self.fields.is_empty() {
            return Err(AttestaError::validation("layout has no fields"));
        }

        let mut anchors = self.fields.values().map(|p| p.anchor);
        let first = anchors
            .next()
            .ok_or_else(|| AttestaError::validation("layout has no fields"))?;
        if anchors.any(|a| a != first) {
            return Err(AttestaError::validation(
                "layout mixes anchor conventions; all fields must share one anchor",
            ));
        }

        for (field, placement) in &self.fields {
            let Point { x, y } = placement.pos;
            if !x.is_finite() || !y.is_finite() {
                return Err(AttestaError::validation(format!(
                    "field '{}' has a non-finite position",
                    field.as_str()
                )));
            }
            if x < 0.0 || y < 0.0 || x > self.template_width || y > self.template_height {
                return Err(AttestaError::validation(format!(
                    "field '{}' at ({x}, {y}) lies outside the {}x{} template",
                    field.as_str(),
                    self.template_width,
                    self.template_height
                )));
            }
            if !placement.size.is_finite() || placement.size <= 0.0 {
                return Err(AttestaError::validation(format!(
                    "field '{}' has a non-positive text size",
                    field.as_str()
                )));
            }
        }
        Ok(())
    }

    /// A table calibrated for one template geometry must not drive another.
    pub fn validate_against(&self, template: &TemplateAsset) -> AttestaResult<()> {
        self.validate()?;
        let (width, height) = template.dimensions();
        if (self.template_width - width).abs() > 0.5 || (self.template_height - height).abs() > 0.5
        {
            return Err(AttestaError::validation(format!(
                "layout was calibrated for {}x{} but the template is {width}x{height}; recalibrate",
                self.template_width, self.template_height
            )));
        }
        Ok(())
    }

    /// The anchor shared by every field. Call after [`validate`].
    pub fn anchor(&self) -> Anchor {
        self.fields
            .values()
            .next()
            .map(|p| p.anchor)
            .unwrap_or(Anchor::Center)
    }

    pub fn from_json_str(json: &str) -> AttestaResult<Self> {
        let layout: Self = serde_json::from_str(json).context("parse layout json")?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn to_json_string(&self) -> AttestaResult<String> {
        Ok(serde_json::to_string_pretty(self).context("serialize layout json")?)
    }

    pub fn load(path: &Path) -> AttestaResult<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                AttestaError::asset_missing(format!("layout file {} not found", path.display()))
            } else {
                AttestaError::Other(
                    anyhow::Error::new(err).context(format!("read layout {}", path.display())),
                )
            }
        })?;
        Self::from_json_str(&text)
    }

    pub fn save(&self, path: &Path) -> AttestaResult<()> {
        let json = self.to_json_string()?;
        fs::write(path, json).with_context(|| format!("write layout {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parse_vector;

    #[test]
    fn classic_layout_validates() {
        let layout = TemplateLayout::classic_1056x816();
        layout.validate().unwrap();
        assert_eq!(layout.fields.len(), FieldId::ALL.len());
        assert_eq!(layout.anchor(), Anchor::Center);
    }

    #[test]
    fn json_round_trip_preserves_placements() {
        let layout = TemplateLayout::classic_1056x816();
        let json = layout.to_json_string().unwrap();
        assert!(json.contains("student_name"));
        let parsed = TemplateLayout::from_json_str(&json).unwrap();
        assert_eq!(parsed, layout);
        assert_eq!(
            parsed.fields[&FieldId::StudentName].pos,
            Point::new(550.0, 400.0)
        );
    }

    #[test]
    fn mixed_anchors_are_rejected() {
        let mut layout = TemplateLayout::classic_1056x816();
        if let Some(p) = layout.fields.get_mut(&FieldId::IssueDate) {
            p.anchor = Anchor::TopLeft;
        }
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("anchor"));
    }

    #[test]
    fn out_of_bounds_position_is_rejected() {
        let mut layout = TemplateLayout::classic_1056x816();
        if let Some(p) = layout.fields.get_mut(&FieldId::StudentName) {
            p.pos = Point::new(5000.0, 400.0);
        }
        assert!(layout.validate().is_err());
    }

    #[test]
    fn non_positive_size_is_rejected() {
        let mut layout = TemplateLayout::classic_1056x816();
        if let Some(p) = layout.fields.get_mut(&FieldId::StudentName) {
            p.size = 0.0;
        }
        assert!(layout.validate().is_err());
    }

    #[test]
    fn dimension_pairing_is_enforced() {
        let layout = TemplateLayout::classic_1056x816();
        let small = parse_vector(
            br#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100"/>"#,
        )
        .unwrap();
        assert!(layout.validate_against(&small).is_err());

        let matching = parse_vector(
            br#"<svg xmlns="http://www.w3.org/2000/svg" width="1056" height="816"/>"#,
        )
        .unwrap();
        layout.validate_against(&matching).unwrap();
    }
}
