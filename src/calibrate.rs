//! Calibration sheet: the template rendered with a coordinate grid and the
//! layout's placements marked, so a position table is tuned against the
//! actual artwork instead of by trial issuance.

use std::sync::Arc;

use kurbo::Point;

use crate::error::{AttestaError, AttestaResult};
use crate::fonts::FontLibrary;
use crate::layout::{Anchor, FieldId, Rgba8, TemplateLayout, TextPlacement};
use crate::render::TextLayoutEngine;
use crate::render_raster::{draw_overlay_text, encode_pixmap_png, premul_bytes_to_pixmap};
use crate::template::{TemplateAsset, VectorTemplate};

/// Hairline spacing in template pixels.
pub const GRID_STEP: f64 = 50.0;
/// Axis labels sit on every other hairline.
pub const LABEL_STEP: f64 = 100.0;

const GRID_INK: Rgba8 = Rgba8 {
    r: 220,
    g: 38,
    b: 38,
    a: 90,
};
const MARK_INK: Rgba8 = Rgba8 {
    r: 220,
    g: 38,
    b: 38,
    a: 255,
};
const SAMPLE_INK: Rgba8 = Rgba8 {
    r: 29,
    g: 78,
    b: 216,
    a: 255,
};

/// Renders the sheet as a PNG at the template's native size. Vector
/// templates are rasterized first. Without a usable font the sheet still
/// carries the grid and crosshairs, just no text labels.
pub fn render_calibration_sheet(
    template: &TemplateAsset,
    layout: &TemplateLayout,
    fonts: &FontLibrary,
) -> AttestaResult<Vec<u8>> {
    layout.validate_against(template)?;

    let (width, height, premul) = match template {
        TemplateAsset::Raster(raster) => (
            raster.width,
            raster.height,
            raster.rgba8_premul.as_slice().to_vec(),
        ),
        TemplateAsset::Vector(vector) => rasterize_vector(vector)?,
    };
    let width_u16: u16 = width
        .try_into()
        .map_err(|_| AttestaError::render("template width exceeds raster limit"))?;
    let height_u16: u16 = height
        .try_into()
        .map_err(|_| AttestaError::render("template height exceeds raster limit"))?;

    let mut ctx = vello_cpu::RenderContext::new(width_u16, height_u16);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    let base = premul_bytes_to_pixmap(&premul, width, height)?;
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(base)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    });
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(width),
        f64::from(height),
    ));

    draw_grid(&mut ctx, f64::from(width), f64::from(height));

    let has_fonts = !fonts.is_empty();
    let mut engine = TextLayoutEngine::new();
    if has_fonts {
        draw_axis_labels(&mut ctx, &mut engine, fonts, f64::from(width), f64::from(height))?;
    } else {
        tracing::warn!("no usable fonts; calibration sheet drawn without labels");
    }

    for (field, placement) in &layout.fields {
        if has_fonts {
            let mut sample = placement.clone();
            sample.color = SAMPLE_INK;
            draw_overlay_text(&mut ctx, &mut engine, fonts, sample_text(*field), &sample)?;

            let coords = format!("({:.0}, {:.0})", placement.pos.x, placement.pos.y);
            let coords_at = TextPlacement {
                pos: Point::new(placement.pos.x + 8.0, placement.pos.y + 8.0),
                size: 12.0,
                color: MARK_INK,
                anchor: Anchor::TopLeft,
                font_family: None,
            };
            draw_overlay_text(&mut ctx, &mut engine, fonts, &coords, &coords_at)?;
        }
        draw_crosshair(&mut ctx, placement.pos);
    }

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(width_u16, height_u16);
    ctx.render_to_pixmap(&mut pixmap);
    encode_pixmap_png(&pixmap, width, height)
}

/// Stand-in text per field so the sheet shows realistic extents around
/// each anchor point.
fn sample_text(field: FieldId) -> &'static str {
    match field {
        FieldId::StudentName => "RAHUL SHARMA",
        FieldId::BatchStartDate => "January 15, 2024",
        FieldId::BatchEndDate => "April 15, 2024",
        FieldId::BatchNumber => "Batch: AWS-2024-001",
        FieldId::StudentId => "ID: SIX001",
        FieldId::IssueDate => "Issued: April 20, 2024",
    }
}

fn rasterize_vector(vector: &VectorTemplate) -> AttestaResult<(u32, u32, Vec<u8>)> {
    let size = vector.tree.size();
    let width = (size.width().ceil() as u32).max(1);
    let height = (size.height().ceil() as u32).max(1);
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| AttestaError::render("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
    resvg::render(&vector.tree, xform, &mut pixmap.as_mut());
    Ok((width, height, pixmap.data().to_vec()))
}

fn draw_grid(ctx: &mut vello_cpu::RenderContext, width: f64, height: f64) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        GRID_INK.r, GRID_INK.g, GRID_INK.b, GRID_INK.a,
    ));
    let mut x = GRID_STEP;
    while x < width {
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(x, 0.0, x + 1.0, height));
        x += GRID_STEP;
    }
    let mut y = GRID_STEP;
    while y < height {
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, y, width, y + 1.0));
        y += GRID_STEP;
    }
}

fn draw_axis_labels(
    ctx: &mut vello_cpu::RenderContext,
    engine: &mut TextLayoutEngine,
    fonts: &FontLibrary,
    width: f64,
    height: f64,
) -> AttestaResult<()> {
    let label_at = |pos: Point| TextPlacement {
        pos,
        size: 11.0,
        color: MARK_INK,
        anchor: Anchor::TopLeft,
        font_family: None,
    };
    let mut x = LABEL_STEP;
    while x < width {
        let label = format!("{x:.0}");
        draw_overlay_text(ctx, engine, fonts, &label, &label_at(Point::new(x + 3.0, 3.0)))?;
        x += LABEL_STEP;
    }
    let mut y = LABEL_STEP;
    while y < height {
        let label = format!("{y:.0}");
        draw_overlay_text(ctx, engine, fonts, &label, &label_at(Point::new(3.0, y + 3.0)))?;
        y += LABEL_STEP;
    }
    Ok(())
}

fn draw_crosshair(ctx: &mut vello_cpu::RenderContext, pos: Point) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        MARK_INK.r, MARK_INK.g, MARK_INK.b, MARK_INK.a,
    ));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        pos.x - 6.0,
        pos.y - 0.5,
        pos.x + 6.0,
        pos.y + 0.5,
    ));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        pos.x - 0.5,
        pos.y - 6.0,
        pos.x + 0.5,
        pos.y + 6.0,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{RasterTemplate, parse_vector};
    use std::collections::BTreeMap;

    fn tiny_layout(width: f64, height: f64) -> TemplateLayout {
        let mut fields = BTreeMap::new();
        fields.insert(
            FieldId::StudentName,
            TextPlacement {
                pos: Point::new(width / 2.0, height / 2.0),
                size: 10.0,
                color: Rgba8::opaque(0, 0, 0),
                anchor: Anchor::Center,
                font_family: None,
            },
        );
        TemplateLayout {
            template_id: "test".to_string(),
            template_width: width,
            template_height: height,
            fields,
        }
    }

    fn white_raster(width: u32, height: u32) -> TemplateAsset {
        TemplateAsset::Raster(RasterTemplate {
            width,
            height,
            rgba8_premul: Arc::new(vec![255u8; (width * height * 4) as usize]),
        })
    }

    #[test]
    fn sheet_matches_raster_template_dimensions() {
        let template = white_raster(120, 90);
        let png =
            render_calibration_sheet(&template, &tiny_layout(120.0, 90.0), &FontLibrary::open(&[]))
                .unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 90));
    }

    #[test]
    fn grid_hairlines_darken_the_template() {
        let template = white_raster(120, 90);
        let png =
            render_calibration_sheet(&template, &tiny_layout(120.0, 90.0), &FontLibrary::open(&[]))
                .unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        // x=50 sits on a hairline, x=25 does not; red ink drops green.
        let on_line = decoded.get_pixel(50, 5).0[1];
        let off_line = decoded.get_pixel(25, 5).0[1];
        assert!(on_line < off_line, "on={on_line} off={off_line}");
    }

    #[test]
    fn vector_template_is_rasterized_at_native_size() {
        let template = parse_vector(
            br##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100"><rect width="200" height="100" fill="#ffffff"/></svg>"##,
        )
        .unwrap();
        let png =
            render_calibration_sheet(&template, &tiny_layout(200.0, 100.0), &FontLibrary::open(&[]))
                .unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 100));
    }

    #[test]
    fn mismatched_layout_is_rejected() {
        let template = white_raster(120, 90);
        let err = render_calibration_sheet(
            &template,
            &tiny_layout(1056.0, 816.0),
            &FontLibrary::open(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, AttestaError::Validation(_)));
    }
}
