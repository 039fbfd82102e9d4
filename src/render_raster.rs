//! Raster overlay: the decoded template drawn full-bleed onto a canvas of
//! exactly the template's pixel dimensions, field text filled on top as
//! glyph runs, output encoded as PNG at native resolution.

use std::sync::Arc;

use anyhow::Context;

use crate::error::{AttestaError, AttestaResult};
use crate::fields::CertificateFields;
use crate::fonts::FontLibrary;
use crate::layout::{TemplateLayout, TextPlacement};
use crate::render::{
    CertificateRenderer, RenderedCertificate, TextLayoutEngine, anchor_origin, first_baseline,
};
use crate::template::RasterTemplate;

pub struct RasterOverlayRenderer {
    template: RasterTemplate,
    fonts: FontLibrary,
}

impl RasterOverlayRenderer {
    pub fn new(template: RasterTemplate, fonts: FontLibrary) -> Self {
        Self { template, fonts }
    }
}

impl CertificateRenderer for RasterOverlayRenderer {
    fn render(
        &self,
        fields: &CertificateFields,
        layout: &TemplateLayout,
    ) -> AttestaResult<RenderedCertificate> {
        let (width, height) = (self.template.width, self.template.height);
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| AttestaError::render("template width exceeds raster limit"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| AttestaError::render("template height exceeds raster limit"))?;

        let mut ctx = vello_cpu::RenderContext::new(width_u16, height_u16);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        let template_pixmap =
            premul_bytes_to_pixmap(self.template.rgba8_premul.as_slice(), width, height)?;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(template_pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        });
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));

        let mut engine = TextLayoutEngine::new();
        for (field, placement) in &layout.fields {
            let text = fields.text(*field);
            draw_overlay_text(&mut ctx, &mut engine, &self.fonts, &text, placement)?;
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width_u16, height_u16);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(RenderedCertificate {
            bytes: encode_pixmap_png(&pixmap, width, height)?,
            extension: "png",
            degraded: false,
        })
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}

/// Lays out `text` with the placement's font and fills its glyph runs with
/// the layout origin translated per the placement anchor.
pub(crate) fn draw_overlay_text(
    ctx: &mut vello_cpu::RenderContext,
    engine: &mut TextLayoutEngine,
    fonts: &FontLibrary,
    text: &str,
    placement: &TextPlacement,
) -> AttestaResult<()> {
    let font = fonts
        .resolve(placement.font_family.as_deref())
        .ok_or_else(|| AttestaError::render("no font face available for overlay text"))?;
    let text_layout = engine.layout_plain(text, &font.bytes, placement.size, placement.color)?;
    let (tx, ty) = anchor_origin(
        placement.anchor,
        placement.pos,
        f64::from(text_layout.width()),
        f64::from(text_layout.height()),
        first_baseline(&text_layout),
    );

    let font_data = vello_cpu::peniko::FontData::new(
        vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()),
        font.index,
    );
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((tx, ty)));
    for line in text_layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let brush = run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&font_data)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
    Ok(())
}

pub(crate) fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> AttestaResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| AttestaError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| AttestaError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(AttestaError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

/// PNG-encodes a rendered pixmap, converting premultiplied pixels back to
/// straight alpha first.
pub(crate) fn encode_pixmap_png(
    pixmap: &vello_cpu::Pixmap,
    width: u32,
    height: u32,
) -> AttestaResult<Vec<u8>> {
    let mut rgba = pixmap.data_as_u8_slice().to_vec();
    unpremultiply_rgba8_in_place(&mut rgba);
    let img = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| AttestaError::render("rendered pixel buffer size mismatch"))?;
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode certificate png")?;
    Ok(buf)
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpremultiply_inverts_premultiply() {
        // premultiplied form of (100, 50, 200) at alpha 128
        let mut px = vec![50u8, 25, 100, 128];
        unpremultiply_rgba8_in_place(&mut px);
        assert_eq!(px, vec![100, 50, 199, 128]);

        let mut opaque = vec![10u8, 20, 30, 255];
        unpremultiply_rgba8_in_place(&mut opaque);
        assert_eq!(opaque, vec![10, 20, 30, 255]);

        let mut clear = vec![0u8, 0, 0, 0];
        unpremultiply_rgba8_in_place(&mut clear);
        assert_eq!(clear, vec![0, 0, 0, 0]);
    }

    #[test]
    fn pixmap_round_trips_through_png() {
        let pixmap = vello_cpu::Pixmap::new(2, 3);
        let png = encode_pixmap_png(&pixmap, 2, 3).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 2);
        assert_eq!(decoded.height(), 3);
    }

    #[test]
    fn byte_length_mismatch_is_render_error() {
        let err = premul_bytes_to_pixmap(&[0u8; 7], 2, 2).unwrap_err();
        assert!(matches!(err, AttestaError::Render(_)));
    }
}
