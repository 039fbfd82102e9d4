//! Renderer selection and the pieces every variant shares. A certificate
//! render is template + calibrated placements + composed field strings; the
//! variants differ only in the surface they produce.

use kurbo::Point;

use crate::error::{AttestaError, AttestaResult};
use crate::fields::CertificateFields;
use crate::fonts::FontLibrary;
use crate::layout::{Anchor, Rgba8, TemplateLayout};
use crate::render_raster::RasterOverlayRenderer;
use crate::render_text::PlainTextRenderer;
use crate::render_vector::VectorOverlayRenderer;
use crate::template::TemplateAsset;

/// Finished certificate bytes plus the artifact extension they belong to.
/// `degraded` marks the plain-text fallback so callers can surface it.
#[derive(Clone, Debug)]
pub struct RenderedCertificate {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
    pub degraded: bool,
}

pub trait CertificateRenderer {
    fn render(
        &self,
        fields: &CertificateFields,
        layout: &TemplateLayout,
    ) -> AttestaResult<RenderedCertificate>;

    fn extension(&self) -> &'static str;
}

/// Picks the variant the environment can actually support: raster overlay
/// for a raster template with at least one usable font, vector overlay for
/// an SVG template, plain text otherwise. The plain-text path is a visible
/// degradation, never a silent blank certificate.
pub fn select_renderer(
    template: Option<&TemplateAsset>,
    fonts: &FontLibrary,
) -> Box<dyn CertificateRenderer> {
    match template {
        Some(TemplateAsset::Raster(raster)) if !fonts.is_empty() => {
            Box::new(RasterOverlayRenderer::new(raster.clone(), fonts.clone()))
        }
        Some(TemplateAsset::Vector(vector)) => {
            Box::new(VectorOverlayRenderer::new(vector.clone(), fonts.clone()))
        }
        Some(TemplateAsset::Raster(_)) => {
            tracing::warn!("no usable fonts; certificates degrade to plain text");
            Box::new(PlainTextRenderer)
        }
        None => Box::new(PlainTextRenderer),
    }
}

/// Where the laid-out text box's top-left corner lands for a placement.
/// `width`/`height` are the measured layout extents and `first_baseline`
/// the offset from the layout top to the first baseline, all in template
/// units.
pub(crate) fn anchor_origin(
    anchor: Anchor,
    pos: Point,
    width: f64,
    height: f64,
    first_baseline: f64,
) -> (f64, f64) {
    match anchor {
        Anchor::TopLeft => (pos.x, pos.y),
        Anchor::Center => (pos.x - width / 2.0, pos.y - height / 2.0),
        Anchor::BaselineLeft => (pos.x, pos.y - first_baseline),
    }
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Rgba8>,
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape and lay out a single run of text using the provided font
    /// bytes. Single-line: certificate fields never wrap.
    pub(crate) fn layout_plain(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        brush: Rgba8,
    ) -> AttestaResult<parley::Layout<Rgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(AttestaError::validation("text size must be finite and > 0"));
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| AttestaError::render("no font families registered from font bytes"))?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| AttestaError::render("registered font family has no name"))?
            .to_string();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<Rgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Offset from the layout top to the first baseline.
pub(crate) fn first_baseline(layout: &parley::Layout<Rgba8>) -> f64 {
    layout
        .lines()
        .next()
        .map(|line| f64::from(line.metrics().baseline))
        .unwrap_or(0.0)
}
