//! Vector overlay: emits an SVG document embedding the template markup
//! full-bleed with one `<text>` element per field. Text stays text in the
//! artifact; the anchor policy maps onto SVG text alignment attributes so
//! calibration coordinates mean the same thing they mean in the raster
//! variant. Every produced document is re-parsed before it is accepted.

use std::fmt::Write as _;

use crate::error::{AttestaError, AttestaResult};
use crate::fields::CertificateFields;
use crate::fonts::FontLibrary;
use crate::layout::{Anchor, Rgba8, TemplateLayout};
use crate::render::{CertificateRenderer, RenderedCertificate};
use crate::template::VectorTemplate;

pub struct VectorOverlayRenderer {
    template: VectorTemplate,
    fonts: FontLibrary,
}

impl VectorOverlayRenderer {
    pub fn new(template: VectorTemplate, fonts: FontLibrary) -> Self {
        Self { template, fonts }
    }
}

impl CertificateRenderer for VectorOverlayRenderer {
    fn render(
        &self,
        fields: &CertificateFields,
        layout: &TemplateLayout,
    ) -> AttestaResult<RenderedCertificate> {
        let size = self.template.tree.size();
        let (width, height) = (size.width(), size.height());

        let mut doc = String::new();
        let _ = writeln!(
            doc,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        doc.push_str(embedded_template_markup(&self.template.source_xml)?);
        doc.push('\n');

        for (field, placement) in &layout.fields {
            let text = xml_escape(&fields.text(*field));
            let family = xml_escape(&font_family_attr(placement.font_family.as_deref()));
            let _ = write!(
                doc,
                r#"<text x="{}" y="{}" font-family="{}" font-size="{}" fill="{}"{}{}>{}</text>"#,
                placement.pos.x,
                placement.pos.y,
                family,
                placement.size,
                fill_hex(placement.color),
                fill_opacity_attr(placement.color),
                anchor_attrs(placement.anchor),
                text,
            );
            doc.push('\n');
        }
        doc.push_str("</svg>\n");

        // Reject malformed output here so a broken document can never be
        // persisted or served.
        let opts = usvg::Options {
            fontdb: self.fonts.database(),
            ..usvg::Options::default()
        };
        usvg::Tree::from_data(doc.as_bytes(), &opts).map_err(|err| {
            AttestaError::render(format!("vector overlay produced invalid markup: {err}"))
        })?;

        Ok(RenderedCertificate {
            bytes: doc.into_bytes(),
            extension: "svg",
            degraded: false,
        })
    }

    fn extension(&self) -> &'static str {
        "svg"
    }
}

/// The template document embedded as a nested `<svg>`: everything from its
/// root element onward. XML prologs and doctypes are not valid mid-document.
fn embedded_template_markup(source: &str) -> AttestaResult<&str> {
    let start = source
        .find("<svg")
        .ok_or_else(|| AttestaError::render("svg template markup has no <svg> root"))?;
    Ok(&source[start..])
}

fn anchor_attrs(anchor: Anchor) -> &'static str {
    match anchor {
        Anchor::Center => r#" text-anchor="middle" dominant-baseline="central""#,
        Anchor::TopLeft => r#" text-anchor="start" dominant-baseline="text-before-edge""#,
        Anchor::BaselineLeft => r#" text-anchor="start""#,
    }
}

fn font_family_attr(requested: Option<&str>) -> String {
    match requested {
        Some(name) => format!("{name}, sans-serif"),
        None => "sans-serif".to_string(),
    }
}

fn fill_hex(color: Rgba8) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn fill_opacity_attr(color: Rgba8) -> String {
    if color.a == 255 {
        String::new()
    } else {
        format!(r#" fill-opacity="{:.3}""#, f64::from(color.a) / 255.0)
    }
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
