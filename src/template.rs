//! Certificate template ingestion. Templates are decoded once at startup
//! and shared read-only by every render; requests never touch template
//! files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::error::{AttestaError, AttestaResult};

/// Upper bound on either template dimension. Matches the raster pipeline's
/// u16 coordinate space with headroom for SVG user units.
pub const MAX_TEMPLATE_DIM: u32 = 16_384;

#[derive(Clone, Debug)]
pub struct RasterTemplate {
    pub width: u32,
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct VectorTemplate {
    pub tree: Arc<usvg::Tree>,
    /// Original markup, re-embedded verbatim by the vector overlay.
    pub source_xml: Arc<String>,
}

/// Decoded template. Raster templates keep native pixel dimensions; vector
/// templates keep the SVG's user-unit size.
#[derive(Clone, Debug)]
pub enum TemplateAsset {
    Raster(RasterTemplate),
    Vector(VectorTemplate),
}

impl TemplateAsset {
    pub fn open(path: &Path) -> AttestaResult<Self> {
        let bytes = fs::read(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                AttestaError::asset_missing(format!("template {} not found", path.display()))
            } else {
                AttestaError::Other(
                    anyhow::Error::new(err).context(format!("read template {}", path.display())),
                )
            }
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" => decode_raster(&bytes),
            "svg" => parse_vector(&bytes),
            other => Err(AttestaError::validation(format!(
                "unsupported template extension '{other}' (expected png, jpg or svg)"
            ))),
        }
    }

    /// Probes `candidates` in order and opens the first that exists.
    /// Deployment layouts differ in where the template lands; the caller
    /// passes its preference list.
    pub fn locate(candidates: &[PathBuf]) -> AttestaResult<(PathBuf, Self)> {
        for candidate in candidates {
            if candidate.exists() {
                let asset = Self::open(candidate)?;
                return Ok((candidate.clone(), asset));
            }
        }
        Err(AttestaError::asset_missing(format!(
            "no template found among {} candidate path(s)",
            candidates.len()
        )))
    }

    /// Native size: pixels for raster, user units for vector.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            Self::Raster(raster) => (f64::from(raster.width), f64::from(raster.height)),
            Self::Vector(vector) => {
                let size = vector.tree.size();
                (f64::from(size.width()), f64::from(size.height()))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Raster(_) => "raster",
            Self::Vector(_) => "vector",
        }
    }
}

/// Conventional locations probed when no explicit template path is given.
pub fn default_template_candidates() -> Vec<PathBuf> {
    [
        "certificate_template.png",
        "certificate_template.svg",
        "assets/certificate_template.png",
        "assets/certificate_template.svg",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

pub fn decode_raster(bytes: &[u8]) -> AttestaResult<TemplateAsset> {
    let dyn_img = image::load_from_memory(bytes).context("decode template image")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(AttestaError::validation("template image has zero dimension"));
    }
    if width > MAX_TEMPLATE_DIM || height > MAX_TEMPLATE_DIM {
        return Err(AttestaError::validation(format!(
            "template {width}x{height} exceeds the {MAX_TEMPLATE_DIM} pixel limit"
        )));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(TemplateAsset::Raster(RasterTemplate {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    }))
}

pub fn parse_vector(bytes: &[u8]) -> AttestaResult<TemplateAsset> {
    let source_xml = String::from_utf8(bytes.to_vec())
        .map_err(|_| AttestaError::validation("svg template must be utf-8 text"))?;
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg template")?;
    let size = tree.size();
    if size.width() > MAX_TEMPLATE_DIM as f32 || size.height() > MAX_TEMPLATE_DIM as f32 {
        return Err(AttestaError::validation(format!(
            "svg template {}x{} exceeds the {MAX_TEMPLATE_DIM} unit limit",
            size.width(),
            size.height()
        )));
    }
    Ok(TemplateAsset::Vector(VectorTemplate {
        tree: Arc::new(tree),
        source_xml: Arc::new(source_xml),
    }))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
