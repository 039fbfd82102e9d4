//! Font discovery for overlay text. System faces plus any operator-provided
//! font directories, queried through one database that also backs SVG text
//! resolution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A concrete face selected for drawing: raw file bytes plus the face index
/// within the file (collections carry several).
#[derive(Clone, Debug)]
pub struct ResolvedFont {
    pub family: String,
    pub bytes: Arc<Vec<u8>>,
    pub index: u32,
}

#[derive(Clone, Debug)]
pub struct FontLibrary {
    db: Arc<usvg::fontdb::Database>,
}

impl FontLibrary {
    pub fn open(extra_dirs: &[PathBuf]) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        for dir in extra_dirs {
            load_fonts_from_dir(&mut db, dir);
        }
        Self { db: Arc::new(db) }
    }

    /// A library with no faces at all. Renders through it degrade exactly
    /// as they do on a host without usable fonts.
    pub fn empty() -> Self {
        Self {
            db: Arc::new(usvg::fontdb::Database::new()),
        }
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.len() == 0
    }

    /// Shared database for SVG text resolution.
    pub fn database(&self) -> Arc<usvg::fontdb::Database> {
        self.db.clone()
    }

    /// Selects a face for the requested family. A missing family never
    /// fails the caller: generic sans-serif, serif and monospace are tried
    /// next, then any face at all. `None` only when the database is empty.
    pub fn resolve(&self, family: Option<&str>) -> Option<ResolvedFont> {
        use usvg::fontdb::Family;

        if let Some(name) = family {
            if let Some(found) = self.query([Family::Name(name)].as_slice()) {
                return Some(found);
            }
            tracing::warn!(family = name, "font family not found; using fallback face");
        }
        self.query([Family::SansSerif, Family::Serif, Family::Monospace].as_slice())
            .or_else(|| self.first_face())
    }

    fn query(&self, families: &[usvg::fontdb::Family<'_>]) -> Option<ResolvedFont> {
        let query = usvg::fontdb::Query {
            families,
            weight: usvg::fontdb::Weight::NORMAL,
            stretch: usvg::fontdb::Stretch::Normal,
            style: usvg::fontdb::Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.extract(id)
    }

    fn first_face(&self) -> Option<ResolvedFont> {
        let id = self.db.faces().next().map(|f| f.id)?;
        self.extract(id)
    }

    fn extract(&self, id: usvg::fontdb::ID) -> Option<ResolvedFont> {
        let family = self
            .db
            .face(id)?
            .families
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        let (bytes, index) = self
            .db
            .with_face_data(id, |data, index| (data.to_vec(), index))?;
        Some(ResolvedFont {
            family,
            bytes: Arc::new(bytes),
            index,
        })
    }
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        let _ = db.load_font_file(&path);
    }
}
