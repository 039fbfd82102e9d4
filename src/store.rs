//! Certificate artifact storage. Filenames are a pure function of roster
//! identity, so re-issuing replaces the previous artifact; resolution
//! validates the requested name before any filesystem access and answers
//! every rejection with the same miss.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::{AttestaError, AttestaResult};
use crate::render::RenderedCertificate;

pub const ARTIFACT_PREFIX: &str = "certificate_";
pub const ARTIFACT_EXTENSIONS: [&str; 3] = ["png", "svg", "txt"];

/// Uniform miss message; invalid names and absent files are
/// indistinguishable to callers.
const STORE_MISS: &str = "no such certificate";

/// A store filename that passed validation: `certificate_` prefix, known
/// extension, no path separators or parent references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    pub fn parse(name: &str) -> AttestaResult<Self> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || !name.starts_with(ARTIFACT_PREFIX)
        {
            return Err(AttestaError::not_found(STORE_MISS));
        }
        let has_known_ext = name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ARTIFACT_EXTENSIONS.contains(&ext));
        if !has_known_ext {
            return Err(AttestaError::not_found(STORE_MISS));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keeps alphanumerics, hyphen and underscore; whitespace runs become a
/// single underscore, everything else is dropped.
pub fn sanitize_student_name(name: &str) -> String {
    let filtered: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect();
    let joined = filtered.split_whitespace().collect::<Vec<_>>().join("_");
    if joined.is_empty() {
        "student".to_string()
    } else {
        joined
    }
}

/// `certificate_<id>_<name>.<ext>`, the one naming scheme shared by the
/// renderer output, the store and the download surface.
pub fn artifact_filename(student_id: &str, student_name: &str, extension: &str) -> String {
    format!(
        "{ARTIFACT_PREFIX}{}_{}.{extension}",
        sanitize_student_name(student_id),
        sanitize_student_name(student_name)
    )
}

#[derive(Debug)]
pub struct CertificateStore {
    dir: PathBuf,
}

impl CertificateStore {
    pub fn open(dir: impl Into<PathBuf>) -> AttestaResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("create certificate dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists a rendered certificate under its deterministic name. The
    /// write goes to a scratch file first and is renamed into place, so a
    /// concurrent reader sees either the previous artifact or the new one.
    pub fn save(
        &self,
        student_id: &str,
        student_name: &str,
        rendered: &RenderedCertificate,
    ) -> AttestaResult<ArtifactHandle> {
        let name = artifact_filename(student_id, student_name, rendered.extension);
        let handle = ArtifactHandle::parse(&name)?;
        let path = self.dir.join(handle.as_str());
        let tmp = self.dir.join(format!("{name}.tmp"));
        fs::write(&tmp, &rendered.bytes).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replace {}", path.display()))?;
        Ok(handle)
    }

    pub fn exists(&self, handle: &ArtifactHandle) -> bool {
        self.dir.join(handle.as_str()).is_file()
    }

    pub fn path_of(&self, handle: &ArtifactHandle) -> PathBuf {
        self.dir.join(handle.as_str())
    }

    pub fn resolve(&self, handle: &ArtifactHandle) -> AttestaResult<Vec<u8>> {
        let path = self.dir.join(handle.as_str());
        fs::read(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                AttestaError::not_found(STORE_MISS)
            } else {
                AttestaError::Other(
                    anyhow::Error::new(err).context(format!("read {}", path.display())),
                )
            }
        })
    }

    /// Validates an externally supplied filename, then resolves it.
    pub fn resolve_name(&self, name: &str) -> AttestaResult<Vec<u8>> {
        let handle = ArtifactHandle::parse(name)?;
        self.resolve(&handle)
    }
}
