//! Issue orchestration: authenticate against the roster, render with the
//! selected variant, persist under the deterministic name. Authentication
//! hands back an explicit grant that the render step consumes, so the
//! roster check can never be skipped or outlived.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::error::{AttestaError, AttestaResult};
use crate::fields::CertificateFields;
use crate::fonts::FontLibrary;
use crate::layout::TemplateLayout;
use crate::record::StudentRecord;
use crate::render::select_renderer;
use crate::roster::{ImportReport, Roster, RosterHandle};
use crate::roster_csv;
use crate::store::{ArtifactHandle, CertificateStore};
use crate::template::TemplateAsset;

/// Proof of a successful roster check. Short-lived; [`IssueService::issue`]
/// rejects grants older than [`IssueService::GRANT_TTL`].
#[derive(Clone, Debug)]
pub struct AuthGrant {
    record: StudentRecord,
    issued_at: Instant,
}

impl AuthGrant {
    pub fn record(&self) -> &StudentRecord {
        &self.record
    }
}

#[derive(Clone, Debug)]
pub struct IssuedCertificate {
    pub handle: ArtifactHandle,
    pub path: PathBuf,
    pub degraded: bool,
}

#[derive(Debug)]
pub struct ServiceStatus {
    pub students_loaded: usize,
    pub template_kind: Option<&'static str>,
    pub template_dimensions: Option<(f64, f64)>,
    pub font_faces: usize,
    pub output_dir: PathBuf,
}

/// Filesystem wiring for [`IssueService::from_paths`].
#[derive(Clone, Debug)]
pub struct IssuerPaths {
    pub roster: PathBuf,
    /// Explicit template path; `None` probes the default candidates.
    pub template: Option<PathBuf>,
    /// Position table; `None` uses the built-in calibrated table.
    pub layout: Option<PathBuf>,
    pub fonts_dir: Option<PathBuf>,
    pub out_dir: PathBuf,
}

#[derive(Debug)]
pub struct IssueService {
    roster: RosterHandle,
    template: Option<TemplateAsset>,
    layout: TemplateLayout,
    fonts: FontLibrary,
    store: CertificateStore,
}

impl IssueService {
    pub const GRANT_TTL: Duration = Duration::from_secs(600);

    /// Validates the layout against the template up front; a calibration
    /// mismatch is a startup failure, not a first-request surprise.
    pub fn new(
        roster: Roster,
        template: Option<TemplateAsset>,
        layout: TemplateLayout,
        fonts: FontLibrary,
        store: CertificateStore,
    ) -> AttestaResult<Self> {
        match &template {
            Some(asset) => layout.validate_against(asset)?,
            None => layout.validate()?,
        }
        Ok(Self {
            roster: RosterHandle::new(roster),
            template,
            layout,
            fonts,
            store,
        })
    }

    /// Full assembly from disk: roster (seeded with the sample data when
    /// absent), template (explicit path or candidate probe), layout and
    /// store. With `allow_degraded` a missing template downgrades the
    /// service to plain-text issuance instead of failing.
    pub fn from_paths(
        paths: &IssuerPaths,
        allow_degraded: bool,
    ) -> AttestaResult<(Self, ImportReport)> {
        let (roster, report) = roster_csv::load_or_seed_roster(&paths.roster)?;

        let opened = match &paths.template {
            Some(path) => TemplateAsset::open(path).map(Some),
            None => {
                TemplateAsset::locate(&crate::template::default_template_candidates())
                    .map(|(_, asset)| Some(asset))
            }
        };
        let template = match opened {
            Ok(template) => template,
            Err(err @ AttestaError::AssetMissing(_)) if allow_degraded => {
                tracing::warn!(error = %err, "template unavailable; issuing degraded certificates");
                None
            }
            Err(err) => return Err(err),
        };

        let layout = match &paths.layout {
            Some(path) => TemplateLayout::load(path)?,
            None => TemplateLayout::classic_1056x816(),
        };
        let font_dirs: Vec<PathBuf> = paths.fonts_dir.iter().cloned().collect();
        let fonts = FontLibrary::open(&font_dirs);
        let store = CertificateStore::open(&paths.out_dir)?;

        let service = Self::new(roster, template, layout, fonts, store)?;
        Ok((service, report))
    }

    pub fn roster_handle(&self) -> &RosterHandle {
        &self.roster
    }

    pub fn roster(&self) -> Arc<Roster> {
        self.roster.load()
    }

    pub fn authenticate(
        &self,
        student_name: &str,
        batch_number: &str,
        student_id: &str,
    ) -> AttestaResult<AuthGrant> {
        let roster = self.roster.load();
        let record = roster
            .authenticate(student_name, batch_number, student_id)?
            .clone();
        Ok(AuthGrant {
            record,
            issued_at: Instant::now(),
        })
    }

    pub fn issue(&self, grant: &AuthGrant) -> AttestaResult<IssuedCertificate> {
        self.issue_on(grant, chrono::Local::now().date_naive())
    }

    #[tracing::instrument(skip(self, grant))]
    pub fn issue_on(&self, grant: &AuthGrant, issued_on: NaiveDate) -> AttestaResult<IssuedCertificate> {
        if grant.issued_at.elapsed() > Self::GRANT_TTL {
            return Err(AttestaError::unauthenticated(
                "authentication grant expired; authenticate again",
            ));
        }

        let fields = CertificateFields::compose(&grant.record, issued_on);
        let renderer = select_renderer(self.template.as_ref(), &self.fonts);
        let rendered = renderer.render(&fields, &self.layout)?;
        if rendered.degraded {
            tracing::warn!(
                student = %grant.record.student_id,
                "issued degraded plain-text certificate"
            );
        }
        let handle = self.store.save(
            &grant.record.student_id,
            &grant.record.student_name,
            &rendered,
        )?;
        Ok(IssuedCertificate {
            path: self.store.path_of(&handle),
            handle,
            degraded: rendered.degraded,
        })
    }

    /// Store-guarded read for download surfaces.
    pub fn fetch(&self, artifact_name: &str) -> AttestaResult<Vec<u8>> {
        self.store.resolve_name(artifact_name)
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            students_loaded: self.roster.load().len(),
            template_kind: self.template.as_ref().map(TemplateAsset::kind),
            template_dimensions: self.template.as_ref().map(TemplateAsset::dimensions),
            font_faces: self.fonts.face_count(),
            output_dir: self.store.dir().to_path_buf(),
        }
    }
}
