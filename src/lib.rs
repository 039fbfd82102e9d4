//! Attesta issues completion certificates to enrolled students.
//!
//! The flow is roster-gated: a request authenticates with the student's
//! name, batch number and student id, and only a successful match can
//! render. Rendering overlays the student's details onto a certificate
//! template at calibrated positions and stores the artifact under a
//! deterministic name:
//!
//! - Load a roster ([`Roster`]) and build an [`IssueService`]
//! - [`IssueService::authenticate`] yields an [`AuthGrant`]
//! - [`IssueService::issue`] renders, stores and names the certificate
//! - [`IssueService::fetch`] serves a stored artifact back by name
#![forbid(unsafe_code)]

pub mod calibrate;
pub mod error;
pub mod fields;
pub mod fonts;
pub mod issue;
pub mod layout;
pub mod record;
pub mod render;
pub mod render_raster;
pub mod render_text;
pub mod render_vector;
pub mod roster;
pub mod roster_csv;
pub mod store;
pub mod template;

pub use calibrate::render_calibration_sheet;
pub use error::{AttestaError, AttestaResult};
pub use fields::CertificateFields;
pub use fonts::FontLibrary;
pub use issue::{AuthGrant, IssueService, IssuedCertificate, IssuerPaths, ServiceStatus};
pub use layout::{Anchor, FieldId, TemplateLayout, TextPlacement};
pub use record::StudentRecord;
pub use render::{CertificateRenderer, RenderedCertificate, select_renderer};
pub use roster::{ImportReport, Roster, RosterHandle};
pub use store::{ArtifactHandle, CertificateStore};
pub use template::TemplateAsset;
