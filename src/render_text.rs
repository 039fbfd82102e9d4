//! Plain-text fallback: a readable certificate body produced when no
//! template can be rendered. Deliberately distinct from the templated
//! artifacts (`.txt` extension, explanatory footer) so the degradation is
//! visible to students and operators alike.

use std::fmt::Write as _;

use crate::error::AttestaResult;
use crate::fields::CertificateFields;
use crate::layout::TemplateLayout;
use crate::render::{CertificateRenderer, RenderedCertificate};

pub struct PlainTextRenderer;

impl CertificateRenderer for PlainTextRenderer {
    fn render(
        &self,
        fields: &CertificateFields,
        _layout: &TemplateLayout,
    ) -> AttestaResult<RenderedCertificate> {
        let mut body = String::new();
        let _ = writeln!(body, "CERTIFICATE OF COMPLETION");
        let _ = writeln!(body, "=========================");
        let _ = writeln!(body);
        let _ = writeln!(body, "This certifies that");
        let _ = writeln!(body);
        let _ = writeln!(body, "    {}", fields.student_name);
        let _ = writeln!(body);
        let _ = writeln!(body, "has successfully completed the training program.");
        let _ = writeln!(body);
        let _ = writeln!(body, "Batch: {}", fields.batch_number);
        let _ = writeln!(
            body,
            "Training period: {} to {}",
            fields.batch_start, fields.batch_end
        );
        let _ = writeln!(body, "Student ID: {}", fields.student_id);
        let _ = writeln!(body, "Issued: {}", fields.issued);
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "This is a plain-text certificate issued while the certificate"
        );
        let _ = writeln!(body, "template was unavailable.");

        Ok(RenderedCertificate {
            bytes: body.into_bytes(),
            extension: "txt",
            degraded: true,
        })
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}
