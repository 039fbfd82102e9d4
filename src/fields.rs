use chrono::NaiveDate;

use crate::layout::FieldId;
use crate::record::StudentRecord;

/// Long-form date used on every certificate surface, e.g. "January 15, 2024".
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Display strings for one certificate, composed once and consumed
/// identically by every renderer variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateFields {
    /// Upper-cased for display.
    pub student_name: String,
    pub batch_number: String,
    pub student_id: String,
    pub batch_start: String,
    pub batch_end: String,
    pub issued: String,
}

impl CertificateFields {
    pub fn compose(record: &StudentRecord, issued_on: NaiveDate) -> Self {
        Self {
            student_name: record.student_name.trim().to_uppercase(),
            batch_number: record.batch_number.trim().to_string(),
            student_id: record.student_id.trim().to_string(),
            batch_start: format_long_date(record.batch_start_date),
            batch_end: format_long_date(record.batch_end_date),
            issued: format_long_date(issued_on),
        }
    }

    /// The string drawn for `field`. Small-print fields carry their label
    /// inline; headline fields are the bare value.
    pub fn text(&self, field: FieldId) -> String {
        match field {
            FieldId::StudentName => self.student_name.clone(),
            FieldId::BatchStartDate => self.batch_start.clone(),
            FieldId::BatchEndDate => self.batch_end.clone(),
            FieldId::BatchNumber => format!("Batch: {}", self.batch_number),
            FieldId::StudentId => format!("ID: {}", self.student_id),
            FieldId::IssueDate => format!("Issued: {}", self.issued),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StudentRecord {
        StudentRecord {
            student_name: "  Rahul Sharma ".to_string(),
            batch_number: "AWS-2024-001".to_string(),
            batch_start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            batch_end_date: NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
            student_id: "SIX001".to_string(),
        }
    }

    #[test]
    fn long_dates_are_month_name_day_year() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(format_long_date(date), "January 15, 2024");
        let date = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert_eq!(format_long_date(date), "December 01, 2024");
    }

    #[test]
    fn compose_uppercases_and_trims() {
        let issued = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let fields = CertificateFields::compose(&record(), issued);
        assert_eq!(fields.student_name, "RAHUL SHARMA");
        assert_eq!(fields.batch_start, "January 15, 2024");
        assert_eq!(fields.batch_end, "April 15, 2024");
        assert_eq!(fields.issued, "April 20, 2024");
    }

    #[test]
    fn small_print_carries_labels() {
        let issued = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let fields = CertificateFields::compose(&record(), issued);
        assert_eq!(fields.text(FieldId::StudentName), "RAHUL SHARMA");
        assert_eq!(fields.text(FieldId::BatchNumber), "Batch: AWS-2024-001");
        assert_eq!(fields.text(FieldId::StudentId), "ID: SIX001");
        assert_eq!(fields.text(FieldId::IssueDate), "Issued: April 20, 2024");
    }
}
