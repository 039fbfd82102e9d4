use chrono::NaiveDate;

use crate::error::{AttestaError, AttestaResult};

/// One roster row. `student_id` is the roster key; uniqueness is enforced
/// under [`normalize_field`] when a roster snapshot is built.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StudentRecord {
    pub student_name: String,
    pub batch_number: String,
    pub batch_start_date: NaiveDate,
    pub batch_end_date: NaiveDate,
    pub student_id: String,
}

/// Canonical form used for every identity comparison: surrounding
/// whitespace stripped, then lowercased.
pub fn normalize_field(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// Spreadsheet exports are inconsistent about dates; accept the shapes seen
// in the wild, including a datetime spill with a midnight time component.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d", "%m/%d/%Y"];

pub fn parse_batch_date(raw: &str) -> AttestaResult<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AttestaError::validation("batch date must be non-empty"));
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(AttestaError::validation(format!(
        "unrecognized batch date '{trimmed}' (expected YYYY-MM-DD)"
    )))
}

impl StudentRecord {
    pub fn validate(&self) -> AttestaResult<()> {
        if self.student_id.trim().is_empty() {
            return Err(AttestaError::validation("student_id must be non-empty"));
        }
        if self.student_name.trim().is_empty() {
            return Err(AttestaError::validation("student_name must be non-empty"));
        }
        if self.batch_number.trim().is_empty() {
            return Err(AttestaError::validation("batch_number must be non-empty"));
        }
        Ok(())
    }

    pub fn normalized_id(&self) -> String {
        normalize_field(&self.student_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StudentRecord {
        StudentRecord {
            student_name: "Rahul Sharma".to_string(),
            batch_number: "AWS-2024-001".to_string(),
            batch_start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            batch_end_date: NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
            student_id: "SIX001".to_string(),
        }
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_field("  Rahul Sharma  "), "rahul sharma");
        assert_eq!(normalize_field("SIX001"), "six001");
        assert_eq!(normalize_field("\tAWS-2024-001\n"), "aws-2024-001");
    }

    #[test]
    fn date_formats_converge() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        for raw in [
            "2024-01-15",
            " 2024-01-15 ",
            "2024-01-15 00:00:00",
            "2024/01/15",
            "01/15/2024",
        ] {
            assert_eq!(parse_batch_date(raw).unwrap(), expected, "input {raw:?}");
        }
    }

    #[test]
    fn date_rejects_garbage() {
        assert!(parse_batch_date("").is_err());
        assert!(parse_batch_date("someday").is_err());
        assert!(parse_batch_date("2024-13-40").is_err());
    }

    #[test]
    fn validate_rejects_blank_fields() {
        let mut rec = sample();
        rec.student_id = "   ".to_string();
        assert!(rec.validate().is_err());

        let mut rec = sample();
        rec.student_name = String::new();
        assert!(rec.validate().is_err());

        let mut rec = sample();
        rec.batch_number = " ".to_string();
        assert!(rec.validate().is_err());

        assert!(sample().validate().is_ok());
    }

    #[test]
    fn json_roundtrip() {
        let rec = sample();
        let s = serde_json::to_string(&rec).unwrap();
        let de: StudentRecord = serde_json::from_str(&s).unwrap();
        assert_eq!(de, rec);
        assert!(s.contains("2024-01-15"));
    }
}
