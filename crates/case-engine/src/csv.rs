//! CSV export with a fixed column set.

use crate::case::Case;

const HEADERS: [&str; 8] = [
    "Case ID",
    "Client Name",
    "Email",
    "Phone",
    "Service",
    "Status",
    "Created",
    "Last Updated",
];

/// Render all cases as CSV. Free-text columns are quoted with embedded
/// quotes doubled; the rest carry no commas by construction.
pub fn export(cases: &[Case]) -> String {
    let mut out = HEADERS.join(",");
    for case in cases {
        out.push('\n');
        let row = [
            case.id.as_str().to_string(),
            quote(&case.name),
            case.email.as_str().to_string(),
            case.phone.clone(),
            quote(&case.service),
            case.status.clone(),
            case.created_at.format("%Y-%m-%d").to_string(),
            case.updated_at.format("%Y-%m-%d").to_string(),
        ];
        out.push_str(&row.join(","));
    }
    out
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Submission;
    use chrono::{TimeZone, Utc};
    use shared_types::CaseId;

    #[test]
    fn fixed_header_and_quote_doubling() {
        let submission = Submission {
            name: Some(r#"Acme "The Firm" Ltd"#.to_string()),
            email: Some("ops@acme.com".to_string()),
            phone: Some("555-0100".to_string()),
            service: Some("asset trace, offshore".to_string()),
            message: None,
        };
        let case = Case::new(
            CaseId::parse("C-EXPORT01").unwrap(),
            submission.validate().unwrap(),
            Vec::new(),
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        );

        let csv = export(&[case]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Case ID,Client Name,Email,Phone,Service,Status,Created,Last Updated"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("C-EXPORT01,"));
        assert!(row.contains(r#""Acme ""The Firm"" Ltd""#));
        assert!(row.contains(r#""asset trace, offshore""#));
        assert!(row.ends_with("new,2024-06-01,2024-06-01"));
    }

    #[test]
    fn empty_export_is_just_the_header() {
        assert_eq!(export(&[]).lines().count(), 1);
    }
}
