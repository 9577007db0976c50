//! Upload file validation
//!
//! Pure policy check run on file selection and again before submission.
//! Rules apply in order and the first failure wins:
//! 1. Name must end with `.csv` (case-insensitive)
//! 2. Size must not exceed [`MAX_UPLOAD_BYTES`]

use crate::models::{UploadCandidate, ValidationReason};

/// Upload size limit: 15 MiB
pub const MAX_UPLOAD_BYTES: u64 = 15 * 1024 * 1024;

/// Check a candidate against the upload policy
pub fn validate(candidate: &UploadCandidate) -> Result<(), ValidationReason> {
    check(candidate.name(), candidate.byte_size())
}

/// Same rules on bare name and size
pub fn check(name: &str, byte_size: u64) -> Result<(), ValidationReason> {
    if !name.to_lowercase().ends_with(".csv") {
        return Err(ValidationReason::NotCsv);
    }
    if byte_size > MAX_UPLOAD_BYTES {
        return Err(ValidationReason::TooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_csv_within_limit() {
        assert_eq!(check("customers.csv", 1024), Ok(()));
        assert_eq!(check("CUSTOMERS.CSV", 0), Ok(()));
        assert_eq!(check("export.Csv", MAX_UPLOAD_BYTES), Ok(()));
    }

    #[test]
    fn test_rejects_non_csv_regardless_of_size() {
        assert_eq!(check("data.txt", 1024), Err(ValidationReason::NotCsv));
        assert_eq!(check("data.csv.gz", 10), Err(ValidationReason::NotCsv));
        assert_eq!(check("csv", 10), Err(ValidationReason::NotCsv));
        assert_eq!(
            check("huge.xlsx", MAX_UPLOAD_BYTES * 4),
            Err(ValidationReason::NotCsv)
        );
    }

    #[test]
    fn test_rejects_oversize_csv() {
        assert_eq!(
            check("data.csv", MAX_UPLOAD_BYTES + 1),
            Err(ValidationReason::TooLarge)
        );
        assert_eq!(
            check("data.csv", 20 * 1000 * 1000),
            Err(ValidationReason::TooLarge)
        );
    }

    #[test]
    fn test_validate_candidate() {
        let candidate = UploadCandidate::from_bytes("data.txt", vec![0u8; 1024]);
        assert_eq!(validate(&candidate), Err(ValidationReason::NotCsv));

        let candidate = UploadCandidate::from_bytes("data.csv", b"a,b\n1,2\n".to_vec());
        assert_eq!(validate(&candidate), Ok(()));
    }
}
