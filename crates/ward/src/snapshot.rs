//! src/snapshot.rs
//!
//! Predicate counting over a persisted snapshot. The query degrades
//! gracefully: a missing or malformed snapshot counts as zero matches
//! rather than an error, with the cause logged for diagnostics.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Counts the records in the snapshot at `path` that satisfy `predicate`.
///
/// Returns 0 when the file does not exist, cannot be read, or does not
/// parse as a JSON array of `T`. The snapshot is never modified.
pub fn count_matching<T, P>(path: &Path, predicate: P) -> usize
where
    T: DeserializeOwned,
    P: Fn(&T) -> bool,
{
    if !path.exists() {
        debug!(path = %path.display(), "snapshot missing, counting zero");
        return 0;
    }

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "snapshot unreadable");
            return 0;
        }
    };

    let records: Vec<T> = match serde_json::from_str(&text) {
        Ok(records) => records,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "snapshot malformed");
            return 0;
        }
    };

    records.iter().filter(|record| predicate(record)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{admit_roster, Patient, DIAGNOSES};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_snapshot_counts_zero() {
        let count = count_matching::<Patient, _>(Path::new("no/such/snapshot.json"), |_| true);
        assert_eq!(count, 0);
    }

    #[test]
    fn malformed_snapshot_counts_zero() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let count = count_matching::<Patient, _>(file.path(), |_| true);
        assert_eq!(count, 0);
    }

    #[test]
    fn per_diagnosis_counts_are_exact() {
        let roster = admit_roster(1000, 99);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&serde_json::to_vec_pretty(&roster).unwrap())
            .unwrap();

        let mut total = 0;
        for diagnosis in DIAGNOSES {
            let expected = roster.iter().filter(|p| p.diagnosis == diagnosis).count();
            let counted =
                count_matching::<Patient, _>(file.path(), |p| p.diagnosis == diagnosis);
            assert_eq!(counted, expected, "count mismatch for {diagnosis}");
            total += counted;
        }
        assert_eq!(total, 1000);
    }

    #[test]
    fn predicate_sees_every_field() {
        let roster = admit_roster(200, 5);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&serde_json::to_vec_pretty(&roster).unwrap())
            .unwrap();

        let expected = roster.iter().filter(|p| p.age >= 65).count();
        let counted = count_matching::<Patient, _>(file.path(), |p| p.age >= 65);
        assert_eq!(counted, expected);
    }
}
