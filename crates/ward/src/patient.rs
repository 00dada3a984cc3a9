//! src/patient.rs
//!
//! Flat patient records and a deterministic roster generator. The roster is
//! the payload the handoff buffer carries and the snapshot queries count.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// The fixed diagnosis set rosters draw from.
pub const DIAGNOSES: [&str; 6] = [
    "Flu",
    "Pneumonia",
    "Hypertension",
    "Diabetes",
    "Asthma",
    "Migraine",
];

const SECONDS_PER_DAY: u64 = 86_400;

/// One admitted patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: u32,
    pub name: String,
    pub age: u32,
    pub diagnosis: String,
    /// Admission time as seconds since the Unix epoch.
    pub admitted_at: u64,
}

/// Generates `count` patients from `seed`. The same seed always yields the
/// same ids, names, ages, and diagnoses; only `admitted_at` depends on the
/// current clock (now minus a seeded 0..365 day offset).
pub fn admit_roster(count: usize, seed: u64) -> Vec<Patient> {
    let mut rng = StdRng::seed_from_u64(seed);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    (0..count)
        .map(|i| {
            let days_ago: u64 = rng.random_range(0..365);
            Patient {
                id: i as u32 + 1,
                name: format!("Patient {}", i + 1),
                age: rng.random_range(18..90),
                diagnosis: DIAGNOSES[rng.random_range(0..DIAGNOSES.len())].to_owned(),
                admitted_at: now.saturating_sub(days_ago * SECONDS_PER_DAY),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_is_deterministic_for_a_seed() {
        let a = admit_roster(100, 7);
        let b = admit_roster(100, 7);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.name, y.name);
            assert_eq!(x.age, y.age);
            assert_eq!(x.diagnosis, y.diagnosis);
        }
    }

    #[test]
    fn roster_fields_stay_in_range() {
        for patient in admit_roster(500, 42) {
            assert!((18..90).contains(&patient.age));
            assert!(DIAGNOSES.contains(&patient.diagnosis.as_str()));
            assert!(patient.id >= 1);
        }
    }
}
