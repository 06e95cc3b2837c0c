//! Reference Data Generator
//!
//! Produces the ground-truth dataset. The shape (count, id sequence) is always
//! deterministic; names are only reproducible when the source is seeded.

use fake::Fake;
use fake::faker::name::en::Name;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{HarnessError, Result};
use crate::models::ReferenceDataset;

/// Anything that can hand out one human-readable name per call.
pub trait NameSource {
    fn next_name(&mut self) -> String;
}

impl<F> NameSource for F
where
    F: FnMut() -> String,
{
    fn next_name(&mut self) -> String {
        self()
    }
}

/// Faker-style full names ("First Last") drawn from a ChaCha8 stream.
#[derive(Debug, Clone)]
pub struct FakerNames {
    rng: ChaCha8Rng,
}

impl FakerNames {
    /// Same seed, same names.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Fresh names every run.
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_os_rng(),
        }
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl NameSource for FakerNames {
    fn next_name(&mut self) -> String {
        Name().fake_with_rng(&mut self.rng)
    }
}

/// Generate `count` records with ids `0..count` and one name each.
pub fn generate<S>(count: usize, source: &mut S) -> Result<ReferenceDataset>
where
    S: NameSource + ?Sized,
{
    if count == 0 {
        return Err(HarnessError::InvalidConfiguration(
            "record count must be greater than zero".to_string(),
        ));
    }

    let dataset = ReferenceDataset::from_names((0..count).map(|_| source.next_name()))?;
    tracing::debug!("Generated {} reference records", dataset.len());
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_exact_count_and_ids() {
        for count in [1usize, 2, 17, 100] {
            let mut names = FakerNames::seeded(7);
            let ds = generate(count, &mut names).unwrap();
            assert_eq!(ds.len(), count);
            for (i, r) in ds.iter().enumerate() {
                assert_eq!(r.id, i as i64);
                assert!(!r.name.is_empty());
            }
        }
    }

    #[test]
    fn test_generate_zero_is_invalid() {
        let mut names = FakerNames::seeded(1);
        let err = generate(0, &mut names).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_seeded_source_is_reproducible() {
        let a = generate(50, &mut FakerNames::seeded(42)).unwrap();
        let b = generate(50, &mut FakerNames::seeded(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_closure_name_source() {
        let mut n = 0;
        let mut source = || {
            n += 1;
            format!("Person {}", n)
        };
        let ds = generate(3, &mut source).unwrap();
        let names: Vec<&str> = ds.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Person 1", "Person 2", "Person 3"]);
    }

    #[test]
    fn test_names_need_not_be_unique() {
        let mut source = || "Same Name".to_string();
        let ds = generate(4, &mut source).unwrap();
        assert!(ds.iter().all(|r| r.name == "Same Name"));
    }
}
