//! Grouping of an event's participants into modality × category × gender-group buckets.

use log::warn;
use std::collections::HashSet;

use super::models::{GenderGroup, Participant, bracket_key};
use crate::db::ProfileDirectory;

/// Map a stored gender field onto a gender group.
///
/// Unknown or missing values fall into `Women`.
pub fn normalize_gender(raw: Option<&str>) -> GenderGroup {
    let Some(raw) = raw else {
        return GenderGroup::Women;
    };

    match raw.trim().to_lowercase().as_str() {
        "masculino" | "m" | "hombre" => GenderGroup::Men,
        "femenino" | "f" | "mujer" => GenderGroup::Women,
        _ => GenderGroup::Women,
    }
}

/// Participants sharing one modality, category and gender group
#[derive(Debug, Clone, PartialEq)]
pub struct BracketBucket {
    pub modality: String,
    pub category: String,
    pub gender_group: GenderGroup,
    /// Input order is preserved
    pub participants: Vec<Participant>,
}

impl BracketBucket {
    /// Key of the bracket this bucket becomes
    pub fn key(&self) -> String {
        bracket_key(&self.modality, &self.category, self.gender_group)
    }

    fn matches(&self, modality: &str, category: &str, group: GenderGroup) -> bool {
        self.modality == modality && self.category == category && self.gender_group == group
    }
}

/// Buckets in first-appearance order, which is bracket creation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BracketPartition {
    buckets: Vec<BracketBucket>,
}

impl BracketPartition {
    pub fn buckets(&self) -> &[BracketBucket] {
        &self.buckets
    }

    pub fn into_buckets(self) -> Vec<BracketBucket> {
        self.buckets
    }

    pub fn get(&self, modality: &str, category: &str, group: GenderGroup) -> Option<&BracketBucket> {
        self.buckets
            .iter()
            .find(|b| b.matches(modality, category, group))
    }

    /// Find the bucket behind a bracket key
    pub fn by_key(&self, key: &str) -> Option<&BracketBucket> {
        self.buckets.iter().find(|b| b.key() == key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total participants across all buckets
    pub fn participant_count(&self) -> usize {
        self.buckets.iter().map(|b| b.participants.len()).sum()
    }

    /// First bracket key shared by two different buckets.
    ///
    /// Keys join names with `_`, so `Salsa_Pro` + `Adult` and `Salsa` +
    /// `Pro_Adult` land on the same key.
    pub fn colliding_key(&self) -> Option<String> {
        let mut seen = HashSet::new();
        self.buckets
            .iter()
            .map(BracketBucket::key)
            .find(|key| !seen.insert(key.clone()))
    }

    pub fn push(&mut self, participant: Participant, group: GenderGroup) {
        match self
            .buckets
            .iter_mut()
            .find(|b| b.matches(&participant.modality, &participant.category, group))
        {
            Some(bucket) => bucket.participants.push(participant),
            None => self.buckets.push(BracketBucket {
                modality: participant.modality.clone(),
                category: participant.category.clone(),
                gender_group: group,
                participants: vec![participant],
            }),
        }
    }
}

/// Resolve the gender group of one participant.
///
/// Couples are always `Mixed` and need no lookup; lookup failures are logged
/// and treated like an unknown value.
pub async fn resolve_gender_group(
    participant: &Participant,
    profiles: &dyn ProfileDirectory,
) -> GenderGroup {
    if participant.is_couple() {
        return GenderGroup::Mixed;
    }

    let Some(competitor) = participant.competitors.first() else {
        warn!(
            "Participant {} has no competitor reference, grouping as {}",
            participant.id,
            GenderGroup::Women.as_str()
        );
        return GenderGroup::Women;
    };

    match profiles.gender_of(competitor).await {
        Ok(raw) => normalize_gender(raw.as_deref()),
        Err(e) => {
            warn!(
                "Gender lookup failed for competitor {} of participant {}: {}",
                competitor, participant.id, e
            );
            GenderGroup::Women
        }
    }
}

/// Group participants into buckets.
///
/// Lookups run one at a time in input order.
pub async fn partition_participants(
    participants: Vec<Participant>,
    profiles: &dyn ProfileDirectory,
) -> BracketPartition {
    let mut partition = BracketPartition::default();
    for participant in participants {
        let group = resolve_gender_group(&participant, profiles).await;
        partition.push(participant, group);
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    fn participant(id: &str, competitors: &[&str], modality: &str, category: &str) -> Participant {
        Participant {
            id: id.to_string(),
            competitors: competitors.iter().map(|c| c.to_string()).collect(),
            category: category.to_string(),
            modality: modality.to_string(),
            event_id: "ev1".to_string(),
            phase: None,
            status: "confirmed".to_string(),
        }
    }

    #[test]
    fn test_normalize_gender_table() {
        assert_eq!(normalize_gender(Some("Masculino")), GenderGroup::Men);
        assert_eq!(normalize_gender(Some("M")), GenderGroup::Men);
        assert_eq!(normalize_gender(Some("Hombre")), GenderGroup::Men);
        assert_eq!(normalize_gender(Some(" hombre ")), GenderGroup::Men);
        assert_eq!(normalize_gender(Some("Femenino")), GenderGroup::Women);
        assert_eq!(normalize_gender(Some("F")), GenderGroup::Women);
        assert_eq!(normalize_gender(Some("Mujer")), GenderGroup::Women);
    }

    #[test]
    fn test_normalize_gender_defaults_to_women() {
        assert_eq!(normalize_gender(None), GenderGroup::Women);
        assert_eq!(normalize_gender(Some("")), GenderGroup::Women);
        assert_eq!(normalize_gender(Some("Otro")), GenderGroup::Women);
    }

    #[tokio::test]
    async fn test_couple_is_mixed_regardless_of_genders() {
        let store = InMemoryStore::new()
            .with_gender("u1", "Masculino")
            .with_gender("u2", "Masculino");

        let partition = partition_participants(
            vec![participant("p1", &["u1", "u2"], "Salsa", "Adult")],
            &store,
        )
        .await;

        assert_eq!(partition.len(), 1);
        assert_eq!(partition.buckets()[0].gender_group, GenderGroup::Mixed);
        assert_eq!(partition.buckets()[0].key(), "Salsa_Adult_Mixed");
    }

    #[tokio::test]
    async fn test_unrecognized_gender_groups_into_women() {
        let store = InMemoryStore::new().with_gender("u1", "no-binario");

        let partition =
            partition_participants(vec![participant("p1", &["u1"], "Salsa", "Adult")], &store)
                .await;

        assert!(partition.get("Salsa", "Adult", GenderGroup::Women).is_some());
    }

    #[tokio::test]
    async fn test_lookup_failure_groups_into_women() {
        let store = InMemoryStore::new().with_failing_lookup("u1");

        let partition =
            partition_participants(vec![participant("p1", &["u1"], "Salsa", "Adult")], &store)
                .await;

        assert_eq!(partition.buckets()[0].gender_group, GenderGroup::Women);
    }

    #[tokio::test]
    async fn test_buckets_in_first_appearance_order() {
        let store = InMemoryStore::new()
            .with_gender("u1", "F")
            .with_gender("u2", "M")
            .with_gender("u3", "F");

        let partition = partition_participants(
            vec![
                participant("p1", &["u1"], "Bachata", "Junior"),
                participant("p2", &["u2"], "Salsa", "Adult"),
                participant("p3", &["u3"], "Bachata", "Junior"),
                participant("p4", &["u2", "u3"], "Bachata", "Junior"),
            ],
            &store,
        )
        .await;

        let keys: Vec<_> = partition.buckets().iter().map(|b| b.key()).collect();
        assert_eq!(
            keys,
            vec!["Bachata_Junior_Women", "Salsa_Adult_Men", "Bachata_Junior_Mixed"]
        );

        let women = partition.by_key("Bachata_Junior_Women").unwrap();
        let ids: Vec<_> = women.participants.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
        assert_eq!(partition.participant_count(), 4);
    }

    #[tokio::test]
    async fn test_underscore_names_collide_on_key() {
        let store = InMemoryStore::new()
            .with_gender("u1", "F")
            .with_gender("u2", "F");

        let partition = partition_participants(
            vec![
                participant("p1", &["u1"], "Salsa_Pro", "Adult"),
                participant("p2", &["u2"], "Salsa", "Pro_Adult"),
            ],
            &store,
        )
        .await;

        assert_eq!(partition.len(), 2);
        assert_eq!(
            partition.colliding_key().as_deref(),
            Some("Salsa_Pro_Adult_Women")
        );
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_collide() {
        let store = InMemoryStore::new().with_gender("u1", "M");

        let partition = partition_participants(
            vec![
                participant("p1", &["u1"], "Salsa", "Adult"),
                participant("p2", &["u1", "u2"], "Salsa", "Adult"),
            ],
            &store,
        )
        .await;

        assert_eq!(partition.colliding_key(), None);
    }
}
