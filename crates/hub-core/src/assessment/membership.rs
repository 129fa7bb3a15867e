//! Archetype membership.
//!
//! An application belongs to an archetype when the archetype's criteria tags
//! are a subset of the application's tags. Only the narrowest matches are
//! kept: an archetype whose criteria are a strict subset of another match's
//! criteria is dropped.

use crate::association;
use crate::database::record;
use crate::error::Result;
use crate::model::{Archetype, Assessment};
use crate::schema;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Archetype with the relations the resolvers read.
#[derive(Debug, Clone, Default)]
pub struct ArchetypeEntry {
    pub archetype: Archetype,
    pub criteria: BTreeSet<u64>,
    /// Tags the archetype contributes to its members.
    pub tags: Vec<u64>,
    pub assessments: Vec<Assessment>,
}

impl ArchetypeEntry {
    pub fn id(&self) -> u64 {
        self.archetype.id
    }
}

/// Narrowest-matching archetypes for an application tag set.
///
/// Returns indexes into `archetypes` in load order. Archetypes with equal
/// criteria are both kept.
pub fn classify(archetypes: &[ArchetypeEntry], tags: &HashSet<u64>) -> Vec<usize> {
    let mut candidates: Vec<usize> = Vec::new();
    for (index, entry) in archetypes.iter().enumerate() {
        let criteria = &entry.criteria;
        if !criteria.iter().all(|t| tags.contains(t)) {
            continue;
        }
        let mut dominated = false;
        let mut kept = Vec::with_capacity(candidates.len() + 1);
        for existing in candidates {
            let other = &archetypes[existing].criteria;
            if strict_subset(criteria, other) {
                dominated = true;
                kept.push(existing);
                continue;
            }
            if strict_subset(other, criteria) {
                continue;
            }
            kept.push(existing);
        }
        candidates = kept;
        if !dominated {
            candidates.push(index);
        }
    }
    candidates
}

fn strict_subset(a: &BTreeSet<u64>, b: &BTreeSet<u64>) -> bool {
    a.len() < b.len() && a.is_subset(b)
}

/// Preloaded archetypes.
#[derive(Debug, Default)]
pub struct MembershipResolver {
    archetypes: Vec<ArchetypeEntry>,
}

impl MembershipResolver {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut archetypes = Vec::new();
        let mut assessments: HashMap<u64, Vec<Assessment>> = HashMap::new();
        let query = crate::database::Query::select("assessment")
            .filter("archetype_id IS NOT NULL", vec![])
            .order_by("id");
        for assessment in record::list::<Assessment>(conn, &query)? {
            if let Some(id) = assessment.archetype_id {
                assessments.entry(id).or_default().push(assessment);
            }
        }
        for archetype in record::list_all::<Archetype>(conn)? {
            let id = archetype.id;
            archetypes.push(ArchetypeEntry {
                criteria: association::related_ids(conn, &schema::ARCHETYPE, "criteriaTags", id)?
                    .into_iter()
                    .collect(),
                tags: association::related_ids(conn, &schema::ARCHETYPE, "tags", id)?,
                assessments: assessments.remove(&id).unwrap_or_default(),
                archetype,
            });
        }
        debug!("Membership loaded: {} archetypes", archetypes.len());
        Ok(Self { archetypes })
    }

    pub fn with(archetypes: Vec<ArchetypeEntry>) -> Self {
        Self { archetypes }
    }

    pub fn archetypes(&self) -> &[ArchetypeEntry] {
        &self.archetypes
    }

    pub fn get(&self, id: u64) -> Option<&ArchetypeEntry> {
        self.archetypes.iter().find(|a| a.id() == id)
    }

    /// Narrowest-matching archetypes of an application with `tags`.
    pub fn classify(&self, tags: &HashSet<u64>) -> Vec<&ArchetypeEntry> {
        classify(&self.archetypes, tags)
            .into_iter()
            .map(|i| &self.archetypes[i])
            .collect()
    }
}

/// Archetype -> member application ids.
#[derive(Debug, Default)]
pub struct MemberIndex {
    members: BTreeMap<u64, Vec<u64>>,
}

impl MemberIndex {
    /// Classify every tagged application, reading `application_tags` once.
    pub fn load(conn: &Connection, membership: &MembershipResolver) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT application_id, tag_id FROM application_tags ORDER BY application_id",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
        let mut tags: BTreeMap<u64, HashSet<u64>> = BTreeMap::new();
        for row in rows {
            let (app, tag) = row?;
            tags.entry(app.max(0) as u64).or_default().insert(tag.max(0) as u64);
        }

        // Untagged applications still match archetypes without criteria.
        let untagged: Vec<u64> = if membership.archetypes().iter().any(|a| a.criteria.is_empty()) {
            let mut stmt = conn.prepare("SELECT id FROM application ORDER BY id")?;
            let ids = stmt.query_map([], |row| row.get::<_, i64>(0))?;
            ids.collect::<rusqlite::Result<Vec<i64>>>()?
                .into_iter()
                .map(|id| id.max(0) as u64)
                .filter(|id| !tags.contains_key(id))
                .collect()
        } else {
            Vec::new()
        };

        let mut index = Self::default();
        for (app, set) in &tags {
            index.fold(*app, &membership.classify(set));
        }
        let empty = HashSet::new();
        for app in untagged {
            index.fold(app, &membership.classify(&empty));
        }
        Ok(index)
    }

    /// Record `application` as a member of each archetype in `archetypes`.
    pub fn fold(&mut self, application: u64, archetypes: &[&ArchetypeEntry]) {
        for archetype in archetypes {
            let members = self.members.entry(archetype.id()).or_default();
            if !members.contains(&application) {
                members.push(application);
            }
        }
    }

    /// Member application ids of `archetype`, ascending.
    pub fn applications(&self, archetype: u64) -> Vec<u64> {
        let mut ids = self.members.get(&archetype).cloned().unwrap_or_default();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, criteria: &[u64]) -> ArchetypeEntry {
        ArchetypeEntry {
            archetype: Archetype {
                id,
                name: format!("A{}", id),
                ..Default::default()
            },
            criteria: criteria.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn set(ids: &[u64]) -> HashSet<u64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_narrowest_match() {
        let archetypes = vec![entry(1, &[1, 2]), entry(2, &[1, 2, 3]), entry(3, &[4])];
        let matched = classify(&archetypes, &set(&[1, 2, 3, 4]));
        let ids: Vec<u64> = matched.iter().map(|i| archetypes[*i].id()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_order_insensitive() {
        let archetypes = vec![entry(2, &[1, 2, 3]), entry(3, &[4]), entry(1, &[1, 2])];
        let matched = classify(&archetypes, &set(&[1, 2, 3, 4]));
        let mut ids: Vec<u64> = matched.iter().map(|i| archetypes[*i].id()).collect();
        ids.sort();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_equal_criteria_both_kept() {
        let archetypes = vec![entry(1, &[1]), entry(2, &[1])];
        assert_eq!(classify(&archetypes, &set(&[1, 5])), vec![0, 1]);
    }

    #[test]
    fn test_no_match() {
        let archetypes = vec![entry(1, &[1, 2])];
        assert!(classify(&archetypes, &set(&[1])).is_empty());
    }

    #[test]
    fn test_antichain() {
        let archetypes = vec![
            entry(1, &[1]),
            entry(2, &[1, 2]),
            entry(3, &[2]),
            entry(4, &[1, 2, 3]),
            entry(5, &[3]),
            entry(6, &[5]),
        ];
        let matched = classify(&archetypes, &set(&[1, 2, 3]));
        for a in &matched {
            for b in &matched {
                assert!(!strict_subset(&archetypes[*a].criteria, &archetypes[*b].criteria));
            }
        }
        assert_eq!(matched, vec![3]);
    }

    #[test]
    fn test_member_index_fold() {
        let resolver = MembershipResolver::with(vec![entry(1, &[1]), entry(2, &[2])]);
        let mut index = MemberIndex::default();
        index.fold(10, &resolver.classify(&set(&[1])));
        index.fold(11, &resolver.classify(&set(&[1, 2])));
        index.fold(10, &resolver.classify(&set(&[1])));
        assert_eq!(index.applications(1), vec![10, 11]);
        assert_eq!(index.applications(2), vec![11]);
        assert!(index.applications(3).is_empty());
    }
}
