//! Archetype resolver.

use super::{aggregate_confidence, aggregate_risk, ArchetypeEntry, Resolvers};
use crate::error::{HubError, Result};
use crate::model::{Assessment, Tag};
use std::collections::HashSet;

/// Derives assessment tags, risk, confidence, assessed state and members
/// for one archetype.
#[derive(Debug)]
pub struct ArchetypeResolver<'r, 'c> {
    resolvers: &'r Resolvers<'c>,
    entry: &'r ArchetypeEntry,
}

impl<'r, 'c> ArchetypeResolver<'r, 'c> {
    pub fn new(resolvers: &'r Resolvers<'c>, id: u64) -> Result<Self> {
        let entry = resolvers
            .membership()?
            .get(id)
            .ok_or_else(|| HubError::not_found("Archetype", id))?;
        Ok(Self { resolvers, entry })
    }

    pub fn entry(&self) -> &'r ArchetypeEntry {
        self.entry
    }

    pub fn required_assessments(&self) -> Result<Vec<&'r Assessment>> {
        let questionnaires = self.resolvers.questionnaires()?;
        Ok(self
            .entry
            .assessments
            .iter()
            .filter(|a| questionnaires.required(a.questionnaire_id))
            .collect())
    }

    /// Tags applied by the answers of the required assessments.
    pub fn assessment_tags(&self) -> Result<Vec<&'r Tag>> {
        let resolver = self.resolvers.tags()?;
        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for assessment in self.required_assessments()? {
            for tag in resolver.assessment(assessment) {
                if seen.insert(tag.id) {
                    tags.push(tag);
                }
            }
        }
        Ok(tags)
    }

    pub fn risk(&self) -> Result<&'static str> {
        Ok(aggregate_risk(&self.required_assessments()?))
    }

    pub fn confidence(&self) -> Result<u32> {
        Ok(aggregate_confidence(&self.required_assessments()?))
    }

    pub fn assessed(&self) -> Result<bool> {
        let questionnaires = self.resolvers.questionnaires()?;
        Ok(questionnaires.assessed(self.required_assessments()?))
    }

    /// Member application ids.
    pub fn applications(&self) -> Result<Vec<u64>> {
        Ok(self.resolvers.members()?.applications(self.entry.id()))
    }
}
