//! Application resolver.

use super::{aggregate_confidence, aggregate_risk, ArchetypeEntry, Resolvers};
use crate::database::record;
use crate::error::Result;
use crate::model::{Application, Assessment, Tag};
use std::cell::OnceCell;
use std::collections::HashSet;

/// Derives archetypes, inherited tags, risk, confidence and assessed state
/// for one application.
pub struct ApplicationResolver<'r, 'c> {
    resolvers: &'r Resolvers<'c>,
    application: Application,
    tags: HashSet<u64>,
    assessments: Vec<Assessment>,
    archetypes: OnceCell<Vec<&'r ArchetypeEntry>>,
}

impl<'r, 'c> ApplicationResolver<'r, 'c> {
    /// Load the application's stored tags and assessments.
    pub fn load(resolvers: &'r Resolvers<'c>, application: Application) -> Result<Self> {
        let conn = resolvers.conn();
        let tags = Application::tag_ids(conn, application.id)?.into_iter().collect();
        let query = crate::database::Query::select("assessment")
            .filter("application_id = ?", vec![application.id.into()])
            .order_by("id");
        let assessments = record::list(conn, &query)?;
        Ok(Self::with(resolvers, application, tags, assessments))
    }

    pub fn with(
        resolvers: &'r Resolvers<'c>,
        application: Application,
        tags: HashSet<u64>,
        assessments: Vec<Assessment>,
    ) -> Self {
        Self {
            resolvers,
            application,
            tags,
            assessments,
            archetypes: OnceCell::new(),
        }
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn assessments(&self) -> &[Assessment] {
        &self.assessments
    }

    /// Narrowest-matching archetypes, computed once.
    pub fn archetypes(&self) -> Result<&[&'r ArchetypeEntry]> {
        if let Some(archetypes) = self.archetypes.get() {
            return Ok(archetypes);
        }
        let archetypes = self.resolvers.membership()?.classify(&self.tags);
        Ok(self.archetypes.get_or_init(|| archetypes))
    }

    /// Tags contributed by the archetypes, de-duplicated in first-seen order.
    pub fn archetype_tags(&self) -> Result<Vec<&'r Tag>> {
        let resolver = self.resolvers.tags()?;
        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for archetype in self.archetypes()? {
            for id in &archetype.tags {
                if seen.insert(*id) {
                    if let Some(tag) = resolver.get(*id) {
                        tags.push(tag);
                    }
                }
            }
        }
        Ok(tags)
    }

    /// The application's own assessments of required questionnaires.
    pub fn required_assessments(&self) -> Result<Vec<&Assessment>> {
        let questionnaires = self.resolvers.questionnaires()?;
        Ok(self
            .assessments
            .iter()
            .filter(|a| questionnaires.required(a.questionnaire_id))
            .collect())
    }

    /// Assessments the aggregations read: the application's own required
    /// assessments, or else the required assessments of its archetypes.
    pub fn effective_assessments(&self) -> Result<Vec<&Assessment>> {
        let required = self.required_assessments()?;
        if !required.is_empty() {
            return Ok(required);
        }
        let questionnaires = self.resolvers.questionnaires()?;
        Ok(self
            .archetypes()?
            .iter()
            .flat_map(|a| a.assessments.iter())
            .filter(|a| questionnaires.required(a.questionnaire_id))
            .collect())
    }

    /// Tags applied by the answers of the effective assessments.
    pub fn assessment_tags(&self) -> Result<Vec<&'r Tag>> {
        let resolver = self.resolvers.tags()?;
        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for assessment in self.effective_assessments()? {
            for tag in resolver.assessment(assessment) {
                if seen.insert(tag.id) {
                    tags.push(tag);
                }
            }
        }
        Ok(tags)
    }

    pub fn risk(&self) -> Result<&'static str> {
        Ok(aggregate_risk(&self.effective_assessments()?))
    }

    pub fn confidence(&self) -> Result<u32> {
        Ok(aggregate_confidence(&self.effective_assessments()?))
    }

    /// Own required assessments decide when present; otherwise every
    /// archetype (at least one) must be assessed.
    pub fn assessed(&self) -> Result<bool> {
        let questionnaires = self.resolvers.questionnaires()?;
        let required = self.required_assessments()?;
        if !required.is_empty() {
            return Ok(questionnaires.assessed(required));
        }
        let archetypes = self.archetypes()?;
        Ok(!archetypes.is_empty()
            && archetypes
                .iter()
                .all(|a| questionnaires.assessed(&a.assessments)))
    }
}
