//! Assessment and archetype resolution.
//!
//! Per-assessment status, risk and confidence, the aggregations used for
//! applications and archetypes, and question preparation from tags. The
//! resolvers in the submodules read one immutable [`Resolvers`] snapshot per
//! request.

mod application;
mod archetype;
mod membership;
mod questionnaire;
mod tag;

pub use application::ApplicationResolver;
pub use archetype::ArchetypeResolver;
pub use membership::{classify, ArchetypeEntry, MemberIndex, MembershipResolver};
pub use questionnaire::QuestionnaireResolver;
pub use tag::TagResolver;

use crate::error::Result;
use crate::model::{
    Assessment, CategorizedTag, Section, Thresholds, RISK_GREEN, RISK_RED, RISK_UNKNOWN, RISK_YELLOW,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::HashSet;

/// Aggregate risk of a subject without assessments.
pub const RISK_UNASSESSED: &str = "unassessed";

// Confidence adjusters, multipliers and weights.
const ADJUSTER_RED: f64 = 0.5;
const ADJUSTER_YELLOW: f64 = 0.98;
const MULTIPLIER_RED: f64 = 0.6;
const MULTIPLIER_YELLOW: f64 = 0.95;
const WEIGHT_RED: f64 = 1.0;
const WEIGHT_YELLOW: f64 = 80.0;
const WEIGHT_GREEN: f64 = 100.0;
const WEIGHT_UNKNOWN: f64 = 70.0;

/// Progress of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Empty,
    Started,
    Complete,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Empty => "empty",
            Status::Started => "started",
            Status::Complete => "complete",
        }
    }
}

/// Per-risk question counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RiskCounts {
    red: u32,
    yellow: u32,
    green: u32,
    unknown: u32,
}

impl RiskCounts {
    fn of(sections: &[Section]) -> Self {
        let mut counts = Self::default();
        for question in sections.iter().flat_map(|s| s.questions.iter()) {
            match question.risk() {
                RISK_RED => counts.red += 1,
                RISK_YELLOW => counts.yellow += 1,
                RISK_GREEN => counts.green += 1,
                _ => counts.unknown += 1,
            }
        }
        counts
    }

    fn total(&self) -> u32 {
        self.red + self.yellow + self.green + self.unknown
    }
}

/// Every question of every section has a selected answer.
pub fn complete(sections: &[Section]) -> bool {
    sections
        .iter()
        .all(|s| s.questions.iter().all(|q| q.answered()))
}

/// Some question has an answer selected by a person (not auto-answered).
pub fn started(sections: &[Section]) -> bool {
    sections
        .iter()
        .flat_map(|s| s.questions.iter())
        .any(|q| q.selected().is_some_and(|a| !a.auto_answered))
}

pub fn status(sections: &[Section]) -> Status {
    if complete(sections) {
        Status::Complete
    } else if started(sections) {
        Status::Started
    } else {
        Status::Empty
    }
}

/// Risk of one assessment against its thresholds.
pub fn risk(sections: &[Section], thresholds: &Thresholds) -> &'static str {
    let counts = RiskCounts::of(sections);
    let total = counts.total();
    if total == 0 {
        return RISK_UNKNOWN;
    }
    let total = f64::from(total);
    let reached = |count: u32, threshold: u32| f64::from(count) / total >= f64::from(threshold) / 100.0;
    if reached(counts.red, thresholds.red) {
        RISK_RED
    } else if reached(counts.yellow, thresholds.yellow) {
        RISK_YELLOW
    } else if reached(counts.unknown, thresholds.unknown) {
        RISK_UNKNOWN
    } else {
        RISK_GREEN
    }
}

/// Confidence score (0..=100) of one assessment.
pub fn confidence(sections: &[Section]) -> u32 {
    let counts = RiskCounts::of(sections);
    let total = counts.total();
    if total == 0 {
        return 0;
    }
    let mut adjuster = 1.0;
    if counts.red > 0 {
        adjuster *= ADJUSTER_RED.powi(counts.red as i32);
    }
    if counts.yellow > 0 {
        adjuster *= ADJUSTER_YELLOW.powi(counts.yellow as i32);
    }
    let mut score = 0.0;
    for _ in 0..counts.red {
        score = score * MULTIPLIER_RED + WEIGHT_RED * adjuster;
    }
    for _ in 0..counts.yellow {
        score = score * MULTIPLIER_YELLOW + WEIGHT_YELLOW * adjuster;
    }
    score += f64::from(counts.green) * WEIGHT_GREEN * adjuster;
    score += f64::from(counts.unknown) * WEIGHT_UNKNOWN * adjuster;
    let max = WEIGHT_GREEN * f64::from(total);
    (score / max * 100.0).floor() as u32
}

impl Assessment {
    pub fn status(&self) -> Status {
        status(&self.sections)
    }

    pub fn complete(&self) -> bool {
        complete(&self.sections)
    }

    pub fn risk(&self) -> &'static str {
        risk(&self.sections, &self.thresholds)
    }

    pub fn confidence(&self) -> u32 {
        confidence(&self.sections)
    }

    /// Symbolic tags applied by the selected answers.
    pub fn applied_tags(&self) -> impl Iterator<Item = &CategorizedTag> {
        self.sections
            .iter()
            .flat_map(|s| s.questions.iter())
            .flat_map(|q| q.tags().iter())
    }

    /// Auto-answer and filter questions for a subject carrying `tags`.
    pub fn prepare(&mut self, resolver: &TagResolver, tags: &HashSet<u64>) {
        prepare(&mut self.sections, resolver, tags);
    }
}

/// Auto-answer, include and exclude questions for the tag ids in `tags`.
///
/// The first answer whose `autoAnswerFor` intersects `tags` is selected and
/// marked auto-answered. A question with `includeFor` is kept only when it
/// intersects `tags`; otherwise a question whose `excludeFor` intersects
/// `tags` is dropped. Kept questions retain their order.
pub fn prepare(sections: &mut [Section], resolver: &TagResolver, tags: &HashSet<u64>) {
    let intersects = |refs: &[CategorizedTag]| {
        refs.iter()
            .filter_map(|r| resolver.resolve(&r.category, &r.tag))
            .any(|t| tags.contains(&t.id))
    };
    for section in sections.iter_mut() {
        let questions = std::mem::take(&mut section.questions);
        for mut question in questions {
            if let Some(index) = question.answers.iter().position(|a| intersects(&a.auto_answer_for)) {
                for (n, answer) in question.answers.iter_mut().enumerate() {
                    answer.selected = n == index;
                    answer.auto_answered = n == index;
                }
            }
            let keep = if !question.include_for.is_empty() {
                intersects(&question.include_for)
            } else {
                question.exclude_for.is_empty() || !intersects(&question.exclude_for)
            };
            if keep {
                section.questions.push(question);
            }
        }
    }
}

/// Aggregate risk over many assessments.
pub fn aggregate_risk(assessments: &[&Assessment]) -> &'static str {
    if assessments.is_empty() {
        return RISK_UNASSESSED;
    }
    let risks: Vec<&str> = assessments.iter().map(|a| a.risk()).collect();
    if risks.contains(&RISK_RED) {
        RISK_RED
    } else if risks.iter().any(|r| *r != RISK_YELLOW && *r != RISK_GREEN) {
        RISK_UNKNOWN
    } else if risks.contains(&RISK_YELLOW) {
        RISK_YELLOW
    } else {
        RISK_GREEN
    }
}

/// Mean confidence over many assessments (integer division).
pub fn aggregate_confidence(assessments: &[&Assessment]) -> u32 {
    if assessments.is_empty() {
        return 0;
    }
    let sum: u32 = assessments.iter().map(|a| a.confidence()).sum();
    sum / assessments.len() as u32
}

// ========================================
// Snapshot
// ========================================

/// Immutable per-request view over the resolver caches.
///
/// Each cache is loaded on first use from the snapshot's connection and never
/// changes afterwards.
#[derive(Debug)]
pub struct Resolvers<'c> {
    conn: &'c Connection,
    tags: OnceCell<TagResolver>,
    questionnaires: OnceCell<QuestionnaireResolver>,
    membership: OnceCell<MembershipResolver>,
    members: OnceCell<MemberIndex>,
}

impl<'c> Resolvers<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            tags: OnceCell::new(),
            questionnaires: OnceCell::new(),
            membership: OnceCell::new(),
            members: OnceCell::new(),
        }
    }

    pub fn conn(&self) -> &'c Connection {
        self.conn
    }

    pub fn tags(&self) -> Result<&TagResolver> {
        if let Some(resolver) = self.tags.get() {
            return Ok(resolver);
        }
        let resolver = TagResolver::load(self.conn)?;
        Ok(self.tags.get_or_init(|| resolver))
    }

    pub fn questionnaires(&self) -> Result<&QuestionnaireResolver> {
        if let Some(resolver) = self.questionnaires.get() {
            return Ok(resolver);
        }
        let resolver = QuestionnaireResolver::load(self.conn)?;
        Ok(self.questionnaires.get_or_init(|| resolver))
    }

    pub fn membership(&self) -> Result<&MembershipResolver> {
        if let Some(resolver) = self.membership.get() {
            return Ok(resolver);
        }
        let resolver = MembershipResolver::load(self.conn)?;
        Ok(self.membership.get_or_init(|| resolver))
    }

    /// Archetype -> member applications, for every application.
    pub fn members(&self) -> Result<&MemberIndex> {
        if let Some(index) = self.members.get() {
            return Ok(index);
        }
        let index = MemberIndex::load(self.conn, self.membership()?)?;
        Ok(self.members.get_or_init(|| index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, Question};

    fn answer(risk: &str, selected: bool) -> Answer {
        Answer {
            risk: risk.to_string(),
            selected,
            ..Default::default()
        }
    }

    fn question(risk: Option<&str>) -> Question {
        let mut answers = vec![answer(RISK_GREEN, false), answer(RISK_RED, false)];
        if let Some(risk) = risk {
            answers.push(answer(risk, true));
        }
        Question {
            answers,
            ..Default::default()
        }
    }

    fn sections(risks: &[Option<&str>]) -> Vec<Section> {
        vec![Section {
            questions: risks.iter().map(|r| question(*r)).collect(),
            ..Default::default()
        }]
    }

    fn assessment(risks: &[Option<&str>], red: u32, yellow: u32) -> Assessment {
        Assessment {
            sections: sections(risks),
            thresholds: Thresholds {
                red,
                yellow,
                unknown: 100,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_status() {
        assert_eq!(status(&sections(&[None, None])), Status::Empty);
        assert_eq!(status(&sections(&[Some(RISK_GREEN), None])), Status::Started);
        assert_eq!(status(&sections(&[Some(RISK_GREEN), Some(RISK_RED)])), Status::Complete);

        let mut auto = sections(&[Some(RISK_GREEN), None]);
        auto[0].questions[0].answers[2].auto_answered = true;
        assert_eq!(status(&auto), Status::Empty);
    }

    #[test]
    fn test_risk_thresholds() {
        let t = Thresholds {
            red: 30,
            yellow: 30,
            unknown: 50,
        };
        assert_eq!(risk(&[], &t), RISK_UNKNOWN);
        assert_eq!(risk(&sections(&[Some(RISK_RED), Some(RISK_GREEN), Some(RISK_GREEN)]), &t), RISK_RED);
        assert_eq!(risk(&sections(&[Some(RISK_GREEN), Some(RISK_YELLOW), Some(RISK_GREEN)]), &t), RISK_YELLOW);
        assert_eq!(risk(&sections(&[None, None, Some(RISK_GREEN)]), &t), RISK_UNKNOWN);
        assert_eq!(risk(&sections(&[Some(RISK_GREEN), Some(RISK_GREEN)]), &t), RISK_GREEN);
    }

    #[test]
    fn test_confidence() {
        assert_eq!(confidence(&[]), 0);
        assert_eq!(confidence(&sections(&[Some(RISK_GREEN), Some(RISK_GREEN)])), 100);
        assert_eq!(confidence(&sections(&[None])), 70);
        // adjuster = 0.5; score = 1*0.5 + 100*0.5 = 50.5 of 200.
        assert_eq!(confidence(&sections(&[Some(RISK_RED), Some(RISK_GREEN)])), 25);
        // adjuster = 0.98; score = 80*0.98 = 78.4.
        assert_eq!(confidence(&sections(&[Some(RISK_YELLOW)])), 78);
        for risks in [
            vec![Some(RISK_RED); 5],
            vec![Some(RISK_YELLOW); 7],
            vec![Some(RISK_GREEN), None, Some(RISK_RED), Some(RISK_YELLOW)],
        ] {
            assert!(confidence(&sections(&risks)) <= 100);
        }
    }

    #[test]
    fn test_aggregate_risk() {
        let g = assessment(&[Some(RISK_GREEN)], 30, 30);
        let y = assessment(&[Some(RISK_YELLOW)], 30, 30);
        let r = assessment(&[Some(RISK_RED)], 30, 30);
        let u = assessment(&[None], 30, 30);
        assert_eq!(aggregate_risk(&[]), RISK_UNASSESSED);
        assert_eq!(aggregate_risk(&[&g, &y, &g]), RISK_YELLOW);
        assert_eq!(aggregate_risk(&[&g, &u, &y]), RISK_UNKNOWN);
        assert_eq!(aggregate_risk(&[&u, &r]), RISK_RED);
        assert_eq!(aggregate_risk(&[&g, &g]), RISK_GREEN);
    }

    #[test]
    fn test_aggregate_confidence() {
        let g = assessment(&[Some(RISK_GREEN)], 30, 30);
        let u = assessment(&[None], 30, 30);
        assert_eq!(aggregate_confidence(&[]), 0);
        assert_eq!(aggregate_confidence(&[&g, &u]), 85);
    }

    #[test]
    fn test_prepare() {
        use std::collections::HashMap;
        let categories = HashMap::from([(1, "Language".to_string())]);
        let java = crate::model::Tag {
            id: 1,
            ..crate::model::Tag::new("Java", 1)
        };
        let go = crate::model::Tag {
            id: 2,
            ..crate::model::Tag::new("Go", 1)
        };
        let resolver = TagResolver::with(&categories, vec![java, go]);
        let java = || vec![CategorizedTag::new("Language", "Java")];
        let go = || vec![CategorizedTag::new("Language", "Go")];

        let mut auto = question(None);
        auto.order = 1;
        auto.answers[0].selected = true;
        auto.answers[1].auto_answer_for = java();
        let mut included = question(None);
        included.order = 2;
        included.include_for = java();
        let mut not_included = question(None);
        not_included.order = 3;
        not_included.include_for = go();
        let mut excluded = question(None);
        excluded.order = 4;
        excluded.exclude_for = java();
        let mut kept = question(None);
        kept.order = 5;
        kept.exclude_for = go();

        let mut sections = vec![Section {
            questions: vec![auto, included, not_included, excluded, kept],
            ..Default::default()
        }];
        prepare(&mut sections, &resolver, &HashSet::from([1]));

        let orders: Vec<u32> = sections[0].questions.iter().map(|q| q.order).collect();
        assert_eq!(orders, vec![1, 2, 5]);
        let answers = &sections[0].questions[0].answers;
        assert!(answers[1].selected && answers[1].auto_answered);
        assert!(!answers[0].selected);
        assert_eq!(status(&sections), Status::Empty);
    }
}
