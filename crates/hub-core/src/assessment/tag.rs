//! Tag resolver.

use crate::database::record;
use crate::error::Result;
use crate::model::{Assessment, Tag, TagCategory};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

/// In-memory index of every tag by category name and tag name.
#[derive(Debug, Default)]
pub struct TagResolver {
    by_name: HashMap<String, HashMap<String, Tag>>,
    by_id: HashMap<u64, Tag>,
}

impl TagResolver {
    pub fn load(conn: &Connection) -> Result<Self> {
        let categories: HashMap<u64, String> = record::list_all::<TagCategory>(conn)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let tags = record::list_all::<Tag>(conn)?;
        Ok(Self::with(&categories, tags))
    }

    /// Build from category names by id and the tags.
    pub fn with(categories: &HashMap<u64, String>, tags: Vec<Tag>) -> Self {
        let mut resolver = Self::default();
        for tag in tags {
            if let Some(category) = categories.get(&tag.category_id) {
                resolver
                    .by_name
                    .entry(category.clone())
                    .or_default()
                    .insert(tag.name.clone(), tag.clone());
            }
            resolver.by_id.insert(tag.id, tag);
        }
        resolver
    }

    /// Tag named `name` in category `category`.
    pub fn resolve(&self, category: &str, name: &str) -> Option<&Tag> {
        self.by_name.get(category).and_then(|tags| tags.get(name))
    }

    pub fn get(&self, id: u64) -> Option<&Tag> {
        self.by_id.get(&id)
    }

    /// Resolvable tags applied by the selected answers of `assessment`,
    /// de-duplicated in first-seen order.
    pub fn assessment(&self, assessment: &Assessment) -> Vec<&Tag> {
        let mut seen = HashSet::new();
        assessment
            .applied_tags()
            .filter_map(|r| self.resolve(&r.category, &r.tag))
            .filter(|t| seen.insert(t.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, CategorizedTag, Question, Section};

    fn tag(id: u64, name: &str, category_id: u64) -> Tag {
        Tag {
            id,
            ..Tag::new(name, category_id)
        }
    }

    fn resolver() -> TagResolver {
        let categories = HashMap::from([(1, "Language".to_string()), (2, "Runtime".to_string())]);
        TagResolver::with(
            &categories,
            vec![tag(1, "Java", 1), tag(2, "Go", 1), tag(3, "Quarkus", 2)],
        )
    }

    #[test]
    fn test_resolve() {
        let r = resolver();
        assert_eq!(r.resolve("Language", "Go").map(|t| t.id), Some(2));
        assert!(r.resolve("Runtime", "Go").is_none());
        assert!(r.resolve("Missing", "Go").is_none());
        assert_eq!(r.get(3).map(|t| t.name.as_str()), Some("Quarkus"));
    }

    #[test]
    fn test_assessment_tags() {
        let selected = |tags: Vec<CategorizedTag>| Question {
            answers: vec![Answer {
                selected: true,
                apply_tags: tags,
                ..Default::default()
            }],
            ..Default::default()
        };
        let assessment = Assessment {
            sections: vec![Section {
                questions: vec![
                    selected(vec![
                        CategorizedTag::new("Language", "Java"),
                        CategorizedTag::new("Language", "Unknown"),
                    ]),
                    selected(vec![
                        CategorizedTag::new("Runtime", "Quarkus"),
                        CategorizedTag::new("Language", "Java"),
                    ]),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let ids: Vec<u64> = resolver().assessment(&assessment).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
