//! Schema descriptors.
//!
//! Every table is described once, statically: its columns, primary key and
//! named relations. The descriptors drive DDL generation, sort field
//! validation, PK counter kinds, and association replacement.

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Boolean,
    /// JSON document stored as TEXT.
    Json,
    /// RFC 3339 timestamp stored as TEXT.
    Timestamp,
}

impl ColumnType {
    fn sql(self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Text | ColumnType::Json | ColumnType::Timestamp => "TEXT",
        }
    }
}

/// Table column.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    /// Column constraint appended to the DDL (e.g. `NOT NULL UNIQUE`).
    pub constraint: &'static str,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType, constraint: &'static str) -> Self {
        Self {
            name,
            ty,
            constraint,
        }
    }
}

/// Relation shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Rows of `join_table` pair `owner_fk` with `related_fk`.
    ManyToMany {
        join_table: &'static str,
        owner_fk: &'static str,
        related_fk: &'static str,
    },
    /// Rows of the related table point at the owner through `fk`.
    /// When `owner` is true the parent exclusively owns its children.
    HasMany { fk: &'static str, owner: bool },
}

/// Named relation from an owner table.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub name: &'static str,
    /// Related table name.
    pub related: &'static str,
    pub kind: RelationKind,
}

/// Table descriptor.
#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    /// Primary key column; `None` for join tables.
    pub primary_key: Option<&'static str>,
    pub columns: &'static [Column],
    /// Table constraints appended to the DDL.
    pub constraints: &'static [&'static str],
    pub relations: &'static [Relation],
}

impl Table {
    /// PK counter kind (uppercased table name).
    pub fn kind(&self) -> String {
        self.name.to_uppercase()
    }

    /// Column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Relation by name (case-insensitive).
    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        self.relations
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Column names.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|c| c.name)
    }

    /// CREATE TABLE statement.
    pub fn ddl(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if Some(c.name) == self.primary_key {
                    format!("{} INTEGER PRIMARY KEY", c.name)
                } else if c.constraint.is_empty() {
                    format!("{} {}", c.name, c.ty.sql())
                } else {
                    format!("{} {} {}", c.name, c.ty.sql(), c.constraint)
                }
            })
            .collect();
        parts.extend(self.constraints.iter().map(|c| c.to_string()));
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            self.name,
            parts.join(",\n    ")
        )
    }
}

use ColumnType::{Boolean, Integer, Json, Text, Timestamp};

const ID: Column = Column::new("id", Integer, "");
const UUID: Column = Column::new("uuid", Text, "UNIQUE");
const CREATE_USER: Column = Column::new("create_user", Text, "NOT NULL DEFAULT ''");
const CREATE_TIME: Column = Column::new("create_time", Timestamp, "");

const fn m2m(
    name: &'static str,
    related: &'static str,
    join_table: &'static str,
    owner_fk: &'static str,
    related_fk: &'static str,
) -> Relation {
    Relation {
        name,
        related,
        kind: RelationKind::ManyToMany {
            join_table,
            owner_fk,
            related_fk,
        },
    }
}

const fn has_many(name: &'static str, related: &'static str, fk: &'static str, owner: bool) -> Relation {
    Relation {
        name,
        related,
        kind: RelationKind::HasMany { fk, owner },
    }
}

// ========================================
// Core bookkeeping
// ========================================

pub static PK: Table = Table {
    name: "pk",
    primary_key: None,
    columns: &[
        Column::new("kind", Text, "PRIMARY KEY"),
        Column::new("last_id", Integer, "NOT NULL DEFAULT 0"),
    ],
    constraints: &[],
    relations: &[],
};

pub static SETTING: Table = Table {
    name: "setting",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("key", Text, "NOT NULL UNIQUE"),
        Column::new("value", Json, ""),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[],
};

pub static FILE: Table = Table {
    name: "file",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("name", Text, "NOT NULL"),
        Column::new("path", Text, "NOT NULL DEFAULT ''"),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[],
};

// ========================================
// Tags
// ========================================

pub static TAG_CATEGORY: Table = Table {
    name: "tag_category",
    primary_key: Some("id"),
    columns: &[
        ID,
        UUID,
        Column::new("name", Text, "NOT NULL UNIQUE"),
        Column::new("color", Text, "NOT NULL DEFAULT ''"),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[has_many("tags", "tag", "category_id", true)],
};

pub static TAG: Table = Table {
    name: "tag",
    primary_key: Some("id"),
    columns: &[
        ID,
        UUID,
        Column::new("name", Text, "NOT NULL"),
        Column::new(
            "category_id",
            Integer,
            "NOT NULL REFERENCES tag_category(id) ON DELETE CASCADE",
        ),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &["UNIQUE (category_id, name)"],
    relations: &[],
};

// ========================================
// Business context
// ========================================

pub static JOB_FUNCTION: Table = Table {
    name: "job_function",
    primary_key: Some("id"),
    columns: &[
        ID,
        UUID,
        Column::new("name", Text, "NOT NULL UNIQUE"),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[],
};

pub static STAKEHOLDER: Table = Table {
    name: "stakeholder",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("name", Text, "NOT NULL"),
        Column::new("email", Text, "NOT NULL UNIQUE"),
        Column::new(
            "job_function_id",
            Integer,
            "REFERENCES job_function(id) ON DELETE SET NULL",
        ),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[],
};

pub static STAKEHOLDER_GROUP: Table = Table {
    name: "stakeholder_group",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("name", Text, "NOT NULL UNIQUE"),
        Column::new("description", Text, "NOT NULL DEFAULT ''"),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[m2m(
        "stakeholders",
        "stakeholder",
        "stakeholder_group_members",
        "stakeholder_group_id",
        "stakeholder_id",
    )],
};

pub static STAKEHOLDER_GROUP_MEMBERS: Table = Table {
    name: "stakeholder_group_members",
    primary_key: None,
    columns: &[
        Column::new(
            "stakeholder_group_id",
            Integer,
            "NOT NULL REFERENCES stakeholder_group(id) ON DELETE CASCADE",
        ),
        Column::new(
            "stakeholder_id",
            Integer,
            "NOT NULL REFERENCES stakeholder(id) ON DELETE CASCADE",
        ),
    ],
    constraints: &["PRIMARY KEY (stakeholder_group_id, stakeholder_id)"],
    relations: &[],
};

pub static BUSINESS_SERVICE: Table = Table {
    name: "business_service",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("name", Text, "NOT NULL UNIQUE"),
        Column::new("description", Text, "NOT NULL DEFAULT ''"),
        Column::new(
            "stakeholder_id",
            Integer,
            "REFERENCES stakeholder(id) ON DELETE SET NULL",
        ),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[has_many("applications", "application", "business_service_id", false)],
};

pub static MIGRATION_WAVE: Table = Table {
    name: "migration_wave",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("name", Text, "NOT NULL DEFAULT ''"),
        Column::new("start_date", Timestamp, ""),
        Column::new("end_date", Timestamp, ""),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &["UNIQUE (name, start_date, end_date)"],
    relations: &[has_many("applications", "application", "migration_wave_id", false)],
};

pub static PLATFORM: Table = Table {
    name: "platform",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("name", Text, "NOT NULL UNIQUE"),
        Column::new("kind", Text, "NOT NULL DEFAULT ''"),
        Column::new("url", Text, "NOT NULL DEFAULT ''"),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[has_many("applications", "application", "platform_id", false)],
};

// ========================================
// Applications and archetypes
// ========================================

pub static APPLICATION: Table = Table {
    name: "application",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("name", Text, "NOT NULL UNIQUE CHECK (name <> '')"),
        Column::new("description", Text, "NOT NULL DEFAULT ''"),
        Column::new("comments", Text, "NOT NULL DEFAULT ''"),
        Column::new("binary", Text, "NOT NULL DEFAULT ''"),
        Column::new("repository", Json, ""),
        Column::new("assets", Json, ""),
        Column::new("coordinates", Json, ""),
        Column::new(
            "business_service_id",
            Integer,
            "REFERENCES business_service(id) ON DELETE SET NULL",
        ),
        Column::new("owner_id", Integer, "REFERENCES stakeholder(id) ON DELETE SET NULL"),
        Column::new(
            "migration_wave_id",
            Integer,
            "REFERENCES migration_wave(id) ON DELETE SET NULL",
        ),
        Column::new("platform_id", Integer, "REFERENCES platform(id) ON DELETE SET NULL"),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[
        m2m("tags", "tag", "application_tags", "application_id", "tag_id"),
        m2m(
            "contributors",
            "stakeholder",
            "application_contributors",
            "application_id",
            "stakeholder_id",
        ),
        has_many("assessments", "assessment", "application_id", true),
    ],
};

pub static APPLICATION_TAGS: Table = Table {
    name: "application_tags",
    primary_key: None,
    columns: &[
        Column::new(
            "application_id",
            Integer,
            "NOT NULL REFERENCES application(id) ON DELETE CASCADE",
        ),
        Column::new("tag_id", Integer, "NOT NULL REFERENCES tag(id) ON DELETE CASCADE"),
        Column::new("source", Text, "NOT NULL DEFAULT ''"),
    ],
    constraints: &["PRIMARY KEY (application_id, tag_id, source)"],
    relations: &[],
};

pub static APPLICATION_CONTRIBUTORS: Table = Table {
    name: "application_contributors",
    primary_key: None,
    columns: &[
        Column::new(
            "application_id",
            Integer,
            "NOT NULL REFERENCES application(id) ON DELETE CASCADE",
        ),
        Column::new(
            "stakeholder_id",
            Integer,
            "NOT NULL REFERENCES stakeholder(id) ON DELETE CASCADE",
        ),
    ],
    constraints: &["PRIMARY KEY (application_id, stakeholder_id)"],
    relations: &[],
};

pub static ARCHETYPE: Table = Table {
    name: "archetype",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("name", Text, "NOT NULL UNIQUE"),
        Column::new("description", Text, "NOT NULL DEFAULT ''"),
        Column::new("comments", Text, "NOT NULL DEFAULT ''"),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[
        m2m(
            "criteriaTags",
            "tag",
            "archetype_criteria_tags",
            "archetype_id",
            "tag_id",
        ),
        m2m("tags", "tag", "archetype_tags", "archetype_id", "tag_id"),
        m2m(
            "stakeholders",
            "stakeholder",
            "archetype_stakeholders",
            "archetype_id",
            "stakeholder_id",
        ),
        m2m(
            "stakeholderGroups",
            "stakeholder_group",
            "archetype_stakeholder_groups",
            "archetype_id",
            "stakeholder_group_id",
        ),
        has_many("profiles", "target_profile", "archetype_id", true),
        has_many("assessments", "assessment", "archetype_id", true),
    ],
};

pub static ARCHETYPE_CRITERIA_TAGS: Table = Table {
    name: "archetype_criteria_tags",
    primary_key: None,
    columns: &[
        Column::new(
            "archetype_id",
            Integer,
            "NOT NULL REFERENCES archetype(id) ON DELETE CASCADE",
        ),
        Column::new("tag_id", Integer, "NOT NULL REFERENCES tag(id) ON DELETE CASCADE"),
    ],
    constraints: &["PRIMARY KEY (archetype_id, tag_id)"],
    relations: &[],
};

pub static ARCHETYPE_TAGS: Table = Table {
    name: "archetype_tags",
    primary_key: None,
    columns: &[
        Column::new(
            "archetype_id",
            Integer,
            "NOT NULL REFERENCES archetype(id) ON DELETE CASCADE",
        ),
        Column::new("tag_id", Integer, "NOT NULL REFERENCES tag(id) ON DELETE CASCADE"),
    ],
    constraints: &["PRIMARY KEY (archetype_id, tag_id)"],
    relations: &[],
};

pub static ARCHETYPE_STAKEHOLDERS: Table = Table {
    name: "archetype_stakeholders",
    primary_key: None,
    columns: &[
        Column::new(
            "archetype_id",
            Integer,
            "NOT NULL REFERENCES archetype(id) ON DELETE CASCADE",
        ),
        Column::new(
            "stakeholder_id",
            Integer,
            "NOT NULL REFERENCES stakeholder(id) ON DELETE CASCADE",
        ),
    ],
    constraints: &["PRIMARY KEY (archetype_id, stakeholder_id)"],
    relations: &[],
};

pub static ARCHETYPE_STAKEHOLDER_GROUPS: Table = Table {
    name: "archetype_stakeholder_groups",
    primary_key: None,
    columns: &[
        Column::new(
            "archetype_id",
            Integer,
            "NOT NULL REFERENCES archetype(id) ON DELETE CASCADE",
        ),
        Column::new(
            "stakeholder_group_id",
            Integer,
            "NOT NULL REFERENCES stakeholder_group(id) ON DELETE CASCADE",
        ),
    ],
    constraints: &["PRIMARY KEY (archetype_id, stakeholder_group_id)"],
    relations: &[],
};

pub static TARGET_PROFILE: Table = Table {
    name: "target_profile",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("name", Text, "NOT NULL"),
        Column::new(
            "archetype_id",
            Integer,
            "REFERENCES archetype(id) ON DELETE CASCADE",
        ),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &["UNIQUE (archetype_id, name)"],
    relations: &[],
};

// ========================================
// Questionnaires and assessments
// ========================================

pub static QUESTIONNAIRE: Table = Table {
    name: "questionnaire",
    primary_key: Some("id"),
    columns: &[
        ID,
        UUID,
        Column::new("name", Text, "NOT NULL UNIQUE"),
        Column::new("description", Text, "NOT NULL DEFAULT ''"),
        Column::new("required", Boolean, "NOT NULL DEFAULT 1"),
        Column::new("sections", Json, ""),
        Column::new("thresholds", Json, ""),
        Column::new("risk_messages", Json, ""),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[],
};

pub static ASSESSMENT: Table = Table {
    name: "assessment",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new(
            "questionnaire_id",
            Integer,
            "NOT NULL REFERENCES questionnaire(id) ON DELETE CASCADE",
        ),
        Column::new(
            "application_id",
            Integer,
            "REFERENCES application(id) ON DELETE CASCADE",
        ),
        Column::new(
            "archetype_id",
            Integer,
            "REFERENCES archetype(id) ON DELETE CASCADE",
        ),
        Column::new("sections", Json, ""),
        Column::new("thresholds", Json, ""),
        Column::new("risk_messages", Json, ""),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &["CHECK ((application_id IS NULL) <> (archetype_id IS NULL))"],
    relations: &[
        m2m(
            "stakeholders",
            "stakeholder",
            "assessment_stakeholders",
            "assessment_id",
            "stakeholder_id",
        ),
        m2m(
            "stakeholderGroups",
            "stakeholder_group",
            "assessment_stakeholder_groups",
            "assessment_id",
            "stakeholder_group_id",
        ),
    ],
};

pub static ASSESSMENT_STAKEHOLDERS: Table = Table {
    name: "assessment_stakeholders",
    primary_key: None,
    columns: &[
        Column::new(
            "assessment_id",
            Integer,
            "NOT NULL REFERENCES assessment(id) ON DELETE CASCADE",
        ),
        Column::new(
            "stakeholder_id",
            Integer,
            "NOT NULL REFERENCES stakeholder(id) ON DELETE CASCADE",
        ),
    ],
    constraints: &["PRIMARY KEY (assessment_id, stakeholder_id)"],
    relations: &[],
};

pub static ASSESSMENT_STAKEHOLDER_GROUPS: Table = Table {
    name: "assessment_stakeholder_groups",
    primary_key: None,
    columns: &[
        Column::new(
            "assessment_id",
            Integer,
            "NOT NULL REFERENCES assessment(id) ON DELETE CASCADE",
        ),
        Column::new(
            "stakeholder_group_id",
            Integer,
            "NOT NULL REFERENCES stakeholder_group(id) ON DELETE CASCADE",
        ),
    ],
    constraints: &["PRIMARY KEY (assessment_id, stakeholder_group_id)"],
    relations: &[],
};

// ========================================
// Seed-managed catalogs
// ========================================

pub static RULE_SET: Table = Table {
    name: "rule_set",
    primary_key: Some("id"),
    columns: &[
        ID,
        UUID,
        Column::new("kind", Text, "NOT NULL DEFAULT ''"),
        Column::new("name", Text, "NOT NULL UNIQUE"),
        Column::new("description", Text, "NOT NULL DEFAULT ''"),
        Column::new("repository", Json, ""),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[
        has_many("rules", "rule", "rule_set_id", true),
        m2m(
            "dependsOn",
            "rule_set",
            "rule_set_depends",
            "rule_set_id",
            "depends_on_id",
        ),
    ],
};

pub static RULE: Table = Table {
    name: "rule",
    primary_key: Some("id"),
    columns: &[
        ID,
        Column::new("name", Text, "NOT NULL DEFAULT ''"),
        Column::new("description", Text, "NOT NULL DEFAULT ''"),
        Column::new("labels", Json, ""),
        Column::new(
            "rule_set_id",
            Integer,
            "REFERENCES rule_set(id) ON DELETE CASCADE",
        ),
        Column::new("file_id", Integer, "REFERENCES file(id) ON DELETE SET NULL"),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[],
};

pub static RULE_SET_DEPENDS: Table = Table {
    name: "rule_set_depends",
    primary_key: None,
    columns: &[
        Column::new(
            "rule_set_id",
            Integer,
            "NOT NULL REFERENCES rule_set(id) ON DELETE CASCADE",
        ),
        Column::new(
            "depends_on_id",
            Integer,
            "NOT NULL REFERENCES rule_set(id) ON DELETE CASCADE",
        ),
    ],
    constraints: &["PRIMARY KEY (rule_set_id, depends_on_id)"],
    relations: &[],
};

pub static TARGET: Table = Table {
    name: "target",
    primary_key: Some("id"),
    columns: &[
        ID,
        UUID,
        Column::new("name", Text, "NOT NULL UNIQUE"),
        Column::new("description", Text, "NOT NULL DEFAULT ''"),
        Column::new("provider", Text, "NOT NULL DEFAULT ''"),
        Column::new("choice", Boolean, "NOT NULL DEFAULT 0"),
        Column::new("labels", Json, ""),
        Column::new("image_id", Integer, "REFERENCES file(id) ON DELETE SET NULL"),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[],
};

pub static GENERATOR: Table = Table {
    name: "generator",
    primary_key: Some("id"),
    columns: &[
        ID,
        UUID,
        Column::new("kind", Text, "NOT NULL DEFAULT ''"),
        Column::new("name", Text, "NOT NULL UNIQUE"),
        Column::new("description", Text, "NOT NULL DEFAULT ''"),
        Column::new("repository", Json, ""),
        Column::new("params", Json, ""),
        Column::new("template_values", Json, ""),
        CREATE_USER,
        CREATE_TIME,
    ],
    constraints: &[],
    relations: &[],
};

/// All tables in creation order (referenced tables first).
pub static TABLES: &[&Table] = &[
    &PK,
    &SETTING,
    &FILE,
    &TAG_CATEGORY,
    &TAG,
    &JOB_FUNCTION,
    &STAKEHOLDER,
    &STAKEHOLDER_GROUP,
    &STAKEHOLDER_GROUP_MEMBERS,
    &BUSINESS_SERVICE,
    &MIGRATION_WAVE,
    &PLATFORM,
    &APPLICATION,
    &APPLICATION_TAGS,
    &APPLICATION_CONTRIBUTORS,
    &ARCHETYPE,
    &ARCHETYPE_CRITERIA_TAGS,
    &ARCHETYPE_TAGS,
    &ARCHETYPE_STAKEHOLDERS,
    &ARCHETYPE_STAKEHOLDER_GROUPS,
    &TARGET_PROFILE,
    &QUESTIONNAIRE,
    &ASSESSMENT,
    &ASSESSMENT_STAKEHOLDERS,
    &ASSESSMENT_STAKEHOLDER_GROUPS,
    &RULE_SET,
    &RULE,
    &RULE_SET_DEPENDS,
    &TARGET,
    &GENERATOR,
];

/// Table by name (case-insensitive).
pub fn table(name: &str) -> Option<&'static Table> {
    TABLES
        .iter()
        .copied()
        .find(|t| t.name.eq_ignore_ascii_case(name))
}

/// Tables carrying an allocated integer primary key.
pub fn keyed_tables() -> impl Iterator<Item = &'static Table> {
    TABLES.iter().copied().filter(|t| t.primary_key.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl() {
        let ddl = TAG.ddl();
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS tag ("));
        assert!(ddl.contains("id INTEGER PRIMARY KEY"));
        assert!(ddl.contains("UNIQUE (category_id, name)"));
        assert_eq!(PK.kind(), "PK");
        assert_eq!(APPLICATION.kind(), "APPLICATION");
    }

    #[test]
    fn test_ddl_executes() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for table in TABLES {
            conn.execute_batch(&table.ddl()).unwrap();
        }
    }

    #[test]
    fn test_lookup() {
        assert!(table("Application").is_some());
        assert!(APPLICATION.column("NAME").is_some());
        assert!(ARCHETYPE.relation("criteriatags").is_some());
        assert!(APPLICATION.relation("nope").is_none());
        assert!(keyed_tables().all(|t| t.primary_key == Some("id")));
        assert!(!keyed_tables().any(|t| t.name == "application_tags"));
    }

    #[test]
    fn test_relations_resolve() {
        for table in TABLES {
            for relation in table.relations {
                let related = super::table(relation.related).unwrap();
                match relation.kind {
                    RelationKind::ManyToMany {
                        join_table,
                        owner_fk,
                        related_fk,
                    } => {
                        let join = super::table(join_table).unwrap();
                        assert!(join.column(owner_fk).is_some());
                        assert!(join.column(related_fk).is_some());
                    }
                    RelationKind::HasMany { fk, .. } => {
                        assert!(related.column(fk).is_some(), "{}.{}", related.name, fk);
                    }
                }
            }
        }
    }
}
