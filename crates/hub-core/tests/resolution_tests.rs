//! Integration tests for archetype membership and assessment resolution over
//! a real database.

use hub_core::association;
use hub_core::database::record;
use hub_core::model::{
    Answer, Application, Archetype, Assessment, CategorizedTag, Question, Questionnaire, Section,
    Tag, TagCategory, Thresholds,
};
use hub_core::schema;
use hub_core::{ApplicationResolver, ArchetypeResolver, Database, Resolvers, SqlValue};
use rusqlite::Connection;
use std::collections::HashSet;
use tempfile::TempDir;

struct Fixture {
    go: u64,
    web: u64,
    java_only: u64,
    questionnaire: Questionnaire,
    app_web: u64,
    app_java: u64,
    app_none: u64,
}

fn questionnaire() -> Questionnaire {
    Questionnaire {
        name: "Legacy".into(),
        thresholds: Thresholds {
            red: 5,
            yellow: 30,
            unknown: 15,
        },
        sections: vec![Section {
            order: 1,
            name: "Basics".into(),
            questions: vec![Question {
                order: 1,
                text: "Language?".into(),
                answers: vec![
                    Answer {
                        order: 1,
                        text: "Java".into(),
                        risk: "green".into(),
                        auto_answer_for: vec![CategorizedTag::new("Language", "Java")],
                        apply_tags: vec![CategorizedTag::new("Language", "Go")],
                        ..Default::default()
                    },
                    Answer {
                        order: 2,
                        text: "Other".into(),
                        risk: "red".into(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn archetype(conn: &Connection, name: &str, criteria: &[u64], tags: &[u64]) -> hub_core::Result<u64> {
    let mut archetype = Archetype {
        name: name.into(),
        ..Default::default()
    };
    record::create(conn, &mut archetype)?;
    association::replace_ids(conn, &schema::ARCHETYPE, "criteriaTags", archetype.id, criteria)?;
    association::replace_ids(conn, &schema::ARCHETYPE, "tags", archetype.id, tags)?;
    Ok(archetype.id)
}

fn application(conn: &Connection, name: &str, tags: &[u64]) -> hub_core::Result<u64> {
    let mut app = Application {
        name: name.into(),
        ..Default::default()
    };
    record::create(conn, &mut app)?;
    association::replace_ids(conn, &schema::APPLICATION, "tags", app.id, tags)?;
    Ok(app.id)
}

fn create_fixture(db: &Database) -> Fixture {
    db.write(|tx| {
        let mut language = TagCategory {
            name: "Language".into(),
            ..Default::default()
        };
        record::create(tx, &mut language)?;
        let mut runtime = TagCategory {
            name: "Runtime".into(),
            ..Default::default()
        };
        record::create(tx, &mut runtime)?;
        let mut java = Tag::new("Java", language.id);
        let mut go = Tag::new("Go", language.id);
        let mut tomcat = Tag::new("Tomcat", runtime.id);
        for tag in [&mut java, &mut go, &mut tomcat] {
            record::create(tx, tag)?;
        }

        let mut questionnaire = questionnaire();
        record::create(tx, &mut questionnaire)?;

        let java_only = archetype(tx, "Java", &[java.id], &[])?;
        let web = archetype(tx, "Java Web", &[java.id, tomcat.id], &[go.id])?;

        let app_web = application(tx, "Store", &[java.id, tomcat.id])?;
        let app_java = application(tx, "Batch", &[java.id])?;
        let app_none = application(tx, "Mainframe", &[])?;

        Ok(Fixture {
            go: go.id,
            web,
            java_only,
            questionnaire,
            app_web,
            app_java,
            app_none,
        })
    })
    .unwrap()
}

fn answered(questionnaire: &Questionnaire, answer: usize) -> Assessment {
    let mut assessment = Assessment::from_questionnaire(questionnaire);
    assessment.sections[0].questions[0].answers[answer].selected = true;
    assessment
}

fn create_test_db() -> (Database, TempDir) {
    let tmp = TempDir::new().unwrap();
    let db = Database::open_at(&tmp.path().join("hub.db")).unwrap();
    (db, tmp)
}

#[test]
fn test_membership_picks_narrowest_archetype() {
    let (db, _tmp) = create_test_db();
    let f = create_fixture(&db);

    db.read(|conn| {
        let resolvers = Resolvers::new(conn);
        let app: Application = record::get(conn, f.app_web)?;
        let resolver = ApplicationResolver::load(&resolvers, app)?;
        let ids: Vec<u64> = resolver.archetypes()?.iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec![f.web]);
        let inherited: Vec<u64> = resolver.archetype_tags()?.iter().map(|t| t.id).collect();
        assert_eq!(inherited, vec![f.go]);

        let app: Application = record::get(conn, f.app_java)?;
        let resolver = ApplicationResolver::load(&resolvers, app)?;
        let ids: Vec<u64> = resolver.archetypes()?.iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec![f.java_only]);

        assert_eq!(ArchetypeResolver::new(&resolvers, f.web)?.applications()?, vec![f.app_web]);
        assert_eq!(
            ArchetypeResolver::new(&resolvers, f.java_only)?.applications()?,
            vec![f.app_java]
        );
        assert!(ArchetypeResolver::new(&resolvers, 999).unwrap_err().is_not_found());
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_application_inherits_archetype_assessment() {
    let (db, _tmp) = create_test_db();
    let f = create_fixture(&db);
    db.write(|tx| {
        let mut assessment = answered(&f.questionnaire, 0);
        assessment.archetype_id = Some(f.web);
        record::create(tx, &mut assessment)
    })
    .unwrap();

    db.read(|conn| {
        let resolvers = Resolvers::new(conn);

        let store = ApplicationResolver::load(&resolvers, record::get(conn, f.app_web)?)?;
        assert!(store.assessed()?);
        assert_eq!(store.risk()?, "green");
        assert_eq!(store.confidence()?, 100);
        let tags: Vec<u64> = store.assessment_tags()?.iter().map(|t| t.id).collect();
        assert_eq!(tags, vec![f.go]);

        let batch = ApplicationResolver::load(&resolvers, record::get(conn, f.app_java)?)?;
        assert!(!batch.assessed()?);
        assert_eq!(batch.risk()?, "unassessed");

        let mainframe = ApplicationResolver::load(&resolvers, record::get(conn, f.app_none)?)?;
        assert!(mainframe.archetypes()?.is_empty());
        assert!(!mainframe.assessed()?);

        let web = ArchetypeResolver::new(&resolvers, f.web)?;
        assert!(web.assessed()?);
        assert_eq!(web.risk()?, "green");
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_own_assessment_overrides_archetype() {
    let (db, _tmp) = create_test_db();
    let f = create_fixture(&db);
    db.write(|tx| {
        let mut inherited = answered(&f.questionnaire, 0);
        inherited.archetype_id = Some(f.web);
        record::create(tx, &mut inherited)?;
        let mut own = answered(&f.questionnaire, 1);
        own.application_id = Some(f.app_web);
        record::create(tx, &mut own)
    })
    .unwrap();

    db.read(|conn| {
        let resolvers = Resolvers::new(conn);
        let store = ApplicationResolver::load(&resolvers, record::get(conn, f.app_web)?)?;
        assert_eq!(store.effective_assessments()?.len(), 1);
        assert_eq!(store.risk()?, "red");
        assert!(store.assessed()?);
        assert!(store.assessment_tags()?.is_empty());
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_optional_questionnaire_is_ignored() {
    let (db, _tmp) = create_test_db();
    let f = create_fixture(&db);
    db.write(|tx| {
        let mut optional = f.questionnaire.clone();
        optional.id = 0;
        optional.name = "Optional".into();
        optional.required = false;
        record::create(tx, &mut optional)?;
        let mut assessment = answered(&optional, 1);
        assessment.application_id = Some(f.app_java);
        record::create(tx, &mut assessment)
    })
    .unwrap();

    db.read(|conn| {
        let resolvers = Resolvers::new(conn);
        let batch = ApplicationResolver::load(&resolvers, record::get(conn, f.app_java)?)?;
        assert!(batch.required_assessments()?.is_empty());
        assert_eq!(batch.risk()?, "unassessed");
        assert!(!batch.assessed()?);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_optional_archetype_assessment_applies_no_tags() {
    let (db, _tmp) = create_test_db();
    let f = create_fixture(&db);
    db.write(|tx| {
        let mut optional = f.questionnaire.clone();
        optional.id = 0;
        optional.name = "Optional".into();
        optional.required = false;
        record::create(tx, &mut optional)?;
        let mut assessment = answered(&optional, 0);
        assessment.archetype_id = Some(f.web);
        record::create(tx, &mut assessment)
    })
    .unwrap();

    db.read(|conn| {
        let resolvers = Resolvers::new(conn);
        let web = ArchetypeResolver::new(&resolvers, f.web)?;
        assert!(web.required_assessments()?.is_empty());
        assert!(web.assessment_tags()?.is_empty());
        assert!(!web.assessed()?);

        let store = ApplicationResolver::load(&resolvers, record::get(conn, f.app_web)?)?;
        assert!(store.assessment_tags()?.is_empty());
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_tag_ids_are_distinct_across_sources() {
    let (db, _tmp) = create_test_db();
    let f = create_fixture(&db);
    let java = db
        .read(|conn| Application::tag_ids(conn, f.app_java))
        .unwrap()[0];
    db.write(|tx| {
        association::replace_scoped(
            tx,
            &schema::APPLICATION,
            "tags",
            f.app_web,
            &[f.go, java],
            &[("source", SqlValue::from("archetype"))],
        )?;
        association::replace_scoped(
            tx,
            &schema::APPLICATION,
            "tags",
            f.app_web,
            &[java],
            &[("source", SqlValue::from("assessment"))],
        )
    })
    .unwrap();

    db.read(|conn| {
        assert_eq!(Application::tags(conn, f.app_web)?.len(), 5);
        let ids = Application::tag_ids(conn, f.app_web)?;
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.contains(&java) && ids.contains(&f.go));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_prepare_with_application_tags() {
    let (db, _tmp) = create_test_db();
    let f = create_fixture(&db);
    db.read(|conn| {
        let resolvers = Resolvers::new(conn);
        let tags: HashSet<u64> = Application::tag_ids(conn, f.app_java)?.into_iter().collect();
        let mut assessment = Assessment::from_questionnaire(&f.questionnaire);
        assessment.prepare(resolvers.tags()?, &tags);
        let answers = &assessment.sections[0].questions[0].answers;
        assert!(answers[0].selected && answers[0].auto_answered);
        assert!(!answers[1].selected);
        // Fully auto-answered counts as complete, never as started.
        assert_eq!(assessment.status(), hub_core::Status::Complete);
        Ok(())
    })
    .unwrap();
}
