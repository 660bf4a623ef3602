mod common;

use common::graph_service;
use coursegraph_core::repo::knowledge_repo::KnowledgeRepository;
use coursegraph_core::{
    open_db_in_memory, CourseImportService, KnowledgeGraphService, ReasonLocale,
    RecommendationService, RecommenderConfig, RepoError, SqliteGraphRepository,
    SqliteKnowledgeRepository, SqliteRecommendationLogRepository,
};
use rusqlite::Connection;
use std::collections::BTreeSet;

/// `ch2` teaches a new term instead of depending on one, so it opens right
/// after `ch1` without any mastery data.
const SEQUENCE: &str = r#"@meta version="1" course="seq"
@term key="algorithm"
@term key="complexity"
@definition term="algorithm"
A finite procedure.
@definition term="complexity"
How resource use grows with input.
@chapter id="ch1" title="Intro" difficulty="1" introduces="algorithm"
What an algorithm is.
@chapter id="ch2" title="Analysis" difficulty="3" requires="ch1" introduces="complexity"
Measuring growth.
"#;

const TWIN_CHAPTERS: &str = r#"@meta version="1" course="twins"
@term key="t1"
@term key="t2"
@definition term="t1"
First.
@definition term="t2"
Second.
@chapter id="beta" title="Beta" introduces="t1"
B.
@chapter id="alpha" title="Alpha" introduces="t2"
A.
"#;

const REORDERED_TWINS: &str = r#"@meta version="1" course="tie"
@term key="a"
@term key="b"
@term key="c"
@definition term="a"
A.
@definition term="b"
B.
@definition term="c"
C.
@chapter id="alpha" title="Alpha" introduces="c,b,a"
Same terms, reversed.
@chapter id="beta" title="Beta" introduces="a,b,c"
Same terms.
"#;

type Engine<'a> = RecommendationService<
    'a,
    SqliteGraphRepository<'a>,
    SqliteKnowledgeRepository<'a>,
    SqliteRecommendationLogRepository<'a>,
>;

fn import(graphs: &KnowledgeGraphService<SqliteGraphRepository<'_>>, source: &str) {
    let report = CourseImportService::new(graphs)
        .import_course(source, false)
        .unwrap();
    assert!(report.valid, "{:?} {:?}", report.errors, report.graph_issues);
}

fn engine<'a>(
    conn: &'a Connection,
    graphs: &'a KnowledgeGraphService<SqliteGraphRepository<'a>>,
    config: RecommenderConfig,
) -> Engine<'a> {
    RecommendationService::new(
        graphs,
        SqliteKnowledgeRepository::try_new(conn).unwrap(),
        SqliteRecommendationLogRepository::try_new(conn).unwrap(),
        config,
    )
}

fn completed(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn cold_start_recommends_next_chapter_and_logs_it() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    import(&graphs, SEQUENCE);
    let engine = engine(&conn, &graphs, RecommenderConfig::default());

    let result = engine.next("s1", "seq", &completed(&["ch1"])).unwrap();
    assert_eq!(result.chapter_id.as_deref(), Some("ch2"));
    assert!(result.cold_start_fallback);
    assert_eq!(result.recommender_version, "hybrid-v1");
    let names: Vec<_> = result.factors.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["new_term_coverage", "difficulty_fit"]);
    assert!(close(result.factors[0].value, 1.0));
    assert!(close(result.factors[1].value, 0.9));
    assert!(close(result.score, 0.65 + 0.35 * 0.9));
    assert!(result.reason.starts_with("Cold start"));

    let logs = engine.list_recommendations("s1", "seq").unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].chapter_id, "ch2");
    for (logged, live) in logs[0].factors.iter().zip(&result.factors) {
        assert_eq!(logged.name, live.name);
        assert!((logged.value - live.value).abs() < 1e-4);
    }
    assert_eq!(logs[0].reason, result.reason);

    let (factors, encoding): (String, String) = conn
        .query_row(
            "SELECT factors, factors_encoding FROM recommendation_log;",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(factors, "new_term_coverage=1.0000;difficulty_fit=0.9000");
    assert_eq!(encoding, "kv1");
}

#[test]
fn three_students_switch_to_warm_scoring() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    import(&graphs, SEQUENCE);

    let knowledge = SqliteKnowledgeRepository::try_new(&conn).unwrap();
    for (student, term, score) in [
        ("s1", "algorithm", 0.9),
        ("s2", "algorithm", 0.8),
        ("s2", "complexity", 0.7),
        ("s3", "algorithm", 0.9),
        ("s3", "complexity", 0.5),
        ("s4", "complexity", 1.0),
    ] {
        knowledge.save_mastery(student, "seq", term, score, 0.5).unwrap();
    }
    assert_eq!(knowledge.count_students("seq").unwrap(), 4);

    let engine = engine(&conn, &graphs, RecommenderConfig::default());
    let result = engine.next("s1", "seq", &completed(&["ch1"])).unwrap();

    assert_eq!(result.chapter_id.as_deref(), Some("ch2"));
    assert!(!result.cold_start_fallback);
    assert_eq!(result.factors.len(), 3);
    assert_eq!(result.factors[2].name, "historical_success_similar");
    // s4 shares no scored term with s1 and is not similar.
    assert!(close(result.factors[2].value, 0.6));
    assert!(close(result.factors[1].value, 0.6));
    assert!(close(result.score, 0.4 + 0.2 * 0.6 + 0.4 * 0.6));
    assert!(result.reason.contains("similar students' success=0.60"));
}

#[test]
fn equal_scores_pick_smallest_chapter_id() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    import(&graphs, TWIN_CHAPTERS);
    let engine = engine(&conn, &graphs, RecommenderConfig::default());

    let result = engine.next("s1", "twins", &BTreeSet::new()).unwrap();
    assert_eq!(result.chapter_id.as_deref(), Some("alpha"));
}

#[test]
fn warm_tie_ignores_introduces_order() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    import(&graphs, REORDERED_TWINS);

    let knowledge = SqliteKnowledgeRepository::try_new(&conn).unwrap();
    for (student, term, score) in [
        ("me", "a", 0.5),
        ("me", "b", 0.5),
        ("me", "c", 0.5),
        ("p1", "a", 0.1),
        ("p1", "b", 0.2),
        ("p1", "c", 0.3),
        ("p2", "z", 1.0),
    ] {
        knowledge.save_mastery(student, "tie", term, score, 0.5).unwrap();
    }

    let engine = engine(&conn, &graphs, RecommenderConfig::default());
    let result = engine.next("me", "tie", &BTreeSet::new()).unwrap();
    assert!(!result.cold_start_fallback);
    assert_eq!(result.chapter_id.as_deref(), Some("alpha"));
    assert!(close(result.factors[2].value, 0.2));
}

#[test]
fn nothing_eligible_yields_sentinel_without_log() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    import(&graphs, SEQUENCE);
    let engine = engine(&conn, &graphs, RecommenderConfig::default());

    for (course, done) in [("seq", completed(&["ch1", "ch2"])), ("unknown", BTreeSet::new())] {
        let result = engine.next("s1", course, &done).unwrap();
        assert_eq!(result.chapter_id, None);
        assert_eq!(result.score, 0.0);
        assert!(result.cold_start_fallback);
        assert!(result.factors.is_empty());
        assert_eq!(result.reason, "No logically available chapters");
    }
    assert!(engine.list_recommendations("s1", "seq").unwrap().is_empty());
}

#[test]
fn russian_reasons_follow_locale() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    import(&graphs, SEQUENCE);
    let config = RecommenderConfig {
        reason_locale: ReasonLocale::Ru,
        ..RecommenderConfig::default()
    };
    let engine = engine(&conn, &graphs, config);

    let result = engine.next("s1", "seq", &completed(&["ch1"])).unwrap();
    assert!(result.reason.starts_with("Cold-start: выбрана глава"));
    let none = engine.next("s1", "seq", &completed(&["ch1", "ch2"])).unwrap();
    assert_eq!(none.reason, "Нет логически доступных глав");
}

#[test]
fn logs_are_listed_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    import(&graphs, SEQUENCE);
    let engine = engine(&conn, &graphs, RecommenderConfig::default());

    engine.next("s1", "seq", &BTreeSet::new()).unwrap();
    engine.next("s1", "seq", &completed(&["ch1"])).unwrap();

    let chapters: Vec<_> = engine
        .list_recommendations("s1", "seq")
        .unwrap()
        .into_iter()
        .map(|entry| entry.chapter_id)
        .collect();
    assert_eq!(chapters, vec!["ch2", "ch1"]);
}

#[test]
fn mastery_saves_are_clamped_upserts() {
    let conn = open_db_in_memory().unwrap();
    let knowledge = SqliteKnowledgeRepository::try_new(&conn).unwrap();

    knowledge.save_mastery("s1", "c", "t", 1.7, 0.2).unwrap();
    assert_eq!(knowledge.load_student_mastery("s1", "c").unwrap()["t"], 1.0);
    knowledge.save_mastery("s1", "c", "t", 0.3, 0.4).unwrap();

    let rows = knowledge.list_student_mastery("s1", "c").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].mastery_score, 0.3);
    assert_eq!(rows[0].confidence_score, 0.4);
    assert_eq!(knowledge.count_students("c").unwrap(), 1);

    assert!(matches!(
        knowledge.save_mastery("s1", "c", "t", f64::NAN, 0.0),
        Err(RepoError::InvalidInput(_))
    ));
}
