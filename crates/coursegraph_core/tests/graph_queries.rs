mod common;

use common::{graph_service, ALGORITHMS};
use coursegraph_core::repo::graph_repo::{ChapterTermPair, GraphRepository};
use coursegraph_core::{
    open_db_in_memory, CourseImportService, EdgeType, GraphCache, GraphServiceError,
    KnowledgeGraphService, RepoError, SqliteGraphRepository, StudentProfile,
};
use std::sync::Arc;

#[test]
fn rehydrated_graph_equals_imported_graph() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    CourseImportService::new(&graphs)
        .import_course(ALGORITHMS, false)
        .unwrap();
    let imported = graphs.read_model("algo").unwrap().unwrap();

    let cold = graph_service(&conn);
    assert!(cold.cache().is_empty());
    let rehydrated = cold.read_model("algo").unwrap().unwrap();
    assert_eq!(*rehydrated, *imported);
    assert_eq!(cold.cache().len(), 1);

    let again = cold.read_model("algo").unwrap().unwrap();
    assert!(Arc::ptr_eq(&again, &rehydrated));
}

#[test]
fn unknown_course_and_chapter_are_not_answered() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    let profile = StudentProfile::default();

    assert_eq!(graphs.eligible_chapters("nope", &profile).unwrap(), None);
    assert_eq!(graphs.explain_chapter("nope", "ch1", &profile).unwrap(), None);

    CourseImportService::new(&graphs)
        .import_course(ALGORITHMS, false)
        .unwrap();
    assert_eq!(graphs.explain_chapter("algo", "ch9", &profile).unwrap(), None);
}

#[test]
fn completing_prerequisites_opens_the_next_chapter() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    CourseImportService::new(&graphs)
        .import_course(ALGORITHMS, false)
        .unwrap();

    let profile = StudentProfile::new(["ch1"], ["algorithm", "complexity"]);
    assert_eq!(
        graphs.eligible_chapters("algo", &profile).unwrap(),
        Some(vec!["ch2".to_string()])
    );
    let verdict = graphs.explain_chapter("algo", "ch2", &profile).unwrap().unwrap();
    assert!(verdict.eligible);
    assert!(verdict.missing_chapters.is_empty());
    assert!(verdict.missing_terms.is_empty());
}

#[test]
fn services_can_share_one_cache() {
    let conn = open_db_in_memory().unwrap();
    let cache = GraphCache::new();
    let writer = KnowledgeGraphService::with_cache(
        SqliteGraphRepository::try_new(&conn).unwrap(),
        cache.clone(),
    );
    CourseImportService::new(&writer)
        .import_course(ALGORITHMS, false)
        .unwrap();

    let reader =
        KnowledgeGraphService::with_cache(SqliteGraphRepository::try_new(&conn).unwrap(), cache);
    let from_writer = writer.read_model("algo").unwrap().unwrap();
    let from_reader = reader.read_model("algo").unwrap().unwrap();
    assert!(Arc::ptr_eq(&from_writer, &from_reader));
}

#[test]
fn chapter_difficulty_is_stored_with_the_graph() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    CourseImportService::new(&graphs)
        .import_course(ALGORITHMS, false)
        .unwrap();

    let difficulties = graphs.chapter_difficulties("algo").unwrap();
    assert_eq!(difficulties.get("ch1"), Some(&1));
    assert_eq!(difficulties.get("ch2"), Some(&3));
    assert_eq!(difficulties.get("ghost"), None);
    assert_eq!(difficulties.len(), 2);
}

#[test]
fn corrupt_role_rows_surface_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let graphs = graph_service(&conn);
    CourseImportService::new(&graphs)
        .import_course(ALGORITHMS, false)
        .unwrap();
    conn.execute_batch("PRAGMA ignore_check_constraints = ON;").unwrap();
    conn.execute(
        "UPDATE chapter_terms SET role = 'teaches' WHERE course_id = 'algo' AND term_key = 'algorithm';",
        [],
    )
    .unwrap();

    let cold = graph_service(&conn);
    match cold.read_model("algo") {
        Err(GraphServiceError::Repo(RepoError::InvalidData(message))) => {
            assert!(message.contains("teaches"))
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn term_pairs_with_requires_role_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGraphRepository::try_new(&conn).unwrap();
    let bad = ChapterTermPair {
        chapter_id: "ch1".into(),
        term_key: "t".into(),
        role: EdgeType::Requires,
    };
    assert!(matches!(
        repo.replace_course_graph("c", &[], &[], &[bad]),
        Err(RepoError::InvalidInput(_))
    ));
}
