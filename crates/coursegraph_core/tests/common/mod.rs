#![allow(dead_code)]

use coursegraph_core::{KnowledgeGraphService, SqliteGraphRepository};
use rusqlite::Connection;

pub const ALGORITHMS: &str = r#"# Algorithms course
@meta version="1" course="algo" title="Algorithms"
@term key="algorithm"
@term key="complexity"
@definition term="algorithm"
A finite procedure.
@definition term="complexity"
How resource use grows with input.
@chapter id="ch1" title="Intro" difficulty="1" introduces="algorithm"
What an algorithm is.
@chapter id="ch2" title="Analysis" difficulty="3" requires="ch1"
Measuring @complexity of code.
@question id="q1" chapter="ch1" type="single"
Which one is an algorithm?
@key question="q1"
B
"#;

/// Same course with `ch1` also requiring `ch2`.
pub const ALGORITHMS_CYCLE: &str = r#"@meta version="2" course="algo"
@term key="algorithm"
@term key="complexity"
@definition term="algorithm"
A finite procedure.
@definition term="complexity"
How resource use grows with input.
@chapter id="ch1" title="Intro" requires="ch2" introduces="algorithm"
What an algorithm is.
@chapter id="ch2" title="Analysis" requires="ch1"
Measuring @complexity of code.
"#;

pub fn graph_service(conn: &Connection) -> KnowledgeGraphService<SqliteGraphRepository<'_>> {
    KnowledgeGraphService::new(SqliteGraphRepository::try_new(conn).unwrap())
}

pub fn count_rows(conn: &Connection, table: &str, course_id: &str) -> i64 {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE course_id = ?1;"),
        [course_id],
        |row| row.get(0),
    )
    .unwrap()
}
