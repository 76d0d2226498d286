use test_case::test_case;
use tsql_query::prelude::*;

fn people(graph: &mut QueryGraph, ordered: bool) -> QueryId {
    let name = if ordered {
        Column::new("Name").asc(0)
    } else {
        Column::new("Name")
    };
    graph.from("Person").select(vec![name]).id()
}

#[test_case(None, Some(10), false => "SELECT TOP(10)\n   [Person].[Name]\nFROM [Person]"; "length alone is top")]
#[test_case(Some(20), Some(10), true => "SELECT\n   [Person].[Name]\nFROM [Person]\nORDER BY [Name] ASC\nOFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"; "skip and length")]
#[test_case(Some(5), None, false => "SELECT\n   [Person].[Name]\nFROM [Person]\nORDER BY (SELECT NULL)\nOFFSET 5 ROWS"; "skip without order")]
#[test_case(None, None, true => "SELECT\n   [Person].[Name]\nFROM [Person]\nORDER BY [Name] ASC"; "outermost keeps order")]
#[test_case(None, Some(0), false => "SELECT\n   [Person].[Name]\nFROM [Person]"; "zero length")]
fn outermost_page(skip: Option<u64>, length: Option<u64>, ordered: bool) -> String {
    let mut graph = QueryGraph::new();
    let id = people(&mut graph, ordered);
    let options = BuildOptions {
        skip,
        length,
        ..BuildOptions::default()
    };
    graph.build(id, &options).unwrap().sql().to_string()
}

#[test]
fn query_range_applies_without_options() {
    let mut graph = QueryGraph::new();
    let id = graph.from("Person").select(["Name"]).range(20..30).id();

    let sql = graph.build(id, &BuildOptions::default()).unwrap();
    assert!(sql
        .sql()
        .ends_with("ORDER BY (SELECT NULL)\nOFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"));
    assert!(!sql.sql().contains("TOP("));
}

#[test]
fn options_take_precedence_over_the_query() {
    let mut graph = QueryGraph::new();
    let id = graph.from("Person").select(["Name"]).top(3).id();

    let own = graph.build(id, &BuildOptions::default()).unwrap();
    assert!(own.sql().starts_with("SELECT TOP(3)\n"));

    let overridden = graph.build(id, &BuildOptions::new().length(7)).unwrap();
    assert!(overridden.sql().starts_with("SELECT TOP(7)\n"));
}

#[test]
fn limited_subquery_keeps_its_order() {
    let mut graph = QueryGraph::new();
    let pets = graph
        .from("Pet")
        .select(vec![Column::new("Name").desc(0)])
        .id();
    let root = graph
        .from("Person")
        .select(vec![
            Column::new("Name"),
            Column::subquery(pets, "FirstPet", ColumnOptions::new().length(1)),
        ])
        .id();

    assert_eq!(
        graph.build(root, &BuildOptions::default()).unwrap().sql(),
        "SELECT\n\
         \x20  [Person].[Name]\n\
         \x20 ,(\n\
         \x20 SELECT TOP(1)\n\
         \x20    [Pet].[Name]\n\
         \x20 FROM [Pet]\n\
         \x20 ORDER BY [Name] DESC\n\
         ) AS [FirstPet]\n\
         FROM [Person]"
    );
}

#[test]
fn unlimited_subquery_comments_its_order() {
    let mut graph = QueryGraph::new();
    let pets = graph
        .from("Pet")
        .select(vec![Column::new("Name").desc(0)])
        .id();
    let root = graph
        .from("Person")
        .select(vec![Column::subquery(pets, "Pets", ColumnOptions::new())])
        .id();

    let sql = graph.build(root, &BuildOptions::default()).unwrap();
    assert!(sql.sql().contains("\n  /* ORDER BY [Name] DESC */\n) AS [Pets]"));
}

#[test]
fn json_subquery_keeps_its_order() {
    let mut graph = QueryGraph::new();
    let pets = graph
        .from("Pet")
        .select(vec![Column::new("Name").desc(0)])
        .id();
    let root = graph
        .from("Person")
        .select(vec![Column::subquery(
            pets,
            "Pets",
            ColumnOptions::new().for_json(ForJson::path()),
        )])
        .id();

    let sql = graph.build(root, &BuildOptions::default()).unwrap();
    assert!(sql
        .sql()
        .contains("\n  ORDER BY [Name] DESC\n  FOR JSON PATH\n) AS [Pets]"));
}
