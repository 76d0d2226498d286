use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tsql_query::prelude::*;

/// Answers every statement with the same rows and remembers what it ran.
struct Canned {
    result: SqlResult,
    seen: Mutex<Vec<Statement>>,
}

impl Canned {
    fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            result: SqlResult::new(columns.iter().map(|c| c.to_string()).collect(), rows),
            seen: Mutex::new(vec![]),
        }
    }

    async fn statements(&self) -> Vec<Statement> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl Executor for Canned {
    async fn execute(&self, statement: &Statement) -> QueryResult<SqlResult> {
        self.seen.lock().await.push(statement.clone());
        Ok(self.result.clone())
    }
}

#[tokio::test]
async fn run_sends_the_built_statement() {
    let executor = Canned::new(&["Name"], vec![vec![json!("Ada")], vec![json!("Grace")]]);
    let mut graph = QueryGraph::new();
    let id = graph
        .from("Person")
        .select(["Name"])
        .filter_value("Age", SqlOperator::GreaterThan, 30)
        .id();

    let result = graph.run(id, &executor, &BuildOptions::default()).await.unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.as_maps()[1]["Name"], json!("Grace"));

    let seen = executor.statements().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].sql(),
        "SELECT\n   [Person].[Name]\nFROM [Person]\nWHERE [Person].[Age] > @p1"
    );
    assert_eq!(seen[0].params(), &[SqlValue::Int(30)]);
}

#[tokio::test]
async fn json_results_are_parsed() {
    let executor = Canned::new(
        &["JSON_F52E2B61-18A1-11d1-B105-00805F49916B"],
        vec![vec![json!(r#"[{"Name":"Ada"},"#)], vec![json!(r#"{"Name":"Grace"}]"#)]],
    );
    let mut graph = QueryGraph::new();
    let query = graph.from("Person").select(["Name"]);

    let options = BuildOptions::new().for_json(ForJson::path());
    let result = query.run(&executor, &options).await.unwrap();
    assert_eq!(
        result.json().unwrap(),
        json!([{ "Name": "Ada" }, { "Name": "Grace" }])
    );
    assert!(executor.statements().await[0]
        .sql()
        .ends_with("\nFOR JSON PATH"));
}

#[tokio::test]
async fn check_columns_reads_the_catalog() {
    let executor = Canned::new(&["COLUMN_NAME"], vec![vec![json!("Id")], vec![json!("Name")]]);
    let mut graph = QueryGraph::new();
    let id = graph
        .from(Table::with_schema("dbo", "Person"))
        .select_all()
        .check_columns(&executor)
        .await
        .unwrap()
        .id();

    let lookup = &executor.statements().await[0];
    assert_eq!(
        lookup.sql(),
        "SELECT\n\
         \x20  [C].[COLUMN_NAME]\n\
         FROM [INFORMATION_SCHEMA].[COLUMNS] AS [C]\n\
         WHERE [C].[TABLE_NAME] = @p1\n\
         \x20 AND [C].[TABLE_SCHEMA] = @p2\n\
         ORDER BY [C].[ORDINAL_POSITION] ASC"
    );
    assert_eq!(
        lookup.params(),
        &[SqlValue::from("Person"), SqlValue::from("dbo")]
    );

    let sql = graph.build(id, &BuildOptions::default()).unwrap();
    assert_eq!(
        sql.sql(),
        "SELECT\n   [Person].[Id]\n  ,[Person].[Name]\nFROM [dbo].[Person]"
    );
}

#[tokio::test]
async fn check_columns_defaults_to_the_current_schema() {
    let executor = Canned::new(&["COLUMN_NAME"], vec![vec![json!("Id")]]);
    let mut graph = QueryGraph::new();
    graph
        .from("Person")
        .select_all()
        .check_columns(&executor)
        .await
        .unwrap();

    let lookup = &executor.statements().await[0];
    assert!(lookup
        .sql()
        .contains("\n  AND [C].[TABLE_SCHEMA] = SCHEMA_NAME()\n"));
    assert_eq!(lookup.params().len(), 1);
}

#[tokio::test]
async fn check_columns_needs_a_table() {
    let executor = Canned::new(&["COLUMN_NAME"], vec![vec![json!("Id")]]);
    let mut graph = QueryGraph::new();
    let people = graph.from("Person").select(["Id"]).id();

    let err = graph
        .from(people)
        .alias("Outer")
        .select(["Id"])
        .check_columns(&executor)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::NotATable { ref alias } if alias == "Outer"));
    assert!(executor.statements().await.is_empty());
}

#[tokio::test]
async fn check_columns_of_an_unknown_table() {
    let executor = Canned::new(&["COLUMN_NAME"], vec![]);
    let mut graph = QueryGraph::new();

    let err = graph
        .from(Table::with_schema("dbo", "Missing"))
        .select_all()
        .check_columns(&executor)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::NoCatalogColumns { ref table } if table == "dbo.Missing"));
    assert_eq!(
        err.to_string(),
        "No columns found in the catalog for `dbo.Missing`"
    );
}
