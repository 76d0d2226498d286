use tsql_query::prelude::*;

fn build(graph: &QueryGraph, id: QueryId) -> String {
    graph
        .build(id, &BuildOptions::default())
        .unwrap()
        .sql()
        .to_string()
}

#[test]
fn top_with_filter() {
    let mut graph = QueryGraph::new();
    let adults = graph
        .select(["Name"])
        .from("Person")
        .filter("Age > 18")
        .top(10)
        .id();

    assert_eq!(
        build(&graph, adults),
        "SELECT TOP(10)\n   [Person].[Name]\nFROM [Person]\nWHERE Age > 18"
    );
}

#[test]
fn aliases_only_when_names_differ() {
    let mut graph = QueryGraph::new();
    let people = graph
        .from(Table::with_schema("dbo", "Person").alias("P"))
        .select(vec![
            Column::new("Name"),
            Column::new("Name").alias("Name"),
            Column::new("BirthDate").alias("Born"),
            Column::expr("Upper([{0}].[Name])", "Shout"),
        ])
        .id();

    assert_eq!(
        build(&graph, people),
        "SELECT\n   [P].[Name]\n  ,[P].[Name]\n  ,[P].[BirthDate] AS [Born]\n  ,Upper([P].[Name]) AS [Shout]\nFROM [dbo].[Person] AS [P]"
    );
}

#[test]
fn wildcards_and_indexed_views() {
    let mut graph = QueryGraph::new();
    let totals = graph
        .query()
        .from_indexed_view(Table::new("OrderTotals"))
        .select_all_of_source()
        .id();

    assert_eq!(
        build(&graph, totals),
        "SELECT\n   [OrderTotals].*\nFROM [OrderTotals] WITH (NOEXPAND)"
    );
}

#[test]
fn aggregates_derive_group_by() {
    let mut graph = QueryGraph::new();
    let per_city = graph
        .from(Table::new("Person").alias("p"))
        .select(vec![
            Column::new("City"),
            func::count(),
            func::max("Age"),
            Column::expr("Year([{0}].[BirthDate])", "Born"),
        ])
        .id();

    let sql = build(&graph, per_city);
    assert!(sql.contains("  ,Count(*) AS [Count]\n  ,Max([p].[Age]) AS [Max_Age]"));
    assert!(sql.ends_with("GROUP BY [p].[City], Year([p].[BirthDate])"));
    assert_eq!(sql.matches("GROUP BY").count(), 1);
}

#[test]
fn joins_push_their_own_scope() {
    let mut graph = QueryGraph::new();
    let people = graph
        .from(Table::new("Person").alias("o"))
        .select(["Name"])
        .join_columns(
            JoinKind::Left,
            Table::new("Pet").alias("p"),
            "OwnerId",
            "Id",
            vec![Column::new("Name").alias("PetName")],
        )
        .join_on(
            JoinKind::Inner,
            Table::new("Address").alias("a"),
            "[{0}].[PersonId] = [{1}].[Id]",
            Vec::<Column>::new(),
        )
        .cross_join(Table::new("Settings"), vec!["Locale"])
        .id();

    assert_eq!(
        build(&graph, people),
        "SELECT\n   [o].[Name]\n  ,[p].[Name] AS [PetName]\n  ,[Settings].[Locale]\nFROM [Person] AS [o]\n  LEFT JOIN [Pet] AS [p]\n    ON [p].[OwnerId] = [o].[Id]\n  INNER JOIN [Address] AS [a]\n    ON [a].[PersonId] = [o].[Id]\n  CROSS JOIN [Settings]"
    );
}

#[test]
fn join_pairs_must_match() {
    let mut graph = QueryGraph::new();
    let people = graph
        .from("Person")
        .select(["Name"])
        .join_columns(
            JoinKind::Inner,
            "Pet",
            vec!["OwnerId", "Kind"],
            "Id",
            Vec::<Column>::new(),
        )
        .id();

    assert!(matches!(
        graph.build(people, &BuildOptions::default()),
        Err(QueryError::ColumnCountMismatch { left: 2, right: 1 })
    ));
}

#[test]
fn filter_values_are_bound() {
    let mut graph = QueryGraph::new();
    let people = graph
        .from("Person")
        .select(["Name"])
        .filter_value("Name", SqlOperator::Like, "O'Brien%")
        .filter_value("Nickname", SqlOperator::AutoEquals, SqlValue::Null)
        .filter_value_if(false, "Age", SqlOperator::GreaterThan, 3)
        .filter_in("Age", vec![30, 40])
        .filter_not_in("City", Vec::<String>::new())
        .filter_not_null("Email")
        .filter_if(true, or(vec![Predicate::from("1 = 0"), Predicate::is_null("Phone")]).unwrap())
        .id();

    let statement = graph.build(people, &BuildOptions::default()).unwrap();
    assert_eq!(
        statement.sql(),
        "SELECT\n   [Person].[Name]\nFROM [Person]\n\
         WHERE [Person].[Name] LIKE @p1\n\
         \x20 AND [Person].[Nickname] IS NULL\n\
         \x20 AND [Person].[Age] IN (@p2, @p3)\n\
         \x20 AND [Person].[City] NOT IN (SELECT NULL WHERE 1 = 0)\n\
         \x20 AND [Person].[Email] IS NOT NULL\n\
         \x20 AND (1 = 0 OR [Person].[Phone] IS NULL)"
    );
    assert_eq!(
        statement.params(),
        &[
            SqlValue::Text("O'Brien%".to_string()),
            SqlValue::Int(30),
            SqlValue::Int(40)
        ]
    );
    assert!(statement
        .to_script()
        .starts_with("DECLARE @p1 NVARCHAR(MAX) = N'O''Brien%';\nDECLARE @p2 BIGINT = 30;\n"));
}

#[test]
fn empty_in_list() {
    let mut graph = QueryGraph::new();
    let people = graph
        .from("Person")
        .select(["Name"])
        .filter_in("Id", Vec::<i64>::new())
        .id();

    assert!(build(&graph, people).ends_with("WHERE [Person].[Id] IN (SELECT NULL)"));
}

#[test]
fn custom_predicates_see_the_scope_stack() {
    let mut graph = QueryGraph::new();
    let people = graph
        .from(Table::new("Person").alias("o"))
        .select(["Name"])
        .filter_with(|ctx| Ok(format!("[{}].[Deleted] = 0 /* depth {} */", ctx.alias(0)?, ctx.depth())))
        .id();

    assert!(build(&graph, people).ends_with("WHERE [o].[Deleted] = 0 /* depth 1 */"));
}

#[test]
fn correlated_subqueries_reach_outer_scopes() {
    let mut graph = QueryGraph::new();
    let toys = graph
        .from(Table::new("Toy").alias("t"))
        .select(["Name"])
        .filter("[{0}].[PetId] = [{1}].[Id]")
        .filter("[{0}].[OwnerId] = [{2}].[Id]")
        .id();
    let pets = graph
        .from(Table::new("Pet").alias("p"))
        .select(vec![
            Column::new("Name"),
            Column::subquery(toys, "Toys", ColumnOptions::new().for_json(ForJson::path())),
        ])
        .filter_columns("OwnerId", "Id")
        .id();
    let people = graph
        .from(Table::new("Person").alias("o"))
        .select(vec![
            Column::new("Name"),
            Column::subquery(pets, "Pets", ColumnOptions::new().for_json(ForJson::path())),
        ])
        .id();

    let sql = graph
        .build(people, &BuildOptions::new().indentation("\t"))
        .unwrap()
        .sql()
        .to_string();

    assert_eq!(
        sql,
        "SELECT\n   [o].[Name]\n  ,(\n\
         \tSELECT\n\
         \t   [p].[Name]\n\
         \t  ,(\n\
         \t\tSELECT\n\
         \t\t   [t].[Name]\n\
         \t\tFROM [Toy] AS [t]\n\
         \t\tWHERE [t].[PetId] = [p].[Id]\n\
         \t\t  AND [t].[OwnerId] = [o].[Id]\n\
         \t\tFOR JSON PATH\n\
         \t) AS [Toys]\n\
         \tFROM [Pet] AS [p]\n\
         \tWHERE [p].[OwnerId] = [o].[Id]\n\
         \tFOR JSON PATH\n\
         ) AS [Pets]\n\
         FROM [Person] AS [o]"
    );
    assert!(!sql.contains(tsql_query::INDENT_PLACEHOLDER));
}

#[test]
fn scope_beyond_the_stack_is_an_error() {
    let mut graph = QueryGraph::new();
    let people = graph.from("Person").select(["Name"]).filter("[{1}].[Id] = 1").id();

    assert!(matches!(
        graph.build(people, &BuildOptions::default()),
        Err(QueryError::ScopeOutOfRange { level: 1, depth: 1 })
    ));
}

#[test]
fn count_beside_paginated_json() {
    let mut graph = QueryGraph::new();
    let people = graph
        .from("Person")
        .select(vec![Column::new("Name").asc(0), Column::new("Age")])
        .filter("[{0}].[Age] > 18")
        .id();
    let total = graph.edit(people).unwrap().as_column_count("Total").unwrap();
    let items = graph.edit(people).unwrap().as_column_with(
        "Items",
        ColumnOptions::new()
            .skip(0)
            .length(10)
            .for_json(ForJson::path()),
    );
    let page = graph.select(vec![total, items]).id();

    let sql = graph
        .build(
            page,
            &BuildOptions::new().for_json(ForJson::path().without_array_wrapper()),
        )
        .unwrap()
        .sql()
        .to_string();

    assert_eq!(
        sql,
        ";WITH [Person_0] AS (\n\
         \x20 SELECT\n\
         \x20    [Person].[Name]\n\
         \x20   ,[Person].[Age]\n\
         \x20 FROM [Person]\n\
         \x20 WHERE [Person].[Age] > 18\n\
         \x20 /* ORDER BY [Name] ASC */\n\
         )\n\
         SELECT\n\
         \x20  (\n\
         \x20 SELECT\n\
         \x20    Count(*) AS [Count]\n\
         \x20 FROM [Person_0]\n\
         ) AS [Total]\n\
         \x20 ,(\n\
         \x20 SELECT\n\
         \x20    [Person].[Name]\n\
         \x20   ,[Person].[Age]\n\
         \x20 FROM [Person]\n\
         \x20 WHERE [Person].[Age] > 18\n\
         \x20 ORDER BY [Name] ASC\n\
         \x20 OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY\n\
         \x20 FOR JSON PATH\n\
         ) AS [Items]\n\
         FOR JSON PATH, WITHOUT_ARRAY_WRAPPER"
    );
}

#[test]
fn set_operations_share_the_indentation() {
    let mut graph = QueryGraph::new();
    let archived = graph
        .from("ArchivedPerson")
        .select(["Name"])
        .order_by_clauses(vec!["[{0}].[Name]"])
        .id();
    let people = graph
        .from("Person")
        .select(["Name"])
        .union_all(archived)
        .order_by(&["Name"])
        .unwrap()
        .id();

    assert_eq!(
        build(&graph, people),
        "SELECT\n   [Person].[Name]\nFROM [Person]\nUNION ALL\nSELECT\n   [ArchivedPerson].[Name]\nFROM [ArchivedPerson]\n/* ORDER BY [ArchivedPerson].[Name] ASC */\nORDER BY [Name] ASC"
    );
}

#[test]
fn paged_branch_is_wrapped() {
    let mut graph = QueryGraph::new();
    let archived = graph
        .from("ArchivedPerson")
        .select(["Name"])
        .order_by(&["Name"])
        .unwrap()
        .range(5u64..10)
        .id();
    let people = graph
        .from("Person")
        .select(["Name"])
        .union(archived)
        .id();

    assert_eq!(
        build(&graph, people),
        "SELECT\n\
         \x20  [Person].[Name]\n\
         FROM [Person]\n\
         UNION\n\
         SELECT *\n\
         FROM (\n\
         \x20 SELECT\n\
         \x20    [ArchivedPerson].[Name]\n\
         \x20 FROM [ArchivedPerson]\n\
         \x20 ORDER BY [Name] ASC\n\
         \x20 OFFSET 5 ROWS FETCH NEXT 5 ROWS ONLY\n\
         ) AS [ArchivedPerson_0]"
    );
}

#[test]
fn window_functions() {
    let mut graph = QueryGraph::new();
    let ranked = graph
        .from(Table::new("Orders").alias("o"))
        .select(vec![
            Column::new("Total"),
            WindowFunction::new("ROW_NUMBER")
                .partition_by(vec!["CustomerId"])
                .order_by_column("Total", Direction::Desc)
                .alias("Rank"),
            Column::window(
                WindowFunction::new("SUM").arguments("[{0}].[Total]"),
                "Overall",
            ),
        ])
        .id();

    let sql = build(&graph, ranked);
    assert!(sql.contains(
        "  ,ROW_NUMBER() OVER (PARTITION BY [o].[CustomerId] ORDER BY [o].[Total] DESC) AS [Rank]\n"
    ));
    assert!(sql.contains("  ,SUM([o].[Total]) OVER () AS [Overall]\n"));
    assert!(!sql.contains("GROUP BY"));
}

#[test]
fn ordering_by_name() {
    let mut graph = QueryGraph::new();
    let people = graph
        .from(Table::new("Person").alias("o"))
        .select(vec![Column::new("Name"), Column::expr("Len([{0}].[Name])", "Length")])
        .join_columns(JoinKind::Left, Table::new("Pet").alias("p"), "OwnerId", "Id", vec!["Kind"])
        .order_by_desc(&["Length", "Kind"])
        .unwrap()
        .add_order_by_clauses(vec![OrderByClause::position(1, Direction::Asc)])
        .id();

    assert!(build(&graph, people)
        .ends_with("ORDER BY 1 ASC, Len([o].[Name]) DESC, [Kind] DESC"));

    let replaced = graph
        .from(Table::new("Person").alias("o"))
        .select(["Name"])
        .order_by_desc(&["Name"])
        .unwrap()
        .order_by_clauses(vec![OrderByClause::position(1, Direction::Asc)])
        .id();
    assert!(build(&graph, replaced).ends_with("FROM [Person] AS [o]\nORDER BY 1 ASC"));
}

#[test]
fn ordering_errors() {
    let mut graph = QueryGraph::new();
    let missing = graph.from("Person").select(["Name"]).order_by(&["Age"]);
    assert!(matches!(missing, Err(QueryError::ColumnNotFound { ref name }) if name == "Age"));

    let ambiguous = graph
        .from(Table::new("Person").alias("o"))
        .select(["Name"])
        .join_using(JoinKind::Inner, Table::new("Pet").alias("p"), "Id", vec!["Name"])
        .order_by(&["Name"]);
    match ambiguous {
        Err(QueryError::AmbiguousColumn { candidates, .. }) => {
            assert_eq!(candidates, vec!["[o].[Name]", "[p].[Name]"])
        }
        other => panic!("unexpected {:?}", other.map(|query| query.id())),
    }
}

#[test]
fn queries_without_columns_fail_at_build() {
    let mut graph = QueryGraph::new();
    let empty = graph.from("Person").id();
    let wrapper = graph
        .from("Pet")
        .select(vec![Column::subquery(empty, "Owner", ColumnOptions::new())])
        .id();

    assert!(matches!(
        graph.build(empty, &BuildOptions::default()),
        Err(QueryError::NoColumns { ref alias }) if alias == "Person"
    ));
    assert!(matches!(
        graph.build(wrapper, &BuildOptions::default()),
        Err(QueryError::NoColumns { .. })
    ));
    assert!(matches!(
        graph.edit(empty).unwrap().clean_select(Vec::<Column>::new()),
        Err(QueryError::NoColumns { .. })
    ));
}

#[test]
fn unnamed_computed_columns_fail() {
    let mut graph = QueryGraph::new();
    let people = graph
        .from("Person")
        .select(vec![Column::expr("1", "")])
        .id();

    assert!(matches!(
        graph.build(people, &BuildOptions::default()),
        Err(QueryError::MissingIdentifier)
    ));
}

#[test]
fn unknown_queries_are_rejected() {
    let mut other = QueryGraph::new();
    other.from("A").select(["Id"]).id();
    let foreign = other.from("B").select(["Id"]).id();

    let graph = QueryGraph::new();
    assert!(matches!(
        graph.build(foreign, &BuildOptions::default()),
        Err(QueryError::UnknownQuery(1))
    ));
}

#[test]
fn pre_and_trailing_query_options() {
    let mut graph = QueryGraph::new();
    let people = graph
        .from("Person")
        .select(["Name"])
        .pre_query_option("SET NOCOUNT ON;")
        .query_options("OPTION (RECOMPILE)")
        .id();

    assert_eq!(
        build(&graph, people),
        "SET NOCOUNT ON;\nSELECT\n   [Person].[Name]\nFROM [Person]\nOPTION (RECOMPILE)"
    );
}

#[test]
fn value_column_orders_the_copy() {
    let mut graph = QueryGraph::new();
    let orders = graph
        .from(Table::new("Orders").alias("o"))
        .select(vec![Column::new("Total"), Column::new("PlacedAt").desc(0)])
        .filter("[{0}].[PersonId] = [{1}].[Id]")
        .id();
    let latest = graph
        .edit(orders)
        .unwrap()
        .as_value_column("Total", "LatestTotal")
        .unwrap();
    let people = graph
        .from(Table::new("Person").alias("pe"))
        .select(vec![Column::new("Name"), latest])
        .id();

    assert_eq!(
        build(&graph, people),
        "SELECT\n   [pe].[Name]\n  ,(\n  SELECT TOP(1)\n     [o].[Total]\n  FROM [Orders] AS [o]\n  WHERE [o].[PersonId] = [pe].[Id]\n  ORDER BY [o].[PlacedAt] DESC\n) AS [LatestTotal]\nFROM [Person] AS [pe]"
    );
}
