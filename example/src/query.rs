use mapiro::{Connection, ErrorKind, Result, Value};

pub async fn main() -> Result<()> {
    let conn = Connection::connect_env().await?;

    // Execute

    conn.query("CREATE TEMPORARY TABLE mapiro(id int, name varchar(32), score double, ok boolean) ON COMMIT PRESERVE ROWS").await?;
    conn.query("INSERT INTO mapiro VALUES (1, 'Deez', 1.5, true)").await?;
    conn.query("INSERT INTO mapiro VALUES (2, 'Foo, \"Bar\"', NULL, false)").await?;

    // Queries

    let table = conn.fetch("SELECT * FROM mapiro ORDER BY id").await?;

    assert_eq!(table.len(), 2);
    assert_eq!(table.column_count(), 4);
    assert_eq!(table.column("name")?.type_name(), "varchar");

    let row = table.row(0).unwrap();
    assert_eq!(row.try_get("id")?, &Value::Int(1));
    assert_eq!(row.try_get("name")?.as_str(), Some("Deez"));
    assert_eq!(row.try_get("score")?.as_f64(), Some(1.5));
    assert_eq!(row.try_get("ok")?.as_bool(), Some(true));

    let row = table.row(1).unwrap();
    assert_eq!(row.try_get("name")?.as_str(), Some("Foo, \"Bar\""));
    assert!(row.try_get("score")?.is_null());

    for row in table.rows() {
        tracing::info!("{row:?}");
    }

    // Pipelined

    let futures = (0..8).map(|i| conn.query(format!("SELECT {i}"))).collect::<Vec<_>>();
    for (i, future) in futures.into_iter().enumerate() {
        let table = future.await?.into_table()?;
        assert_eq!(table.into_rows(), [vec![Value::Int(i as i64)]]);
    }

    // Error case

    let err = conn.query("SELECT foo").await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Database(_)));

    conn.query("SELECT 1").await?;

    conn.close().await?;

    Ok(())
}
