use mapiro::{Connection, Param, Result};

pub async fn main() -> Result<()> {
    let conn = Connection::connect_env().await?;

    conn.query("CREATE TEMPORARY TABLE people(id int, name varchar(32)) ON COMMIT PRESERVE ROWS").await?;

    let stmt = conn.prepare("INSERT INTO people VALUES (?, ?)").await?;
    tracing::info!("prepared statement {}", stmt.id());

    stmt.bind(1).bind("O'Brien").await?;
    stmt.bind(2).bind(None::<&str>).await?;
    stmt.exec(&[Param::Int(3), Param::Text("Deez".into())]).await?;

    let stmt = conn.prepare("prepare SELECT name FROM people WHERE id = ?").await?;
    let table = stmt.bind(1).await?.into_table()?;
    assert_eq!(table.row(0).unwrap().try_get(0usize)?.as_str(), Some("O'Brien"));

    conn.close().await?;

    Ok(())
}
