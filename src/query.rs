//! Postgres protocol request operations.
//!
//! The extended query flow: [`send_batch`] writes a
//! `Parse`/`Bind`/`Execute` triple per query, [`send_sync`] closes the
//! request round, then each execute's rows arrive through
//! [`read_next_data`] and the round is confirmed over
//! [`read_ready_for_query`].
//!
//! <https://www.postgresql.org/docs/current/protocol-flow.html#PROTOCOL-FLOW-EXT-QUERY>
use crate::{
    Connection, Error, Result,
    connection::DataMessage,
    postgres::{BackendMessage, FieldDescription, Oid, PgFormat, frontend},
    statement::StatementName,
};

/// One query of a batch.
///
/// Parameter values are raw wire bytes in `param_format`; a value of
/// [`None`] binds an SQL NULL. Value encoding is the caller's concern.
#[derive(Debug)]
pub struct BatchQuery<'a> {
    pub sql: &'a str,
    /// Parameter type oids to prespecify for `Parse`. May be empty to let
    /// the server infer them.
    pub param_oids: &'a [Oid],
    pub params: &'a [Option<&'a [u8]>],
    pub param_format: PgFormat,
    pub result_format: PgFormat,
}

impl<'a> BatchQuery<'a> {
    /// A parameterless text-format query.
    pub fn new(sql: &'a str) -> Self {
        Self {
            sql,
            param_oids: &[],
            params: &[],
            param_format: PgFormat::Text,
            result_format: PgFormat::Text,
        }
    }
}

/// Buffer a `Parse`/`Bind`/`Execute` triple for every query of the batch.
///
/// Everything runs on the unnamed statement and portal; `Execute` carries
/// no row limit. No `Sync` is emitted and nothing is flushed; follow with
/// [`send_sync`] (or use [`send_batch_and_sync`]).
pub fn send_batch(conn: &mut Connection, queries: &[BatchQuery]) {
    let stmt = StatementName::unnamed();
    for query in queries {
        conn.send(frontend::Parse {
            prepare_name: stmt.as_str(),
            sql: query.sql,
            oids: query.param_oids,
        });
        conn.send(frontend::Bind {
            portal_name: "",
            stmt_name: stmt.as_str(),
            param_format: query.param_format,
            params: query.params,
            result_format: query.result_format,
        });
        conn.send(frontend::Execute { portal_name: "", max_rows: 0 });
    }
}

/// Emit a `Sync` barrier and flush.
///
/// The server answers every `Sync` with exactly one `ReadyForQuery` once
/// the preceding requests are done.
pub async fn send_sync(conn: &mut Connection) -> Result<()> {
    conn.send(frontend::Sync);
    conn.flush().await?;
    Ok(())
}

/// Emit a `Flush` and flush the stream.
///
/// `Flush` asks the server to deliver any pending responses without
/// closing the request round.
pub async fn send_flush(conn: &mut Connection) -> Result<()> {
    conn.send(frontend::Flush);
    conn.flush().await?;
    Ok(())
}

/// [`send_batch`] followed by [`send_sync`].
pub async fn send_batch_and_sync(conn: &mut Connection, queries: &[BatchQuery<'_>]) -> Result<()> {
    send_batch(conn, queries);
    send_sync(conn).await
}

/// Send a simple query message.
///
/// The server runs every statement of `sql` and answers with a
/// `ReadyForQuery` at the end; rows arrive on the data queue exactly as in
/// the extended flow.
pub async fn send_simple_query(conn: &mut Connection, sql: &str) -> Result<()> {
    conn.send(frontend::Query { sql });
    conn.flush().await?;
    Ok(())
}

/// Dequeue the next data queue entry.
///
/// One entry per `Execute` (or per statement of a simple query), in the
/// order they were sent: the accumulated rows on success, the server's
/// error otherwise.
pub async fn read_next_data(conn: &mut Connection) -> Result<DataMessage> {
    conn.read_data().await
}

/// Drain the control queue until `ReadyForQuery`.
///
/// Returns the first server error seen in the drained prefix, if any.
pub async fn read_ready_for_query(conn: &mut Connection) -> Result<()> {
    let mut first_error = None;

    loop {
        match conn.read_control().await? {
            BackendMessage::ReadyForQuery(_) => break,
            BackendMessage::ErrorResponse(err) if first_error.is_none() => {
                first_error = Some(err.diagnostic);
            }
            _ => {}
        }
    }

    match first_error {
        Some(diagnostic) => Err(Error::database(diagnostic)),
        None => Ok(()),
    }
}

/// Describe a statement without executing it.
///
/// Parses `sql` as the unnamed statement and asks the server to describe
/// it: the parameter type oids, and the fields of the rows it would return
/// (empty for a statement that returns no rows).
pub async fn describe_statement(
    conn: &mut Connection,
    sql: &str,
) -> Result<(Vec<Oid>, Vec<FieldDescription>)> {
    let stmt = StatementName::unnamed();
    conn.send(frontend::Parse { prepare_name: stmt.as_str(), sql, oids: &[] });
    conn.send(frontend::Describe { kind: b'S', name: stmt.as_str() });
    conn.send(frontend::Sync);
    conn.flush().await?;

    let mut oids = Vec::new();
    let mut fields = Vec::new();
    let mut first_error = None;

    loop {
        match conn.read_control().await? {
            BackendMessage::ReadyForQuery(_) => break,
            BackendMessage::ParameterDescription(params) => oids = params.oids,
            BackendMessage::RowDescription(row) => fields = row.fields,
            // the statement returns no rows
            BackendMessage::NoData(_) => fields = Vec::new(),
            BackendMessage::ErrorResponse(err) if first_error.is_none() => {
                first_error = Some(err.diagnostic);
            }
            _ => {}
        }
    }

    match first_error {
        Some(diagnostic) => Err(Error::database(diagnostic)),
        None => Ok((oids, fields)),
    }
}

/// Parse `sql` under a generated statement name, reusing the name if this
/// connection prepared it before.
///
/// The name is recorded in the connection's statement storage; when the
/// storage evicts an older statement, that statement is closed on the
/// server before returning.
pub async fn prepare_cached(conn: &mut Connection, sql: &str) -> Result<StatementName> {
    if let Some(name) = conn.statements().get(sql) {
        return Ok(name);
    }

    let name = StatementName::next();
    conn.send(frontend::Parse { prepare_name: name.as_str(), sql, oids: &[] });
    conn.send(frontend::Sync);
    conn.flush().await?;
    read_ready_for_query(conn).await?;

    if let Some(evicted) = conn.statements().insert(sql, name.clone()) {
        conn.send(frontend::Close { variant: b'S', name: evicted.as_str() });
        conn.send(frontend::Sync);
        conn.flush().await?;
        read_ready_for_query(conn).await?;
    }

    Ok(name)
}
