//! MonetDB connection.
use std::{collections::HashMap, fmt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc::UnboundedSender, oneshot},
};

use crate::{
    Result,
    error::ErrorKind,
    net::Socket,
    response::ResponseFuture,
    row::TableResult,
    session::{Environment, Session},
    statement::{PreparedStatement, prepare_command},
};

mod config;
mod worker;

pub use config::{Config, ParseError};
use worker::{WorkerFuture, WorkerMessage};

/// A handle to a single MonetDB connection.
///
/// The connection is driven by a background task, handles are cheap to clone
/// and every clone shares the same single flight queue. Commands from all
/// handles are answered in the order they are submitted.
///
/// Dropping every handle closes the connection after queued work completes.
#[derive(Clone)]
pub struct Connection {
    send: UnboundedSender<WorkerMessage>,
    env: Environment,
}

impl Connection {
    /// Connect using url, see [`Config::parse`].
    pub async fn connect(url: &str) -> Result<Connection> {
        Self::connect_with(Config::parse(url)?).await
    }

    /// Connect using config from environment variable, see [`Config::from_env`].
    pub async fn connect_env() -> Result<Connection> {
        Self::connect_with(Config::from_env()).await
    }

    /// Connect with given config.
    ///
    /// Resolves after login, session setup and a probe query succeeded.
    pub async fn connect_with(config: Config) -> Result<Connection> {
        let socket = match &config.socket {
            Some(path) => Socket::connect_socket(path).await,
            None => Socket::connect_tcp(&config.host, config.port).await,
        };
        let socket = socket.map_err(|e| crate::Error::from(e).context("failed to connect"))?;
        Self::connect_io(socket, config).await
    }

    /// Run the protocol over an already established transport.
    ///
    /// Requires a tokio runtime, the connection is driven by a spawned task.
    pub async fn connect_io<IO>(io: IO, config: Config) -> Result<Connection>
    where
        IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (connect, ready) = oneshot::channel();
        let (send, worker) = WorkerFuture::new(io, Session::new(config, connect));
        tokio::spawn(worker);

        match ready.await {
            Ok(Ok(env)) => Ok(Self { send, env }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ErrorKind::Closed.into()),
        }
    }

    /// Submit a command.
    ///
    /// Sql commands are sent as `s<command>;`, `raw` commands are sent verbatim.
    /// The command is queued immediately, the returned future only waits for
    /// the response.
    pub fn submit(&self, command: impl Into<String>, raw: bool) -> ResponseFuture {
        let (send, future) = ResponseFuture::channel();
        let command = command.into();
        // on error, the dropped sender resolves the future as closed
        let _ = self.send.send(WorkerMessage::Submit { command, raw, send });
        future
    }

    /// Submit sql query.
    pub fn query(&self, sql: impl Into<String>) -> ResponseFuture {
        self.submit(sql, false)
    }

    /// Submit protocol directive, e.g. `Xreply_size 100`.
    pub fn command(&self, directive: impl Into<String>) -> ResponseFuture {
        self.submit(directive, true)
    }

    /// Submit sql query which must return a table.
    pub async fn fetch(&self, sql: impl Into<String>) -> Result<TableResult> {
        self.query(sql).await?.into_table()
    }

    /// Prepare a statement.
    ///
    /// `PREPARE` is prepended unless `sql` already starts with it.
    pub async fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        let table = self.query(prepare_command(sql)).await?.into_table()?;
        Ok(PreparedStatement::new(self.clone(), table))
    }

    /// Server environment, as returned by `SELECT * FROM env()` on connect.
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Close the connection.
    ///
    /// Commands submitted before this call are still answered, commands
    /// submitted after it fail with [`ErrorKind::Closing`]. Resolves after the
    /// transport is shut down.
    pub async fn close(&self) -> Result<()> {
        let (send, future) = ResponseFuture::channel();
        if self.send.send(WorkerMessage::Close(send)).is_err() {
            return Ok(());
        }
        match future.await {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.kind(), ErrorKind::Closed) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_handle(send: UnboundedSender<WorkerMessage>, env: Environment) -> Connection {
    Connection { send, env }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.send.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

    use super::*;
    use crate::{
        Param,
        mapi::{
            BlockDecoder,
            auth::{Challenge, Login},
            block,
        },
        value::Value,
    };

    const CHALLENGE: &str = "fQm5bmYQw:merovingian:9:RIPEMD160,SHA512,SHA384,SHA256,SHA224:LIT:SHA512:";
    const ENV: &str = "&1 0 1 2 1\n\
        % .env,\t.env # table_name\n\
        % name,\tvalue # name\n\
        % varchar,\tvarchar # type\n\
        % 10,\t4 # length\n\
        [ \"gdk_dbname\",\t\"demo\"\t]\n";

    fn single(value: &str) -> String {
        format!("&1 0 1 1 1\n% .L # table_name\n% v # name\n% int # type\n% 2 # length\n[ {value}\t]\n")
    }

    /// Scripted server speaking the block framing over an in memory pipe.
    struct FakeServer {
        io: DuplexStream,
        buf: BytesMut,
        decoder: BlockDecoder,
    }

    impl FakeServer {
        fn new() -> (FakeServer, DuplexStream) {
            let (client, io) = duplex(4096);
            (FakeServer { io, buf: BytesMut::new(), decoder: BlockDecoder::new() }, client)
        }

        async fn send(&mut self, message: &str) {
            let mut out = BytesMut::new();
            // small blocks, so messages span several of them
            block::encode(message, 32, &mut out);
            self.io.write_all(&out).await.unwrap();
        }

        async fn recv(&mut self) -> String {
            loop {
                if let Some(message) = self.decoder.decode(&mut self.buf).unwrap() {
                    return message;
                }
                let n = self.io.read_buf(&mut self.buf).await.unwrap();
                assert_ne!(n, 0, "client hung up");
            }
        }

        async fn expect(&mut self, message: &str) {
            assert_eq!(self.recv().await, message);
        }

        async fn login(&mut self) {
            self.send(CHALLENGE).await;
            let config = Config::new();
            let expect = Login::from(&config).respond(&Challenge::parse(CHALLENGE));
            self.expect(&expect).await;
            self.send("").await;

            self.expect("Xreply_size -1").await;
            self.send("").await;
            self.expect("Xauto_commit 1").await;
            self.send("").await;
            self.expect("sSELECT * FROM env();").await;
            self.send(ENV).await;
            self.expect("sSELECT 42;").await;
            self.send(&single("42")).await;
        }

        async fn eof(&mut self) {
            let n = self.io.read_buf(&mut self.buf).await.unwrap();
            assert_eq!(n, 0);
        }
    }

    #[tokio::test]
    async fn connect_and_query() {
        let (mut server, client) = FakeServer::new();
        let server = tokio::spawn(async move {
            server.login().await;
            server.expect("sSELECT 1;").await;
            server.send(&single("1")).await;
            server
        });

        let conn = Connection::connect_io(client, Config::new()).await.unwrap();
        assert_eq!(conn.env().get("gdk_dbname").map(String::as_str), Some("demo"));

        let table = conn.fetch("SELECT 1").await.unwrap();
        assert_eq!(table.row(0).unwrap().try_get("v").unwrap(), &Value::Int(1));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn pipelined_in_order() {
        let (mut server, client) = FakeServer::new();
        let server = tokio::spawn(async move {
            server.login().await;
            for i in 1..=3 {
                server.expect(&format!("sSELECT {i};")).await;
                server.send(&single(&i.to_string())).await;
            }
        });

        let conn = Connection::connect_io(client, Config::new()).await.unwrap();
        let r1 = conn.query("SELECT 1");
        let r2 = conn.clone().query("SELECT 2");
        let r3 = conn.query("SELECT 3");

        let (r3, r2, r1) = (r3.await.unwrap(), r2.await.unwrap(), r1.await.unwrap());
        for (i, response) in [r1, r2, r3].into_iter().enumerate() {
            let rows = response.into_table().unwrap().into_rows();
            assert_eq!(rows, [vec![Value::Int(i as i64 + 1)]]);
        }

        server.await.unwrap();
    }

    #[tokio::test]
    async fn query_error_does_not_break_queue() {
        let (mut server, client) = FakeServer::new();
        let server = tokio::spawn(async move {
            server.login().await;
            server.expect("sSELEC 1;").await;
            server.send("!42000!syntax error, unexpected IDENT in: \"selec\"\n").await;
            server.expect("sSELECT 2;").await;
            server.send(&single("2")).await;
        });

        let conn = Connection::connect_io(client, Config::new()).await.unwrap();
        let bad = conn.query("SELEC 1");
        let good = conn.query("SELECT 2");

        let err = bad.await.unwrap_err();
        let ErrorKind::Database(db) = err.kind() else {
            panic!("expected database error, got {err}");
        };
        assert_eq!(db.code(), Some("42000"));
        assert!(good.await.unwrap().is_table());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn auth_failure() {
        let (mut server, client) = FakeServer::new();
        let server = tokio::spawn(async move {
            server.send(CHALLENGE).await;
            server.recv().await;
            server.send("!InvalidCredentialsException:checkCredentials:invalid credentials for user 'monetdb'\n").await;
            server.eof().await;
        });

        let err = Connection::connect_io(client, Config::new()).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Auth(_)));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn close_waits_for_queue() {
        let (mut server, client) = FakeServer::new();
        let server = tokio::spawn(async move {
            server.login().await;
            server.expect("sCREATE TABLE t (i int);").await;
            server.send("&3 2 -1\n").await;
            server.expect("sSELECT 42;").await;
            server.send(&single("42")).await;
            server.eof().await;
        });

        let conn = Connection::connect_io(client, Config::new()).await.unwrap();
        let create = conn.query("CREATE TABLE t (i int)");
        conn.close().await.unwrap();

        assert!(!create.await.unwrap().is_table());

        let err = conn.query("SELECT 1").await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed | ErrorKind::Closing));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn drop_closes() {
        let (mut server, client) = FakeServer::new();
        let server = tokio::spawn(async move {
            server.login().await;
            server.expect("sSELECT 42;").await;
            server.send(&single("42")).await;
            server.eof().await;
        });

        let conn = Connection::connect_io(client, Config::new()).await.unwrap();
        drop(conn);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn server_hangup() {
        let (mut server, client) = FakeServer::new();
        let server = tokio::spawn(async move {
            server.login().await;
            server.expect("sSELECT 1;").await;
            drop(server);
        });

        let conn = Connection::connect_io(client, Config::new()).await.unwrap();
        let first = conn.query("SELECT 1");
        let second = conn.query("SELECT 2");

        assert!(matches!(first.await.unwrap_err().kind(), ErrorKind::Io(_)));
        assert!(matches!(second.await.unwrap_err().kind(), ErrorKind::Closed));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn prepare_and_exec() {
        let (mut server, client) = FakeServer::new();
        let server = tokio::spawn(async move {
            server.login().await;
            server.expect("sPREPARE INSERT INTO people VALUES (?, ?);").await;
            server
                .send(
                    "&5 7 2 6 2\n\
                    % .prepare,\t.prepare,\t.prepare,\t.prepare,\t.prepare,\t.prepare # table_name\n\
                    % type,\tdigits,\tscale,\tschema,\ttable,\tcolumn # name\n\
                    % varchar,\tint,\tint,\tstr,\tstr,\tstr # type\n\
                    % 7,\t2,\t1,\t0,\t1,\t1 # length\n\
                    [ \"int\",\t32,\t0,\tNULL,\tNULL,\tNULL\t]\n\
                    [ \"varchar\",\t20,\t0,\tNULL,\tNULL,\tNULL\t]\n",
                )
                .await;
            server.expect("sEXEC 7(42, 'O\\'Brien');").await;
            server.send("&2 1 -1\n").await;
            server.expect("sEXEC 7(NULL, 'x');").await;
            server.send("&2 1 -1\n").await;
        });

        let conn = Connection::connect_io(client, Config::new()).await.unwrap();
        let stmt = conn.prepare("INSERT INTO people VALUES (?, ?)").await.unwrap();
        assert_eq!(stmt.id(), 7);

        stmt.bind(42).bind("O'Brien").await.unwrap();
        stmt.exec(&[Param::Null, Param::Text("x".into())]).await.unwrap();

        server.await.unwrap();
    }
}
