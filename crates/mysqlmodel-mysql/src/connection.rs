//! Synchronous MySQL connection.
//!
//! Implements connection establishment, authentication and the command
//! phase needed by the [`Driver`] seam: server-side prepared statements
//! with binary result sets, plus plain text statements for session
//! control (`SET NAMES`, `SET autocommit`, `ROLLBACK`).

#![allow(clippy::cast_possible_truncation)]

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use mysqlmodel_core::{
    BindType, ColumnInfo, ConnectionError, ConnectionErrorKind, ConnectionParams, Connector,
    Driver, DriverError, DriverResult, Error, ProtocolError, Result, Row, Value,
};

use crate::auth;
use crate::config::MySqlConfig;
use crate::protocol::{
    Command, MAX_PACKET_SIZE, PacketHeader, PacketReader, PacketType, PacketWriter, capabilities,
    client_error, command_payload, frame, parse_stmt_prepare_ok, server_status,
    stmt_close_payload, stmt_execute_payload, stmt_prepare_payload,
};
use crate::types::{ColumnDef, decode_binary_row};

/// Connection state in the protocol state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Awaiting the server greeting
    Connecting,
    /// Handshake response sent, auth exchange in progress
    Authenticating,
    /// Ready for commands
    Ready,
    /// An I/O or framing failure left the stream unusable
    Broken,
    /// COM_QUIT sent
    Closed,
}

/// Server greeting (Protocol::HandshakeV10).
#[derive(Debug, Clone)]
pub struct ServerHandshake {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub capabilities: u32,
    pub charset: u8,
    pub status_flags: u16,
    pub auth_plugin: String,
    /// Scramble (20 bytes, trailing NUL stripped)
    pub auth_data: Vec<u8>,
}

impl ServerHandshake {
    /// Parse the initial handshake packet.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut reader = PacketReader::new(payload);
        let protocol_version = reader
            .read_u8()
            .ok_or_else(|| protocol_error("missing protocol version"))?;
        if protocol_version == 0xFF {
            let err = server_error(payload);
            return Err(connection_error(
                ConnectionErrorKind::Refused,
                format!("server refused connection: {}", err.message),
            ));
        }
        if protocol_version != 10 {
            return Err(protocol_error(format!(
                "unsupported protocol version {protocol_version}"
            )));
        }

        let server_version = reader
            .read_null_string()
            .ok_or_else(|| protocol_error("missing server version"))?;
        let connection_id = reader
            .read_u32_le()
            .ok_or_else(|| protocol_error("missing connection id"))?;
        let mut auth_data = reader
            .read_bytes(8)
            .ok_or_else(|| protocol_error("missing scramble"))?
            .to_vec();
        reader.skip(1);
        let caps_lower = reader
            .read_u16_le()
            .ok_or_else(|| protocol_error("missing capability flags"))?;
        let charset = reader.read_u8().unwrap_or(0);
        let status_flags = reader.read_u16_le().unwrap_or(0);
        let caps_upper = reader.read_u16_le().unwrap_or(0);
        let capabilities = u32::from(caps_lower) | (u32::from(caps_upper) << 16);

        let auth_data_len = usize::from(reader.read_u8().unwrap_or(0));
        reader.skip(10);

        if capabilities & capabilities::CLIENT_SECURE_CONNECTION != 0 {
            let len = auth_data_len.saturating_sub(8).max(13);
            if let Some(rest) = reader.read_bytes(len.min(reader.remaining())) {
                auth_data.extend_from_slice(rest.strip_suffix(&[0]).unwrap_or(rest));
            }
        }

        let auth_plugin = if capabilities & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            reader.read_null_string().unwrap_or_default()
        } else {
            auth::plugins::MYSQL_NATIVE_PASSWORD.to_string()
        };

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            capabilities,
            charset,
            status_flags,
            auth_plugin,
            auth_data,
        })
    }
}

/// A server-side prepared statement.
///
/// Rows of the last execution are buffered in the handle until
/// [`Driver::fetch_all`] takes them.
#[derive(Debug)]
pub struct MySqlStatement {
    id: u32,
    sql: String,
    param_count: usize,
    columns: Vec<ColumnDef>,
    rows: Vec<Row>,
}

impl MySqlStatement {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Result columns reported by the last prepare or execution.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }
}

/// MySQL connection over any byte stream (a `TcpStream` in production).
pub struct MySqlConnection<S = TcpStream> {
    stream: S,
    state: ConnectionState,
    server: Option<ServerHandshake>,
    /// Capabilities both sides agreed on
    capabilities: u32,
    status_flags: u16,
    affected_rows: u64,
    last_insert_id: u64,
    warnings: u16,
    config: MySqlConfig,
    sequence_id: u8,
}

impl<S> std::fmt::Debug for MySqlConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("state", &self.state)
            .field("connection_id", &self.connection_id())
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("database", &self.config.database)
            .finish_non_exhaustive()
    }
}

impl<S> MySqlConnection<S> {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub fn connection_id(&self) -> u32 {
        self.server.as_ref().map_or(0, |s| s.connection_id)
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server.as_ref().map(|s| s.server_version.as_str())
    }

    /// Warnings raised by the last command.
    pub fn warnings(&self) -> u16 {
        self.warnings
    }

    /// Is a transaction open on the server?
    pub fn in_transaction(&self) -> bool {
        self.status_flags & server_status::SERVER_STATUS_IN_TRANS != 0
    }

    pub fn autocommit(&self) -> bool {
        self.status_flags & server_status::SERVER_STATUS_AUTOCOMMIT != 0
    }
}

impl MySqlConnection<TcpStream> {
    /// Open a TCP connection and run the handshake.
    pub fn connect(config: MySqlConfig) -> Result<Self> {
        let addr = config
            .socket_addr()
            .to_socket_addrs()
            .map_err(|e| {
                connection_error(
                    ConnectionErrorKind::Connect,
                    format!("cannot resolve {}: {e}", config.socket_addr()),
                )
            })?
            .next()
            .ok_or_else(|| {
                connection_error(
                    ConnectionErrorKind::Connect,
                    format!("{} resolved to no address", config.socket_addr()),
                )
            })?;

        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout).map_err(|e| {
            let kind = if e.kind() == std::io::ErrorKind::ConnectionRefused {
                ConnectionErrorKind::Refused
            } else {
                ConnectionErrorKind::Connect
            };
            Error::Connection(ConnectionError {
                kind,
                message: format!("failed to connect to {}: {e}", config.socket_addr()),
                source: Some(Box::new(e)),
            })
        })?;

        stream.set_nodelay(true).ok();
        stream.set_read_timeout(Some(config.connect_timeout)).ok();
        stream.set_write_timeout(Some(config.connect_timeout)).ok();

        let io_timeout = config.io_timeout;
        let conn = Self::handshake(stream, config)?;
        conn.stream.set_read_timeout(io_timeout).ok();
        conn.stream.set_write_timeout(io_timeout).ok();
        Ok(conn)
    }
}

impl<S: Read + Write> MySqlConnection<S> {
    /// Run the connection phase over an already open stream.
    pub fn handshake(stream: S, config: MySqlConfig) -> Result<Self> {
        let mut conn = Self {
            stream,
            state: ConnectionState::Connecting,
            server: None,
            capabilities: 0,
            status_flags: 0,
            affected_rows: 0,
            last_insert_id: 0,
            warnings: 0,
            config,
            sequence_id: 0,
        };

        let greeting = conn.read_packet()?;
        let server = ServerHandshake::parse(&greeting)?;
        if server.capabilities & capabilities::CLIENT_PROTOCOL_41 == 0 {
            return Err(protocol_error("server does not speak protocol 4.1"));
        }
        conn.capabilities = conn.config.capability_flags() & server.capabilities;
        tracing::debug!(
            server_version = %server.server_version,
            connection_id = server.connection_id,
            auth_plugin = %server.auth_plugin,
            "received server handshake"
        );

        conn.state = ConnectionState::Authenticating;
        let plugin = server.auth_plugin.clone();
        let seed = server.auth_data.clone();
        conn.server = Some(server);
        conn.send_handshake_response(&plugin, &seed)?;
        conn.authenticate(seed)?;

        conn.state = ConnectionState::Ready;
        Ok(conn)
    }

    fn send_handshake_response(&mut self, plugin: &str, seed: &[u8]) -> Result<()> {
        let password = self.config.password.as_deref().unwrap_or("");
        let (plugin, response) = match auth::scramble_for(plugin, password, seed) {
            Some(response) => (plugin, response),
            None => (
                auth::plugins::MYSQL_NATIVE_PASSWORD,
                auth::mysql_native_password(password, seed),
            ),
        };

        let mut w = PacketWriter::new();
        w.write_u32_le(self.capabilities);
        w.write_u32_le(self.config.max_packet_size);
        w.write_u8(self.config.charset);
        w.write_zeros(23);
        w.write_null_string(&self.config.user);
        if self.capabilities & capabilities::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
            w.write_lenenc_bytes(&response);
        } else {
            w.write_u8(response.len() as u8);
            w.write_bytes(&response);
        }
        if self.capabilities & capabilities::CLIENT_CONNECT_WITH_DB != 0 {
            w.write_null_string(self.config.database.as_deref().unwrap_or(""));
        }
        if self.capabilities & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            w.write_null_string(plugin);
        }
        self.write_packet(w.as_bytes())
    }

    /// Drive the auth exchange to its final OK or ERR.
    fn authenticate(&mut self, mut seed: Vec<u8>) -> Result<()> {
        let password = self.config.password.clone().unwrap_or_default();
        loop {
            let payload = self.read_packet()?;
            match payload.first().copied() {
                Some(0x00) => {
                    if let Some(ok) = PacketReader::new(&payload).parse_ok_packet() {
                        self.status_flags = ok.status_flags;
                    }
                    return Ok(());
                }
                Some(0xFF) => {
                    let err = server_error(&payload);
                    return Err(connection_error(
                        ConnectionErrorKind::Authentication,
                        format!("authentication failed: {err}"),
                    ));
                }
                Some(0xFE) => {
                    let mut reader = PacketReader::new(&payload[1..]);
                    let plugin = reader.read_null_string().unwrap_or_default();
                    let rest = reader.read_rest();
                    seed = rest.strip_suffix(&[0]).unwrap_or(rest).to_vec();
                    tracing::debug!(plugin = %plugin, "server requested auth switch");
                    let response = auth::scramble_for(&plugin, &password, &seed).ok_or_else(|| {
                        connection_error(
                            ConnectionErrorKind::Authentication,
                            format!("unsupported authentication plugin '{plugin}'"),
                        )
                    })?;
                    self.write_packet(&response)?;
                }
                Some(0x01) => match payload.get(1).copied() {
                    Some(auth::caching_sha2::FAST_AUTH_SUCCESS) => {}
                    Some(auth::caching_sha2::PERFORM_FULL_AUTH) => {
                        tracing::debug!("caching_sha2_password full authentication");
                        self.write_packet(&[auth::caching_sha2::REQUEST_PUBLIC_KEY])?;
                        let key = self.read_packet()?;
                        let pem = key.strip_prefix(&[0x01]).ok_or_else(|| {
                            protocol_error("expected server public key during authentication")
                        })?;
                        let encrypted = auth::sha256_password_rsa(&password, &seed, pem, true)?;
                        self.write_packet(&encrypted)?;
                    }
                    other => {
                        return Err(protocol_error(format!(
                            "unexpected auth continuation {other:02X?}"
                        )));
                    }
                },
                other => {
                    return Err(protocol_error(format!(
                        "unexpected packet during authentication: {other:02X?}"
                    )));
                }
            }
        }
    }

    /// Run a text-protocol statement whose result is discarded; returns
    /// the affected row count.
    pub fn query_drop(&mut self, sql: &str) -> DriverResult<u64> {
        self.begin_command()?;
        self.write_packet(&command_payload(Command::Query, sql.as_bytes()))
            .map_err(|e| self.fail(e))?;
        let first = self.read_command_packet()?;
        match first.first().copied() {
            Some(0x00) => {
                self.apply_ok(&first)?;
                Ok(self.affected_rows)
            }
            Some(0xFF) => Err(server_error(&first)),
            Some(0xFB) => Err(self.fail(protocol_error("LOAD DATA LOCAL INFILE is not supported"))),
            _ => {
                // A result set nobody asked for: skip columns and rows.
                let count = lenenc_count(&first)?;
                for _ in 0..count {
                    self.read_command_packet()?;
                }
                if !self.deprecate_eof() {
                    self.read_command_packet()?;
                }
                loop {
                    let packet = self.read_command_packet()?;
                    match PacketType::from_first_byte(packet[0], packet.len()) {
                        PacketType::Eof => {
                            self.apply_terminator(&packet)?;
                            break;
                        }
                        PacketType::Error => return Err(server_error(&packet)),
                        _ => {}
                    }
                }
                Ok(0)
            }
        }
    }

    /// COM_STMT_PREPARE.
    pub fn prepare_statement(&mut self, sql: &str) -> DriverResult<MySqlStatement> {
        self.begin_command()?;
        self.write_packet(&stmt_prepare_payload(sql))
            .map_err(|e| self.fail(e))?;
        let first = self.read_command_packet()?;
        if first.first() == Some(&0xFF) {
            return Err(server_error(&first));
        }
        let ok = parse_stmt_prepare_ok(&first)
            .ok_or_else(|| malformed("invalid COM_STMT_PREPARE response"))?;

        if ok.num_params > 0 {
            for _ in 0..ok.num_params {
                self.read_command_packet()?;
            }
            if !self.deprecate_eof() {
                self.read_command_packet()?;
            }
        }
        let mut columns = Vec::with_capacity(usize::from(ok.num_columns));
        if ok.num_columns > 0 {
            for _ in 0..ok.num_columns {
                let packet = self.read_command_packet()?;
                columns.push(parse_column(&packet)?);
            }
            if !self.deprecate_eof() {
                self.read_command_packet()?;
            }
        }

        tracing::trace!(
            statement_id = ok.statement_id,
            params = ok.num_params,
            columns = ok.num_columns,
            "prepared statement"
        );
        Ok(MySqlStatement {
            id: ok.statement_id,
            sql: sql.to_string(),
            param_count: usize::from(ok.num_params),
            columns,
            rows: Vec::new(),
        })
    }

    /// COM_STMT_EXECUTE. Any result set is read completely and buffered
    /// in `stmt`.
    pub fn execute_statement(
        &mut self,
        stmt: &mut MySqlStatement,
        types: &[BindType],
        params: &[Value],
    ) -> DriverResult<()> {
        if types.len() != params.len() || params.len() != stmt.param_count {
            return Err(DriverError::new(
                client_error::CR_PARAMS_NOT_BOUND,
                format!(
                    "statement takes {} parameters, got {} values for {} types",
                    stmt.param_count,
                    params.len(),
                    types.len()
                ),
            ));
        }
        stmt.rows.clear();
        self.begin_command()?;
        self.write_packet(&stmt_execute_payload(stmt.id, types, params))
            .map_err(|e| self.fail(e))?;

        self.read_execute_response(stmt)?;
        while self.status_flags & server_status::SERVER_MORE_RESULTS_EXISTS != 0 {
            let mut trailing = MySqlStatement {
                id: stmt.id,
                sql: String::new(),
                param_count: 0,
                columns: Vec::new(),
                rows: Vec::new(),
            };
            self.read_execute_response(&mut trailing)?;
        }
        Ok(())
    }

    fn read_execute_response(&mut self, stmt: &mut MySqlStatement) -> DriverResult<()> {
        let first = self.read_command_packet()?;
        match first.first().copied() {
            Some(0x00) => {
                self.apply_ok(&first)?;
                return Ok(());
            }
            Some(0xFF) => return Err(server_error(&first)),
            _ => {}
        }

        let count = lenenc_count(&first)?;
        let mut columns = Vec::with_capacity(count);
        for _ in 0..count {
            let packet = self.read_command_packet()?;
            columns.push(parse_column(&packet)?);
        }
        if !self.deprecate_eof() {
            self.read_command_packet()?;
        }

        let names = Arc::new(ColumnInfo::new(
            columns.iter().map(|c| c.name.clone()).collect(),
        ));
        loop {
            let packet = self.read_command_packet()?;
            match packet.first().copied() {
                Some(0x00) => {
                    let values = decode_binary_row(&columns, &packet)
                        .ok_or_else(|| malformed("truncated binary row"))?;
                    stmt.rows.push(Row::with_columns(Arc::clone(&names), values));
                }
                Some(0xFE) if packet.len() < MAX_PACKET_SIZE => {
                    self.apply_terminator(&packet)?;
                    break;
                }
                Some(0xFF) => return Err(server_error(&packet)),
                other => {
                    return Err(malformed(format!("unexpected row header {other:02X?}")));
                }
            }
        }
        self.affected_rows = 0;
        self.last_insert_id = 0;
        stmt.columns = columns;
        Ok(())
    }

    /// COM_STMT_CLOSE. The server does not answer.
    pub fn close_statement(&mut self, stmt: MySqlStatement) -> DriverResult<()> {
        self.begin_command()?;
        self.write_packet(&stmt_close_payload(stmt.id))
            .map_err(|e| self.fail(e))
    }

    /// COM_PING.
    pub fn ping_server(&mut self) -> DriverResult<()> {
        self.begin_command()?;
        self.write_packet(&[Command::Ping as u8])
            .map_err(|e| self.fail(e))?;
        let reply = self.read_command_packet()?;
        match reply.first().copied() {
            Some(0x00) => self.apply_ok(&reply),
            Some(0xFF) => Err(server_error(&reply)),
            _ => Err(malformed("unexpected COM_PING response")),
        }
    }

    /// COM_QUIT. Best effort: the server closes the socket without a reply.
    pub fn quit(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        if self.state == ConnectionState::Ready {
            self.sequence_id = 0;
            let _ = self.write_packet(&[Command::Quit as u8]);
        }
        self.state = ConnectionState::Closed;
        tracing::debug!(connection_id = self.connection_id(), "connection closed");
    }

    fn begin_command(&mut self) -> DriverResult<()> {
        if self.state != ConnectionState::Ready {
            return Err(DriverError::new(
                client_error::CR_SERVER_LOST,
                format!("connection is not usable ({:?})", self.state),
            ));
        }
        self.sequence_id = 0;
        Ok(())
    }

    fn deprecate_eof(&self) -> bool {
        self.capabilities & capabilities::CLIENT_DEPRECATE_EOF != 0
    }

    fn apply_ok(&mut self, payload: &[u8]) -> DriverResult<()> {
        let ok = PacketReader::new(payload)
            .parse_ok_packet()
            .ok_or_else(|| malformed("invalid OK packet"))?;
        self.affected_rows = ok.affected_rows;
        self.last_insert_id = ok.last_insert_id;
        self.status_flags = ok.status_flags;
        self.warnings = ok.warnings;
        Ok(())
    }

    /// Apply the EOF (or 0xFE-headed OK) packet that ends a result set.
    fn apply_terminator(&mut self, payload: &[u8]) -> DriverResult<()> {
        if self.deprecate_eof() {
            let ok = PacketReader::new(payload)
                .parse_ok_packet()
                .ok_or_else(|| malformed("invalid result set terminator"))?;
            self.status_flags = ok.status_flags;
            self.warnings = ok.warnings;
        } else {
            let eof = PacketReader::new(payload)
                .parse_eof_packet()
                .ok_or_else(|| malformed("invalid EOF packet"))?;
            self.status_flags = eof.status_flags;
            self.warnings = eof.warnings;
        }
        Ok(())
    }

    fn read_command_packet(&mut self) -> DriverResult<Vec<u8>> {
        match self.read_packet() {
            Ok(payload) if payload.is_empty() => Err(self.fail(protocol_error("empty packet"))),
            Ok(payload) => Ok(payload),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Mark the stream unusable and convert to a driver error.
    fn fail(&mut self, err: Error) -> DriverError {
        self.state = ConnectionState::Broken;
        tracing::warn!(connection_id = self.connection_id(), error = %err, "connection broken");
        driver_error(&err)
    }

    /// Read one logical packet, joining continuation packets.
    fn read_packet(&mut self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        loop {
            let mut header = [0u8; PacketHeader::SIZE];
            self.stream
                .read_exact(&mut header)
                .map_err(|e| io_error("failed to read packet header", e))?;
            let header = PacketHeader::from_bytes(&header);
            let len = header.payload_length as usize;
            self.sequence_id = header.sequence_id.wrapping_add(1);

            let start = payload.len();
            payload.resize(start + len, 0);
            self.stream
                .read_exact(&mut payload[start..])
                .map_err(|e| io_error("failed to read packet payload", e))?;
            if len < MAX_PACKET_SIZE {
                return Ok(payload);
            }
        }
    }

    fn write_packet(&mut self, payload: &[u8]) -> Result<()> {
        let packet = frame(payload, self.sequence_id);
        let packets = payload.len() / MAX_PACKET_SIZE + 1;
        self.sequence_id = self.sequence_id.wrapping_add(packets as u8);
        self.stream
            .write_all(&packet)
            .map_err(|e| io_error("failed to write packet", e))?;
        self.stream
            .flush()
            .map_err(|e| io_error("failed to flush stream", e))
    }
}

impl<S: Read + Write> Driver for MySqlConnection<S> {
    type Statement = MySqlStatement;

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()> {
        let sql = if enabled {
            "SET autocommit=1"
        } else {
            "SET autocommit=0"
        };
        self.query_drop(sql).map(drop)
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<MySqlStatement> {
        self.prepare_statement(sql)
    }

    fn execute(
        &mut self,
        stmt: &mut MySqlStatement,
        types: &[BindType],
        values: &[Value],
    ) -> DriverResult<()> {
        self.execute_statement(stmt, types, values)
    }

    fn fetch_all(&mut self, stmt: &mut MySqlStatement) -> DriverResult<Vec<Row>> {
        Ok(std::mem::take(&mut stmt.rows))
    }

    fn close(&mut self, stmt: MySqlStatement) -> DriverResult<()> {
        self.close_statement(stmt)
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.query_drop("ROLLBACK").map(drop)
    }

    fn ping(&mut self) -> DriverResult<()> {
        self.ping_server()
    }

    fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    fn disconnect(&mut self) -> DriverResult<()> {
        self.quit();
        Ok(())
    }
}

/// Opens [`MySqlConnection`]s over TCP.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    connect_timeout: Duration,
    io_timeout: Option<Duration>,
}

impl Default for MySqlConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            io_timeout: None,
        }
    }
}

impl MySqlConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Socket read/write timeout for established connections.
    pub fn io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }
}

impl Connector for MySqlConnector {
    type Driver = MySqlConnection;

    fn connect(&self, params: &ConnectionParams) -> Result<MySqlConnection> {
        let config = MySqlConfig::from_params(params)
            .connect_timeout(self.connect_timeout)
            .io_timeout(self.io_timeout);
        let mut conn = MySqlConnection::connect(config)?;
        conn.query_drop("SET NAMES utf8mb4").map_err(|e| {
            connection_error(
                ConnectionErrorKind::Connect,
                format!("failed to select utf8mb4: {e}"),
            )
        })?;
        tracing::info!(
            address = %params.address(),
            database = %params.db_name,
            connection_id = conn.connection_id(),
            server_version = conn.server_version().unwrap_or(""),
            "connected to MySQL"
        );
        Ok(conn)
    }
}

fn lenenc_count(payload: &[u8]) -> DriverResult<usize> {
    PacketReader::new(payload)
        .read_lenenc_int()
        .map(|n| n as usize)
        .ok_or_else(|| malformed("invalid column count"))
}

fn parse_column(payload: &[u8]) -> DriverResult<ColumnDef> {
    ColumnDef::parse(payload).ok_or_else(|| malformed("invalid column definition"))
}

fn server_error(payload: &[u8]) -> DriverError {
    PacketReader::new(payload)
        .parse_err_packet()
        .map_or_else(|| malformed("invalid error packet"), |err| err.to_driver_error())
}

fn malformed(message: impl Into<String>) -> DriverError {
    DriverError::new(client_error::CR_MALFORMED_PACKET, message)
}

fn driver_error(err: &Error) -> DriverError {
    let code = match err {
        Error::Protocol(_) => client_error::CR_MALFORMED_PACKET,
        _ => client_error::CR_SERVER_LOST,
    };
    DriverError::new(code, err.to_string())
}

fn protocol_error(message: impl Into<String>) -> Error {
    Error::Protocol(ProtocolError {
        message: message.into(),
        raw_data: None,
    })
}

fn connection_error(kind: ConnectionErrorKind, message: impl Into<String>) -> Error {
    Error::Connection(ConnectionError {
        kind,
        message: message.into(),
        source: None,
    })
}

fn io_error(context: &str, err: std::io::Error) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Disconnected,
        message: format!("{context}: {err}"),
        source: Some(Box::new(err)),
    })
}
