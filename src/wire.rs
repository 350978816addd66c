use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::auth::HangarAuthSource;
use crate::directory::UserDirectory;
use crate::feed::ChangeFeed;
use crate::fleet::FleetManager;
use crate::model::{Interval, Principal};
use crate::schedule::{ScheduleError, Scheduler};
use crate::sql::{self, Command};

pub struct HangarHandler {
    fleet: Arc<FleetManager>,
    directory: Arc<UserDirectory>,
    query_parser: Arc<HangarQueryParser>,
}

impl HangarHandler {
    pub fn new(fleet: Arc<FleetManager>, directory: Arc<UserDirectory>) -> Self {
        Self {
            fleet,
            directory,
            query_parser: Arc::new(HangarQueryParser),
        }
    }

    /// Database name names the aircraft (tail number).
    fn resolve_scheduler<C: ClientInfo>(&self, client: &C) -> PgWireResult<Arc<Scheduler>> {
        let tail = client
            .metadata()
            .get("database")
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        self.fleet.get_or_create(&tail).map_err(|e| {
            PgWireError::UserError(Box::new(ErrorInfo::new(
                "ERROR".into(),
                "08006".into(),
                format!("aircraft error: {e}"),
            )))
        })
    }

    /// Login user name resolves through the directory to a typed
    /// principal. Unknown names are refused — the resolver never sees an
    /// unidentified requester.
    fn resolve_principal<C: ClientInfo>(&self, client: &C) -> PgWireResult<Principal> {
        let name = client
            .metadata()
            .get("user")
            .cloned()
            .unwrap_or_default();
        self.directory.resolve(&name).ok_or_else(|| {
            metrics::counter!(crate::observability::AUTH_FAILURES_TOTAL).increment(1);
            PgWireError::UserError(Box::new(ErrorInfo::new(
                "ERROR".into(),
                "28000".into(),
                format!("unknown user: {name}"),
            )))
        })
    }

    async fn execute_command(
        &self,
        scheduler: &Scheduler,
        principal: &Principal,
        cmd: Command,
    ) -> PgWireResult<Vec<Response>> {
        let label = crate::observability::command_label(&cmd);
        let started = std::time::Instant::now();
        let result = self.dispatch(scheduler, principal, cmd).await;
        metrics::histogram!(crate::observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(crate::observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);
        result
    }

    async fn dispatch(
        &self,
        scheduler: &Scheduler,
        principal: &Principal,
        cmd: Command,
    ) -> PgWireResult<Vec<Response>> {
        match cmd {
            Command::InsertBooking { id, start, end, notes } => {
                scheduler
                    .create_booking(id, principal, Interval::new(start, end), notes)
                    .await
                    .map_err(schedule_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::DeleteBooking { id } => {
                scheduler
                    .cancel_booking(id, principal)
                    .await
                    .map_err(schedule_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::InsertMaintenance { id, start, end, description } => {
                // Authorization boundary: maintenance creation is owner-only.
                if !principal.is_privileged() {
                    return Err(schedule_err(ScheduleError::Forbidden(
                        "owner role required",
                    )));
                }
                scheduler
                    .schedule_maintenance(id, Interval::new(start, end), description)
                    .await
                    .map_err(schedule_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::DeleteMaintenance { id } => {
                scheduler
                    .cancel_maintenance(id, principal)
                    .await
                    .map_err(schedule_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::SelectBookings { window } => {
                let window = window.map(|(s, e)| Interval::new(s, e));
                let bookings = scheduler
                    .list_bookings(window)
                    .await
                    .map_err(schedule_err)?;

                let schema = Arc::new(bookings_schema());
                let rows: Vec<PgWireResult<_>> = bookings
                    .into_iter()
                    .map(|b| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&b.id.to_string())?;
                        encoder.encode_field(&b.owner_id.to_string())?;
                        encoder.encode_field(&b.start)?;
                        encoder.encode_field(&b.end)?;
                        encoder.encode_field(&b.notes)?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectMaintenance { window } => {
                let window = window.map(|(s, e)| Interval::new(s, e));
                let blocks = scheduler
                    .list_maintenance(window)
                    .await
                    .map_err(schedule_err)?;

                let schema = Arc::new(maintenance_schema());
                let rows: Vec<PgWireResult<_>> = blocks
                    .into_iter()
                    .map(|m| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&m.id.to_string())?;
                        encoder.encode_field(&m.start)?;
                        encoder.encode_field(&m.end)?;
                        encoder.encode_field(&m.description)?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectAvailability { start, end, min_duration } => {
                let free = scheduler
                    .free_windows(Interval::new(start, end), min_duration)
                    .await
                    .map_err(schedule_err)?;

                let schema = Arc::new(availability_schema());
                let rows: Vec<PgWireResult<_>> = free
                    .into_iter()
                    .map(|slot| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&slot.start)?;
                        encoder.encode_field(&slot.end)?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::Listen { channel } => {
                if !ChangeFeed::is_known_channel(&channel) {
                    return Err(PgWireError::UserError(Box::new(ErrorInfo::new(
                        "ERROR".into(),
                        "42000".into(),
                        format!("unknown channel: {channel} (expected schedule, bookings or maintenance)"),
                    ))));
                }
                Ok(vec![Response::Execution(Tag::new("LISTEN"))])
            }
            Command::Unlisten { .. } | Command::UnlistenAll => {
                Ok(vec![Response::Execution(Tag::new("UNLISTEN"))])
            }
        }
    }
}

fn bookings_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("owner".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("start".into(), None, None, Type::INT8, FieldFormat::Text),
        FieldInfo::new("end".into(), None, None, Type::INT8, FieldFormat::Text),
        FieldInfo::new("notes".into(), None, None, Type::VARCHAR, FieldFormat::Text),
    ]
}

fn maintenance_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("start".into(), None, None, Type::INT8, FieldFormat::Text),
        FieldInfo::new("end".into(), None, None, Type::INT8, FieldFormat::Text),
        FieldInfo::new(
            "description".into(),
            None,
            None,
            Type::VARCHAR,
            FieldFormat::Text,
        ),
    ]
}

fn availability_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("start".into(), None, None, Type::INT8, FieldFormat::Text),
        FieldInfo::new("end".into(), None, None, Type::INT8, FieldFormat::Text),
    ]
}

/// Schema for a statement, by the table it selects from. Mutations have no
/// result schema.
fn statement_schema(stmt: &str) -> Vec<FieldInfo> {
    let upper = stmt.to_uppercase();
    if !upper.contains("SELECT") {
        return vec![];
    }
    if upper.contains("AVAILABILITY") {
        availability_schema()
    } else if upper.contains("MAINTENANCE") {
        maintenance_schema()
    } else if upper.contains("BOOKINGS") {
        bookings_schema()
    } else {
        vec![]
    }
}

#[async_trait]
impl SimpleQueryHandler for HangarHandler {
    async fn do_query<C>(
        &self,
        client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let scheduler = self.resolve_scheduler(client)?;
        let principal = self.resolve_principal(client)?;
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        self.execute_command(&scheduler, &principal, cmd).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct HangarQueryParser;

#[async_trait]
impl QueryParser for HangarQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(statement_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for HangarHandler {
    type Statement = String;
    type QueryParser = HangarQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let scheduler = self.resolve_scheduler(client)?;
        let principal = self.resolve_principal(client)?;
        let sql = substitute_params(portal);
        let cmd = sql::parse_sql(&sql).map_err(sql_err)?;
        let mut responses = self.execute_command(&scheduler, &principal, cmd).await?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            statement_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(statement_schema(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start {
                if let Ok(n) = sql[start..i].parse::<usize>() {
                    if n > max {
                        max = n;
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
fn substitute_params(portal: &Portal<String>) -> String {
    let sql = portal.statement.statement.to_string();
    let params = &portal.parameters;
    let mut result = sql;

    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                format!("'{}'", text.replace('\'', "''"))
            }
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }

    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct HangarFactory {
    handler: Arc<HangarHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<HangarAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl HangarFactory {
    pub fn new(
        fleet: Arc<FleetManager>,
        directory: Arc<UserDirectory>,
        password: String,
    ) -> Self {
        let auth_source = HangarAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(HangarHandler::new(fleet, directory)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for HangarFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Drive one client connection through the pgwire state machine.
pub async fn process_connection(
    socket: TcpStream,
    fleet: Arc<FleetManager>,
    directory: Arc<UserDirectory>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> Result<(), std::io::Error> {
    let factory = HangarFactory::new(fleet, directory, password);
    pgwire::tokio::process_socket(socket, tls, factory).await
}

fn schedule_err(e: ScheduleError) -> PgWireError {
    let code = match &e {
        ScheduleError::InvalidRange { .. } => "22007",
        ScheduleError::SlotTaken(_) => {
            metrics::counter!(crate::observability::CONFLICTS_TOTAL).increment(1);
            "23505"
        }
        ScheduleError::MaintenanceConflict(_) => {
            metrics::counter!(crate::observability::CONFLICTS_TOTAL).increment(1);
            "23P01"
        }
        ScheduleError::Forbidden(_) => "42501",
        ScheduleError::NotFound(_) => "P0002",
        ScheduleError::AlreadyExists(_) => "23505",
        ScheduleError::LimitExceeded(_) => "54000",
        ScheduleError::Storage(_) => "58000",
    };
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        e.to_string(),
    )))
}

fn sql_err(e: crate::sql::SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}
