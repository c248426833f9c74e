use std::io::{self, BufRead, Read, Write};
use std::path::Path;

use fathr_core::{
    aggregate, classify, estimate_risk, trend, IntakeOptions, MeasurementRecord, Measurements,
    Recency, RecordError, RecordId,
};
use fathr_storage::{PersistentRecordStore, RecordStore, StorageError, UserId};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::protocol::{
    JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR, STORAGE_ERROR,
};
use crate::view::{DashboardSummary, HistoryEntry, RecordView};

const SERVER_NAME: &str = "fathrd";
/// Largest `Content-Length` body accepted on stdio.
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

pub struct ScoringServer {
    store: Mutex<Box<dyn RecordStore>>,
    config: ServerConfig,
}

#[derive(Debug, Deserialize)]
struct MeasurementParams {
    measurements: Measurements,
}

#[derive(Debug, Deserialize)]
struct AppendParams {
    user_id: UserId,
    measurements: Measurements,
    #[serde(default = "default_true")]
    estimate_dna: bool,
    #[serde(default)]
    entitled: bool,
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    user_id: UserId,
    id: RecordId,
}

#[derive(Debug, Deserialize)]
struct UserParams {
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct ListParams {
    user_id: UserId,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    entitled: bool,
}

#[derive(Debug, Deserialize)]
struct ReportParams {
    user_id: UserId,
    #[serde(default)]
    entitled: bool,
}

const fn default_true() -> bool {
    true
}

impl ScoringServer {
    pub fn new(config: ServerConfig) -> Result<Self, StorageError> {
        let store = PersistentRecordStore::open(&config.db_path)?;
        Ok(Self::with_store(Box::new(store), config))
    }

    pub fn with_db_path(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let config = ServerConfig {
            db_path: path.as_ref().to_path_buf(),
            ..ServerConfig::default()
        };
        Self::new(config)
    }

    pub fn with_store(store: Box<dyn RecordStore>, config: ServerConfig) -> Self {
        Self {
            store: Mutex::new(store),
            config,
        }
    }

    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            warn!(version = %request.jsonrpc, "rejected request with bad jsonrpc version");
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "invalid jsonrpc version",
            ));
        }

        if request.is_notification() {
            debug!(method = %request.method, "ignoring notification");
            return None;
        }

        let id = request.id.unwrap_or(Value::Null);
        debug!(method = %request.method, "handling request");

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
                    "store": self.store.lock().stats(),
                }),
            ),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "records/classify" => self.classify(id, request.params),
            "records/estimate_risk" => self.estimate_risk(id, request.params),
            "records/append" => self.append(id, request.params),
            "records/delete" => self.delete(id, request.params),
            "records/delete_all" => self.delete_all(id, request.params),
            "records/list" => self.list(id, request.params),
            "dashboard/summary" => self.dashboard(id, request.params),
            "report/history" => self.history(id, request.params),
            other => {
                warn!(method = other, "unknown method");
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, "method not found")
            }
        };

        Some(response)
    }

    fn classify(&self, id: Value, params: Value) -> JsonRpcResponse {
        let args: MeasurementParams = match parse_params(&id, params) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        if let Err(err) = args.measurements.validate() {
            return record_error(id, &err);
        }
        success(id, &classify(&args.measurements))
    }

    fn estimate_risk(&self, id: Value, params: Value) -> JsonRpcResponse {
        let args: MeasurementParams = match parse_params(&id, params) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        if let Err(err) = args.measurements.validate() {
            return record_error(id, &err);
        }
        let assessment = estimate_risk(&args.measurements);
        success(
            id,
            &json!({
                "percent": assessment.estimate.percent(),
                "category": assessment.estimate.category(),
                "flags": assessment.flags,
            }),
        )
    }

    fn append(&self, id: Value, params: Value) -> JsonRpcResponse {
        let args: AppendParams = match parse_params(&id, params) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let options = IntakeOptions {
            estimate_dna: args.estimate_dna,
        };
        let record = match MeasurementRecord::create(args.measurements, options) {
            Ok(v) => v,
            Err(err) => return record_error(id, &err),
        };

        if let Err(err) = self.store.lock().append(&args.user_id, record.clone()) {
            return storage_error(id, &err);
        }
        info!(user = %args.user_id, record = %record.id, "stored record");
        match RecordView::build(&record, args.entitled) {
            Ok(view) => success(id, &view),
            Err(err) => encode_error(id, &err),
        }
    }

    fn delete(&self, id: Value, params: Value) -> JsonRpcResponse {
        let args: DeleteParams = match parse_params(&id, params) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self.store.lock().delete(&args.user_id, &args.id) {
            Ok(deleted) => JsonRpcResponse::success(id, json!({ "deleted": deleted })),
            Err(err) => storage_error(id, &err),
        }
    }

    fn delete_all(&self, id: Value, params: Value) -> JsonRpcResponse {
        let args: UserParams = match parse_params(&id, params) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self.store.lock().delete_all_for_user(&args.user_id) {
            Ok(deleted) => JsonRpcResponse::success(id, json!({ "deleted": deleted })),
            Err(err) => storage_error(id, &err),
        }
    }

    fn list(&self, id: Value, params: Value) -> JsonRpcResponse {
        let args: ListParams = match parse_params(&id, params) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let records = self.store.lock().list_for_user(&args.user_id);
        let views: Result<Vec<RecordView>, _> = records
            .iter()
            .take(args.limit.unwrap_or(usize::MAX))
            .map(|record| RecordView::build(record, args.entitled))
            .collect();
        match views {
            Ok(views) => success(id, &json!({ "records": views })),
            Err(err) => encode_error(id, &err),
        }
    }

    fn dashboard(&self, id: Value, params: Value) -> JsonRpcResponse {
        let args: ReportParams = match parse_params(&id, params) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        // Snapshot under the lock, score without it.
        let records = self.store.lock().list_for_user(&args.user_id);
        let summary = DashboardSummary::build(
            &records,
            &aggregate(&records),
            trend(&records, Recency::NewestFirst),
            self.config.recent_limit,
            args.entitled,
        );
        success(id, &summary)
    }

    fn history(&self, id: Value, params: Value) -> JsonRpcResponse {
        let args: ReportParams = match parse_params(&id, params) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let records = self.store.lock().list_for_user(&args.user_id);
        let entries: Vec<HistoryEntry> = records
            .iter()
            .map(|record| HistoryEntry::build(record, args.entitled))
            .collect();
        success(id, &json!({ "entries": entries }))
    }

    pub fn serve_stdio(&self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut reader = io::BufReader::new(stdin.lock());
        let mut stdout = io::stdout();
        info!("serving json-rpc on stdio");
        self.serve(&mut reader, &mut stdout)
    }

    /// Answers every request read from `reader`, mirroring the framing each
    /// request arrived in. Returns at end of input.
    pub fn serve<R: BufRead, W: Write>(&self, reader: &mut R, writer: &mut W) -> io::Result<()> {
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }

            let trimmed = line.trim_end_matches(['\r', '\n']).trim_start();
            if trimmed.is_empty() {
                continue;
            }

            let (payload, frame) = if is_header_line(trimmed) {
                let content_length = match read_content_length(reader, trimmed) {
                    Ok(v) if v > MAX_FRAME_BYTES => {
                        warn!(content_length = v, "oversized frame");
                        discard(reader, v)?;
                        let response = JsonRpcResponse::error(
                            Value::Null,
                            PARSE_ERROR,
                            format!("invalid frame: content-length {v} exceeds {MAX_FRAME_BYTES}"),
                        );
                        write_response(writer, &response, Frame::ContentLength)?;
                        continue;
                    }
                    Ok(v) => v,
                    Err(err) => {
                        let response = JsonRpcResponse::error(
                            Value::Null,
                            PARSE_ERROR,
                            format!("invalid frame: {err}"),
                        );
                        write_response(writer, &response, Frame::LineDelimited)?;
                        continue;
                    }
                };

                let mut body = vec![0_u8; content_length];
                if let Err(err) = reader.read_exact(&mut body) {
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!("invalid frame body: {err}"),
                    );
                    write_response(writer, &response, Frame::ContentLength)?;
                    continue;
                }
                (body, Frame::ContentLength)
            } else {
                (trimmed.as_bytes().to_vec(), Frame::LineDelimited)
            };

            let request: JsonRpcRequest = match serde_json::from_slice(&payload) {
                Ok(v) => v,
                Err(err) => {
                    warn!(error = %err, "unparsable request");
                    let response =
                        JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("parse error: {err}"));
                    write_response(writer, &response, frame)?;
                    continue;
                }
            };

            if let Some(response) = self.handle_request(request) {
                write_response(writer, &response, frame)?;
            }
        }

        info!("input closed");
        Ok(())
    }
}

fn parse_params<T: for<'de> Deserialize<'de>>(
    id: &Value,
    params: Value,
) -> Result<T, JsonRpcResponse> {
    if params.is_null() {
        return Err(JsonRpcResponse::invalid_params(id.clone(), "missing params"));
    }
    serde_json::from_value(params).map_err(|err| {
        warn!(error = %err, "invalid params");
        JsonRpcResponse::invalid_params(id.clone(), format!("invalid params: {err}"))
    })
}

fn success<T: serde::Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(v) => JsonRpcResponse::success(id, v),
        Err(err) => encode_error(id, &err),
    }
}

fn encode_error(id: Value, err: &serde_json::Error) -> JsonRpcResponse {
    JsonRpcResponse::error(id, STORAGE_ERROR, format!("encode error: {err}"))
}

fn record_error(id: Value, err: &RecordError) -> JsonRpcResponse {
    warn!(error = %err, "rejected measurements");
    JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string())
}

fn storage_error(id: Value, err: &StorageError) -> JsonRpcResponse {
    let code = match err {
        StorageError::InvalidInput(_) | StorageError::Collection(_) => INVALID_PARAMS,
        StorageError::Io(_) | StorageError::Serde(_) => STORAGE_ERROR,
    };
    warn!(error = %err, code, "storage call failed");
    JsonRpcResponse::error(id, code, err.to_string())
}

#[derive(Clone, Copy)]
enum Frame {
    LineDelimited,
    ContentLength,
}

fn write_response<W: Write>(
    writer: &mut W,
    response: &JsonRpcResponse,
    frame: Frame,
) -> io::Result<()> {
    match frame {
        Frame::LineDelimited => {
            let serialized = serde_json::to_string(response)?;
            writeln!(writer, "{serialized}")?;
        }
        Frame::ContentLength => {
            let serialized = serde_json::to_vec(response)?;
            write!(writer, "Content-Length: {}\r\n\r\n", serialized.len())?;
            writer.write_all(&serialized)?;
        }
    }
    writer.flush()
}

/// Skips a body that will not be read, up to end of input.
fn discard<R: BufRead>(reader: &mut R, len: usize) -> io::Result<()> {
    let len = u64::try_from(len).unwrap_or(u64::MAX);
    io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    Ok(())
}

fn is_header_line(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.starts_with("content-length:") || lower.starts_with("content-type:")
}

fn read_content_length<R: BufRead>(reader: &mut R, first_line: &str) -> io::Result<usize> {
    let mut content_length = parse_content_length(first_line);
    let mut header_line = String::new();
    loop {
        header_line.clear();
        if reader.read_line(&mut header_line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "unexpected eof while reading frame headers",
            ));
        }
        let trimmed = header_line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some(v) = parse_content_length(trimmed) {
            content_length = Some(v);
        }
    }
    content_length
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing content-length header"))
}

fn parse_content_length(line: &str) -> Option<usize> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse::<usize>().ok()
}
