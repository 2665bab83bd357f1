//! Blocking REST client.
//!
//! Endpoints used (all relative to `address:port`):
//!
//! ```text
//! GET  /connect/{db}                         basic auth → session cookie
//! GET  /query/{db}/{lang}/{text SKIP n}      read-only, paged by SKIP
//! POST /command/{db}/{lang}/{text}           mutating statements
//! POST /property/{db}/{class}/{prop}/{TYPE}  property creation
//! POST /batch/{db}                           batched script
//! GET|POST|PUT /document/{db}[/{rid}]        single documents
//! GET  /class/{db}/{class}                   schema information
//! GET  /database/{db}, /listDatabases        server information
//! GET  /export/{db}                          gzip'd JSON export
//! ```
//!
//! Statement text travels percent-encoded in the URL path, so very long
//! statements are better sent through [`OrientClient::post_batch`].

use crate::batch::BatchRequest;
use crate::config::ConnectionConfig;
use crate::error::{ClientError, Result};
use crate::pager::Pager;
use crate::sql::{edge_exists_query, Command, Content, Identifier, PropertyType, RecordId, Select};
use crate::store::GraphStore;
use flate2::read::GzDecoder;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use urlencoding::encode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Full,
    Partial,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Full => "full",
            UpdateMode::Partial => "partial",
        }
    }
}

pub struct OrientClient {
    http: Client,
    config: ConnectionConfig,
    server: String,
}

impl OrientClient {
    /// Authenticate against `config.database`. A non-2xx answer is
    /// [`ClientError::Authentication`].
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .build()?;
        let client = Self {
            http,
            config: config.clone(),
            server: config.server_address(),
        };

        let url = client.url(&["connect", &config.database]);
        debug!(%url, user = %config.user, "connecting");
        let response = client.request(Method::GET, &url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Authentication { status });
        }
        debug!(%status, "connected");
        Ok(client)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.server.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&encode(segment));
        }
        url
    }

    // Credentials go with every request, not just the session cookie.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.config.user, Some(self.config.wire_password()))
    }

    fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send()?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().unwrap_or_default();
            debug!(%status, %body, "store rejected request");
            Err(ClientError::Response { status, body })
        }
    }

    fn json(response: Response) -> Result<Value> {
        let text = response.text()?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(format!("{e}: {text}")))
    }

    fn result_rows(body: Value) -> Result<Vec<Value>> {
        match body {
            Value::Object(mut map) => match map.remove("result") {
                Some(Value::Array(rows)) => Ok(rows),
                Some(other) => Err(ClientError::Decode(format!("`result` is not an array: {other}"))),
                None => Err(ClientError::Decode("body has no `result` field".to_string())),
            },
            other => Err(ClientError::Decode(format!("expected an object, got {other}"))),
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// One page of a read-only query. `text` must not carry its own SKIP.
    pub fn query_page(&self, text: &str, language: &str, skip: u64) -> Result<Vec<Value>> {
        let paged = format!("{text} SKIP {skip}");
        self.query_text(&paged, language)
    }

    fn query_text(&self, text: &str, language: &str) -> Result<Vec<Value>> {
        let url = self.url(&["query", &self.config.database, language, text]);
        debug!(query = %text, "query");
        let response = self.send(self.request(Method::GET, &url))?;
        Self::result_rows(Self::json(response)?)
    }

    /// Every row of `text`, fetched lazily page by page.
    pub fn query<'a>(
        &'a self,
        text: &'a str,
        language: &'a str,
    ) -> Pager<impl FnMut(u64) -> Result<Vec<Value>> + 'a> {
        Pager::new(move |skip| self.query_page(text, language, skip))
    }

    /// Every row matched by `select`, fetched lazily page by page.
    pub fn select<'a>(&'a self, select: &'a Select) -> Pager<impl FnMut(u64) -> Result<Vec<Value>> + 'a> {
        Pager::new(move |skip| self.query_text(&select.render(skip), "sql"))
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    pub fn command(&self, text: &str, language: &str) -> Result<Value> {
        let url = self.url(&["command", &self.config.database, language, text]);
        debug!(command = %text, "command");
        let response = self.send(self.request(Method::POST, &url))?;
        Self::json(response)
    }

    pub fn execute(&self, command: &Command) -> Result<Value> {
        self.command(&command.render(), "sql")
    }

    fn execute_for_rid(&self, command: &Command) -> Result<RecordId> {
        let rows = Self::result_rows(self.execute(command)?)?;
        let first = rows
            .first()
            .ok_or_else(|| ClientError::Decode(format!("`{command}` returned no record")))?;
        RecordId::from_row(first)
    }

    pub fn create_class_property(
        &self,
        class: &Identifier,
        property: &Identifier,
        kind: PropertyType,
    ) -> Result<()> {
        let url = self.url(&[
            "property",
            &self.config.database,
            class.as_str(),
            property.as_str(),
            kind.as_str(),
        ]);
        debug!(%class, %property, %kind, "create property");
        self.send(self.request(Method::POST, &url))?;
        Ok(())
    }

    pub fn post_batch(&self, request: &BatchRequest) -> Result<Value> {
        let url = self.url(&["batch", &self.config.database]);
        debug!(commands = request.command_count(), "batch");
        let response = self.send(self.request(Method::POST, &url).json(request))?;
        Self::json(response)
    }

    // ------------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------------

    pub fn get_document(&self, rid: RecordId) -> Result<Value> {
        let url = self.url(&["document", &self.config.database, &rid.path_segment()]);
        Self::json(self.send(self.request(Method::GET, &url))?)
    }

    /// Create a document of `class`; the answer carries the new `@rid`.
    pub fn create_document(&self, class: &Identifier, content: &Content) -> Result<Value> {
        let mut payload = content.clone();
        payload.insert("@class".to_string(), Value::String(class.to_string()));
        let url = self.url(&["document", &self.config.database]);
        Self::json(self.send(self.request(Method::POST, &url).json(&payload))?)
    }

    pub fn update_document(&self, rid: RecordId, payload: &Content, mode: UpdateMode) -> Result<Value> {
        let url = self.url(&["document", &self.config.database, &rid.path_segment()]);
        let builder = self
            .request(Method::PUT, &url)
            .query(&[("updateMode", mode.as_str())])
            .json(payload);
        Self::json(self.send(builder)?)
    }

    // ------------------------------------------------------------------------
    // Server / schema information
    // ------------------------------------------------------------------------

    pub fn list_databases(&self) -> Result<Vec<String>> {
        let url = self.url(&["listDatabases"]);
        let body = Self::json(self.send(self.request(Method::GET, &url))?)?;
        let names = body
            .get("databases")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::Decode(format!("no `databases` array in {body}")))?;
        Ok(names
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    pub fn database_info(&self) -> Result<Value> {
        let url = self.url(&["database", &self.config.database]);
        Self::json(self.send(self.request(Method::GET, &url))?)
    }

    pub fn class_info(&self, class: &Identifier) -> Result<Value> {
        let url = self.url(&["class", &self.config.database, class.as_str()]);
        Self::json(self.send(self.request(Method::GET, &url))?)
    }

    /// Download a full export. The store always answers gzip'd JSON;
    /// `*.json.gz` targets get it verbatim, `*.json` targets get it inflated.
    pub fn export_database(&self, path: &Path) -> Result<u64> {
        let format = ExportFormat::for_path(path)?;
        let url = self.url(&["export", &self.config.database]);
        let bytes = self.send(self.request(Method::GET, &url))?.bytes()?;
        write_export(&bytes, path, format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Gzip,
    Json,
}

impl ExportFormat {
    fn for_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".json.gz") {
            Ok(Self::Gzip)
        } else if name.ends_with(".json") {
            Ok(Self::Json)
        } else {
            Err(ClientError::UnsupportedExportTarget(path.to_path_buf()))
        }
    }
}

fn write_export(bytes: &[u8], path: &Path, format: ExportFormat) -> Result<u64> {
    match format {
        ExportFormat::Gzip => {
            fs::write(path, bytes)?;
            Ok(bytes.len() as u64)
        }
        ExportFormat::Json => {
            let mut inflated = Vec::new();
            GzDecoder::new(bytes).read_to_end(&mut inflated)?;
            fs::write(path, &inflated)?;
            Ok(inflated.len() as u64)
        }
    }
}

impl GraphStore for OrientClient {
    fn create_vertex_class(&mut self, class: &Identifier) -> Result<()> {
        self.execute(&Command::CreateVertexClass(class.clone()))?;
        Ok(())
    }

    fn create_edge_class(&mut self, class: &Identifier) -> Result<()> {
        self.execute(&Command::CreateEdgeClass(class.clone()))?;
        Ok(())
    }

    fn create_property(
        &mut self,
        class: &Identifier,
        property: &Identifier,
        kind: PropertyType,
    ) -> Result<()> {
        self.create_class_property(class, property, kind)
    }

    fn find_vertex(&mut self, class: &Identifier, filter: &Content) -> Result<Option<RecordId>> {
        let select = Select::matching(class.clone(), filter)?.limit(1);
        match self.query_text(&select.render(0), "sql")?.first() {
            Some(row) => RecordId::from_row(row).map(Some),
            None => Ok(None),
        }
    }

    fn create_vertex(&mut self, class: &Identifier, content: &Content) -> Result<RecordId> {
        self.execute_for_rid(&Command::CreateVertex {
            class: class.clone(),
            content: content.clone(),
        })
    }

    fn edge_exists(&mut self, class: &Identifier, from: RecordId, to: RecordId) -> Result<bool> {
        let rows = self.query_text(&edge_exists_query(class, from, to), "sql")?;
        Ok(!rows.is_empty())
    }

    fn create_edge(
        &mut self,
        class: &Identifier,
        from: RecordId,
        to: RecordId,
        content: Option<&Content>,
    ) -> Result<RecordId> {
        self.execute_for_rid(&Command::CreateEdge {
            class: class.clone(),
            from,
            to,
            content: content.cloned(),
        })
    }

    fn submit_batch(&mut self, request: &BatchRequest) -> Result<()> {
        self.post_batch(request)?;
        Ok(())
    }
}
