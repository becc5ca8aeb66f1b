//! HTTP interface: an upload form and a generate endpoint
//!
//! `GET /` serves the form. `POST /` takes the spreadsheet and template as
//! multipart fields and answers with the zip of generated documents. Any
//! failure while handling the upload is logged and reported to the client as a
//! bare 500 with a fixed message.
//!
//! Connections are served one at a time with keep-alive disabled, so a
//! generate request always finishes before the next one is accepted.

mod page;
mod upload;

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::rc::Rc;

use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use miette::Diagnostic;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::batch::{generate_archive, BatchOptions, GenerateError};
use crate::core::config::{Config, ConfigError};
use crate::core::workspace::WorkArea;

pub use page::{render_index, PageError};
pub use upload::{read_uploads, Upload, Uploads, SPREADSHEET_FIELD, TEMPLATE_FIELD};

pub const FAILURE_MESSAGE: &str = "An error occurred while generating documents";
const ARCHIVE_DISPOSITION: &str = "attachment; filename=\"documents.zip\"";

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "csv"];
const TEMPLATE_EXTENSIONS: &[&str] = &["docx"];

#[derive(Debug, Error, Diagnostic)]
pub enum ServeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot listen on {addr}: {source}")]
    #[diagnostic(code(docfill::serve::bind), help("is another process using the port?"))]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot render the upload page: {0}")]
    #[diagnostic(code(docfill::serve::page))]
    Page(#[from] PageError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(docfill::serve::io))]
    Io(#[from] std::io::Error),
}

/// Why a `POST /` failed; never shown to the client
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is not multipart/form-data: {0}")]
    NotMultipart(#[source] multer::Error),

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("form field '{0}' is missing")]
    MissingField(&'static str),

    #[error("cannot read request body: {0}")]
    Body(String),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a request handler needs, built once at startup
#[derive(Debug, Clone)]
pub struct ServerState {
    pub options: BatchOptions,
    pub max_upload_bytes: usize,
    pub index_html: Bytes,
}

impl ServerState {
    pub fn from_config(config: &Config) -> Result<Self, ServeError> {
        Ok(Self {
            options: config.batch_options(),
            max_upload_bytes: config.max_upload_bytes(),
            index_html: Bytes::from(render_index(config.max_upload_mb)?),
        })
    }
}

/// Bind the configured address and serve until Ctrl-C
pub fn run(config: &Config) -> Result<(), ServeError> {
    let addr = config.bind_addr()?;
    let state = ServerState::from_config(config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    runtime.block_on(async move {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind { addr, source })?;
        log::info!("listening on http://{}", listener.local_addr()?);

        serve(listener, state, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
    })
}

/// Accept and serve connections one by one until `shutdown` completes
pub async fn serve(
    listener: TcpListener,
    state: ServerState,
    shutdown: impl Future<Output = ()>,
) -> Result<(), ServeError> {
    let state = Rc::new(state);
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            conn = listener.accept() => match conn {
                Ok(conn) => conn,
                Err(e) => {
                    log::error!("accept error: {e}");
                    continue;
                }
            },
            _ = &mut shutdown => {
                log::info!("shutdown signal received");
                break;
            }
        };

        log::debug!("connection from {peer}");
        let state = state.clone();
        let service = service_fn(move |req| {
            let state = state.clone();
            async move { Ok::<_, Infallible>(handle(req, &state).await) }
        });

        if let Err(e) = http1::Builder::new()
            .keep_alive(false)
            .serve_connection(TokioIo::new(stream), service)
            .await
        {
            log::warn!("connection from {peer} failed: {e}");
        }
    }

    Ok(())
}

async fn handle(req: Request<Incoming>, state: &ServerState) -> Response<Full<Bytes>> {
    log::info!("{} {}", req.method(), req.uri().path());

    if req.uri().path() != "/" {
        return text_response(StatusCode::NOT_FOUND, "Not Found");
    }

    match *req.method() {
        Method::GET => {
            let mut res = Response::new(Full::new(state.index_html.clone()));
            res.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            res
        }
        Method::POST => match generate(req, state).await {
            Ok(archive) => {
                let mut res = Response::new(Full::new(archive));
                let headers = res.headers_mut();
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/zip"),
                );
                headers.insert(
                    header::CONTENT_DISPOSITION,
                    HeaderValue::from_static(ARCHIVE_DISPOSITION),
                );
                res
            }
            Err(e) => {
                log::error!("generation failed: {e}");
                text_response(StatusCode::INTERNAL_SERVER_ERROR, FAILURE_MESSAGE)
            }
        },
        _ => {
            let mut res = text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            res.headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, POST"));
            res
        }
    }
}

/// Run one upload through the batch inside its own work area
async fn generate(req: Request<Incoming>, state: &ServerState) -> Result<Bytes, RequestError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = Limited::new(req.into_body(), state.max_upload_bytes)
        .collect()
        .await
        .map_err(|e| RequestError::Body(e.to_string()))?
        .to_bytes();
    let uploads = read_uploads(content_type.as_deref(), body).await?;

    let work = WorkArea::new()?;
    let result = generate_in(&work, &uploads, &state.options);
    work.release();
    result
}

fn generate_in(
    work: &WorkArea,
    uploads: &Uploads,
    options: &BatchOptions,
) -> Result<Bytes, RequestError> {
    let spreadsheet = uploads
        .spreadsheet
        .save_as(work.path(), "records", SPREADSHEET_EXTENSIONS)?;
    let template = uploads
        .template
        .save_as(work.path(), "template", TEMPLATE_EXTENSIONS)?;

    let output = generate_archive(work, &spreadsheet, &template, options, &mut rand::rng())?;
    log::info!(
        "generated {} document(s) for download",
        output.report.file_count()
    );
    Ok(Bytes::from(std::fs::read(&output.archive)?))
}

fn text_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *res.status_mut() = status;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res
}
