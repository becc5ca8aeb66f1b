//! Multipart form parsing for `POST /`

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use hyper::body::Bytes;
use multer::Multipart;

use super::RequestError;

pub const SPREADSHEET_FIELD: &str = "excel";
pub const TEMPLATE_FIELD: &str = "word";

/// One uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: Option<String>,
    pub data: Bytes,
}

impl Upload {
    fn has_extension(&self, ext: &str) -> bool {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Write into `dir` as `stem.<ext>`; the client's file name only decides
    /// the extension, picked from `allowed` with the first as fallback
    pub fn save_as(&self, dir: &Path, stem: &str, allowed: &[&str]) -> std::io::Result<PathBuf> {
        let ext = allowed
            .iter()
            .find(|ext| self.has_extension(ext))
            .or(allowed.first())
            .copied()
            .unwrap_or("bin");
        let path = dir.join(format!("{stem}.{ext}"));
        std::fs::write(&path, &self.data)?;
        Ok(path)
    }
}

/// The two files the form submits
#[derive(Debug)]
pub struct Uploads {
    pub spreadsheet: Upload,
    pub template: Upload,
}

pub async fn read_uploads(content_type: Option<&str>, body: Bytes) -> Result<Uploads, RequestError> {
    let boundary = multer::parse_boundary(content_type.unwrap_or_default())
        .map_err(RequestError::NotMultipart)?;
    let stream = futures::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = Multipart::new(stream, boundary);

    let mut spreadsheet = None;
    let mut template = None;
    while let Some(field) = multipart.next_field().await? {
        let slot = match field.name() {
            Some(SPREADSHEET_FIELD) => &mut spreadsheet,
            Some(TEMPLATE_FIELD) => &mut template,
            other => {
                log::debug!("ignoring form field {other:?}");
                continue;
            }
        };
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;
        log::debug!("received {} byte(s) as {file_name:?}", data.len());
        *slot = Some(Upload { file_name, data });
    }

    Ok(Uploads {
        spreadsheet: spreadsheet.ok_or(RequestError::MissingField(SPREADSHEET_FIELD))?,
        template: template.ok_or(RequestError::MissingField(TEMPLATE_FIELD))?,
    })
}
