use std::fs;
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, LAST_MODIFIED, USER_AGENT};

use crate::config::{BucketConfig, ChebiConfig};
use crate::error::ChebiError;
use crate::fs_util;

pub const CHEBI_FLAT_FILE_URL: &str =
    "https://ftp.ebi.ac.uk/pub/databases/chebi/Flat_file_tab_delimited/";

/// Retrieval capability for the named release files. `fetch` returns a path
/// to an already-decompressed local copy; `is_current` applies the monthly
/// release staleness policy to a local path.
pub trait BlobStore {
    fn fetch(&self, name: &str) -> Result<Utf8PathBuf, ChebiError>;
    fn is_current(&self, path: &Utf8Path) -> bool;
}

/// First Tuesday of the month containing `date`.
pub fn first_tuesday_of(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    let offset = (Weekday::Tue.num_days_from_monday() + 7
        - first.weekday().num_days_from_monday())
        % 7;
    first + chrono::Days::new(u64::from(offset))
}

/// The publication time of the latest release: the first Tuesday of the
/// current month once it has passed, otherwise the first Tuesday of the
/// previous month.
pub fn last_release_time(now: NaiveDateTime) -> NaiveDateTime {
    let this_month = first_tuesday_of(now.date()).and_time(NaiveTime::MIN);
    if this_month < now {
        return this_month;
    }
    let first_of_month = now.date().with_day(1).unwrap_or(now.date());
    let last_month = first_of_month.pred_opt().unwrap_or(first_of_month);
    first_tuesday_of(last_month).and_time(NaiveTime::MIN)
}

/// A cached copy is stale unless it was written strictly after the release
/// threshold.
pub fn is_stale(mtime: NaiveDateTime, threshold: NaiveDateTime) -> bool {
    mtime <= threshold
}

fn file_mtime(path: &Utf8Path) -> Option<NaiveDateTime> {
    let modified = fs::metadata(path.as_std_path()).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified).naive_utc())
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, ChebiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("libchebi/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| ChebiError::Filesystem(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| ChebiError::Download {
            name: "client".to_string(),
            message: err.to_string(),
        })
}

pub(crate) fn send_with_retries<F>(
    mut make_req: F,
) -> Result<reqwest::blocking::Response, reqwest::Error>
where
    F: FnMut() -> reqwest::blocking::RequestBuilder,
{
    const MAX_RETRIES: usize = 3;
    const BASE_DELAY_MS: u64 = 200;
    let mut attempt = 0usize;
    loop {
        match make_req().send() {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if attempt < MAX_RETRIES && matches!(status, 429 | 500 | 502 | 503 | 504) {
                    thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                    attempt += 1;
                    continue;
                }
                return Ok(resp);
            }
            Err(err) => {
                if attempt < MAX_RETRIES && (err.is_timeout() || err.is_connect() || err.is_request())
                {
                    thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                    attempt += 1;
                    continue;
                }
                return Err(err);
            }
        }
    }
}

/// Shared post-fetch step: hand back the decompressed form of a cached file.
/// Zip archives yield their first member; gzip files decompress next to the
/// compressed copy, reusing an existing current decompressed file.
fn resolve_decompressed(
    path: &Utf8Path,
    dir: &Utf8Path,
    store: &dyn BlobStore,
) -> Result<Utf8PathBuf, ChebiError> {
    if path.as_str().ends_with(".zip") {
        return fs_util::extract_zip_first(path, dir);
    }
    if let Some(stripped) = path.as_str().strip_suffix(".gz") {
        let unzipped = Utf8PathBuf::from(stripped);
        if !(unzipped.as_std_path().exists() && store.is_current(&unzipped)) {
            tracing::debug!(file = %path, "decompressing");
            fs_util::gunzip_to(path, &unzipped)?;
        }
        return Ok(unzipped);
    }
    Ok(path.to_owned())
}

/// Local-filesystem cache backed by the EBI flat-file tree.
pub struct FileStore {
    client: Client,
    base_url: String,
    download_dir: Utf8PathBuf,
    auto_update: bool,
}

impl FileStore {
    pub fn new(config: &ChebiConfig) -> Result<Self, ChebiError> {
        Ok(Self {
            client: http_client(Duration::from_secs(120))?,
            base_url: CHEBI_FLAT_FILE_URL.to_string(),
            download_dir: config.resolve_download_dir()?,
            auto_update: config.auto_update,
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn download_dir(&self) -> &Utf8Path {
        &self.download_dir
    }

    fn download(&self, name: &str, destination: &Utf8Path) -> Result<(), ChebiError> {
        let url = format!("{}{name}", self.base_url);
        let mut response =
            send_with_retries(|| self.client.get(&url)).map_err(|err| ChebiError::Download {
                name: name.to_string(),
                message: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ChebiError::DownloadStatus {
                name: name.to_string(),
                status: response.status().as_u16(),
            });
        }
        fs_util::write_atomic(&mut response, destination)
    }
}

impl BlobStore for FileStore {
    fn fetch(&self, name: &str) -> Result<Utf8PathBuf, ChebiError> {
        let filepath = self.download_dir.join(name);
        if !self.is_current(&filepath) {
            fs::create_dir_all(self.download_dir.as_std_path())
                .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
            tracing::info!(file = name, "downloading from EBI");
            self.download(name, &filepath)?;
        }
        resolve_decompressed(&filepath, &self.download_dir, self)
    }

    fn is_current(&self, path: &Utf8Path) -> bool {
        if !self.auto_update {
            return true;
        }
        match file_mtime(path) {
            Some(mtime) => !is_stale(mtime, last_release_time(Utc::now().naive_utc())),
            None => false,
        }
    }
}

/// Object-storage cache: release files mirrored into an HTTPS-addressable
/// bucket, with a temp working directory for the decompressed copies.
pub struct BucketStore {
    client: Client,
    base_url: String,
    bucket_url: String,
    token: Option<String>,
    auto_update: bool,
    work_dir: Utf8PathBuf,
    _work: tempfile::TempDir,
}

impl BucketStore {
    pub fn new(config: &ChebiConfig) -> Result<Self, ChebiError> {
        let bucket = config
            .bucket
            .as_ref()
            .ok_or_else(|| ChebiError::Config("bucket backend requires a bucket name".to_string()))?;
        let work = tempfile::Builder::new()
            .prefix("libchebi-bucket")
            .tempdir()
            .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
        let work_dir = Utf8PathBuf::from_path_buf(work.path().to_path_buf())
            .map_err(|_| ChebiError::Filesystem("non-utf8 temp dir".to_string()))?;
        Ok(Self {
            client: http_client(Duration::from_secs(120))?,
            base_url: CHEBI_FLAT_FILE_URL.to_string(),
            bucket_url: bucket_object_url(bucket),
            token: bucket.token.clone(),
            auto_update: config.auto_update,
            work_dir,
            _work: work,
        })
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/{name}", self.bucket_url)
    }

    fn object_is_current(&self, url: &str) -> bool {
        if !self.auto_update {
            return true;
        }
        let Ok(response) = send_with_retries(|| self.client.head(url)) else {
            return false;
        };
        if !response.status().is_success() {
            return false;
        }
        response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
            .map(|modified| {
                !is_stale(
                    modified.naive_utc(),
                    last_release_time(Utc::now().naive_utc()),
                )
            })
            .unwrap_or(false)
    }

    fn download_object(&self, url: &str, name: &str, local: &Utf8Path) -> Result<(), ChebiError> {
        let mut response =
            send_with_retries(|| self.client.get(url)).map_err(|err| ChebiError::Download {
                name: name.to_string(),
                message: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ChebiError::DownloadStatus {
                name: name.to_string(),
                status: response.status().as_u16(),
            });
        }
        fs_util::write_atomic(&mut response, local)
    }

    fn upload_object(&self, url: &str, local: &Utf8Path) {
        let Some(token) = &self.token else {
            return;
        };
        let Ok(body) = fs::read(local.as_std_path()) else {
            return;
        };
        let result = send_with_retries(|| {
            self.client
                .put(url)
                .bearer_auth(token)
                .body(body.clone())
        });
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(url, status = response.status().as_u16(), "bucket upload rejected");
            }
            Err(err) => tracing::warn!(url, error = %err, "bucket upload failed"),
        }
    }
}

impl BlobStore for BucketStore {
    fn fetch(&self, name: &str) -> Result<Utf8PathBuf, ChebiError> {
        let local = self.work_dir.join(name);
        // The working copy lives for this session only; reuse it as-is.
        if !local.as_std_path().exists() {
            let url = self.object_url(name);
            if self.object_is_current(&url) {
                tracing::info!(file = name, "downloading from bucket");
                self.download_object(&url, name, &local)?;
            } else {
                tracing::info!(file = name, "bucket copy stale, downloading from EBI");
                let ebi_url = format!("{}{name}", self.base_url);
                self.download_object(&ebi_url, name, &local)?;
                self.upload_object(&url, &local);
            }
        }
        resolve_decompressed(&local, &self.work_dir, self)
    }

    fn is_current(&self, path: &Utf8Path) -> bool {
        if !self.auto_update {
            return true;
        }
        match file_mtime(path) {
            Some(mtime) => !is_stale(mtime, last_release_time(Utc::now().naive_utc())),
            None => false,
        }
    }
}

fn bucket_object_url(bucket: &BucketConfig) -> String {
    let mut url = format!("https://storage.googleapis.com/{}", bucket.name);
    if !bucket.prefix.is_empty() {
        url.push('/');
        url.push_str(&bucket.prefix);
    }
    url
}

/// Backend selection from configuration, composed into the cache object.
pub fn build_store(config: &ChebiConfig) -> Result<Box<dyn BlobStore>, ChebiError> {
    match config.backend {
        crate::config::Backend::File => Ok(Box::new(FileStore::new(config)?)),
        crate::config::Backend::Bucket => Ok(Box::new(BucketStore::new(config)?)),
    }
}
