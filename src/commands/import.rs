use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use bytes::Bytes;
use clap::Subcommand;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::{Context, JOB_TEMPLATE};
use crate::client::UploadApi;
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::jobs::wait_for_job;
use crate::model::{NewJob, UploadSession, JOB_TYPE_IMPORT};

/// Bytes sent per upload request.
const UPLOAD_CHUNK: usize = 8 * 1024 * 1024;

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Upload an import file, resuming an earlier upload with --upload
    Upload {
        file: PathBuf,
        /// Id of an interrupted upload session to resume
        #[arg(long = "upload", value_name = "ID")]
        upload_id: Option<String>,
    },
    /// List uploaded import files ready to process
    List,
    /// Start an import job for an uploaded file
    Process {
        /// Name reported by `import upload` or `import list`
        name: String,
        #[arg(long)]
        wait: bool,
    },
    /// Inspect import jobs
    Job {
        #[command(subcommand)]
        cmd: ImportJobCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImportJobCommands {
    /// List import jobs
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        per_page: u32,
    },
    /// Show one import job
    Show { id: String },
}

pub async fn run(cmd: ImportCommands, ctx: &Context<'_>) -> Result<()> {
    let client = ctx.client();
    match cmd {
        ImportCommands::Upload { file, upload_id } => {
            let size = tokio::fs::metadata(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?
                .len();
            let session = match upload_id {
                Some(id) => {
                    let us = client
                        .get_upload(&id)
                        .await
                        .with_context(|| format!("failed to get upload session {id}"))?;
                    if us.file_size != size as i64 {
                        bail!(
                            "file {} does not match upload session {id}: expected {} bytes, found {size}",
                            file.display(),
                            us.file_size
                        );
                    }
                    us
                }
                None => {
                    let filename = file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .context("import file has no name")?;
                    let user_id = ctx
                        .session
                        .user()
                        .map(|u| u.id.clone())
                        .unwrap_or_else(|| "nouser".to_string());
                    let us = client
                        .create_upload(&UploadSession {
                            upload_type: "import".to_string(),
                            filename,
                            file_size: size as i64,
                            user_id,
                            ..Default::default()
                        })
                        .await
                        .context("failed to create upload session")?;
                    ctx.printer
                        .print_t("Upload session successfully created, ID: {{ id }}", &us);
                    us
                }
            };
            upload_from_offset(client, &session, &file).await?;
            ctx.printer.print_t(
                "Import file successfully uploaded, name: {{ name }}",
                &json!({ "upload_id": session.id, "name": session.import_name() }),
            );
            Ok(())
        }
        ImportCommands::List => {
            let names = client.list_imports().await.context("failed to list imports")?;
            if names.is_empty() {
                ctx.printer.print_warning("No import files found");
            }
            for name in &names {
                ctx.printer.print(name);
            }
            Ok(())
        }
        ImportCommands::Process { name, wait } => {
            let mut data = BTreeMap::new();
            data.insert("import_file".to_string(), name);
            let job = client
                .create_job(&NewJob {
                    job_type: JOB_TYPE_IMPORT.to_string(),
                    data,
                })
                .await
                .context("failed to create import process job")?;
            let job = if wait {
                wait_for_job(client, &job.id).await?
            } else {
                job
            };
            ctx.printer.set_single(true);
            ctx.printer.print_t(JOB_TEMPLATE, &job);
            Ok(())
        }
        ImportCommands::Job {
            cmd: ImportJobCommands::List { page, per_page },
        } => {
            let jobs = client
                .get_jobs_by_type(JOB_TYPE_IMPORT, page, per_page)
                .await
                .context("failed to get import jobs")?;
            if jobs.is_empty() {
                ctx.printer.print_warning("No jobs found");
            }
            for job in &jobs {
                ctx.printer.print_t(JOB_TEMPLATE, job);
            }
            Ok(())
        }
        ImportCommands::Job {
            cmd: ImportJobCommands::Show { id },
        } => {
            let job = client
                .get_job(&id)
                .await
                .with_context(|| format!("failed to get import job {id}"))?;
            ctx.printer.set_single(true);
            ctx.printer.print_t(JOB_TEMPLATE, &job);
            Ok(())
        }
    }
}

/// Stream `path` into `session` starting at the session's current offset.
pub(crate) async fn upload_from_offset<C: UploadApi + ?Sized>(
    client: &C,
    session: &UploadSession,
    path: &Path,
) -> Result<()> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let offset = u64::try_from(session.file_offset).unwrap_or(0);
    file.seek(std::io::SeekFrom::Start(offset)).await?;
    tracing::debug!(upload = %session.id, offset, "uploading import file");

    let mut buf = vec![0u8; UPLOAD_CHUNK];
    loop {
        let n = read_full(&mut file, &mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let done = client
            .upload_data(&session.id, Bytes::copy_from_slice(&buf[..n]))
            .await
            .context("failed to upload data")?;
        if done.is_some() {
            return Ok(());
        }
    }
}

async fn read_full(file: &mut tokio::fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiResult;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingUploads {
        received: Mutex<Vec<u8>>,
        expected: usize,
    }

    #[async_trait]
    impl UploadApi for RecordingUploads {
        async fn create_upload(&self, upload: &UploadSession) -> ApiResult<UploadSession> {
            Ok(upload.clone())
        }

        async fn get_upload(&self, _: &str) -> ApiResult<UploadSession> {
            Ok(UploadSession::default())
        }

        async fn upload_data(&self, _: &str, data: Bytes) -> ApiResult<Option<Value>> {
            let mut received = self.received.lock().unwrap();
            received.extend_from_slice(&data);
            Ok((received.len() >= self.expected).then(|| json!({"name": "done"})))
        }

        async fn list_imports(&self) -> ApiResult<Vec<String>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn resumes_from_the_session_offset() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.zip");
        std::fs::write(&path, b"0123456789").unwrap();
        let uploads = RecordingUploads {
            expected: 6,
            ..Default::default()
        };
        let session = UploadSession {
            id: "up1".into(),
            filename: "data.zip".into(),
            file_size: 10,
            file_offset: 4,
            ..Default::default()
        };
        upload_from_offset(&uploads, &session, &path).await.unwrap();
        assert_eq!(&*uploads.received.lock().unwrap(), b"456789");
    }
}
