use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use uuid::Uuid;

use super::ReportError;

/// Rendered report artifacts, one `report-<bill_id>.pdf` per bill.
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, bill_id: &Uuid) -> PathBuf {
        self.dir.join(format!("report-{bill_id}.pdf"))
    }

    /// Write the artifact next to its target without making it visible.
    pub fn stage(&self, bill_id: &Uuid, pdf_bytes: &[u8]) -> Result<StagedReport, ReportError> {
        std::fs::create_dir_all(&self.dir)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(pdf_bytes)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;

        Ok(StagedReport {
            bill_id: *bill_id,
            dir: self.dir.clone(),
            tmp,
            target: self.path_for(bill_id),
        })
    }

    pub fn open(&self, bill_id: &Uuid) -> Result<Vec<u8>, ReportError> {
        match std::fs::read(self.path_for(bill_id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ReportError::NotGenerated(*bill_id))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// A fully written artifact not yet renamed into place. Dropping it removes
/// the temp file and leaves any published artifact untouched.
pub struct StagedReport {
    bill_id: Uuid,
    dir: PathBuf,
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedReport {
    /// Atomically replace the artifact. Readers see either the old file or
    /// the complete new one. The previous bytes are kept for `rollback`.
    pub fn publish(self) -> Result<PublishedReport, ReportError> {
        let previous = match std::fs::read(&self.target) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        self.tmp.persist(&self.target).map_err(|e| ReportError::Io(e.error))?;
        tracing::info!(bill_id = %self.bill_id, "Report artifact published");

        Ok(PublishedReport {
            bill_id: self.bill_id,
            dir: self.dir,
            target: self.target,
            previous,
        })
    }
}

/// A published artifact that can still be reverted to what it replaced.
pub struct PublishedReport {
    bill_id: Uuid,
    dir: PathBuf,
    target: PathBuf,
    previous: Option<Vec<u8>>,
}

impl PublishedReport {
    /// Keep the new artifact.
    pub fn commit(self) -> PathBuf {
        self.target
    }

    /// Put back the artifact this one replaced, or remove it if there was none.
    pub fn rollback(self) -> Result<(), ReportError> {
        match self.previous {
            Some(bytes) => {
                let mut tmp = NamedTempFile::new_in(&self.dir)?;
                tmp.write_all(&bytes)?;
                tmp.as_file().sync_all()?;
                tmp.persist(&self.target).map_err(|e| ReportError::Io(e.error))?;
            }
            None => std::fs::remove_file(&self.target)?,
        }
        tracing::warn!(bill_id = %self.bill_id, "Report artifact rolled back");
        Ok(())
    }
}
