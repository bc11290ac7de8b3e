/// Detection pipeline: decides whether one file is a threat.
///
/// Stages, cheapest first:
/// 1. **Gate:** only files with a suspicious extension or a known test-file
///    name are opened at all. This is a cost control, not a security boundary.
/// 2. **Prefix signatures:** the first [`PREFIX_LEN`] bytes are searched for
///    known text signatures (the EICAR test string).
/// 3. **Content hash:** the whole file is SHA-256 hashed and the hex digest
///    looked up in the hash table.
///
/// Any I/O failure (permission denied, file vanished mid-scan) makes the file
/// clean as far as this pipeline is concerned. The detector holds no mutable
/// state and can be shared across threads.
pub mod signatures;

pub use signatures::{SignatureDatabase, SignatureSet, TextSignature};

use crate::model::Threat;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Number of leading bytes searched for text signatures.
pub const PREFIX_LEN: usize = 1024;

/// Read buffer for streaming SHA-256.
const HASH_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Detector {
    signatures: Arc<dyn SignatureDatabase>,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(SignatureSet::shared_builtin())
    }
}

impl Detector {
    pub fn new(signatures: Arc<dyn SignatureDatabase>) -> Self {
        Self { signatures }
    }

    pub fn signatures(&self) -> &Arc<dyn SignatureDatabase> {
        &self.signatures
    }

    /// Whether `path` passes the extension / file-name gate.
    pub fn should_inspect(&self, path: &Path) -> bool {
        let ext = extension_of(path);
        if !ext.is_empty() && self.signatures.is_suspicious_extension(&ext) {
            return true;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        self.signatures.is_test_file_name(&name)
    }

    /// Run the pipeline on one file.
    pub fn scan_file(&self, path: &Path) -> Option<Threat> {
        if !self.should_inspect(path) {
            return None;
        }

        match self.inspect(path) {
            Ok(threat) => threat,
            Err(err) => {
                debug!("Skipping {}: {err}", path.display());
                None
            }
        }
    }

    fn inspect(&self, path: &Path) -> io::Result<Option<Threat>> {
        let mut file = File::open(path)?;
        let display_path = path.to_string_lossy();

        let mut prefix = Vec::with_capacity(PREFIX_LEN);
        (&mut file).take(PREFIX_LEN as u64).read_to_end(&mut prefix)?;
        if let Some(sig) = self.signatures.match_text(&prefix) {
            return Ok(Some(Threat::new(
                display_path,
                sig.label.as_str(),
                sig.pattern.as_str(),
            )));
        }

        file.seek(SeekFrom::Start(0))?;
        let digest = sha256_reader(&mut file)?;
        Ok(self
            .signatures
            .lookup_hash(&digest)
            .map(|label| Threat::new(display_path, label, digest.as_str())))
    }
}

/// Lowercase text after the last `.` of the file name.
///
/// Unlike [`Path::extension`], a dotfile such as `.exe` yields `exe`.
fn extension_of(path: &Path) -> String {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return String::new(),
    };
    match name.rfind('.') {
        Some(dot) => name[dot + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Lowercase hex SHA-256 of everything `reader` yields.
pub fn sha256_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
