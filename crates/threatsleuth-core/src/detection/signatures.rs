/// Signature database: the lookup tables the detection pipeline consults.
///
/// The pipeline only talks to the [`SignatureDatabase`] trait, so the
/// built-in static tables can be swapped for another source without
/// touching detection logic. [`SignatureSet`] is the in-process
/// implementation: fixed extension and file-name gates, text signatures for
/// prefix matching, and a SHA-256 → label map.
use crate::error::ConfigError;
use memchr::memmem;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// The EICAR anti-malware test string.
pub const EICAR_SIGNATURE: &str =
    r"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

/// Label reported for EICAR prefix matches.
pub const EICAR_LABEL: &str = "Malware.Test.EICAR";

/// Label for hash-list entries that do not name their own type.
pub const GENERIC_HASH_LABEL: &str = "Malware.Generic.Hash";

/// SHA-256 of the canonical 68-byte EICAR file.
const EICAR_SHA256: &str = "275a021bbfb6489e54d471899f7db9d1663fc695ec2fe2a2c4538aabf651fd0f";

/// Executables and script interpreters worth opening. Lowercase, no dot.
const SUSPICIOUS_EXTENSIONS: &[&str] = &[
    "exe", "bat", "ps1", "vbs", "js", "com", "scr", "cmd", "msi", "dll",
];

/// Well-known test-file names inspected regardless of extension.
const TEST_FILE_NAMES: &[&str] = &["eicar.com", "eicar.txt", "eicar.com.txt"];

/// A byte string searched for in the file prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSignature {
    pub label: String,
    pub pattern: String,
}

/// Read-only lookup interface used by [`super::Detector`].
///
/// Implementations must be immutable once shared; the detector may be
/// called from any thread.
pub trait SignatureDatabase: Send + Sync + std::fmt::Debug {
    /// `ext` is lowercase without the leading dot.
    fn is_suspicious_extension(&self, ext: &str) -> bool;

    /// `name` is the lowercase base file name.
    fn is_test_file_name(&self, name: &str) -> bool;

    /// First text signature contained in `prefix`, if any.
    fn match_text(&self, prefix: &[u8]) -> Option<&TextSignature>;

    /// Threat label for a lowercase hex SHA-256 digest.
    fn lookup_hash(&self, sha256_hex: &str) -> Option<&str>;
}

/// In-process signature tables.
#[derive(Debug, Clone, Default)]
pub struct SignatureSet {
    extensions: HashSet<String>,
    test_names: HashSet<String>,
    text: Vec<TextSignature>,
    hashes: HashMap<String, String>,
}

impl SignatureSet {
    /// An empty set: gates nothing, matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in tables.
    pub fn builtin() -> Self {
        let mut set = Self {
            extensions: SUSPICIOUS_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            test_names: TEST_FILE_NAMES.iter().map(|n| n.to_string()).collect(),
            text: vec![TextSignature {
                label: EICAR_LABEL.to_string(),
                pattern: EICAR_SIGNATURE.to_string(),
            }],
            hashes: HashMap::new(),
        };
        set.hashes
            .insert(EICAR_SHA256.to_string(), "Malware.EICAR.SHA256".to_string());
        set
    }

    /// Shared instance of [`SignatureSet::builtin`], built on first use.
    pub fn shared_builtin() -> Arc<dyn SignatureDatabase> {
        static BUILTIN: OnceLock<Arc<SignatureSet>> = OnceLock::new();
        BUILTIN.get_or_init(|| Arc::new(SignatureSet::builtin())).clone()
    }

    /// Add or replace a known-bad digest. The digest is stored lowercase.
    pub fn with_hash(mut self, sha256_hex: &str, label: &str) -> Self {
        self.hashes
            .insert(sha256_hex.trim().to_ascii_lowercase(), label.to_string());
        self
    }

    /// Add a text signature searched for in file prefixes.
    pub fn with_text(mut self, label: &str, pattern: &str) -> Self {
        self.text.push(TextSignature {
            label: label.to_string(),
            pattern: pattern.to_string(),
        });
        self
    }

    /// Add an extension (with or without the leading dot) to the inspection gate.
    pub fn with_extension(mut self, ext: &str) -> Self {
        self.extensions
            .insert(ext.trim_start_matches('.').to_ascii_lowercase());
        self
    }

    pub fn hash_count(&self) -> usize {
        self.hashes.len()
    }

    /// Merge a hash-list file into this set.
    ///
    /// One entry per line: `<sha256-hex> [label]`. Blank lines and lines
    /// starting with `#` are skipped. Entries without a label get
    /// [`GENERIC_HASH_LABEL`]. Returns the number of entries read.
    pub fn load_hash_list(&mut self, path: &Path) -> Result<usize, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut added = 0usize;
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, char::is_whitespace);
            let digest = parts.next().unwrap_or_default();
            if !is_sha256_hex(digest) {
                return Err(ConfigError::InvalidHash {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    value: digest.to_string(),
                });
            }
            let label = parts
                .next()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .unwrap_or(GENERIC_HASH_LABEL);
            self.hashes
                .insert(digest.to_ascii_lowercase(), label.to_string());
            added += 1;
        }
        Ok(added)
    }
}

impl SignatureDatabase for SignatureSet {
    fn is_suspicious_extension(&self, ext: &str) -> bool {
        self.extensions.contains(ext)
    }

    fn is_test_file_name(&self, name: &str) -> bool {
        self.test_names.contains(name)
    }

    fn match_text(&self, prefix: &[u8]) -> Option<&TextSignature> {
        self.text
            .iter()
            .find(|sig| memmem::find(prefix, sig.pattern.as_bytes()).is_some())
    }

    fn lookup_hash(&self, sha256_hex: &str) -> Option<&str> {
        self.hashes.get(sha256_hex).map(String::as_str)
    }
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_gates() {
        let set = SignatureSet::builtin();
        for ext in ["exe", "bat", "ps1", "vbs", "js", "com", "scr", "cmd", "msi", "dll"] {
            assert!(set.is_suspicious_extension(ext), "{ext} should be gated in");
        }
        assert!(!set.is_suspicious_extension("txt"));
        assert!(!set.is_suspicious_extension("EXE"), "caller lowercases");
        assert!(set.is_test_file_name("eicar.txt"));
        assert!(set.is_test_file_name("eicar.com"));
        assert!(!set.is_test_file_name("notes.txt"));
    }

    #[test]
    fn match_text_finds_eicar_anywhere_in_prefix() {
        let set = SignatureSet::builtin();
        let mut prefix = b"some leading junk ".to_vec();
        prefix.extend_from_slice(EICAR_SIGNATURE.as_bytes());
        prefix.extend_from_slice(b"\r\n");
        let sig = set.match_text(&prefix).expect("EICAR should match");
        assert_eq!(sig.label, EICAR_LABEL);
        assert!(set.match_text(b"EICAR-STANDARD").is_none());
    }

    #[test]
    fn builtin_hash_table_has_eicar_digest() {
        let set = SignatureSet::builtin();
        assert_eq!(set.lookup_hash(EICAR_SHA256), Some("Malware.EICAR.SHA256"));
        assert_eq!(set.lookup_hash(&"0".repeat(64)), None);
    }

    #[test]
    fn with_hash_stores_lowercase() {
        let digest = "AB".repeat(32);
        let set = SignatureSet::empty().with_hash(&digest, "Trojan.Test");
        assert_eq!(set.lookup_hash(&"ab".repeat(32)), Some("Trojan.Test"));
    }

    #[test]
    fn with_extension_strips_dot() {
        let set = SignatureSet::empty().with_extension(".JAR");
        assert!(set.is_suspicious_extension("jar"));
    }

    #[test]
    fn load_hash_list_parses_labels_and_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# local blocklist").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}  Trojan.Dropper", "a".repeat(64)).unwrap();
        writeln!(file, "{}", "B".repeat(64)).unwrap();

        let mut set = SignatureSet::empty();
        let added = set.load_hash_list(file.path()).unwrap();
        assert_eq!(added, 2);
        assert_eq!(set.lookup_hash(&"a".repeat(64)), Some("Trojan.Dropper"));
        assert_eq!(set.lookup_hash(&"b".repeat(64)), Some(GENERIC_HASH_LABEL));
    }

    #[test]
    fn load_hash_list_rejects_bad_digest_with_line_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", "c".repeat(64)).unwrap();
        writeln!(file, "not-a-hash Some.Label").unwrap();

        let mut set = SignatureSet::empty();
        match set.load_hash_list(file.path()) {
            Err(ConfigError::InvalidHash { line, value, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "not-a-hash");
            }
            other => panic!("expected InvalidHash, got {other:?}"),
        }
    }

    #[test]
    fn load_hash_list_missing_file_is_io_error() {
        let mut set = SignatureSet::empty();
        let err = set
            .load_hash_list(Path::new("/definitely/not/here.txt"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
