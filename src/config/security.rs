//! Security advisories for unsafe configuration channels.
//!
//! Advisories are informational: they never block resolution and never
//! include the secret value itself, only the fact that one was supplied
//! through a channel considered unsafe (command-line arguments are visible
//! in process listings; plaintext files can leak through backups or loose
//! permissions).
//!
//! Output goes to the diagnostic stream (stderr by default) so it never
//! pollutes the primary output stream; tests inject a capturing sink.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::warn;

const BANNER: &str = "-----------------------------------------------------";

/// Sink for diagnostic output.
pub type DiagnosticSink = Box<dyn Write + Send>;

/// Emits human-readable warnings about configuration values supplied
/// through channels considered unsafe for secrets.
pub struct SecurityAdvisor {
    sink: Mutex<DiagnosticSink>,
}

impl SecurityAdvisor {
    /// Create an advisor writing to stderr.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Box::new(std::io::stderr()))
    }

    /// Create an advisor writing to a custom sink.
    #[must_use]
    pub fn with_sink(sink: DiagnosticSink) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Warn that a database password was supplied via command-line argument.
    pub fn warn_cli_password(&self) {
        warn!("Database password supplied via command-line argument");
        self.emit(&[
            "Database password provided via command-line argument.",
            "Command-line arguments are visible in process listings",
            "and shell history.",
            "",
            "Prefer the DB_PASSWORD environment variable:",
            "  export DB_PASSWORD='your-secure-password'",
        ]);
    }

    /// Warn that a password was found stored in a plaintext properties file.
    pub fn warn_password_in_file(&self, path: &Path) {
        warn!("Database password found in configuration file {:?}", path);
        let location = format!("  {}", path.display());
        self.emit(&[
            "Database password loaded from configuration file:",
            &location,
            "",
            "Prefer the DB_PASSWORD environment variable and remove",
            "the password from the file.",
        ]);
    }

    /// Warn that a properties file is readable by group or other.
    pub fn warn_insecure_permissions(&self, path: &Path, mode: u32) {
        warn!("Insecure permissions {:03o} on {:?}", mode & 0o777, path);
        let detail = format!(
            "Configuration file {} has insecure permissions ({:03o}).",
            path.display(),
            mode & 0o777
        );
        let fix = format!("  chmod 600 {}", path.display());
        self.emit(&[
            &detail,
            "Recommended permissions: 600 (rw-------). Fix with:",
            &fix,
        ]);
    }

    fn emit(&self, lines: &[&str]) {
        let mut sink = self
            .sink
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = writeln!(sink, "{BANNER}");
        let _ = writeln!(sink, "SECURITY WARNING");
        let _ = writeln!(sink, "{BANNER}");
        for line in lines {
            let _ = writeln!(sink, "{line}");
        }
        let _ = writeln!(sink, "{BANNER}");
        let _ = sink.flush();
    }
}

impl Default for SecurityAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

/// A clonable in-memory sink used by tests to capture advisories.
#[derive(Clone, Default)]
pub struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Whether a custom property key likely names a secret.
///
/// Used to mask values in human-readable summaries.
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    ["password", "secret", "token", "credential", "apikey", "api_key"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// The value to display for a property: masked when the key is sensitive.
#[must_use]
pub fn mask_value<'a>(key: &str, value: &'a str) -> &'a str {
    if is_sensitive_key(key) { "***" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_password_warning_names_channel_and_alternative() {
        let sink = SharedSink::new();
        let advisor = SecurityAdvisor::with_sink(Box::new(sink.clone()));

        advisor.warn_cli_password();

        let output = sink.contents();
        assert!(output.contains("command-line argument"));
        assert!(output.contains("DB_PASSWORD"));
    }

    #[test]
    fn test_file_password_warning_never_includes_secret() {
        let sink = SharedSink::new();
        let advisor = SecurityAdvisor::with_sink(Box::new(sink.clone()));

        advisor.warn_password_in_file(Path::new("/home/user/.blockchain-cli/database.toml"));

        let output = sink.contents();
        assert!(output.contains("configuration file"));
        assert!(output.contains("database.toml"));
        assert!(output.contains("DB_PASSWORD"));
    }

    #[test]
    fn test_permission_warning_reports_mode() {
        let sink = SharedSink::new();
        let advisor = SecurityAdvisor::with_sink(Box::new(sink.clone()));

        advisor.warn_insecure_permissions(Path::new("/tmp/database.toml"), 0o100644);

        let output = sink.contents();
        assert!(output.contains("644"));
        assert!(output.contains("600"));
    }

    #[test]
    fn test_sensitive_key_detection() {
        assert!(is_sensitive_key("db.password"));
        assert!(is_sensitive_key("API_TOKEN"));
        assert!(is_sensitive_key("clientSecret"));
        assert!(!is_sensitive_key("search.limit"));
        assert!(!is_sensitive_key("host"));
    }
}
