use std::{
    fs,
    path::Path,
    process::{Command, Stdio},
};

use tracing::{debug, error};

/// Converts HTML markup into a PDF at `destination`.
///
/// Failure is an opaque `false`; callers decide whether to retry.
pub trait PdfConverter: Send + Sync {
    fn convert(&self, markup: &str, destination: &Path) -> bool;
}

/// Runs an external `<bin> <input.html> <output.pdf>` converter such as
/// wkhtmltopdf. Blocking; call it from `web::block`.
#[derive(Debug, Clone)]
pub struct CommandPdfConverter {
    bin: String,
}

impl CommandPdfConverter {
    pub fn new(bin: impl Into<String>) -> Self {
        CommandPdfConverter { bin: bin.into() }
    }
}

impl PdfConverter for CommandPdfConverter {
    fn convert(&self, markup: &str, destination: &Path) -> bool {
        if let Some(parent) = destination.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!(error = %e, dir = %parent.display(), "Cannot create output directory");
                return false;
            }
        }

        let input = destination.with_extension("html");
        if let Err(e) = fs::write(&input, markup) {
            error!(error = %e, file = %input.display(), "Cannot write converter input");
            return false;
        }

        let output = Command::new(&self.bin)
            .arg(&input)
            .arg(destination)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();
        let _ = fs::remove_file(&input);

        match output {
            Ok(out) if out.status.success() && destination.exists() => {
                debug!(file = %destination.display(), "PDF written");
                true
            }
            Ok(out) => {
                error!(
                    bin = %self.bin,
                    status = %out.status,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "PDF conversion failed"
                );
                false
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(bin = %self.bin, "PDF converter binary not found");
                false
            }
            Err(e) => {
                error!(error = %e, bin = %self.bin, "Failed to run PDF converter");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_reports_failure() {
        let dir = std::env::temp_dir().join(format!("hrdocs-pdf-{}", uuid::Uuid::new_v4()));
        let dest = dir.join("out.pdf");
        let converter = CommandPdfConverter::new("hrdocs-no-such-converter");

        assert!(!converter.convert("<p>hi</p>", &dest));
        assert!(!dest.exists());
        assert!(!dest.with_extension("html").exists());
        let _ = fs::remove_dir_all(dir);
    }
}
