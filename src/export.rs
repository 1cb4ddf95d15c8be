//! Write the annotated HTML report.
//!
//! Rendering is done by `tracklight_core::render`; this module decides
//! where the bytes go. [`ExportTarget`] is the seam for destinations other
//! than the local disk.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracklight_core::color::ColorCache;
use tracklight_core::models::Char;
use tracklight_core::render::render_html_string;

use crate::error::Result;

/// A place an HTML report can be written to.
pub trait ExportTarget {
    fn open_writer(&self, path: &Path) -> io::Result<Box<dyn Write>>;
}

/// Writes to the local filesystem, creating parent directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTarget;

impl ExportTarget for LocalTarget {
    fn open_writer(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

/// Render `chars` and write the document through `target`.
pub fn export_report(
    target: &dyn ExportTarget,
    path: &Path,
    chars: &[Char],
    colors: &mut ColorCache,
    include_key: bool,
) -> Result<()> {
    let html = render_html_string(chars, colors, include_key);
    let mut writer = target.open_writer(path)?;
    writer.write_all(html.as_bytes())?;
    writer.flush()?;
    tracing::info!(path = %path.display(), chars = chars.len(), "exported html report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::highlighter::HighlightedFile;
    use crate::token::{create_test_line, SpanGroup};

    /// Collects written bytes in memory.
    #[derive(Default, Clone)]
    struct MemoryTarget {
        written: Rc<RefCell<Vec<u8>>>,
    }

    struct MemoryWriter(Rc<RefCell<Vec<u8>>>);

    impl Write for MemoryWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ExportTarget for MemoryTarget {
        fn open_writer(&self, _path: &Path) -> io::Result<Box<dyn Write>> {
            Ok(Box::new(MemoryWriter(Rc::clone(&self.written))))
        }
    }

    #[test]
    fn test_export_through_custom_target() {
        let line = create_test_line("Frigate <A>");
        line.whitespace_tokens()[0]
            .record("Tool", "name", "Frigate", None)
            .unwrap();
        let target = MemoryTarget::default();
        line.highlighted_file()
            .export_to(&target, Path::new("out.html"), true)
            .unwrap();

        let html = String::from_utf8(target.written.borrow().clone()).unwrap();
        assert!(html.starts_with("<html>"));
        assert!(html.contains("title=\"Tool/name, Value:Frigate\""));
        assert!(html.contains("&lt;A&gt;"));
        assert!(html.contains("Color Key"));
    }

    #[test]
    fn test_local_target_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reports").join("a.html");
        let hf = HighlightedFile::from_text("abc");
        hf.materialize().unwrap();
        hf.export(&path, false).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("abc"));
        assert!(!html.contains("Color Key"));
    }
}
