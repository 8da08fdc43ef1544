//! Static file serving.
//!
//! Registered as an ordinary `GET` route ending in `*filepath`; the handler
//! maps the captured tail onto a directory on disk.
//!
//! ```rust,no_run
//! use gyre::Engine;
//!
//! let mut engine = Engine::new();
//! // GET /assets/css/site.css  →  ./static/css/site.css
//! engine.static_files("/assets", "./static");
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use http::StatusCode;
use http::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::context::Context;
use crate::handler::{handler_fn, BoxFuture};

/// Content types picked from a file extension.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Css,          // text/css
    Csv,          // text/csv
    Gif,          // image/gif
    Html,         // text/html; charset=utf-8
    Ico,          // image/x-icon
    Jpeg,         // image/jpeg
    JavaScript,   // text/javascript
    Json,         // application/json
    OctetStream,  // application/octet-stream  (anything unknown)
    Pdf,          // application/pdf
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain; charset=utf-8
    Wasm,         // application/wasm
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Csv         => "text/csv",
            Self::Gif         => "image/gif",
            Self::Html        => "text/html; charset=utf-8",
            Self::Ico         => "image/x-icon",
            Self::Jpeg        => "image/jpeg",
            Self::JavaScript  => "text/javascript",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Wasm        => "application/wasm",
            Self::Xml         => "application/xml",
        }
    }

    /// Case-insensitive extension lookup. Unknown or missing extensions map to
    /// `OctetStream`.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "css"          => Self::Css,
            "csv"          => Self::Csv,
            "gif"          => Self::Gif,
            "htm" | "html" => Self::Html,
            "ico"          => Self::Ico,
            "jpg" | "jpeg" => Self::Jpeg,
            "js" | "mjs"   => Self::JavaScript,
            "json"         => Self::Json,
            "pdf"          => Self::Pdf,
            "png"          => Self::Png,
            "svg"          => Self::Svg,
            "txt"          => Self::Text,
            "wasm"         => Self::Wasm,
            "xml"          => Self::Xml,
            _              => Self::OctetStream,
        }
    }
}

/// Joins a captured `filepath` onto `root`, refusing anything that could step
/// outside it.
fn resolve(root: &Path, filepath: &str) -> Option<PathBuf> {
    let relative = Path::new(filepath);
    if filepath.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(root.join(relative))
}

/// Handler serving files below `root` for the `filepath` parameter.
pub fn static_handler(root: PathBuf) -> impl for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static {
    let root = Arc::new(root);
    handler_fn(move |c| {
        let root = Arc::clone(&root);
        Box::pin(async move {
            let Some(path) = resolve(&root, c.param("filepath")) else {
                warn!(filepath = c.param("filepath"), "rejected static path");
                c.status(StatusCode::NOT_FOUND);
                return;
            };

            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    c.set_header(CONTENT_TYPE.as_str(), ContentType::from_path(&path).as_str());
                    c.data(StatusCode::OK, &bytes);
                }
                Err(e) => {
                    debug!(path = %path.display(), "static file unavailable: {e}");
                    c.status(StatusCode::NOT_FOUND);
                }
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(ContentType::from_path(Path::new("a/site.CSS")), ContentType::Css);
        assert_eq!(ContentType::from_path(Path::new("index.html")), ContentType::Html);
        assert_eq!(ContentType::from_path(Path::new("bin/blob")), ContentType::OctetStream);
    }

    #[test]
    fn resolve_refuses_escapes() {
        let root = Path::new("/srv/static");
        assert_eq!(resolve(root, "css/a.css"), Some(PathBuf::from("/srv/static/css/a.css")));
        assert_eq!(resolve(root, "../etc/passwd"), None);
        assert_eq!(resolve(root, "css/../../x"), None);
        assert_eq!(resolve(root, "/etc/passwd"), None);
        assert_eq!(resolve(root, ""), None);
    }
}
