//! Local static file server that exposes the base directory to the browser
//!
//! The server lives exactly as long as its [`StaticServer`] handle: dropping
//! the handle (or calling [`StaticServer::shutdown`]) stops the serving thread
//! and releases the port.

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Method, Request, Response, Server};

pub struct StaticServer {
    server: Arc<Server>,
    worker: Option<JoinHandle<()>>,
    port: u16,
}

impl StaticServer {
    /// Bind `127.0.0.1:<port>` and serve files under `root`.
    /// Port 0 binds an OS-assigned port, see [`port`](Self::port).
    pub fn start(root: &Path, port: u16) -> Result<Self> {
        let server = Server::http(("127.0.0.1", port)).map_err(|e| Error::ServerStart {
            port,
            message: e.to_string(),
        })?;
        let bound = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(port);

        let server = Arc::new(server);
        let root = root.to_path_buf();
        let srv = server.clone();
        let worker = thread::Builder::new()
            .name("pagesnap-static".into())
            .spawn(move || {
                for request in srv.incoming_requests() {
                    handle(&root, request);
                }
            })
            .map_err(|e| Error::ServerStart {
                port,
                message: format!("failed to spawn server thread: {}", e),
            })?;

        log::info!("serving static files on http://127.0.0.1:{}/", bound);
        Ok(Self {
            server,
            worker: Some(worker),
            port: bound,
        })
    }

    /// The port actually bound
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        base_url(self.port)
    }

    /// Stop serving and release the port
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.server.unblock();
            if worker.join().is_err() {
                log::warn!("static server thread panicked");
            }
            log::debug!("static server on port {} stopped", self.port);
        }
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Root URL of a server bound on `port`
pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/", port)
}

fn handle(root: &Path, request: Request) {
    let response = match request.method() {
        Method::Get | Method::Head => serve_file(root, request.url()),
        _ => Response::from_string("Method Not Allowed").with_status_code(405),
    };
    log::debug!("{} {} -> {}", request.method(), request.url(), response.status_code().0);
    if let Err(e) = request.respond(response) {
        log::warn!("failed to send response: {}", e);
    }
}

fn serve_file(root: &Path, url: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let not_found = || Response::from_string("Not Found").with_status_code(404);

    let path = match resolve_request_path(root, url) {
        Some(p) => p,
        None => return not_found(),
    };
    let body = match fs::read(&path) {
        Ok(b) => b,
        Err(_) => return not_found(),
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let mut response = Response::from_data(body);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], mime.essence_str().as_bytes()) {
        response.add_header(header);
    }
    response
}

/// Map a request URL onto a file under `root`. Returns `None` for paths
/// that would escape the root.
fn resolve_request_path(root: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(|c| c == '?' || c == '#').next().unwrap_or("");
    let decoded = urlencoding::decode(path).ok()?;

    let mut resolved = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') => return None,
            s => resolved.push(s),
        }
    }
    if resolved.is_dir() {
        resolved.push("index.html");
    }
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn resolves_paths_inside_root() {
        let root = Path::new("/srv/site");
        assert_eq!(
            resolve_request_path(root, "/a/b.html?v=1"),
            Some(PathBuf::from("/srv/site/a/b.html"))
        );
        assert_eq!(
            resolve_request_path(root, "/with%20space.html"),
            Some(PathBuf::from("/srv/site/with space.html"))
        );
        assert_eq!(resolve_request_path(root, "/../etc/passwd"), None);
        assert_eq!(resolve_request_path(root, "/a/%2e%2e/%2e%2e/x"), None);
    }

    #[test]
    fn serves_files_with_content_type() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("css/site.css"), "h1{color:red}").unwrap();

        let server = StaticServer::start(dir.path(), 0).unwrap();
        let base = server.base_url();

        let resp = reqwest::blocking::get(format!("{}css/site.css", base)).unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(resp.headers()["content-type"], "text/css");
        assert_eq!(resp.text().unwrap(), "h1{color:red}");

        let resp = reqwest::blocking::get(&base).unwrap();
        assert_eq!(resp.text().unwrap(), "<h1>home</h1>");

        let resp = reqwest::blocking::get(format!("{}missing.html", base)).unwrap();
        assert_eq!(resp.status().as_u16(), 404);

        server.shutdown();
    }

    #[test]
    fn port_is_released_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let server = StaticServer::start(dir.path(), 0).unwrap();
        let port = server.port();
        drop(server);

        // The accept loop exits asynchronously after the handle is gone.
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match StaticServer::start(dir.path(), port) {
                Ok(again) => {
                    assert_eq!(again.port(), port);
                    break;
                }
                Err(e) if Instant::now() > deadline => panic!("port {} not released: {}", port, e),
                Err(_) => std::thread::sleep(Duration::from_millis(50)),
            }
        }
    }

    #[test]
    fn occupied_port_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let first = StaticServer::start(dir.path(), 0).unwrap();
        let err = StaticServer::start(dir.path(), first.port()).err().unwrap();
        assert!(matches!(err, Error::ServerStart { .. }));
    }
}
