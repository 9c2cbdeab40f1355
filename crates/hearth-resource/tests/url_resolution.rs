//! URL strategy tests against a real HTTP server.
//!
//! A `tiny_http` server is started in-process on a random port; the resolver
//! uses the default `ureq`-backed fetcher.

use hearth_resource::{Bundle, ResourceError, ResourceResolver, Strategy};
use std::sync::Arc;
use tiny_http::{Response, Server, StatusCode};

struct TestServer {
    url: String,
    server: Arc<Server>,
}

impl TestServer {
    /// Serves `body` at `/solrconfig.xml` and 404 for everything else.
    fn start(body: &'static str) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let port = server.server_addr().to_ip().unwrap().port();
        let srv = Arc::clone(&server);
        std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                let response = if request.url() == "/solrconfig.xml" {
                    Response::from_string(body)
                } else {
                    Response::from_string("not found").with_status_code(StatusCode(404))
                };
                let _ = request.respond(response);
            }
        });
        Self {
            url: format!("http://127.0.0.1:{port}"),
            server,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

#[test]
fn http_url_is_served_by_url_strategy() {
    let server = TestServer::start("<config><remote/></config>");
    let resolver = ResourceResolver::new(Bundle::defaults());

    let res = resolver
        .resolve(&format!("{}/solrconfig.xml", server.url))
        .unwrap();
    assert_eq!(res.strategy(), Strategy::Url);
    assert_eq!(res.into_bytes().unwrap(), b"<config><remote/></config>");
}

#[test]
fn http_404_falls_through_and_reports_not_found() {
    let server = TestServer::start("<config/>");
    let resolver = ResourceResolver::new(Bundle::defaults());
    let name = format!("{}/schema.xml", server.url);

    let err = resolver.resolve(&name).unwrap_err();
    match err {
        ResourceError::NotFound { name: n, attempted } => {
            assert_eq!(n, name);
            assert_eq!(
                attempted,
                vec![Strategy::Url, Strategy::Filesystem, Strategy::Bundled]
            );
        }
        other => panic!("expected NotFound, got {other}"),
    }
}

#[test]
fn unreachable_host_falls_through() {
    // Bind and immediately drop a listener to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let resolver = ResourceResolver::new(Bundle::defaults());
    let err = resolver
        .resolve(&format!("http://127.0.0.1:{port}/schema.xml"))
        .unwrap_err();
    assert!(matches!(err, ResourceError::NotFound { .. }));
}

#[test]
fn file_url_is_served_by_url_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.xml");
    std::fs::write(&path, "<schema name=\"local\"/>").unwrap();
    let url = format!("file://{}", path.display());

    let resolver = ResourceResolver::new(Bundle::empty());
    let res = resolver.resolve(&url).unwrap();
    assert_eq!(res.strategy(), Strategy::Url);
    assert_eq!(res.into_bytes().unwrap(), b"<schema name=\"local\"/>");
}
