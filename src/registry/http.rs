// ABOUTME: Cluster registry client speaking plain HTTP/1 to the discovery locators.
// ABOUTME: Reads fan out to every locator; shutdowns try one locator at a time.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::{BoxFuture, select_ok};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;

use super::{AgentHandle, ClusterRegistry, DiscoverySeed, RegistryError};
use crate::types::Locator;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry handle backed by the locators' HTTP endpoints.
///
/// `GET /agents` lists registered agents, `POST /agents/{id}/shutdown`
/// stops one. Group filters are passed as repeated `group` query parameters.
#[derive(Debug, Clone)]
pub struct HttpClusterRegistry {
    locators: Vec<Locator>,
    groups: Vec<String>,
    request_timeout: Duration,
}

impl HttpClusterRegistry {
    pub fn new(seed: &DiscoverySeed) -> Self {
        Self {
            locators: seed.locators.iter().cloned().collect(),
            groups: seed.groups.clone(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Connector suitable for [`super::RegistryHandleCache::new`].
    pub fn connect(seed: &DiscoverySeed) -> Result<Self, RegistryError> {
        Ok(Self::new(seed))
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn agents_path(&self) -> String {
        if self.groups.is_empty() {
            return "/agents".to_string();
        }
        let query: Vec<String> = self
            .groups
            .iter()
            .map(|g| format!("group={}", urlencoding::encode(g)))
            .collect();
        format!("/agents?{}", query.join("&"))
    }

    async fn send_bounded(
        &self,
        locator: &Locator,
        method: &str,
        path: &str,
    ) -> Result<Bytes, RegistryError> {
        tokio::time::timeout(self.request_timeout, send(locator, method, path))
            .await
            .map_err(|_| RegistryError::Timeout)?
    }

    /// Send a read to every locator at once; the first success wins.
    async fn query_any(&self, path: String) -> Result<Bytes, RegistryError> {
        if self.locators.is_empty() {
            return Err(RegistryError::NoLocators);
        }

        let attempts: Vec<BoxFuture<'_, Result<Bytes, RegistryError>>> = self
            .locators
            .iter()
            .map(|locator| Box::pin(self.send_bounded(locator, "GET", &path)) as BoxFuture<'_, _>)
            .collect();

        let (body, _) = select_ok(attempts).await?;
        Ok(body)
    }

    /// Send a command to the locators in order, stopping at the first that accepts it.
    async fn command_first(&self, path: &str) -> Result<Bytes, RegistryError> {
        let mut last_error = RegistryError::NoLocators;
        for locator in &self.locators {
            match self.send_bounded(locator, "POST", path).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::debug!(%locator, "registry command failed, trying next: {}", e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

async fn send(locator: &Locator, method: &str, path: &str) -> Result<Bytes, RegistryError> {
    let unreachable = |reason: String| RegistryError::Unreachable {
        locator: locator.to_string(),
        reason,
    };

    let stream = TcpStream::connect((locator.host(), locator.port()))
        .await
        .map_err(|e| unreachable(e.to_string()))?;
    let io = TokioIo::new(stream);

    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| unreachable(format!("HTTP handshake failed: {}", e)))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("registry connection error: {}", e);
        }
    });

    let req = hyper::Request::builder()
        .method(method)
        .uri(path)
        .header("Host", locator.to_string())
        .header("Accept", "application/json")
        .body(Empty::<Bytes>::new())
        .map_err(|e| unreachable(format!("failed to build request: {}", e)))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| unreachable(format!("request failed: {}", e)))?;

    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| unreachable(format!("failed to read response: {}", e)))?
        .to_bytes();

    if !status.is_success() {
        return Err(RegistryError::Status {
            locator: locator.to_string(),
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).trim().to_string(),
        });
    }

    Ok(body)
}

#[async_trait]
impl ClusterRegistry for HttpClusterRegistry {
    async fn list_agents(&self) -> Result<Vec<AgentHandle>, RegistryError> {
        let body = self.query_any(self.agents_path()).await?;
        serde_json::from_slice(&body).map_err(|e| RegistryError::Decode(e.to_string()))
    }

    async fn shutdown_agent(&self, agent: &AgentHandle) -> Result<(), RegistryError> {
        let path = format!("/agents/{}/shutdown", urlencoding::encode(agent.id.as_str()));
        self.command_first(&path).await?;
        tracing::info!(agent = %agent, "agent shutdown requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeAddress;
    use nonempty::NonEmpty;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Answers every connection with `status` and `body`, reporting request lines.
    async fn responder(
        status: &'static str,
        body: &'static str,
    ) -> (Locator, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&buf);
                    let _ = tx.send(head.lines().next().unwrap_or_default().to_string());
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        (Locator::new("127.0.0.1", port), rx)
    }

    fn registry(locators: Vec<Locator>, groups: &[&str]) -> HttpClusterRegistry {
        let mut iter = locators.into_iter();
        let mut seed = DiscoverySeed::new(NonEmpty::from((iter.next().unwrap(), iter.collect())));
        seed.groups = groups.iter().map(|g| g.to_string()).collect();
        HttpClusterRegistry::new(&seed).request_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn lists_agents_with_group_filter() {
        let (locator, mut requests) = responder(
            "200 OK",
            r#"[{"id":"a1","host_address":"10.0.0.5","host_name":"node-5","zones":["web"]}]"#,
        )
        .await;

        let agents = registry(vec![locator], &["prod", "blue green"])
            .list_agents()
            .await
            .unwrap();

        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].host_name.as_deref(), Some("node-5"));
        assert_eq!(
            requests.recv().await.unwrap(),
            "GET /agents?group=prod&group=blue%20green HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn finds_agent_by_host_name() {
        let (locator, _requests) = responder(
            "200 OK",
            r#"[{"id":"a1","host_address":"10.0.0.5","host_name":"node-5"}]"#,
        )
        .await;

        let found = registry(vec![locator], &[])
            .find_agent_by_address(&NodeAddress::new("node-5").unwrap())
            .await
            .unwrap();

        assert_eq!(found.map(|a| a.id.as_str().to_string()), Some("a1".to_string()));
    }

    async fn dead_locator() -> Locator {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Locator::new("127.0.0.1", port)
    }

    #[tokio::test]
    async fn falls_over_to_a_healthy_locator() {
        let dead = dead_locator().await;
        let (alive, _requests) = responder("200 OK", "[]").await;

        let agents = registry(vec![dead, alive], &[]).list_agents().await.unwrap();
        assert!(agents.is_empty());
    }

    #[tokio::test]
    async fn shutdown_posts_to_encoded_agent_path() {
        let (locator, mut requests) = responder("204 No Content", "").await;
        let agent = AgentHandle::new("agent/1", NodeAddress::new("10.0.0.5").unwrap());

        registry(vec![locator], &[]).shutdown_agent(&agent).await.unwrap();

        assert_eq!(
            requests.recv().await.unwrap(),
            "POST /agents/agent%2F1/shutdown HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn shutdown_is_sent_to_one_locator_only() {
        let (first, mut first_requests) = responder("204 No Content", "").await;
        let (second, mut second_requests) = responder("204 No Content", "").await;
        let agent = AgentHandle::new("a1", NodeAddress::new("10.0.0.5").unwrap());

        registry(vec![first, second], &[])
            .shutdown_agent(&agent)
            .await
            .unwrap();

        assert_eq!(
            first_requests.recv().await.unwrap(),
            "POST /agents/a1/shutdown HTTP/1.1"
        );
        assert!(second_requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn shutdown_moves_past_a_dead_locator() {
        let dead = dead_locator().await;
        let (alive, mut requests) = responder("204 No Content", "").await;
        let agent = AgentHandle::new("a1", NodeAddress::new("10.0.0.5").unwrap());

        registry(vec![dead, alive], &[])
            .shutdown_agent(&agent)
            .await
            .unwrap();

        assert_eq!(
            requests.recv().await.unwrap(),
            "POST /agents/a1/shutdown HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let (locator, _requests) = responder("503 Service Unavailable", "warming up").await;

        let err = registry(vec![locator], &[]).list_agents().await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Status { status: 503, ref body, .. } if body == "warming up"
        ));
    }

    #[tokio::test]
    async fn malformed_listing_is_a_decode_error() {
        let (locator, _requests) = responder("200 OK", "not json").await;

        let err = registry(vec![locator], &[]).list_agents().await.unwrap_err();
        assert!(matches!(err, RegistryError::Decode(_)));
    }
}
