use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::{PipelineError, Result};

// rust 的 async trait 还没有稳定，可以用async_trait 宏
#[async_trait]
pub trait Fetch {
    type Error;
    async fn fetch(&self) -> Result<String, Self::Error>;
}

/// 从 http(s) 源、file:// 源或者本地路径中获取原始 CSV 文本
///
/// 只尝试一次，没有重试也没有超时
pub async fn retrieve_data(source: impl AsRef<str>) -> Result<String> {
    let name = source.as_ref();
    if name.starts_with("http://") || name.starts_with("https://") {
        UrlFetcher(name).fetch().await
    } else if let Some(path) = name.strip_prefix("file://") {
        FileFetcher(path).fetch().await
    } else if name.contains("://") {
        Err(PipelineError::fetch(
            name,
            "We only support http/https/file at the moment",
        ))
    } else {
        FileFetcher(name).fetch().await
    }
}

struct UrlFetcher<'a>(pub(crate) &'a str);

#[async_trait]
impl<'a> Fetch for UrlFetcher<'a> {
    type Error = PipelineError;

    async fn fetch(&self) -> Result<String, Self::Error> {
        debug!("GET {}", self.0);
        let resp = reqwest::get(self.0)
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| PipelineError::fetch(self.0, e))?;
        resp.text().await.map_err(|e| PipelineError::fetch(self.0, e))
    }
}

struct FileFetcher<'a>(pub(crate) &'a str);

#[async_trait]
impl<'a> Fetch for FileFetcher<'a> {
    type Error = PipelineError;

    async fn fetch(&self) -> Result<String, Self::Error> {
        debug!("reading {}", self.0);
        fs::read_to_string(self.0)
            .await
            .map_err(|e| PipelineError::fetch(self.0, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 本地起一个只应答一次的 http 服务，返回请求地址
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let resp = format!(
                "HTTP/1.1 {status}\r\ncontent-type: text/csv\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(resp.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/countries-aggregated.csv")
    }

    #[tokio::test]
    async fn http_ok_returns_body() {
        let body = "Date,Country,Confirmed,Recovered,Deaths\n2020-03-09,Italy,1,0,0\n";
        let url = serve_once("200 OK", body).await;
        assert_eq!(retrieve_data(&url).await.unwrap(), body);
    }

    #[tokio::test]
    async fn http_not_found_is_a_fetch_error() {
        let url = serve_once("404 Not Found", "").await;
        match retrieve_data(&url).await.unwrap_err() {
            PipelineError::Fetch { location, message } => {
                assert_eq!(location, url);
                assert!(message.contains("404"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn bare_path_and_file_url_read_the_same_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Date,Country,Confirmed,Recovered,Deaths\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let plain = retrieve_data(&path).await.unwrap();
        let url = retrieve_data(format!("file://{}", path)).await.unwrap();
        assert_eq!(plain, url);
        assert!(plain.starts_with("Date,Country"));
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let err = retrieve_data("/definitely/not/here.csv").await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let err = retrieve_data("ftp://example.com/data.csv").await.unwrap_err();
        match err {
            PipelineError::Fetch { location, .. } => assert_eq!(location, "ftp://example.com/data.csv"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
