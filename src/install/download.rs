use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use crate::http::HttpClient;
use crate::runtime::Runtime;

/// Downloads a URL to `dest` through the runtime, with retry support.
#[tracing::instrument(skip(runtime, dest, http_client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    dest: &Path,
    http_client: &HttpClient,
) -> Result<()> {
    info!("Downloading {}...", url);

    http_client
        .download_file(url, || {
            runtime
                .create_file(dest)
                .with_context(|| format!("Failed to create {:?}", dest))
        })
        .await?;

    info!("Download complete.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use reqwest::Client;

    #[tokio::test]
    async fn test_download_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/vault.zip")
            .with_status(200)
            .with_body("zip bytes")
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_file()
            .with(eq(Path::new("vault.zip.part").to_path_buf()))
            .returning(|_| Ok(Box::new(std::io::sink())));

        let result = download_file(
            &runtime,
            &format!("{}/vault.zip", server.url()),
            Path::new("vault.zip.part"),
            &HttpClient::new(Client::new()),
        )
        .await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_download_file_not_found_creates_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/vault.zip")
            .with_status(404)
            .create_async()
            .await;

        // No expectations: creating a file would panic.
        let runtime = MockRuntime::new();

        let result = download_file(
            &runtime,
            &format!("{}/vault.zip", server.url()),
            Path::new("vault.zip.part"),
            &HttpClient::new(Client::new()),
        )
        .await;

        mock.assert_async().await;
        assert!(result.is_err());
    }
}
