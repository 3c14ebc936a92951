use std::sync::LazyLock;
use std::time::Duration;

/// Process-wide HTTP client shared by the TMDB and RPDB clients.
///
/// Built lazily on first use so connection pools and DNS results are reused
/// across requests. Per-call timeouts are set on each request from
/// configuration; the values here are upper bounds.
///
/// - Compression: gzip, deflate, brotli, zstd
/// - HTTP/2 with adaptive window sizing and keep-alive
/// - Rustls TLS
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        // Timeouts
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        // Connection pooling
        .pool_max_idle_per_host(16)
        .pool_idle_timeout(Duration::from_secs(90))
        // HTTP/2 settings
        .http2_adaptive_window(true)
        .http2_keep_alive_interval(Duration::from_secs(10))
        .http2_keep_alive_timeout(Duration::from_secs(20))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .zstd(true)
        .user_agent(format!("tmdb-addon/{}", crate::pkg_version()))
        .build()
        .expect("Failed to build HTTP client")
});
