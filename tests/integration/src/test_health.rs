//! Health probe and CORS integration tests.

#[cfg(test)]
mod tests {
    use crate::{client, url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_healthy() {
        let response = client().get(url("/health")).send().await.expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let json: serde_json::Value = response.json().await.expect("json");
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_answer_preflight() {
        let response = client()
            .request(reqwest::Method::OPTIONS, url("/generate-invoice"))
            .header("Origin", "https://example.com")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .expect("request");
        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }
}
