//! Error response integration tests.

#[cfg(test)]
mod tests {
    use crate::{INVOICE_XML, client, post_form, url, xml_form};

    fn code(body: &[u8]) -> String {
        let json: serde_json::Value = serde_json::from_slice(body).expect("json error body");
        json["code"].as_str().unwrap_or_default().to_owned()
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_missing_xml_field() {
        let form = reqwest::multipart::Form::new().text("additionalData", "{}");
        let (status, body) = post_form("/generate-invoice", form).await.expect("request");
        assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(code(&body), "MissingField");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_non_xml_file() {
        let form = xml_form("faktura.pdf", INVOICE_XML).expect("form");
        let (status, body) = post_form("/generate-upo", form).await.expect("request");
        assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(code(&body), "InvalidFileType");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_invalid_additional_data() {
        let form = xml_form("faktura.xml", INVOICE_XML)
            .expect("form")
            .text("additionalData", "[not an object]");
        let (status, body) = post_form("/generate-invoice", form).await.expect("request");
        assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(code(&body), "InvalidAdditionalData");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_malformed_xml() {
        let form = xml_form("faktura.xml", "<Faktura><Fa></Faktura>").expect("form");
        let (status, body) = post_form("/generate-invoice", form).await.expect("request");
        assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(code(&body), "MalformedXml");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_json_body() {
        let response = client()
            .post(url("/generate-invoice"))
            .header("content-type", "application/json")
            .body("{}")
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body = response.bytes().await.expect("body");
        assert_eq!(code(&body), "InvalidContentType");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_wrong_method_and_unknown_path() {
        let response = client()
            .get(url("/generate-invoice"))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

        let response = client().get(url("/missing")).send().await.expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
