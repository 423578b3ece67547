//! Document rendering integration tests.

#[cfg(test)]
mod tests {
    use reqwest::multipart::Part;

    use crate::{INVOICE_XML, UPO_XML, client, post_form, url, xml_form};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_render_invoice_with_normalized_document() {
        let form = xml_form("faktura.xml", INVOICE_XML)
            .expect("form")
            .text("additionalData", r#"{"nrKSeF":"5555555555-20240101-ABCDEF-01"}"#);
        let response = client()
            .post(url("/generate-invoice"))
            .multipart(form)
            .send()
            .await
            .expect("request");

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let disposition = response
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok())
            .expect("content-disposition")
            .to_owned();
        assert!(disposition.starts_with("attachment; filename=\"invoice-"));

        // The `cat` renderer echoes the render request.
        let json: serde_json::Value = response.json().await.expect("json");
        assert_eq!(json["kind"], "invoice");
        assert_eq!(json["document"]["Faktura"]["Fa"]["P_2"]["_text"], "FV/2024/001");
        assert_eq!(
            json["document"]["Faktura"]["Fa"]["FaWiersz"][1]["P_7"]["_text"],
            "Gadget"
        );
        assert_eq!(
            json["additionalData"]["nrKSeF"],
            "5555555555-20240101-ABCDEF-01"
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_render_upo() {
        let (status, body) = post_form("/generate-upo", xml_form("upo.xml", UPO_XML).expect("form"))
            .await
            .expect("request");
        assert_eq!(status, reqwest::StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["kind"], "upo");
        assert!(json["document"]["Potwierdzenie"].is_object());
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_preserve_binary_safe_upload() {
        let mut xml = INVOICE_XML.as_bytes().to_vec();
        xml.extend_from_slice(b"\r\n\r\n<!-- trailing -->");
        let part = Part::bytes(xml)
            .file_name("faktura.xml")
            .mime_str("application/xml")
            .expect("mime");
        let form = reqwest::multipart::Form::new().part("xml", part);

        let (status, _) = post_form("/generate-invoice", form).await.expect("request");
        assert_eq!(status, reqwest::StatusCode::OK);
    }
}
