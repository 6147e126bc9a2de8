//! Page serving integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::{BUCKET, ENDPOINT, client, raw_get, start_server};

    #[tokio::test]
    async fn test_should_serve_index_with_signed_image_urls() {
        let server = start_server().await;
        server.write(
            "index.html",
            r#"<html><body><h1>Gallery</h1><img data-src="photos/cat.jpg" src="thumbs/cat.jpg" alt="cat"></body></html>"#,
        );

        let response = client().get(server.url("/")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/html; charset=utf-8"
        );
        assert!(response.headers().contains_key("x-request-id"));

        let body = response.text().await.unwrap();
        assert!(body.contains("<h1>Gallery</h1>"));
        assert!(body.contains(r#"alt="cat""#));
        assert!(body.contains(&format!(
            r#"data-src="https://{ENDPOINT}/{BUCKET}/photos/cat.jpg?X-Amz-Algorithm=AWS4-HMAC-SHA256"#
        )));
        assert!(body.contains(&format!(
            r#" src="https://{ENDPOINT}/{BUCKET}/thumbs/cat.jpg?X-Amz-Algorithm=AWS4-HMAC-SHA256"#
        )));
        assert!(body.contains("X-Amz-Expires=3600"));
        assert!(body.contains("X-Amz-Signature="));
        assert!(!body.contains("wJalrXUtnFEMI"));
    }

    #[tokio::test]
    async fn test_should_serve_nested_page_and_directory_index() {
        let server = start_server().await;
        server.write("blog/post.html", r#"<img src="post.png">"#);
        server.write("blog/index.html", "<p>no images</p>");

        let post = client()
            .get(server.url("/blog/post.html"))
            .send()
            .await
            .unwrap();
        assert_eq!(post.status(), StatusCode::OK);
        assert!(post.text().await.unwrap().contains("/images/post.png?"));

        let index = client().get(server.url("/blog/")).send().await.unwrap();
        assert_eq!(index.status(), StatusCode::OK);
        assert_eq!(index.text().await.unwrap(), "<p>no images</p>");
    }

    #[tokio::test]
    async fn test_should_return_not_found_for_rejected_requests() {
        let server = start_server().await;
        server.write("index.html", "<p>home</p>");
        server.write("style.css", "body {}");
        server.write("broken.html", b"<p>\xff\xfe</p>");
        let client = client();

        let expected = client
            .get(server.url("/missing.html"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        for path in [
            "/missing.html",
            "/style.css",
            "/broken.html",
            "/%ff.html",
            "/nowhere/",
        ] {
            let response = client.get(server.url(path)).send().await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
            assert_eq!(response.text().await.unwrap(), expected, "{path}");
        }
    }

    #[tokio::test]
    async fn test_should_reject_encoded_traversal_sent_verbatim() {
        let server = start_server().await;
        // Served if the dot segments were dropped before reaching the server.
        server.write("etc/passwd.html", "<p>inside root</p>");

        let direct = raw_get(server.addr, "/etc/passwd.html").await;
        assert!(direct.starts_with("HTTP/1.1 200 OK"), "{direct}");

        for path in [
            "/%2e%2e/%2e%2e/etc/passwd.html",
            "/%2E%2E%2F%2E%2E%2Fetc%2Fpasswd.html",
            "/../../etc/passwd.html",
        ] {
            let response = raw_get(server.addr, path).await;
            assert!(response.starts_with("HTTP/1.1 404 Not Found"), "{path}: {response}");
            assert!(!response.contains("inside root"), "{path}");
        }
    }

    #[tokio::test]
    async fn test_should_sign_fresh_urls_on_every_request() {
        let server = start_server().await;
        server.write("index.html", r#"<img src="a.jpg">"#);
        let client = client();

        let first = client
            .get(server.url("/index.html"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let second = client
            .get(server.url("/index.html"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert_ne!(first, second);
        assert!(second.contains("/images/a.jpg?"));
    }

    #[tokio::test]
    async fn test_should_pick_up_file_changes_without_restart() {
        let server = start_server().await;
        server.write("page.html", "<p>v1</p>");
        let client = client();

        let v1 = client.get(server.url("/page.html")).send().await.unwrap();
        assert_eq!(v1.text().await.unwrap(), "<p>v1</p>");

        server.write("page.html", "<p>v2</p>");
        let v2 = client.get(server.url("/page.html")).send().await.unwrap();
        assert_eq!(v2.text().await.unwrap(), "<p>v2</p>");
    }

    #[tokio::test]
    async fn test_should_answer_health_check() {
        let server = start_server().await;

        let response = client()
            .get(server.url("/_imgsign/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["service"], "imgsign");
    }

    #[tokio::test]
    async fn test_should_handle_concurrent_requests() {
        let server = start_server().await;
        server.write("index.html", r#"<img src="a.jpg"><img src="b.jpg">"#);
        let client = client();

        let requests = (0..16).map(|_| {
            let client = client.clone();
            let url = server.url("/");
            tokio::spawn(async move { client.get(url).send().await.unwrap().status() })
        });
        for handle in requests.collect::<Vec<_>>() {
            assert_eq!(handle.await.unwrap(), StatusCode::OK);
        }
    }
}
