use axum::{http::header, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;

const ARTICLE: &str = r#"<!doctype html>
<html lang="en"><head><title>Enzyme stability notes</title>
<meta name="description" content="Lab notes on thermal stability"></head>
<body><article>
<h1>Enzyme stability notes</h1>
<p>Researchers measured how quickly the enzyme degraded under varying temperatures,
and they found that stability dropped sharply above forty degrees because the folded
structure loosened.</p>
<p>Adding a small amount of glycerol slowed the loss of activity, which suggests that
the solvent shell matters as much as the sequence itself for long incubations.</p>
<pre><code>rate = k * exp(-Ea / (R * T))</code></pre>
</article></body></html>"#;

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route(
            "/article",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], ARTICLE) }),
        )
        .route(
            "/short",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    "<html><body><p>tiny</p></body></html>",
                )
            }),
        )
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "nope") }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn sgnl(args: &[&str]) -> (Option<i32>, serde_json::Value) {
    let bin = assert_cmd::cargo::cargo_bin!("sgnl");
    let out = tokio::process::Command::new(bin)
        .args(args)
        .args(["--timeout-ms", "5000"])
        .env_remove("SGNL_ENV_FILE")
        .output()
        .await
        .expect("run sgnl");
    let v = serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout was not json ({e}); stderr={}",
            String::from_utf8_lossy(&out.stderr)
        )
    });
    (out.status.code(), v)
}

#[tokio::test(flavor = "multi_thread")]
async fn extract_prints_canonical_text_and_metadata() {
    let addr = serve().await;
    let url = format!("http://{addr}/article");
    let (code, v) = sgnl(&["extract", &url, "--force-depth"]).await;

    assert_eq!(code, Some(0));
    assert_eq!(v["title"].as_str(), Some("Enzyme stability notes"));
    assert!(v.get("error").is_none());
    assert!(v["length"].as_u64().unwrap() > 100);
    assert!(v["content"].as_str().unwrap().contains("glycerol"));
    for key in ["signal_score", "density_score", "idea_density"] {
        let s = v[key].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&s), "{key}={s}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn extract_failure_prints_error_record_and_exits_nonzero() {
    let addr = serve().await;
    let url = format!("http://{addr}/missing");
    let (code, v) = sgnl(&["extract", &url]).await;

    assert_eq!(code, Some(1));
    assert_eq!(v["title"].as_str(), Some("Extraction Failed"));
    assert_eq!(v["length"].as_u64(), Some(0));
    assert_eq!(v["density_score"].as_f64(), Some(0.0));
    assert!(v["error"].as_str().unwrap().contains("404"));
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_proceeds_with_heuristic_when_threshold_is_met() {
    let addr = serve().await;
    let url = format!("http://{addr}/article");
    let (code, v) = sgnl(&["scan", &url, "--density-threshold", "0"]).await;

    assert_eq!(code, Some(0));
    assert_eq!(v["skipped_analysis"].as_bool(), Some(false));
    assert!(v["explanation"].is_null());
    let h = v["heuristic"]["score"].as_u64().expect("heuristic score");
    assert!(h <= 100);
    assert!(v["analysis_text"].as_str().unwrap().contains("enzyme"));
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_skips_analysis_below_threshold() {
    let addr = serve().await;
    let url = format!("http://{addr}/article");
    let (code, v) = sgnl(&["scan", &url, "--density-threshold", "1.5"]).await;

    assert_eq!(code, Some(0));
    assert_eq!(v["skipped_analysis"].as_bool(), Some(true));
    assert!(v["heuristic"].is_null());
    assert!(v["analysis_text"].is_null());
    assert!(v["explanation"]
        .as_str()
        .unwrap()
        .starts_with("Low Signal: Content filtered (density="));
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_rejects_thin_pages() {
    let addr = serve().await;
    let url = format!("http://{addr}/short");
    let (code, v) = sgnl(&["scan", &url]).await;

    assert_eq!(code, Some(2));
    assert_eq!(v["ok"].as_bool(), Some(false));
    assert_eq!(v["error"]["kind"].as_str(), Some("insufficient_content"));
    assert!(v["error"]["chars"].as_u64().unwrap() < 100);
}

#[tokio::test(flavor = "multi_thread")]
async fn analyze_ranks_candidates_and_survives_fetch_failures() {
    let addr = serve().await;
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("candidates.json");
    let items = serde_json::json!([
        { "url": format!("http://{addr}/missing"), "title": "Gone", "score": 0.9 },
        { "url": format!("http://{addr}/article"), "title": "Enzymes", "score": 0.4 },
    ]);
    std::fs::write(&input, items.to_string()).unwrap();
    let input = input.to_string_lossy().to_string();

    let (code, v) = sgnl(&["analyze", "--query", "enzyme stability", "--input", &input]).await;
    assert_eq!(code, Some(0));
    assert_eq!(v["query"].as_str(), Some("enzyme stability"));
    assert_eq!(v["count"].as_u64(), Some(2));

    let results = v["results"].as_array().unwrap();
    let finals: Vec<f64> = results
        .iter()
        .map(|r| r["final_score"].as_f64().unwrap())
        .collect();
    assert!(finals.windows(2).all(|w| w[0] >= w[1]), "{finals:?}");

    let gone = results
        .iter()
        .find(|r| r["title"].as_str() == Some("Gone"))
        .unwrap();
    assert_eq!(
        gone["heuristic_reason"].as_str(),
        Some("Could not analyze (fetch failed)")
    );
    assert_eq!(gone["original_score"].as_f64(), Some(0.9));
}
