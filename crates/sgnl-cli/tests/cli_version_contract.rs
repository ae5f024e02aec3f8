#[test]
fn sgnl_version_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("sgnl");
    let out = std::process::Command::new(bin)
        .args(["version"])
        // Keep the contract hermetic.
        .env_remove("SGNL_ENV_FILE")
        .output()
        .expect("run sgnl version");

    assert!(out.status.success(), "sgnl version failed");
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse version json");

    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["kind"].as_str(), Some("version"));
    assert_eq!(v["ok"].as_bool(), Some(true));
    assert_eq!(v["name"].as_str(), Some("sgnl"));
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[test]
fn sgnl_version_text_output_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("sgnl");
    let out = std::process::Command::new(bin)
        .args(["version", "--output", "text"])
        .output()
        .expect("run sgnl version --output text");

    assert!(out.status.success());
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.trim_start().starts_with("sgnl "), "got: {s}");
}
