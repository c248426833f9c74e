use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};

use serde_json::{json, Value};

#[test]
fn stdio_serves_line_and_framed_requests() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("stdio.json");
    let mut child = Command::new(env!("CARGO_BIN_EXE_fathrd"))
        .env("FATHR_DB", &db)
        .env("FATHR_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn fathrd");

    let mut child_stdin = child.stdin.take().expect("stdin");
    let child_stdout = child.stdout.take().expect("stdout");
    let mut reader = BufReader::new(child_stdout);

    let classify = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "records/classify",
        "params": {
            "measurements": {
                "appearance": "normal",
                "liquefaction": "normal",
                "consistency": "medium",
                "semenQuantity": 2.0,
                "pH": 7.4,
                "totalMobility": 35.0,
                "progressiveMobility": 30.0,
                "nonProgressiveMobility": 5.0,
                "travelSpeed": 0.1,
                "mobilityIndex": 50.0,
                "still": 40.0,
                "agglutination": "mild",
                "spermConcentration": 20.0,
                "totalSpermatozoa": 40.0,
                "functionalSpermatozoa": 15.0,
                "roundCells": 0.5,
                "leukocytes": 0.2,
                "liveSpermatozoa": 70.0,
                "morphologyRate": 5.0,
                "pathology": 10.0,
                "headDefect": 3.0,
                "neckDefect": 2.0,
                "tailDefect": 1.0
            }
        }
    });
    let initialized = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
    let summary = serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "dashboard/summary",
        "params": {"user_id": "stdio-user"}
    }))
    .expect("encode summary");

    writeln!(child_stdin, "{classify}").expect("write classify");
    writeln!(child_stdin, "{initialized}").expect("write notification");
    write!(child_stdin, "Content-Length: {}\r\n\r\n", summary.len()).expect("write header");
    child_stdin.write_all(&summary).expect("write body");
    drop(child_stdin);

    let mut line = String::new();
    reader.read_line(&mut line).expect("read line response");
    let first: Value = serde_json::from_str(&line).expect("parse line response");
    assert_eq!(first["id"], 1);
    assert_eq!(first["result"]["motility"], "Less Active");
    assert_eq!(first["result"]["overall"], "Review");

    let mut header = String::new();
    reader.read_line(&mut header).expect("read header");
    let length: usize = header
        .trim()
        .strip_prefix("Content-Length:")
        .expect("content-length header")
        .trim()
        .parse()
        .expect("length");
    let mut blank = String::new();
    reader.read_line(&mut blank).expect("read separator");
    assert_eq!(blank, "\r\n");
    let mut body = vec![0_u8; length];
    reader.read_exact(&mut body).expect("read body");
    let second: Value = serde_json::from_slice(&body).expect("parse framed response");
    assert_eq!(second["id"], 2);
    assert_eq!(second["result"]["record_count"], 0);

    let status = child.wait().expect("wait");
    assert!(status.success());
    assert!(db.exists());
}
