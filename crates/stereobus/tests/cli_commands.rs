#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use stereobus_msgs::{
    CameraParameterRequest, CameraParameterResponse, Image, Message, PixelType, SetBoolRequest,
    Velocity,
};
use stereobus_transport::{topic, Responder, ALL_TOPICS};
use tempfile::tempdir;

fn stereobus() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_stereobus"));
    command.env_remove("STEREOBUS_DIR").args(["--log-level", "error"]);
    command
}

fn run_json(args: &[&str]) -> Output {
    stereobus()
        .args(["--format", "json"])
        .args(args)
        .output()
        .expect("command should run")
}

fn write_message<M: Message>(dir: &Path, name: &str, message: &M) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, message.to_bytes().expect("message should encode"))
        .expect("message file should be writable");
    path
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

#[test]
fn topics_lists_the_whole_table() {
    let output = run_json(&["topics", "--dir", "/run/bus"]);
    assert!(output.status.success());
    let topics = &json_lines(&output)[0];
    let topics = topics.as_array().expect("topics should be a JSON array");
    assert_eq!(topics.len(), ALL_TOPICS.len());
    let velocity = topics
        .iter()
        .find(|t| t["name"] == "nodar/velocity")
        .expect("velocity topic should be listed");
    assert_eq!(velocity["port"], 9824);
    assert_eq!(velocity["kind"], "velocity");
    assert_eq!(velocity["socket"], "/run/bus/nodar-velocity.sock");
}

#[test]
fn inspect_summarizes_a_message_file() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let image = Image::new(5, 6, 2, 2, PixelType::MONO16, vec![0u8; 8]).unwrap();
    let path = write_message(dir, "image.bin", &image);

    let output = run_json(&["inspect", path.to_str().unwrap()]);
    assert!(output.status.success(), "{output:?}");
    let records = json_lines(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["kind"], "image");
    assert_eq!(records[0]["frame_id"], 6);
    assert_eq!(records[0]["size"], image.required_size());
    assert_eq!(records[0]["detail"], "2x2 u16C1 conv=unspecified ext=0B");
}

#[test]
fn inspect_all_walks_concatenated_messages() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let path = dir.join("stream.bin");
    let mut bytes = Velocity::new(1, [0.5, 0.0, 0.0]).to_bytes().unwrap().to_vec();
    bytes.extend_from_slice(&SetBoolRequest { value: true }.to_bytes().unwrap());
    std::fs::write(&path, &bytes).unwrap();

    let output = run_json(&["inspect", "--all", path.to_str().unwrap()]);
    assert!(output.status.success(), "{output:?}");
    let kinds: Vec<_> = json_lines(&output)
        .iter()
        .map(|r| r["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["velocity", "set_bool_request"]);
}

#[test]
fn inspect_rejects_garbage_with_data_invalid() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let path = dir.join("garbage.bin");
    std::fs::write(&path, [0xFFu8; 16]).unwrap();

    let output = run_json(&["inspect", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("decode failed"));
}

#[test]
fn inspect_all_prints_what_decoded_before_a_bad_message() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("torn.bin");
    let mut bytes = Velocity::new(9, [0.0; 3]).to_bytes().unwrap().to_vec();
    bytes.extend_from_slice(&[0xFFu8; 12]);
    std::fs::write(&path, &bytes).unwrap();

    let output = run_json(&["inspect", "--all", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(60));
    let records = json_lines(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["kind"], "velocity");
    assert_eq!(records[0]["time"], 9);
}

#[test]
fn send_refuses_a_message_of_the_wrong_kind() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let path = write_message(dir, "velocity.bin", &Velocity::default());

    let output = run_json(&[
        "send",
        "nodar/obstacle",
        "--file",
        path.to_str().unwrap(),
        "--dir",
        dir.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(60));
    assert!(!topic::OBSTACLE.socket_path(dir).exists());
}

#[test]
fn listen_refuses_request_topics() {
    let output = run_json(&["listen", "nodar/set_gain", "--dir", "/tmp"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn listen_times_out_waiting_for_a_publisher() {
    let tmp = tempdir().unwrap();
    let started = Instant::now();
    let output = run_json(&[
        "listen",
        "velocity",
        "--timeout",
        "300ms",
        "--dir",
        tmp.path().to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(124));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no publisher"));
}

#[test]
fn send_reaches_a_listener() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let path = write_message(dir, "velocity.bin", &Velocity::new(77, [1.5, 0.0, -2.0]));

    let listener = stereobus()
        .args(["--format", "json", "listen", "velocity", "--count", "1"])
        .args(["--timeout", "20s", "--dir", dir.to_str().unwrap()])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen should start");

    let sent = run_json(&[
        "send",
        "9824",
        "--file",
        path.to_str().unwrap(),
        "--dir",
        dir.to_str().unwrap(),
        "--linger",
        "20s",
    ]);
    assert!(sent.status.success(), "{sent:?}");

    let received = listener.wait_with_output().expect("listen should exit");
    assert!(received.status.success(), "{received:?}");
    let records = json_lines(&received);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["kind"], "velocity");
    assert_eq!(records[0]["time"], 77);
    assert_eq!(records[0]["source"], "nodar/velocity");
    assert!(records[0]["received_at"].is_string());
}

#[test]
fn send_without_subscribers_times_out() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let path = write_message(dir, "velocity.bin", &Velocity::default());
    let started = Instant::now();
    let output = run_json(&[
        "send",
        "velocity",
        "-f",
        path.to_str().unwrap(),
        "--dir",
        dir.to_str().unwrap(),
        "--linger",
        "200ms",
    ]);
    assert_eq!(output.status.code(), Some(124));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!topic::VELOCITY.socket_path(dir).exists());
}

#[test]
fn send_on_a_settings_topic_prints_the_reply() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let path = write_message(dir, "gain.bin", &CameraParameterRequest { value: 4.0 });
    let mut responder = Responder::bind(topic::CAMERA_GAIN, dir).unwrap();

    let server = thread::spawn(move || {
        let mut seen = None;
        responder
            .serve(|request: CameraParameterRequest| {
                seen = Some(request.value);
                CameraParameterResponse { success: true }
            })
            .unwrap();
        seen
    });

    let output = run_json(&[
        "send",
        "set_gain",
        "-f",
        path.to_str().unwrap(),
        "--dir",
        dir.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(server.join().unwrap(), Some(4.0));
    let records = json_lines(&output);
    assert_eq!(records[0]["kind"], "camera_parameter_response");
    assert_eq!(records[0]["detail"], "success=true");
}

#[test]
fn version_extended_reports_protocol() {
    let output = stereobus().args(["version", "--extended"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: stereobus"));
    assert!(stdout.contains("protocol: 0.1"));
}
