use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_upscale-bridge")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "upscale-bridge.exe"
            } else {
                "upscale-bridge"
            });
            p
        })
}

#[test]
fn cli_simulate_writes_report() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let cfg_path = dir.join("settings.json");
    let report_path = dir.join("report.json");
    let _ = std::fs::remove_file(&report_path);
    std::fs::write(
        &cfg_path,
        r#"{ "render_scale": 0.5, "upscale_scale": 2.0 }"#,
    )
    .unwrap();

    let cfg_arg = cfg_path.to_string_lossy().to_string();
    let report_arg = report_path.to_string_lossy().to_string();

    let status = std::process::Command::new(exe())
        .args([
            "simulate",
            "--frames",
            "6",
            "--width",
            "800",
            "--height",
            "600",
            "--resize-at",
            "3:1280x720",
            "--drop-source-at",
            "1",
            "--config",
            cfg_arg.as_str(),
            "--report",
        ])
        .arg(report_arg.as_str())
        .status()
        .unwrap();
    assert!(status.success());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["frames"], 6);
    assert_eq!(report["stats"]["upscaled"], 5);
    assert_eq!(report["stats"]["skipped"], 1);
    assert_eq!(report["stats"]["targets"]["allocations"], 2);
    assert_eq!(report["last_intermediate_extent"]["width"], 2560);
    assert_eq!(report["last_render_extent"]["height"], 360);
    assert_eq!(report["leaked_targets"], 0);
    assert_eq!(report["teardown"]["callbacks_released"], true);
}

#[test]
fn cli_config_prints_defaults() {
    let out = std::process::Command::new(exe())
        .arg("config")
        .output()
        .unwrap();
    assert!(out.status.success());

    let settings: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(settings["render_pass_event"], "after_rendering_opaques");
    assert_eq!(settings["render_scale"], 0.5);
}
