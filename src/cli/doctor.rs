//! Environment readiness check.

use anyhow::Result;
use std::process::Command;
use unspool::session::find_chromium;

pub async fn run() -> Result<()> {
    println!("Unspool Doctor");
    println!("==============");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    // Chromium discovery + version
    let chromium = find_chromium();
    match &chromium {
        Some(path) => {
            println!("[OK] Chromium found: {}", path.display());
            match Command::new(path).arg("--version").output() {
                Ok(output) if output.status.success() => {
                    let version = String::from_utf8_lossy(&output.stdout);
                    println!("[OK] Version: {}", version.trim());
                }
                _ => println!("[??] Could not read Chromium version"),
            }
        }
        None => println!(
            "[!!] Chromium NOT found. Install Chrome/Chromium or set UNSPOOL_CHROMIUM."
        ),
    }

    // Output-path writability
    let cwd = std::env::current_dir()?;
    let probe = cwd.join(".unspool-doctor-probe");
    match std::fs::write(&probe, b"ok") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            println!("[OK] Output directory {} is writable", cwd.display());
        }
        Err(e) => println!("[!!] Output directory {} not writable: {e}", cwd.display()),
    }

    println!();
    if chromium.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
        println!("  Only `unspool extract` and `unspool export` work without a browser.");
    }
    Ok(())
}
