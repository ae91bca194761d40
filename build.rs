use std::process::Command;

fn main() {
    // Prefer VAI_INSTALLER_VERSION if set (e.g. by a release pipeline),
    // otherwise fall back to git describe for local builds.
    if let Ok(version) = std::env::var("VAI_INSTALLER_VERSION") {
        println!("cargo:rustc-env=VAI_INSTALLER_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=VAI_INSTALLER_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=VAI_INSTALLER_VERSION");
}
