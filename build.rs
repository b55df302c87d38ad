//! Build script: checks for the Metal Toolchain when the `metal` feature is enabled.

fn main() {
    println!("cargo::rustc-check-cfg=cfg(missing_metal_toolchain)");

    // mistralrs compiles its .metal shaders at build time and fails with an
    // opaque error when `xcrun metal` is missing. Surface that early instead.
    #[cfg(all(feature = "metal", target_os = "macos"))]
    {
        let output = std::process::Command::new("xcrun")
            .args(["metal", "--version"])
            .output();

        if !matches!(output, Ok(o) if o.status.success()) {
            println!(
                "cargo::warning=Metal Toolchain not found. Install it with: \
                 xcodebuild -downloadComponent MetalToolchain"
            );
            println!("cargo::rustc-cfg=missing_metal_toolchain");
        }
    }
}
