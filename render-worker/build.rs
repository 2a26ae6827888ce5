// Build script to capture build timestamp

fn main() {
    let now = chrono::Local::now();
    let build_timestamp = now.to_rfc3339();

    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rerun-if-changed=build.rs");
}
