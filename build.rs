fn main() {
    // Embeds build metadata (including the git commit hash) into OUT_DIR/built.rs.
    if let Err(err) = built::write_built_file() {
        println!("cargo:warning=failed to acquire build-time information: {err}");
    }
}
