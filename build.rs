//! Compiles the provider protocol into Rust types.
//!
//! The proto is parsed with `protox`, so no `protoc` binary is needed on the
//! build machine. Output lands in `OUT_DIR` and is pulled in by `src/proto.rs`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/provider.proto");

    let descriptors = protox::compile(["proto/provider.proto"], ["proto"])?;

    tonic_prost_build::configure()
        .build_client(false)
        .build_server(true)
        .compile_fds(descriptors)?;

    Ok(())
}
