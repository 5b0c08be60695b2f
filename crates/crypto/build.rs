//! Build script for compiling the keyset protobuf definitions into Rust code

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    println!("cargo:rerun-if-changed=proto");
    tonic_build::configure()
        .build_client(false)
        .build_server(false)
        .compile(&["proto/tink.proto", "proto/keys.proto"], &["proto"])?;
    Ok(())
}
