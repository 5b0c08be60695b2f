//! Build script for compiling the testing API protobuf definitions into Rust code

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    println!("cargo:rerun-if-changed=proto/testing_api.proto");
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["proto/testing_api.proto"], &["proto"])?;
    Ok(())
}
