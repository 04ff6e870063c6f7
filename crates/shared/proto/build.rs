fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile user service proto
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&["proto/user.proto"], &["proto/"])?;

    Ok(())
}
