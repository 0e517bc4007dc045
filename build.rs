fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile the storage plugin protocol
    tonic_prost_build::compile_protos("proto/storage.proto")?;

    Ok(())
}
