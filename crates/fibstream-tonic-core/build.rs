/// Builds the gRPC client and server code for `fibonacci.proto` using
/// `tonic-prost-build`.
///
/// The generated modules land in `OUT_DIR` together with an encoded file
/// descriptor set (`fibonacci_descriptor.bin`) used to serve reflection.
///
/// # Panics
///
/// Panics if code generation fails.
///
/// # Output
///
/// ```rust,ignore
/// pub mod proto {
///     tonic::include_proto!("fibonacci");
/// }
/// ```
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("fibonacci_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/fibonacci.proto"], &["proto"])
        .unwrap();
}
