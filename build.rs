//! Build script for zeebe-client.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Compile the gateway proto (client-only, no server stubs — this crate
    // never plays the gateway role).
    println!("cargo:rerun-if-changed=proto/zeebe/gateway.proto");
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["proto/zeebe/gateway.proto"], &["proto"])
        .expect("Failed to compile gateway proto");
}
