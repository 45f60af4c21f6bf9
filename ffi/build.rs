use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("set by cargo"));
    let header = crate_dir.join("include").join("minihttp.h");

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("MINIHTTP_H".to_string()),
        cpp_compat: true,
        ..Default::default()
    };

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            if let Err(e) = std::fs::create_dir_all(crate_dir.join("include")) {
                println!("cargo:warning=cannot create include dir: {e}");
                return;
            }
            bindings.write_to_file(header);
        }
        Err(e) => println!("cargo:warning=header not generated: {e}"),
    }
}
