use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.h");
    println!("cargo:rerun-if-env-changed=FAAC_LIB_DIR");
    println!("cargo:rerun-if-env-changed=FAAC_INCLUDE_DIR");

    let mut include_paths = Vec::new();

    if let Ok(lib_dir) = env::var("FAAC_LIB_DIR") {
        println!("cargo:rustc-link-search={}", lib_dir);
        println!("cargo:rustc-link-lib=faac");
        if let Ok(include_dir) = env::var("FAAC_INCLUDE_DIR") {
            include_paths.push(PathBuf::from(include_dir));
        }
    } else {
        // older faac releases don't ship a .pc file, so fall back to whatever the linker finds
        match pkg_config::Config::new().probe("faac") {
            Ok(lib) => include_paths.extend(lib.include_paths),
            Err(_) => println!("cargo:rustc-link-lib=faac"),
        }
    }

    let mut bindings = bindgen::Builder::default().header("src/lib.h");
    for path in &include_paths {
        bindings = bindings.clang_arg(format!("-I{}", path.display()));
    }

    let bindings = bindings
        .allowlist_function("faacEnc.+")
        .allowlist_type("faacEnc.+")
        .allowlist_var("FAAC_.+")
        .allowlist_var("SHORTCTL_.+")
        .allowlist_var("(RAW|ADTS)_STREAM")
        .allowlist_var("(MAIN|LOW|SSR|LTP)")
        .allowlist_var("(MPEG2|MPEG4)")
        .generate()
        .expect("unable to generate bindings");

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    bindings.write_to_file(out_path.join("bindings.rs")).expect("unable to write bindings");
}
