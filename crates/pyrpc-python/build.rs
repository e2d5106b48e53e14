use std::env;
use std::path::{Path, PathBuf};

// Link against a bundled libpython when a shim directory is provided, so the
// bridge can embed an interpreter that is not installed system-wide.
fn main() {
    println!("cargo:rerun-if-env-changed=PYRPC_PYTHON_SHIM_DIR");
    println!("cargo:rerun-if-changed=python/pyrpc_internal.py");

    let (Ok(manifest_dir), Ok(target)) = (env::var("CARGO_MANIFEST_DIR"), env::var("TARGET"))
    else {
        return;
    };
    let shim_dir = env::var("PYRPC_PYTHON_SHIM_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| Path::new(&manifest_dir).join("../../python-shim").join(&target));

    if !shim_dir.exists() {
        return;
    }

    if let Some(lib_file) = find_python_lib(&shim_dir) {
        println!("cargo:rustc-link-search=native={}", shim_dir.display());
        println!("cargo:rerun-if-changed={}", lib_file.display());
        add_rpath(&target);
    }
}

fn find_python_lib(dir: &Path) -> Option<PathBuf> {
    dir.read_dir().ok()?.flatten().map(|e| e.path()).find(|path| {
        path.is_file()
            && path.file_name().and_then(|s| s.to_str()).is_some_and(|name| {
                (name.starts_with("libpython")
                    && (name.ends_with(".dylib") || name.contains(".so")))
                    || (name.starts_with("python") && name.ends_with(".dll"))
            })
    })
}

fn add_rpath(target: &str) {
    if target.contains("apple-darwin") {
        println!("cargo:rustc-link-arg=-Wl,-rpath,@executable_path");
        println!("cargo:rustc-link-arg=-Wl,-rpath,@executable_path/..");
    } else if target.contains("linux") {
        println!("cargo:rustc-link-arg=-Wl,-rpath,$ORIGIN");
        println!("cargo:rustc-link-arg=-Wl,-rpath,$ORIGIN/..");
    }
}
