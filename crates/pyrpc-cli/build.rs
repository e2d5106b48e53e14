// The `pyrpc` binary embeds libpython; record where to find it at run time.
fn main() {
    println!("cargo:rerun-if-env-changed=PYO3_PYTHON");

    let Ok(target) = std::env::var("TARGET") else {
        return;
    };

    let relative: &[&str] = if target.contains("apple-darwin") {
        &["@executable_path", "@executable_path/../lib"]
    } else if target.contains("linux") {
        &["$ORIGIN", "$ORIGIN/../lib"]
    } else {
        return;
    };
    for path in relative {
        add_rpath(path);
    }

    if let Some(libdir) = python_libdir() {
        add_rpath(&libdir);
    }
}

fn add_rpath(path: &str) {
    println!("cargo:rustc-link-arg-bins=-Wl,-rpath,{path}");
}

/// LIBDIR of the interpreter pyo3 builds against, if one was named
fn python_libdir() -> Option<String> {
    let python = std::env::var("PYO3_PYTHON").ok()?;
    let output = std::process::Command::new(python)
        .args([
            "-c",
            "import sysconfig; print(sysconfig.get_config_var('LIBDIR') or '')",
        ])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let libdir = String::from_utf8(output.stdout).ok()?;
    let libdir = libdir.trim();
    (!libdir.is_empty()).then(|| libdir.to_string())
}
