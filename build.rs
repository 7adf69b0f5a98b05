use std::{env, fs::File, io::Write, path::PathBuf};

fn main() -> anyhow::Result<()> {
    // The PAC only provides device.x, the memory layout comes from here
    let out = PathBuf::from(env::var_os("OUT_DIR").ok_or(anyhow::anyhow!("`OUT_DIR` is not set"))?);

    File::create(out.join("memory.x"))?.write_all(include_bytes!("memory.x"))?;

    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    Ok(())
}
