use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo::rerun-if-changed=abi");
    let rev = fs::read_to_string("abi/REVISION")?;
    println!("cargo::rustc-env=ABI_REVISION={}", rev.trim());
    Ok(())
}
