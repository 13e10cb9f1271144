use vergen_gix::{BuildBuilder, CargoBuilder, Emitter, GixBuilder, RustcBuilder};

// Emits the VERGEN_* variables read by `version` and /api/version
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rustc = RustcBuilder::default()
        .semver(true)
        .channel(true)
        .llvm_version(true)
        .build()?;

    Emitter::default()
        .add_instructions(&BuildBuilder::default().build_timestamp(true).build()?)?
        .add_instructions(&CargoBuilder::default().target_triple(true).build()?)?
        .add_instructions(&GixBuilder::default().sha(true).build()?)?
        .add_instructions(&rustc)?
        .emit()?;

    Ok(())
}
