use std::env;
use std::fs;

use phrasebook_lib::graphql_api::api_schema_builder;

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=../phrasebook_lib/src/graphql_api");
    println!("cargo:rerun-if-changed=../common_types/src");

    let out_path = env::current_dir()?.join("schema.graphql");
    let sdl = api_schema_builder().finish().sdl();
    fs::write(out_path, sdl)?;

    Ok(())
}
