use entities::ENTITIES;
use std::io::Write;
use std::{env, path::PathBuf};

fn main() {
    let out_dir: PathBuf = env::var("OUT_DIR").unwrap().parse().unwrap();

    // entity::lookup is handed just the inner entity name, like "amp" for
    // "&amp;"; we only match those with a trailing ";".
    //
    // entities::ENTITIES includes many both with and without a trailing ";".
    // Exclude those without, and strip the leading "&" and trailing ";" so
    // the map is keyed on the bare name.
    let mut named = ENTITIES
        .iter()
        .filter(|e| e.entity.starts_with('&') && e.entity.ends_with(';'))
        .map(|e| (&e.entity[1..e.entity.len() - 1], e.characters))
        .collect::<Vec<_>>();
    named.sort_by_key(|(entity, _characters)| *entity);
    named.dedup_by_key(|(entity, _characters)| *entity);

    let min_length = named.iter().map(|(e, _)| e.len()).min().unwrap();
    let max_length = named.iter().map(|(e, _)| e.len()).max().unwrap();

    let mut map = phf_codegen::Map::new();
    for &(entity, characters) in &named {
        map.entry(entity, &format!("{:?}", characters));
    }

    let out = std::fs::File::create(out_dir.join("entitydata.rs")).unwrap();
    let mut bw = std::io::BufWriter::new(out);
    writeln!(bw, "mod entitydata {{").unwrap();
    writeln!(bw, "    pub const MIN_ENTITY_LENGTH: usize = {};", min_length).unwrap();
    writeln!(bw, "    pub const MAX_ENTITY_LENGTH: usize = {};", max_length).unwrap();
    writeln!(
        bw,
        "    pub static ENTITIES: ::phf::Map<&'static str, &'static str> = {};",
        map.build()
    )
    .unwrap();
    writeln!(bw, "}}").unwrap();
}
