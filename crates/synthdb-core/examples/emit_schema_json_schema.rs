use schemars::schema_for;
use synthdb_core::ParsedSchema;

fn main() {
    let schema = schema_for!(ParsedSchema);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}
