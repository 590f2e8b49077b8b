fn main() {
    uniffi::generate_scaffolding("src/vidstream.udl").unwrap();
}
