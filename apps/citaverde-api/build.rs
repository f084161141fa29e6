fn main() {
    built::write_built_file().expect("No se pudo generar la información de build");
}
