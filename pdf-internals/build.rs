fn main() {
    // No build-time setup needed for dynamic linking.
    // PDFium is loaded at runtime from the directories listed in
    // `pdfium.library_dirs`, then from the system library paths.
    // qpdf is linked through the qpdf crate's own build script.
    println!("cargo:rerun-if-changed=build.rs");
}
