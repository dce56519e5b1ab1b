//! Generates the Kotlin and Swift bindings of `passbud-core`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
